//! services/api/src/mood.rs
//!
//! Mood-tracking domain types and the analytics math behind the
//! `/api/mood/analytics` endpoint: per-series statistics, a linear trend
//! sign, and sleep/activity correlation insights.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One self-reported mood entry. Scores are on a 1–10 scale.
#[derive(Debug, Clone, Serialize)]
pub struct MoodEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub mood_score: i32,
    pub energy_level: i32,
    pub stress_level: i32,
    pub sleep_hours: Option<f32>,
    pub physical_activity: Option<i32>,
    pub social_activity: Option<i32>,
    pub notes: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMoodEntry {
    pub mood_score: i32,
    pub energy_level: i32,
    pub stress_level: i32,
    pub sleep_hours: Option<f32>,
    pub physical_activity: Option<i32>,
    pub social_activity: Option<i32>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial update; unset fields keep their stored values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoodEntryPatch {
    pub mood_score: Option<i32>,
    pub energy_level: Option<i32>,
    pub stress_level: Option<i32>,
    pub sleep_hours: Option<f32>,
    pub physical_activity: Option<i32>,
    pub social_activity: Option<i32>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MoodEntryPatch {
    pub fn apply_to(self, mut entry: MoodEntry) -> MoodEntry {
        if let Some(v) = self.mood_score {
            entry.mood_score = v;
        }
        if let Some(v) = self.energy_level {
            entry.energy_level = v;
        }
        if let Some(v) = self.stress_level {
            entry.stress_level = v;
        }
        if let Some(v) = self.sleep_hours {
            entry.sleep_hours = Some(v);
        }
        if let Some(v) = self.physical_activity {
            entry.physical_activity = Some(v);
        }
        if let Some(v) = self.social_activity {
            entry.social_activity = Some(v);
        }
        if let Some(v) = self.notes {
            entry.notes = v;
        }
        if let Some(v) = self.tags {
            entry.tags = v;
        }
        entry
    }
}

//=========================================================================================
// Analytics
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

/// Average/min/max plus the trend sign for one series of scores.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub trend: Trend,
}

impl SeriesStats {
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let average = values.iter().sum::<f64>() / values.len() as f64;
        let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some(Self {
            average,
            min,
            max,
            trend: trend(values),
        })
    }
}

/// Least-squares slope over entry index, bucketed at ±0.1 into a trend sign.
pub fn trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }
    let n = values.len() as f64;
    let x_mean = (values.len() - 1) as f64 / 2.0;
    let y_mean = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        numerator += dx * (y - y_mean);
        denominator += dx * dx;
    }
    if denominator == 0.0 {
        return Trend::Stable;
    }
    let slope = numerator / denominator;
    if slope > 0.1 {
        Trend::Improving
    } else if slope < -0.1 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

/// Pearson correlation coefficient; 0.0 for degenerate inputs.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.len() < 2 {
        return 0.0;
    }
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut x_variance = 0.0;
    let mut y_variance = 0.0;
    for i in 0..x.len() {
        let dx = x[i] - x_mean;
        let dy = y[i] - y_mean;
        numerator += dx * dy;
        x_variance += dx * dx;
        y_variance += dy * dy;
    }
    if x_variance == 0.0 || y_variance == 0.0 {
        return 0.0;
    }
    numerator / (x_variance * y_variance).sqrt()
}

/// Human-readable observations over the last month of entries. Needs at
/// least a week of data to say anything.
pub fn insights(entries: &[MoodEntry]) -> Vec<String> {
    if entries.len() < 7 {
        return vec!["Need more data to generate insights".to_string()];
    }
    let mut insights = Vec::new();

    let mood_scores: Vec<f64> = entries.iter().map(|e| f64::from(e.mood_score)).collect();
    let avg_mood = mood_scores.iter().sum::<f64>() / mood_scores.len() as f64;
    if avg_mood > 7.0 {
        insights.push("Your mood has been consistently positive recently".to_string());
    } else if avg_mood < 4.0 {
        insights.push("Your mood has been consistently low recently".to_string());
    } else {
        insights.push("Your mood has been relatively stable recently".to_string());
    }

    let sleep_pairs: Vec<(f64, f64)> = entries
        .iter()
        .filter_map(|e| e.sleep_hours.map(|s| (f64::from(s), f64::from(e.mood_score))))
        .collect();
    if !sleep_pairs.is_empty() {
        let sleep: Vec<f64> = sleep_pairs.iter().map(|p| p.0).collect();
        let mood: Vec<f64> = sleep_pairs.iter().map(|p| p.1).collect();
        let r = correlation(&sleep, &mood);
        if r > 0.3 {
            insights.push("Better sleep appears to correlate with better mood".to_string());
        } else if r < -0.3 {
            insights.push("Poor sleep appears to correlate with lower mood".to_string());
        }
    }

    let activity_pairs: Vec<(f64, f64)> = entries
        .iter()
        .filter_map(|e| {
            e.physical_activity
                .map(|a| (f64::from(a), f64::from(e.mood_score)))
        })
        .collect();
    if !activity_pairs.is_empty() {
        let activity: Vec<f64> = activity_pairs.iter().map(|p| p.0).collect();
        let mood: Vec<f64> = activity_pairs.iter().map(|p| p.1).collect();
        let r = correlation(&activity, &mood);
        if r > 0.3 {
            insights.push("Physical activity appears to improve your mood".to_string());
        } else if r < -0.3 {
            insights.push("Physical activity appears to correlate with lower mood".to_string());
        }
    }

    insights
}

/// Simple guidance derived from the monthly averages.
pub fn recommendations(entries: &[MoodEntry]) -> Vec<String> {
    if entries.len() < 7 {
        return vec!["Continue tracking to get personalized recommendations".to_string()];
    }
    let mut recommendations = Vec::new();

    let avg_mood = entries.iter().map(|e| f64::from(e.mood_score)).sum::<f64>()
        / entries.len() as f64;
    let avg_stress = entries.iter().map(|e| f64::from(e.stress_level)).sum::<f64>()
        / entries.len() as f64;

    if avg_mood < 5.0 {
        recommendations.push("Consider talking to a mental health professional".to_string());
        recommendations.push("Try engaging in activities you used to enjoy".to_string());
    }
    if avg_stress > 7.0 {
        recommendations
            .push("Practice stress management techniques like deep breathing".to_string());
        recommendations.push("Consider taking regular breaks throughout the day".to_string());
    }

    let sleep_values: Vec<f64> = entries
        .iter()
        .filter_map(|e| e.sleep_hours.map(f64::from))
        .collect();
    if !sleep_values.is_empty() {
        let avg_sleep = sleep_values.iter().sum::<f64>() / sleep_values.len() as f64;
        if avg_sleep < 7.0 {
            recommendations.push("Aim for 7-9 hours of sleep per night".to_string());
        } else if avg_sleep > 9.0 {
            recommendations
                .push("Consider if oversleeping might be affecting your mood".to_string());
        }
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mood: i32, stress: i32, sleep: Option<f32>, activity: Option<i32>) -> MoodEntry {
        MoodEntry {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            mood_score: mood,
            energy_level: 5,
            stress_level: stress,
            sleep_hours: sleep,
            physical_activity: activity,
            social_activity: None,
            notes: String::new(),
            tags: Vec::new(),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn trend_signs() {
        assert_eq!(trend(&[1.0, 2.0, 3.0, 4.0]), Trend::Improving);
        assert_eq!(trend(&[8.0, 6.0, 4.0, 2.0]), Trend::Declining);
        assert_eq!(trend(&[5.0, 5.0, 5.0, 5.0]), Trend::Stable);
        assert_eq!(trend(&[5.0]), Trend::Stable);
    }

    #[test]
    fn correlation_of_linear_series_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((correlation(&x, &y) - 1.0).abs() < 1e-9);

        let inverse = [8.0, 6.0, 4.0, 2.0];
        assert!((correlation(&x, &inverse) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn correlation_degenerate_inputs_are_zero() {
        assert_eq!(correlation(&[1.0], &[2.0]), 0.0);
        assert_eq!(correlation(&[1.0, 2.0], &[3.0]), 0.0);
        assert_eq!(correlation(&[2.0, 2.0, 2.0], &[1.0, 5.0, 9.0]), 0.0);
    }

    #[test]
    fn series_stats_summarize_values() {
        let stats = SeriesStats::from_values(&[2.0, 4.0, 6.0]).unwrap();
        assert!((stats.average - 4.0).abs() < 1e-9);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 6.0);
        assert_eq!(stats.trend, Trend::Improving);
        assert!(SeriesStats::from_values(&[]).is_none());
    }

    #[test]
    fn insights_need_a_week_of_data() {
        let entries: Vec<MoodEntry> = (0..3).map(|_| entry(5, 5, None, None)).collect();
        assert_eq!(
            insights(&entries),
            vec!["Need more data to generate insights".to_string()]
        );
    }

    #[test]
    fn low_mood_and_sleep_correlation_show_up() {
        // Low mood tracking low sleep across two weeks.
        let entries: Vec<MoodEntry> = (0..14)
            .map(|i| entry(2 + (i % 3), 5, Some(4.0 + (i % 3) as f32), None))
            .collect();
        let found = insights(&entries);
        assert!(found.contains(&"Your mood has been consistently low recently".to_string()));
        assert!(found.contains(&"Better sleep appears to correlate with better mood".to_string()));
    }

    #[test]
    fn recommendations_follow_averages() {
        let entries: Vec<MoodEntry> = (0..10).map(|_| entry(3, 9, Some(5.0), None)).collect();
        let recs = recommendations(&entries);
        assert!(recs.contains(&"Consider talking to a mental health professional".to_string()));
        assert!(recs
            .contains(&"Practice stress management techniques like deep breathing".to_string()));
        assert!(recs.contains(&"Aim for 7-9 hours of sleep per night".to_string()));
    }
}
