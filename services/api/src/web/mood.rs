//! services/api/src/web/mood.rs
//!
//! Axum handlers for the mood-tracking endpoints. Every endpoint requires an
//! `x-user-id` header; mood entries are always attributed.

use crate::mood::{self, MoodEntryPatch, NewMoodEntry, SeriesStats};
use crate::web::chat::ErrorBody;
use crate::web::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;
use wellmind_core::ports::PortError;

const ANALYTICS_WINDOW_DAYS: i64 = 30;
const DEFAULT_LIST_LIMIT: i64 = 100;

//=========================================================================================
// Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct NewMoodEntryBody {
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

impl From<NewMoodEntryBody> for NewMoodEntry {
    fn from(body: NewMoodEntryBody) -> Self {
        NewMoodEntry {
            mood_score: body.mood_score,
            energy_level: body.energy_level,
            stress_level: body.stress_level,
            sleep_hours: body.sleep_hours,
            physical_activity: body.physical_activity,
            social_activity: body.social_activity,
            notes: body.notes,
            tags: body.tags,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct MoodEntryPatchBody {
    pub mood_score: Option<i32>,
    pub energy_level: Option<i32>,
    pub stress_level: Option<i32>,
    pub sleep_hours: Option<f32>,
    pub physical_activity: Option<i32>,
    pub social_activity: Option<i32>,
    pub notes: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl From<MoodEntryPatchBody> for MoodEntryPatch {
    fn from(body: MoodEntryPatchBody) -> Self {
        MoodEntryPatch {
            mood_score: body.mood_score,
            energy_level: body.energy_level,
            stress_level: body.stress_level,
            sleep_hours: body.sleep_hours,
            physical_activity: body.physical_activity,
            social_activity: body.social_activity,
            notes: body.notes,
            tags: body.tags,
        }
    }
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Pulls the mandatory `x-user-id` header.
fn required_user_id(headers: &HeaderMap) -> Result<Uuid, (StatusCode, Json<ErrorBody>)> {
    crate::web::chat::optional_user_id(headers)?.ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "missing_user_id".to_string(),
                message: Some("x-user-id header is required".to_string()),
            }),
        )
    })
}

fn port_error_response(err: PortError) -> (StatusCode, Json<ErrorBody>) {
    match err {
        PortError::NotFound(what) => (
            StatusCode::NOT_FOUND,
            Json(ErrorBody {
                error: "not_found".to_string(),
                message: Some(what),
            }),
        ),
        other => {
            error!("mood endpoint failed: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorBody {
                    error: "internal_error".to_string(),
                    message: None,
                }),
            )
        }
    }
}

//=========================================================================================
// CRUD Handlers
//=========================================================================================

/// Record a new mood entry.
#[utoipa::path(
    post,
    path = "/api/mood/entries",
    request_body = NewMoodEntryBody,
    responses(
        (status = 201, description = "Entry created"),
        (status = 400, description = "Missing or malformed x-user-id", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The user recording the entry.")
    )
)]
pub async fn create_mood_entry_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewMoodEntryBody>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    let entry = app_state
        .db
        .create_mood_entry(user_id, payload.into())
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// List mood entries, newest first, optionally bounded by a date range.
#[utoipa::path(
    get,
    path = "/api/mood/entries",
    responses(
        (status = 200, description = "Mood entries, newest first"),
        (status = 400, description = "Missing or malformed x-user-id", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The user whose entries to list."),
        ("start_date" = Option<String>, Query, description = "Inclusive RFC 3339 lower bound."),
        ("end_date" = Option<String>, Query, description = "Inclusive RFC 3339 upper bound."),
        ("limit" = Option<i64>, Query, description = "Maximum number of entries (default 100).")
    )
)]
pub async fn list_mood_entries_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 1000);
    let entries = app_state
        .db
        .list_mood_entries(user_id, query.start_date, query.end_date, limit)
        .await
        .map_err(port_error_response)?;
    Ok(Json(entries))
}

/// Fetch a single mood entry.
#[utoipa::path(
    get,
    path = "/api/mood/entries/{entry_id}",
    responses(
        (status = 200, description = "The mood entry"),
        (status = 404, description = "No such entry for this user", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The owning user."),
        ("entry_id" = Uuid, Path, description = "The entry identifier.")
    )
)]
pub async fn get_mood_entry_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    let entry = app_state
        .db
        .find_mood_entry(user_id, entry_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(entry))
}

/// Partially update a mood entry.
#[utoipa::path(
    put,
    path = "/api/mood/entries/{entry_id}",
    request_body = MoodEntryPatchBody,
    responses(
        (status = 200, description = "The updated entry"),
        (status = 404, description = "No such entry for this user", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The owning user."),
        ("entry_id" = Uuid, Path, description = "The entry identifier.")
    )
)]
pub async fn update_mood_entry_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entry_id): Path<Uuid>,
    Json(payload): Json<MoodEntryPatchBody>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    let entry = app_state
        .db
        .update_mood_entry(user_id, entry_id, payload.into())
        .await
        .map_err(port_error_response)?;
    Ok(Json(entry))
}

/// Delete a mood entry.
#[utoipa::path(
    delete,
    path = "/api/mood/entries/{entry_id}",
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 404, description = "No such entry for this user", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The owning user."),
        ("entry_id" = Uuid, Path, description = "The entry identifier.")
    )
)]
pub async fn delete_mood_entry_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(entry_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    app_state
        .db
        .delete_mood_entry(user_id, entry_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Analytics and Export
//=========================================================================================

/// Thirty-day statistics, trends, insights and guidance.
#[utoipa::path(
    get,
    path = "/api/mood/analytics",
    responses(
        (status = 200, description = "Analytics over the last 30 days"),
        (status = 400, description = "Missing or malformed x-user-id", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The user to analyze.")
    )
)]
pub async fn mood_analytics_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    let end = Utc::now();
    let start = end - Duration::days(ANALYTICS_WINDOW_DAYS);
    let entries = app_state
        .db
        .mood_entries_since(user_id, start)
        .await
        .map_err(port_error_response)?;

    let mood: Vec<f64> = entries.iter().map(|e| f64::from(e.mood_score)).collect();
    let energy: Vec<f64> = entries.iter().map(|e| f64::from(e.energy_level)).collect();
    let stress: Vec<f64> = entries.iter().map(|e| f64::from(e.stress_level)).collect();

    let body = json!({
        "period": {
            "start_date": start,
            "end_date": end,
            "entry_count": entries.len(),
        },
        "mood": SeriesStats::from_values(&mood),
        "energy": SeriesStats::from_values(&energy),
        "stress": SeriesStats::from_values(&stress),
        "insights": mood::insights(&entries),
        "recommendations": mood::recommendations(&entries),
    });
    Ok(Json(body))
}

/// Download all mood entries in a date range as a CSV attachment.
#[utoipa::path(
    get,
    path = "/api/mood/export",
    responses(
        (status = 200, description = "CSV export", content_type = "text/csv"),
        (status = 400, description = "Missing or malformed x-user-id", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The user to export."),
        ("start_date" = Option<String>, Query, description = "Inclusive RFC 3339 lower bound."),
        ("end_date" = Option<String>, Query, description = "Inclusive RFC 3339 upper bound.")
    )
)]
pub async fn export_mood_entries_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let user_id = required_user_id(&headers)?;
    let entries = app_state
        .db
        .list_mood_entries(user_id, query.start_date, query.end_date, i64::MAX)
        .await
        .map_err(port_error_response)?;

    let mut csv = String::from(
        "created_at,mood_score,energy_level,stress_level,sleep_hours,physical_activity,social_activity,notes,tags\n",
    );
    for e in &entries {
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{}\n",
            e.created_at.to_rfc3339(),
            e.mood_score,
            e.energy_level,
            e.stress_level,
            e.sleep_hours.map(|v| v.to_string()).unwrap_or_default(),
            e.physical_activity.map(|v| v.to_string()).unwrap_or_default(),
            e.social_activity.map(|v| v.to_string()).unwrap_or_default(),
            csv_field(&e.notes),
            csv_field(&e.tags.join(";")),
        ));
    }

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"mood-entries.csv\"".to_string(),
            ),
        ],
        csv,
    )
        .into_response())
}

fn csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
