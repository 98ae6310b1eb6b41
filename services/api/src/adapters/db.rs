//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `SessionStore` port from the `core` crate, plus the
//! mood-tracking queries used by the mood endpoints. It handles all
//! interactions with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::mood::{MoodEntry, MoodEntryPatch, NewMoodEntry};
use wellmind_core::domain::{ChatSession, NewAssessment, NewMessage, SessionUpdate, StoredMessage};
use wellmind_core::ports::{PortError, PortResult, SessionStore};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `SessionStore` port.
#[derive(Clone)]
pub struct SqlxStore {
    pool: PgPool,
}

impl SqlxStore {
    /// Creates a new `SqlxStore`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    session_id: String,
    user_id: Option<Uuid>,
    is_anonymous: bool,
    is_active: bool,
    mood_detected: Option<String>,
    sentiment_score: Option<f32>,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    fn to_domain(self) -> ChatSession {
        ChatSession {
            id: self.id,
            session_id: self.session_id,
            user_id: self.user_id,
            is_anonymous: self.is_anonymous,
            is_active: self.is_active,
            mood_detected: self.mood_detected,
            sentiment_score: self.sentiment_score,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: Uuid,
    session_ref: Uuid,
    sender: String,
    content: String,
    message_type: String,
    metadata: Option<String>,
    created_at: DateTime<Utc>,
}

impl MessageRecord {
    fn to_domain(self) -> PortResult<StoredMessage> {
        let sender = self
            .sender
            .parse()
            .map_err(|e| PortError::Unexpected(format!("corrupt sender column: {e}")))?;
        Ok(StoredMessage {
            id: self.id,
            session_ref: self.session_ref,
            sender,
            content: self.content,
            message_type: self.message_type,
            metadata: self.metadata,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct MoodEntryRecord {
    id: Uuid,
    user_id: Uuid,
    mood_score: i32,
    energy_level: i32,
    stress_level: i32,
    sleep_hours: Option<f32>,
    physical_activity: Option<i32>,
    social_activity: Option<i32>,
    notes: String,
    tags: String,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
}

impl MoodEntryRecord {
    fn to_domain(self) -> MoodEntry {
        MoodEntry {
            id: self.id,
            user_id: self.user_id,
            mood_score: self.mood_score,
            energy_level: self.energy_level,
            stress_level: self.stress_level,
            sleep_hours: self.sleep_hours,
            physical_activity: self.physical_activity,
            social_activity: self.social_activity,
            notes: self.notes,
            tags: serde_json::from_str(&self.tags).unwrap_or_default(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

const SESSION_COLUMNS: &str =
    "id, session_id, user_id, is_anonymous, is_active, mood_detected, sentiment_score, created_at";
const MESSAGE_COLUMNS: &str =
    "id, session_ref, sender, content, message_type, metadata, created_at";
const MOOD_COLUMNS: &str = "id, user_id, mood_score, energy_level, stress_level, sleep_hours, \
    physical_activity, social_activity, notes, tags, created_at, updated_at";

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for SqlxStore {
    async fn create_session(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        is_anonymous: bool,
    ) -> PortResult<ChatSession> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "INSERT INTO chat_sessions (id, session_id, user_id, is_anonymous) \
             VALUES ($1, $2, $3, $4) RETURNING {SESSION_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(user_id)
        .bind(is_anonymous)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn find_session(&self, session_id: &str) -> PortResult<ChatSession> {
        let record = sqlx::query_as::<_, SessionRecord>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE session_id = $1"
        ))
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Session {} not found", session_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn append_message(
        &self,
        session_ref: Uuid,
        message: NewMessage,
    ) -> PortResult<StoredMessage> {
        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages (id, session_ref, sender, content, message_type, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(session_ref)
        .bind(message.sender.as_str())
        .bind(message.content)
        .bind(message.message_type)
        .bind(message.metadata)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        record.to_domain()
    }

    async fn record_bot_turn(
        &self,
        session_ref: Uuid,
        message: NewMessage,
        update: SessionUpdate,
    ) -> PortResult<StoredMessage> {
        // The bot message and the mirrored session fields commit together or
        // not at all; an error drops the transaction and rolls it back.
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let record = sqlx::query_as::<_, MessageRecord>(&format!(
            "INSERT INTO messages (id, session_ref, sender, content, message_type, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(session_ref)
        .bind(message.sender.as_str())
        .bind(message.content)
        .bind(message.message_type)
        .bind(message.metadata)
        .fetch_one(&mut *tx)
        .await
        .map_err(unexpected)?;

        sqlx::query(
            "UPDATE chat_sessions \
             SET mood_detected = $1, sentiment_score = $2, context_data = $3 WHERE id = $4",
        )
        .bind(update.mood_detected)
        .bind(update.sentiment_score)
        .bind(update.context_data)
        .bind(session_ref)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        record.to_domain()
    }

    async fn messages_for_session(&self, session_ref: Uuid) -> PortResult<Vec<StoredMessage>> {
        let records = sqlx::query_as::<_, MessageRecord>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages WHERE session_ref = $1 ORDER BY created_at ASC"
        ))
        .bind(session_ref)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        records.into_iter().map(|r| r.to_domain()).collect()
    }

    async fn end_session(&self, session_id: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE chat_sessions SET is_active = FALSE WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn save_assessment(&self, assessment: NewAssessment) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO assessments (id, user_id, assessment_type, responses, total_score, severity_level) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::new_v4())
        .bind(assessment.user_id)
        .bind(assessment.kind.as_str())
        .bind(assessment.responses)
        .bind(assessment.total_score as i32)
        .bind(assessment.severity_level)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// Mood-Tracking Queries
//=========================================================================================

impl SqlxStore {
    pub async fn create_mood_entry(
        &self,
        user_id: Uuid,
        entry: NewMoodEntry,
    ) -> PortResult<MoodEntry> {
        let tags = serde_json::to_string(&entry.tags).unwrap_or_else(|_| "[]".to_string());
        let record = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "INSERT INTO mood_entries \
             (id, user_id, mood_score, energy_level, stress_level, sleep_hours, \
              physical_activity, social_activity, notes, tags) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {MOOD_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(entry.mood_score)
        .bind(entry.energy_level)
        .bind(entry.stress_level)
        .bind(entry.sleep_hours)
        .bind(entry.physical_activity)
        .bind(entry.social_activity)
        .bind(entry.notes)
        .bind(tags)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    /// Applies a partial update. Reads the row first so unset fields keep
    /// their stored values.
    pub async fn update_mood_entry(
        &self,
        user_id: Uuid,
        entry_id: Uuid,
        patch: MoodEntryPatch,
    ) -> PortResult<MoodEntry> {
        let existing = self.find_mood_entry(user_id, entry_id).await?;
        let merged = patch.apply_to(existing);
        let tags = serde_json::to_string(&merged.tags).unwrap_or_else(|_| "[]".to_string());

        let record = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "UPDATE mood_entries SET mood_score = $1, energy_level = $2, stress_level = $3, \
             sleep_hours = $4, physical_activity = $5, social_activity = $6, notes = $7, \
             tags = $8, updated_at = NOW() \
             WHERE id = $9 AND user_id = $10 RETURNING {MOOD_COLUMNS}"
        ))
        .bind(merged.mood_score)
        .bind(merged.energy_level)
        .bind(merged.stress_level)
        .bind(merged.sleep_hours)
        .bind(merged.physical_activity)
        .bind(merged.social_activity)
        .bind(merged.notes)
        .bind(tags)
        .bind(entry_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    pub async fn delete_mood_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM mood_entries WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Mood entry {} not found",
                entry_id
            )));
        }
        Ok(())
    }

    pub async fn find_mood_entry(&self, user_id: Uuid, entry_id: Uuid) -> PortResult<MoodEntry> {
        let record = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "SELECT {MOOD_COLUMNS} FROM mood_entries WHERE id = $1 AND user_id = $2"
        ))
        .bind(entry_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Mood entry {} not found", entry_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    /// Most recent entries first, optionally bounded by a date range.
    pub async fn list_mood_entries(
        &self,
        user_id: Uuid,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        limit: i64,
    ) -> PortResult<Vec<MoodEntry>> {
        let records = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "SELECT {MOOD_COLUMNS} FROM mood_entries \
             WHERE user_id = $1 \
               AND ($2::timestamptz IS NULL OR created_at >= $2) \
               AND ($3::timestamptz IS NULL OR created_at <= $3) \
             ORDER BY created_at DESC LIMIT $4"
        ))
        .bind(user_id)
        .bind(start)
        .bind(end)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    /// All entries since `start`, oldest first, for analytics and export.
    pub async fn mood_entries_since(
        &self,
        user_id: Uuid,
        start: DateTime<Utc>,
    ) -> PortResult<Vec<MoodEntry>> {
        let records = sqlx::query_as::<_, MoodEntryRecord>(&format!(
            "SELECT {MOOD_COLUMNS} FROM mood_entries \
             WHERE user_id = $1 AND created_at >= $2 ORDER BY created_at ASC"
        ))
        .bind(user_id)
        .bind(start)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
