//! services/api/src/web/chat.rs
//!
//! Contains the Axum handlers for the conversation endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;
use wellmind_core::domain::AssessmentKind;
use wellmind_core::ChatError;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        start_session_handler,
        send_message_handler,
        end_session_handler,
        get_history_handler,
        export_history_handler,
        get_context_handler,
        start_assessment_handler,
        submit_assessment_response_handler,
        complete_assessment_handler,
        crate::web::mood::create_mood_entry_handler,
        crate::web::mood::list_mood_entries_handler,
        crate::web::mood::get_mood_entry_handler,
        crate::web::mood::update_mood_entry_handler,
        crate::web::mood::delete_mood_entry_handler,
        crate::web::mood::mood_analytics_handler,
        crate::web::mood::export_mood_entries_handler,
    ),
    components(
        schemas(
            StartSessionRequest,
            StartSessionResponse,
            SendMessageRequest,
            StartAssessmentRequest,
            AssessmentQuestionDto,
            AssessmentResponseRequest,
            MessageDto,
            ErrorBody,
            crate::web::mood::NewMoodEntryBody,
            crate::web::mood::MoodEntryPatchBody,
        )
    ),
    tags(
        (name = "WellMind API", description = "API endpoints for the mental-health support chatbot.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct StartSessionRequest {
    /// When true, the session carries no user attribution.
    #[serde(default)]
    pub anonymous: bool,
}

#[derive(Serialize, ToSchema)]
pub struct StartSessionResponse {
    pub session_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct StartAssessmentRequest {
    /// `"PHQ-9"` or `"GAD-7"`.
    pub assessment_type: String,
}

#[derive(Serialize, ToSchema)]
pub struct AssessmentQuestionDto {
    pub id: String,
    pub text: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AssessmentResponseRequest {
    pub question_id: String,
    /// Response on the standard 0–3 scale.
    pub response: u8,
}

/// One durable message, as exposed over the API.
#[derive(Serialize, ToSchema)]
pub struct MessageDto {
    pub id: Uuid,
    pub sender: String,
    pub content: String,
    pub message_type: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a domain error to an HTTP response.
pub fn chat_error_response(err: ChatError) -> (StatusCode, Json<ErrorBody>) {
    let (status, error, message) = match &err {
        ChatError::EmptyMessage => (
            StatusCode::BAD_REQUEST,
            "empty_message",
            Some("Message cannot be empty".to_string()),
        ),
        ChatError::InvalidSender(s) => (
            StatusCode::BAD_REQUEST,
            "invalid_sender",
            Some(format!("Unknown sender: {s}")),
        ),
        ChatError::UnknownQuestionId(id) => (
            StatusCode::BAD_REQUEST,
            "unknown_question",
            Some(format!("Unknown question id: {id}")),
        ),
        ChatError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            "session_not_found",
            Some(format!("No active session with id {id}")),
        ),
        ChatError::SessionAlreadyActive(id) => (
            StatusCode::CONFLICT,
            "session_already_active",
            Some(format!("Session {id} is already active")),
        ),
        ChatError::AssessmentAlreadyInProgress => (
            StatusCode::CONFLICT,
            "assessment_in_progress",
            Some("An assessment is already in progress for this session".to_string()),
        ),
        ChatError::NoAssessmentInProgress => (
            StatusCode::BAD_REQUEST,
            "no_assessment_in_progress",
            Some("No assessment is in progress for this session".to_string()),
        ),
        ChatError::ProcessingFailed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "processing_failed",
            Some("I apologize, but I encountered an error. Please try again.".to_string()),
        ),
    };
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            message,
        }),
    )
}

/// Pulls an optional `x-user-id` header. A malformed value is a client error.
pub fn optional_user_id(headers: &HeaderMap) -> Result<Option<Uuid>, (StatusCode, Json<ErrorBody>)> {
    match headers.get("x-user-id") {
        None => Ok(None),
        Some(value) => {
            let raw = value.to_str().map_err(|_| bad_user_id())?;
            Uuid::parse_str(raw).map(Some).map_err(|_| bad_user_id())
        }
    }
}

fn bad_user_id() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: "invalid_user_id".to_string(),
            message: Some("x-user-id must be a UUID".to_string()),
        }),
    )
}

//=========================================================================================
// Session Handlers
//=========================================================================================

/// Start a new chat session.
///
/// Anonymous sessions carry no user attribution even when the header is set.
#[utoipa::path(
    post,
    path = "/api/session/start",
    request_body = StartSessionRequest,
    responses(
        (status = 201, description = "Session created", body = StartSessionResponse),
        (status = 400, description = "Malformed request", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    params(
        ("x-user-id" = Option<Uuid>, Header, description = "The user starting the session, if known.")
    )
)]
pub async fn start_session_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let user_id = optional_user_id(&headers)?;
    let session_id = app_state
        .orchestrator
        .start_session(user_id, payload.anonymous)
        .await
        .map_err(chat_error_response)?;
    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse { session_id }),
    ))
}

/// Send a message to a session and receive the generated reply.
#[utoipa::path(
    post,
    path = "/api/session/{session_id}/message",
    request_body = SendMessageRequest,
    responses(
        (status = 200, description = "Reply generated, both turns persisted"),
        (status = 400, description = "Empty message", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn send_message_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let reply = app_state
        .orchestrator
        .handle_message(&session_id, &payload.message)
        .await
        .map_err(chat_error_response)?;
    Ok(Json(reply))
}

/// End a session, marking it inactive and dropping its in-memory context.
#[utoipa::path(
    post,
    path = "/api/session/{session_id}/end",
    responses(
        (status = 204, description = "Session ended"),
        (status = 404, description = "Unknown session", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn end_session_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    app_state
        .orchestrator
        .end_session(&session_id)
        .await
        .map_err(chat_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Full durable message history of a session, in append order.
#[utoipa::path(
    get,
    path = "/api/session/{session_id}/history",
    responses(
        (status = 200, description = "Message history", body = [MessageDto]),
        (status = 404, description = "Unknown session", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn get_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let messages = app_state
        .orchestrator
        .session_history(&session_id)
        .await
        .map_err(chat_error_response)?;
    let body: Vec<MessageDto> = messages
        .into_iter()
        .map(|m| MessageDto {
            id: m.id,
            sender: m.sender.as_str().to_string(),
            content: m.content,
            message_type: m.message_type,
            created_at: m.created_at,
        })
        .collect();
    Ok(Json(body))
}

/// Download the session transcript as a CSV attachment.
#[utoipa::path(
    get,
    path = "/api/session/{session_id}/history/export",
    responses(
        (status = 200, description = "CSV transcript", content_type = "text/csv"),
        (status = 404, description = "Unknown session", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn export_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    let messages = app_state
        .orchestrator
        .session_history(&session_id)
        .await
        .map_err(chat_error_response)?;

    let mut csv = String::from("timestamp,sender,message_type,content\n");
    for m in &messages {
        csv.push_str(&format!(
            "{},{},{},{}\n",
            m.created_at.to_rfc3339(),
            m.sender.as_str(),
            csv_escape(&m.message_type),
            csv_escape(&m.content),
        ));
    }

    let filename = format!("session-{session_id}.csv");
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

/// Quotes a CSV field when it contains a delimiter, quote or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Compact view of the session's rolling context.
#[utoipa::path(
    get,
    path = "/api/session/{session_id}/context",
    responses(
        (status = 200, description = "Context summary"),
        (status = 404, description = "Unknown session", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn get_context_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let summary = app_state
        .orchestrator
        .get_context_summary(&session_id)
        .await
        .map_err(chat_error_response)?;
    Ok(Json(summary))
}

//=========================================================================================
// Assessment Handlers
//=========================================================================================

/// Begin a structured assessment within a session.
#[utoipa::path(
    post,
    path = "/api/session/{session_id}/assessment/start",
    request_body = StartAssessmentRequest,
    responses(
        (status = 200, description = "Assessment started", body = [AssessmentQuestionDto]),
        (status = 400, description = "Unknown assessment type", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody),
        (status = 409, description = "An assessment is already in progress", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn start_assessment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<StartAssessmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let kind: AssessmentKind = payload.assessment_type.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "unknown_assessment_type".to_string(),
                message: Some(format!(
                    "Unknown assessment type: {}",
                    payload.assessment_type
                )),
            }),
        )
    })?;
    let questions = app_state
        .orchestrator
        .start_assessment(&session_id, kind)
        .await
        .map_err(chat_error_response)?;
    let body: Vec<AssessmentQuestionDto> = questions
        .into_iter()
        .map(|q| AssessmentQuestionDto {
            id: q.id,
            text: q.text,
        })
        .collect();
    Ok(Json(body))
}

/// Record a response to one assessment question.
#[utoipa::path(
    post,
    path = "/api/session/{session_id}/assessment/response",
    request_body = AssessmentResponseRequest,
    responses(
        (status = 204, description = "Response recorded"),
        (status = 400, description = "Unknown question id or no assessment in progress", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn submit_assessment_response_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(payload): Json<AssessmentResponseRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    app_state
        .orchestrator
        .submit_assessment_response(&session_id, &payload.question_id, payload.response)
        .await
        .map_err(chat_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Score the in-progress assessment and return the result.
#[utoipa::path(
    post,
    path = "/api/session/{session_id}/assessment/complete",
    responses(
        (status = 200, description = "Assessment scored"),
        (status = 400, description = "No assessment in progress", body = ErrorBody),
        (status = 404, description = "Unknown session", body = ErrorBody)
    ),
    params(
        ("session_id" = String, Path, description = "The session identifier.")
    )
)]
pub async fn complete_assessment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorBody>)> {
    let completed = app_state
        .orchestrator
        .complete_assessment(&session_id)
        .await
        .map_err(chat_error_response)?;
    Ok(Json(completed))
}
