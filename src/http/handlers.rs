use super::state::AppState;
use crate::api::{CandidateProfile, ParsedResume, ProfileUpdate, ResumeUpload, UploadError};
use crate::session::{SessionError, SessionSnapshot};
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TranscriptRequest {
    pub text: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpeechFailedRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub prompt: Option<String>,
    pub listening: bool,
}

#[derive(Debug, Serialize)]
pub struct RelayResponse {
    pub accepted: bool,
}

/// Candidate profile along with the mandatory fields still to fill in
#[derive(Debug, Serialize)]
pub struct ProfileView {
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub missing_fields: Vec<&'static str>,
}

impl From<CandidateProfile> for ProfileView {
    fn from(profile: CandidateProfile) -> Self {
        let missing_fields = profile.missing_fields();
        Self {
            profile,
            missing_fields,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

fn session_error(e: SessionError) -> Response {
    let status = match &e {
        SessionError::MissingProfile => StatusCode::PRECONDITION_FAILED,
        SessionError::IncompleteProfile(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::InterviewInProgress(_) | SessionError::InvalidAction { .. } => {
            StatusCode::CONFLICT
        }
        SessionError::ServiceUnavailable(_) | SessionError::NoQuestions => StatusCode::BAD_GATEWAY,
        SessionError::ControllerClosed => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e.to_string())
}

/// Reply to a session command with the resulting snapshot
fn command_response(state: &AppState, result: Result<(), SessionError>) -> Response {
    match result {
        Ok(()) => (StatusCode::OK, Json::<SessionSnapshot>(state.session.snapshot())).into_response(),
        Err(e) => session_error(e),
    }
}

// ============================================================================
// Profile
// ============================================================================

/// PUT /profile
pub async fn set_profile(
    State(state): State<AppState>,
    Json(resume): Json<ParsedResume>,
) -> impl IntoResponse {
    let result = state.session.set_profile(resume).await;
    command_response(&state, result)
}

/// Reply with the current profile, or 404 when there is none
fn profile_response(state: &AppState) -> Response {
    match state.session.snapshot().profile {
        Some(profile) => (StatusCode::OK, Json(ProfileView::from(profile))).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "No profile uploaded"),
    }
}

/// GET /profile
pub async fn get_profile(State(state): State<AppState>) -> impl IntoResponse {
    profile_response(&state)
}

/// PATCH /profile
pub async fn update_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> impl IntoResponse {
    match state.session.update_profile(update).await {
        Ok(()) => profile_response(&state),
        Err(e) => session_error(e),
    }
}

/// POST /profile/resume
///
/// Multipart upload with the resume in a `file` field.
pub async fn upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> impl IntoResponse {
    let phase = state.session.snapshot().phase;
    if !phase.can_start() {
        return session_error(SessionError::InterviewInProgress(phase));
    }

    let upload = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => {
                return error_response(StatusCode::BAD_REQUEST, "Missing `file` field");
            }
            Err(e) => return error_response(e.status(), e.body_text()),
        };
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("resume").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return error_response(e.status(), e.body_text()),
        };

        match ResumeUpload::new(file_name, content_type.as_deref(), bytes.to_vec()) {
            Ok(upload) => break upload,
            Err(e) => return upload_error(e),
        }
    };

    info!(
        "Parsing uploaded resume {} ({} bytes)",
        upload.file_name,
        upload.bytes.len()
    );
    let resume = match state.parser.parse_resume(upload).await {
        Ok(resume) => resume,
        Err(e) => {
            error!("Resume parsing failed: {}", e);
            return error_response(
                StatusCode::BAD_GATEWAY,
                format!("Failed to parse resume: {}", e),
            );
        }
    };

    match state.session.set_profile(resume).await {
        Ok(()) => profile_response(&state),
        Err(e) => session_error(e),
    }
}

fn upload_error(e: UploadError) -> Response {
    let status = match &e {
        UploadError::UnsupportedType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        UploadError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Empty => StatusCode::BAD_REQUEST,
    };
    warn!("Rejected resume upload: {}", e);
    error_response(status, e.to_string())
}

/// DELETE /profile
pub async fn clear_profile(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.session.clear_profile().await;
    command_response(&state, result)
}

// ============================================================================
// Interview control
// ============================================================================

/// POST /interview/start
pub async fn start_interview(State(state): State<AppState>) -> impl IntoResponse {
    info!("Start interview requested");
    let result = state.session.start().await;
    if let Err(e) = &result {
        warn!("Interview did not start: {}", e);
    }
    command_response(&state, result)
}

/// POST /interview/record/start
pub async fn start_recording(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.session.start_recording().await;
    command_response(&state, result)
}

/// POST /interview/record/stop
pub async fn stop_recording(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.session.stop_recording().await;
    command_response(&state, result)
}

/// POST /interview/skip
pub async fn skip_question(State(state): State<AppState>) -> impl IntoResponse {
    let result = state.session.skip().await;
    command_response(&state, result)
}

/// GET /interview/status
pub async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    (StatusCode::OK, Json(state.session.snapshot()))
}

// ============================================================================
// Speech relay
// ============================================================================

/// GET /interview/prompt
pub async fn get_prompt(State(state): State<AppState>) -> impl IntoResponse {
    Json(PromptResponse {
        prompt: state.relay.pending_prompt().await,
        listening: state.relay.is_listening().await,
    })
}

/// POST /interview/speech/finished
pub async fn speech_finished(State(state): State<AppState>) -> impl IntoResponse {
    let accepted = state.relay.finish_speech().await;
    Json(RelayResponse { accepted })
}

/// POST /interview/speech/failed
pub async fn speech_failed(
    State(state): State<AppState>,
    body: Option<Json<SpeechFailedRequest>>,
) -> impl IntoResponse {
    let reason = body
        .and_then(|Json(b)| b.reason)
        .unwrap_or_else(|| "client reported speech error".to_string());
    warn!("Client speech playback failed: {}", reason);
    let accepted = state.relay.fail_speech(reason).await;
    Json(RelayResponse { accepted })
}

/// POST /interview/transcript/interim
pub async fn transcript_interim(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> impl IntoResponse {
    let accepted = state.relay.push_interim(req.text).await;
    Json(RelayResponse { accepted })
}

/// POST /interview/transcript/final
pub async fn transcript_final(
    State(state): State<AppState>,
    Json(req): Json<TranscriptRequest>,
) -> impl IntoResponse {
    let accepted = state.relay.finish_transcript(req.text).await;
    Json(RelayResponse { accepted })
}

// ============================================================================
// Saved interviews
// ============================================================================

/// GET /interviews
pub async fn list_interviews(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list().await {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(e) => {
            error!("Failed to list interviews: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to list interviews: {}", e),
            )
        }
    }
}

/// GET /interviews/:session_id
pub async fn get_interview(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> impl IntoResponse {
    match state.store.load(session_id).await {
        Ok(Some(record)) => (StatusCode::OK, Json(record)).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Interview {} not found", session_id),
        ),
        Err(e) => {
            error!("Failed to load interview {}: {:#}", session_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load interview: {}", e),
            )
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
