use super::handlers;
use super::state::AppState;
use crate::api::MAX_RESUME_BYTES;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Candidate profile
        .route(
            "/profile",
            put(handlers::set_profile)
                .get(handlers::get_profile)
                .patch(handlers::update_profile)
                .delete(handlers::clear_profile),
        )
        .route(
            "/profile/resume",
            post(handlers::upload_resume)
                // Room for the multipart framing around the largest accepted file
                .layer(DefaultBodyLimit::max(MAX_RESUME_BYTES + 1024 * 1024)),
        )
        // Interview control
        .route("/interview/start", post(handlers::start_interview))
        .route("/interview/record/start", post(handlers::start_recording))
        .route("/interview/record/stop", post(handlers::stop_recording))
        .route("/interview/skip", post(handlers::skip_question))
        .route("/interview/status", get(handlers::get_status))
        // Speech channels played by the client
        .route("/interview/prompt", get(handlers::get_prompt))
        .route("/interview/speech/finished", post(handlers::speech_finished))
        .route("/interview/speech/failed", post(handlers::speech_failed))
        .route("/interview/transcript/interim", post(handlers::transcript_interim))
        .route("/interview/transcript/final", post(handlers::transcript_final))
        // Saved interviews
        .route("/interviews", get(handlers::list_interviews))
        .route("/interviews/:session_id", get(handlers::get_interview))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
