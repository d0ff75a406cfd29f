//! HTTP API for a browser front-end driving the interview
//!
//! - PUT/GET/PATCH/DELETE /profile - Parsed resume of the candidate
//! - POST /profile/resume - Upload a PDF/DOCX resume for parsing
//! - POST /interview/start - Generate questions and start
//! - POST /interview/record/start|stop, /interview/skip - Candidate actions
//! - GET /interview/status - Session snapshot
//! - GET /interview/prompt, POST /interview/speech/*, /interview/transcript/* - Speech relay
//! - GET /interviews, /interviews/:id - Saved interviews
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
