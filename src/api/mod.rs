//! Client for the remote ML service
//!
//! - POST /parse-resume - structured resume from an uploaded file
//! - POST /generate-questions - interview questions for a parsed resume
//! - POST /score-answers - per-question and overall scores
//! - GET /health - liveness

pub mod client;
pub mod messages;
pub mod resume;
pub mod upload;

pub use client::{ApiClient, ApiError, InterviewService, ResumeParser};
pub use messages::{
    CandidateInfo, GenerateQuestionsResponse, InterviewItem, ParsedResume, QuestionScore,
    ScoringPayload, ScoringResponse,
};
pub use resume::{CandidateProfile, ProfileUpdate};
pub use upload::{ResumeFormat, ResumeUpload, UploadError, MAX_RESUME_BYTES};
