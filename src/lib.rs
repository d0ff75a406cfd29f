pub mod api;
pub mod config;
pub mod http;
pub mod session;
pub mod speech;
pub mod storage;

pub use api::{ApiClient, ApiError, CandidateProfile, InterviewService, ParsedResume};
pub use config::Config;
pub use http::{create_router, AppState};
pub use session::{
    Answer, AnswerOutcome, InterviewController, Phase, Question, SessionConfig, SessionError,
    SessionHandle, SessionSnapshot,
};
pub use speech::{ConsoleSpeech, NoSpeech, SpeechOutput, SpeechRelay, Transcriber};
pub use storage::{InterviewRecord, InterviewStore, JsonFileStore, MemoryStore};
