//! Interview session management
//!
//! This module provides the `InterviewController` state machine that manages:
//! - Question generation and playback
//! - The 30s start window and 120s answer window countdowns
//! - Transcription of spoken answers and sentinel answers on skip/timeout
//! - Scoring, fallback scoring and auto-save of the finished interview

mod config;
mod controller;
mod countdown;
mod error;
mod events;
mod handle;
mod model;
pub mod scoring;
mod state;

pub use config::SessionConfig;
pub use controller::InterviewController;
pub use countdown::CountdownKind;
pub use error::SessionError;
pub use handle::SessionHandle;
pub use model::{
    Answer, AnswerOutcome, Difficulty, Phase, Question, SKIPPED_SUFFIX, SKIPPED_TEXT,
    TIME_EXPIRED_TEXT,
};
pub use state::{
    Notice, NoticeLevel, ScoreSource, ScoringResult, SessionSnapshot, SessionState,
};
