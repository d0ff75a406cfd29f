use thiserror::Error;

use super::model::Phase;

/// Errors surfaced to whoever drives the interview session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error("Please upload a resume before starting the interview")]
    MissingProfile,

    #[error("Please fill in the missing mandatory fields: {}", .0.join(", "))]
    IncompleteProfile(Vec<String>),

    #[error("An interview is already in progress (phase: {0})")]
    InterviewInProgress(Phase),

    #[error("Cannot {action} while the interview is {phase}")]
    InvalidAction { action: &'static str, phase: Phase },

    #[error("Failed to start interview, please try again: {0}")]
    ServiceUnavailable(String),

    #[error("The question service returned no questions")]
    NoQuestions,

    #[error("Interview controller is not running")]
    ControllerClosed,
}
