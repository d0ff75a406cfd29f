use tokio::sync::oneshot;

use super::error::SessionError;
use crate::api::{ParsedResume, ProfileUpdate};

/// Everything the controller reacts to, delivered one at a time through its queue
#[derive(Debug)]
pub(crate) enum SessionEvent {
    /// A driver action, answered through `reply`
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },

    /// One second elapsed on countdown `countdown`
    Tick { countdown: u64 },

    /// Speech output for prompt `ticket` finished, failed, or was skipped as unsupported
    SpeechDone { ticket: u64, outcome: SpeechOutcome },

    /// Transcription for recording `ticket` ended
    TranscriptReady {
        ticket: u64,
        result: Result<String, String>,
    },
}

#[derive(Debug)]
pub(crate) enum Command {
    SetProfile(Box<ParsedResume>),
    UpdateProfile(ProfileUpdate),
    ClearProfile,
    Start,
    StartRecording,
    StopRecording,
    Skip,
    Shutdown,
}

#[derive(Debug)]
pub(crate) enum SpeechOutcome {
    Finished,
    Failed(String),
    Unsupported,
}
