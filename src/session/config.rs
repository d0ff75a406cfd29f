use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing rules for an interview session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seconds the candidate has to start recording once the question was read
    /// Default: 30
    pub start_timeout_secs: u64,

    /// Seconds the candidate has to finish answering once recording started
    /// Default: 120
    pub answer_timeout_secs: u64,

    /// Delay standing in for speech playback when speech output is unsupported
    pub speech_grace_ms: u64,

    /// Delay between a speech completion signal and the transition it triggers
    pub speech_settle_ms: u64,

    /// How long an abandoned transcription may take to honour its stop signal
    /// before it is aborted
    pub transcriber_stop_grace_ms: u64,
}

impl SessionConfig {
    pub fn speech_grace(&self) -> Duration {
        Duration::from_millis(self.speech_grace_ms)
    }

    pub fn speech_settle(&self) -> Duration {
        Duration::from_millis(self.speech_settle_ms)
    }

    pub fn transcriber_stop_grace(&self) -> Duration {
        Duration::from_millis(self.transcriber_stop_grace_ms)
    }

    pub fn answer_window(&self) -> Duration {
        Duration::from_secs(self.answer_timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            start_timeout_secs: 30,
            answer_timeout_secs: 120,
            speech_grace_ms: 2000,
            speech_settle_ms: 100,
            transcriber_stop_grace_ms: 2000,
        }
    }
}
