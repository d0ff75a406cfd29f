use crate::api::ResumeParser;
use crate::session::SessionHandle;
use crate::speech::SpeechRelay;
use crate::storage::InterviewStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The single live interview session
    pub session: SessionHandle,

    /// Speech channels driven by the HTTP client
    pub relay: SpeechRelay,

    /// Saved interviews
    pub store: Arc<dyn InterviewStore>,

    /// Turns uploaded resume files into structured profiles
    pub parser: Arc<dyn ResumeParser>,
}

impl AppState {
    pub fn new(
        session: SessionHandle,
        relay: SpeechRelay,
        store: Arc<dyn InterviewStore>,
        parser: Arc<dyn ResumeParser>,
    ) -> Self {
        Self {
            session,
            relay,
            store,
            parser,
        }
    }
}
