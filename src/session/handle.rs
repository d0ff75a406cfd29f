use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::error::SessionError;
use super::events::{Command, SessionEvent};
use super::state::{Notice, SessionSnapshot};
use crate::api::{ParsedResume, ProfileUpdate};

/// Cloneable remote control for a running `InterviewController`
#[derive(Clone)]
pub struct SessionHandle {
    events: mpsc::Sender<SessionEvent>,
    snapshot: watch::Receiver<SessionSnapshot>,
    notices: broadcast::Sender<Notice>,
}

impl SessionHandle {
    pub(crate) fn new(
        events: mpsc::Sender<SessionEvent>,
        snapshot: watch::Receiver<SessionSnapshot>,
        notices: broadcast::Sender<Notice>,
    ) -> Self {
        Self {
            events,
            snapshot,
            notices,
        }
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.events
            .send(SessionEvent::Command { command, reply })
            .await
            .map_err(|_| SessionError::ControllerClosed)?;
        rx.await.map_err(|_| SessionError::ControllerClosed)?
    }

    /// Provide the parsed resume. Resets a finished session.
    pub async fn set_profile(&self, resume: ParsedResume) -> Result<(), SessionError> {
        self.send(Command::SetProfile(Box::new(resume))).await
    }

    /// Correct the candidate's contact details.
    ///
    /// Rejected if mandatory fields would still be blank afterwards.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), SessionError> {
        self.send(Command::UpdateProfile(update)).await
    }

    /// Forget the candidate and discard the current session
    pub async fn clear_profile(&self) -> Result<(), SessionError> {
        self.send(Command::ClearProfile).await
    }

    /// Generate questions and begin the interview.
    ///
    /// Resolves once the first question is being read, or with the error that
    /// sent the session back to idle.
    pub async fn start(&self) -> Result<(), SessionError> {
        self.send(Command::Start).await
    }

    pub async fn start_recording(&self) -> Result<(), SessionError> {
        self.send(Command::StartRecording).await
    }

    pub async fn stop_recording(&self) -> Result<(), SessionError> {
        self.send(Command::StopRecording).await
    }

    pub async fn skip(&self) -> Result<(), SessionError> {
        self.send(Command::Skip).await
    }

    /// Stop timers, silence speech and end the controller
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.send(Command::Shutdown).await
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Wait until a published snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SessionError::ControllerClosed)?
            .clone();
        Ok(snapshot)
    }

    /// Watch every snapshot as it is published
    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }
}
