use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::countdown::{Countdown, CountdownKind, TickOutcome};
use super::error::SessionError;
use super::events::{Command, SessionEvent, SpeechOutcome};
use super::handle::SessionHandle;
use super::model::{Answer, Phase};
use super::scoring;
use super::state::{Notice, ScoringResult, SessionSnapshot, SessionState};
use crate::api::{CandidateProfile, InterviewService, ParsedResume, ProfileUpdate};
use crate::speech::{InterimSink, SpeechOutput, Transcriber, TranscriptionRequest};
use crate::storage::{InterviewRecord, InterviewStore};

const EVENT_QUEUE: usize = 64;
const NOTICE_BUFFER: usize = 32;

/// Drives one interview session through its phases
///
/// All state lives here and is only touched from `run`, one event at a time.
/// Countdowns, speech playback and transcription run as tasks that post
/// events back into the queue, stamped with the id/ticket they were started
/// with so late events from cancelled work are dropped.
pub struct InterviewController {
    config: SessionConfig,
    service: Arc<dyn InterviewService>,
    speech: Arc<dyn SpeechOutput>,
    transcriber: Arc<dyn Transcriber>,
    store: Arc<dyn InterviewStore>,

    profile: Option<ParsedResume>,
    candidate: Option<CandidateProfile>,
    state: SessionState,

    countdown: Countdown,
    speech_ticket: u64,
    speech_task: Option<JoinHandle<()>>,
    recording_ticket: u64,
    recording: Option<Recording>,

    events_tx: mpsc::WeakSender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    notices_tx: broadcast::Sender<Notice>,
}

/// The open recording window of the current question
struct Recording {
    ticket: u64,
    started: Instant,
    stop_tx: Option<oneshot::Sender<()>>,
    interim: watch::Receiver<String>,
    task: JoinHandle<()>,
}

impl Recording {
    fn request_stop(&mut self) {
        if let Some(stop) = self.stop_tx.take() {
            let _ = stop.send(());
        }
    }

    fn partial_text(&self) -> String {
        self.interim.borrow().clone()
    }

    /// Stop the transcriber, aborting it if it ignores the stop for longer than `grace`
    fn release(mut self, grace: Duration) {
        self.request_stop();
        if self.task.is_finished() {
            return;
        }

        let ticket = self.ticket;
        let task = self.task;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if !task.is_finished() {
                warn!("Transcription {} ignored stop, aborting", ticket);
                task.abort();
            }
        });
    }
}

impl InterviewController {
    pub fn new(
        config: SessionConfig,
        service: Arc<dyn InterviewService>,
        speech: Arc<dyn SpeechOutput>,
        transcriber: Arc<dyn Transcriber>,
        store: Arc<dyn InterviewStore>,
    ) -> (Self, SessionHandle) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let state = SessionState::new();
        let (snapshot_tx, snapshot_rx) =
            watch::channel(SessionSnapshot::capture(&state, None, None));
        let (notices_tx, _) = broadcast::channel(NOTICE_BUFFER);

        let handle = SessionHandle::new(events_tx.clone(), snapshot_rx, notices_tx.clone());

        let controller = Self {
            config,
            service,
            speech,
            transcriber,
            store,
            profile: None,
            candidate: None,
            state,
            countdown: Countdown::new(),
            speech_ticket: 0,
            speech_task: None,
            recording_ticket: 0,
            recording: None,
            events_tx: events_tx.downgrade(),
            events_rx,
            snapshot_tx,
            notices_tx,
        };

        (controller, handle)
    }

    /// Process events until shutdown or until every handle is gone
    pub async fn run(mut self) {
        info!(
            "Interview controller started (speech: {}, transcription: {})",
            self.speech.name(),
            self.transcriber.name()
        );

        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event).await {
                break;
            }
        }

        self.teardown().await;
        info!("Interview controller stopped");
    }

    async fn handle_event(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::Command { command, reply } => {
                if matches!(command, Command::Shutdown) {
                    let _ = reply.send(Ok(()));
                    return false;
                }
                let result = self.apply(command).await;
                if let Err(e) = &result {
                    debug!("Command rejected: {}", e);
                }
                // Callers read the snapshot as soon as the reply lands
                self.publish();
                let _ = reply.send(result);
                return true;
            }
            SessionEvent::Tick { countdown } => self.on_tick(countdown).await,
            SessionEvent::SpeechDone { ticket, outcome } => {
                self.on_speech_done(ticket, outcome).await
            }
            SessionEvent::TranscriptReady { ticket, result } => {
                self.on_transcript(ticket, result).await
            }
        }

        self.publish();
        true
    }

    async fn apply(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::SetProfile(resume) => self.set_profile(*resume).await,
            Command::UpdateProfile(update) => self.update_profile(update),
            Command::ClearProfile => {
                self.clear_profile().await;
                Ok(())
            }
            Command::Start => self.start_interview().await,
            Command::StartRecording => self.start_recording().await,
            Command::StopRecording => self.stop_recording(),
            Command::Skip => self.skip().await,
            Command::Shutdown => Ok(()),
        }
    }

    // ========================================================================
    // Profile
    // ========================================================================

    async fn set_profile(&mut self, resume: ParsedResume) -> Result<(), SessionError> {
        if !self.state.phase.can_start() {
            return Err(SessionError::InterviewInProgress(self.state.phase));
        }

        let candidate = CandidateProfile::from_resume(&resume);
        info!(
            "Profile set for {}",
            candidate.display_name().unwrap_or("unnamed candidate")
        );

        let missing = candidate.missing_fields();
        if !missing.is_empty() {
            self.notify(Notice::warning(format!(
                "Please fill in the missing mandatory fields: {}",
                missing.join(", ")
            )));
        }

        self.profile = Some(resume);
        self.candidate = Some(candidate);
        self.reset_session().await;
        Ok(())
    }

    fn update_profile(&mut self, update: ProfileUpdate) -> Result<(), SessionError> {
        if !self.state.phase.can_start() {
            return Err(SessionError::InterviewInProgress(self.state.phase));
        }
        let Some(resume) = self.profile.as_mut() else {
            return Err(SessionError::MissingProfile);
        };

        let mut edited = resume.clone();
        update.apply_to(&mut edited);
        let candidate = CandidateProfile::from_resume(&edited);

        let missing = candidate.missing_fields();
        if !missing.is_empty() {
            return Err(SessionError::IncompleteProfile(
                missing.into_iter().map(String::from).collect(),
            ));
        }

        info!("Profile updated for {}", candidate.name);
        *resume = edited;
        self.candidate = Some(candidate);
        Ok(())
    }

    async fn clear_profile(&mut self) {
        info!("Profile cleared, discarding session {}", self.state.session_id);
        self.profile = None;
        self.candidate = None;
        self.reset_session().await;
    }

    /// Stop all in-flight work and replace the session with a fresh idle one
    async fn reset_session(&mut self) {
        self.countdown.cancel();
        self.cancel_speech().await;
        self.close_recording();
        self.state = SessionState::new();
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            info!(
                "Session {}: {} -> {} (question {}/{})",
                self.state.session_id,
                self.state.phase,
                phase,
                (self.state.current_question_index + 1).min(self.state.questions.len().max(1)),
                self.state.questions.len()
            );
            self.state.phase = phase;
        }
    }

    async fn start_interview(&mut self) -> Result<(), SessionError> {
        if !self.state.phase.can_start() {
            return Err(SessionError::InterviewInProgress(self.state.phase));
        }
        let Some(resume) = self.profile.clone() else {
            self.notify(Notice::error(SessionError::MissingProfile.to_string()));
            return Err(SessionError::MissingProfile);
        };

        self.reset_session().await;
        self.state.started_at_epoch_ms = Utc::now().timestamp_millis();
        self.set_phase(Phase::Generating);
        self.publish();

        let generated = match self.service.generate_questions(&resume).await {
            Ok(response) if response.questions.is_empty() => Err(SessionError::NoQuestions),
            Ok(response) => Ok(response),
            Err(e) => Err(SessionError::ServiceUnavailable(e.to_string())),
        };

        match generated {
            Ok(response) => {
                info!(
                    "Interview {} ready: {} questions on {}",
                    self.state.session_id,
                    response.questions.len(),
                    response.technology
                );
                self.state.questions = response.questions;
                self.state.technology = response.technology;
                self.state.candidate_name = response.candidate_name;
                self.load_question().await;
                Ok(())
            }
            Err(e) => {
                error!("Failed to generate questions: {}", e);
                self.state = SessionState::new();
                self.notify(Notice::error("Failed to start interview. Please try again."));
                Err(e)
            }
        }
    }

    /// Present the question at the current index and read it aloud
    async fn load_question(&mut self) {
        self.countdown.cancel();
        self.close_recording();
        self.state.time_remaining_secs = 0;
        self.set_phase(Phase::Reading);

        let Some(text) = self.state.current_question().map(|q| q.text.clone()) else {
            return;
        };
        self.begin_speech(text).await;
    }

    async fn begin_speech(&mut self, text: String) {
        self.cancel_speech().await;
        let ticket = self.speech_ticket;

        let Some(events) = self.events_tx.upgrade() else {
            return;
        };

        let task = if self.speech.is_supported() {
            let speech = Arc::clone(&self.speech);
            let settle = self.config.speech_settle();
            tokio::spawn(async move {
                let outcome = match speech.speak(&text).await {
                    Ok(()) => SpeechOutcome::Finished,
                    Err(e) => SpeechOutcome::Failed(e.to_string()),
                };
                tokio::time::sleep(settle).await;
                let _ = events.send(SessionEvent::SpeechDone { ticket, outcome }).await;
            })
        } else {
            debug!("Speech output unsupported, waiting {:?}", self.config.speech_grace());
            let grace = self.config.speech_grace();
            tokio::spawn(async move {
                tokio::time::sleep(grace).await;
                let outcome = SpeechOutcome::Unsupported;
                let _ = events.send(SessionEvent::SpeechDone { ticket, outcome }).await;
            })
        };

        self.speech_task = Some(task);
    }

    /// Invalidate the current prompt and silence it
    async fn cancel_speech(&mut self) {
        self.speech_ticket += 1;
        if let Some(task) = self.speech_task.take() {
            task.abort();
            self.speech.cancel().await;
        }
    }

    async fn on_speech_done(&mut self, ticket: u64, outcome: SpeechOutcome) {
        if ticket != self.speech_ticket || self.state.phase != Phase::Reading {
            debug!("Ignoring stale speech completion (ticket {})", ticket);
            return;
        }
        self.speech_task = None;

        if let SpeechOutcome::Failed(reason) = &outcome {
            warn!("Speech output failed, continuing: {}", reason);
        }

        self.enter_waiting_to_start();
    }

    fn enter_waiting_to_start(&mut self) {
        let secs = self.config.start_timeout_secs;
        self.set_phase(Phase::WaitingToStart);
        self.start_countdown(CountdownKind::StartWindow, secs);
    }

    fn start_countdown(&mut self, kind: CountdownKind, secs: u64) {
        self.state.time_remaining_secs = secs;
        if let Some(events) = self.events_tx.upgrade() {
            self.countdown.start(kind, secs, events);
        }
    }

    async fn on_tick(&mut self, countdown: u64) {
        match self.countdown.tick(countdown) {
            TickOutcome::Stale => {}
            TickOutcome::Running(remaining) => self.state.time_remaining_secs = remaining,
            TickOutcome::Expired(kind) => {
                self.state.time_remaining_secs = 0;
                match kind {
                    CountdownKind::StartWindow => self.on_start_window_expired().await,
                    CountdownKind::AnswerWindow => self.on_answer_window_expired().await,
                }
            }
        }
    }

    async fn on_start_window_expired(&mut self) {
        if self.state.phase != Phase::WaitingToStart {
            return;
        }
        let Some(question) = self.state.current_question() else {
            return;
        };

        let answer = Answer::time_expired(question);
        self.notify(Notice::warning(
            "Time expired to start answer. Moving to next question.",
        ));
        self.advance(answer).await;
    }

    async fn start_recording(&mut self) -> Result<(), SessionError> {
        let phase = self.state.phase;
        if !matches!(phase, Phase::Reading | Phase::WaitingToStart) {
            return Err(SessionError::InvalidAction {
                action: "start recording",
                phase,
            });
        }

        self.countdown.cancel();
        self.cancel_speech().await;

        let Some(events) = self.events_tx.upgrade() else {
            return Err(SessionError::ControllerClosed);
        };

        self.recording_ticket += 1;
        let ticket = self.recording_ticket;
        let (interim, interim_rx) = InterimSink::channel();
        let (stop_tx, stop_rx) = oneshot::channel();
        let request = TranscriptionRequest {
            max_duration: self.config.answer_window(),
            stop: stop_rx,
            interim,
        };

        let transcriber = Arc::clone(&self.transcriber);
        let task = tokio::spawn(async move {
            let result = transcriber
                .transcribe(request)
                .await
                .map_err(|e| e.to_string());
            let _ = events.send(SessionEvent::TranscriptReady { ticket, result }).await;
        });

        self.recording = Some(Recording {
            ticket,
            started: Instant::now(),
            stop_tx: Some(stop_tx),
            interim: interim_rx,
            task,
        });

        self.set_phase(Phase::Recording);
        let secs = self.config.answer_timeout_secs;
        self.start_countdown(CountdownKind::AnswerWindow, secs);
        Ok(())
    }

    fn stop_recording(&mut self) -> Result<(), SessionError> {
        let phase = self.state.phase;
        match self.recording.as_mut() {
            Some(recording) if phase == Phase::Recording => {
                debug!("Stop requested for recording {}", recording.ticket);
                recording.request_stop();
                Ok(())
            }
            _ => Err(SessionError::InvalidAction {
                action: "stop recording",
                phase,
            }),
        }
    }

    async fn on_transcript(&mut self, ticket: u64, result: Result<String, String>) {
        let current = self.recording.as_ref().map(|r| r.ticket);
        if current != Some(ticket) || self.state.phase != Phase::Recording {
            debug!("Ignoring stale transcript (ticket {})", ticket);
            return;
        }
        let Some(recording) = self.recording.take() else {
            return;
        };

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                warn!("Transcription failed, keeping interim text: {}", e);
                recording.partial_text()
            }
        };

        self.submit(recording, text).await;
    }

    async fn on_answer_window_expired(&mut self) {
        if self.state.phase != Phase::Recording {
            return;
        }
        let Some(recording) = self.recording.take() else {
            return;
        };

        let text = recording.partial_text();
        self.notify(Notice::info("Time limit reached. Submitting answer..."));
        self.submit(recording, text).await;
    }

    async fn submit(&mut self, recording: Recording, text: String) {
        self.countdown.cancel();
        let time_taken = recording.started.elapsed().as_secs();
        recording.release(self.config.transcriber_stop_grace());
        self.set_phase(Phase::Submitting);

        let Some(question) = self.state.current_question() else {
            return;
        };
        let answer = Answer::transcribed(question, &text, time_taken);

        debug!(
            "Answer to question {} after {}s ({} chars)",
            answer.question_id,
            time_taken,
            answer.answer_text.len()
        );

        self.advance(answer).await;
    }

    async fn skip(&mut self) -> Result<(), SessionError> {
        let phase = self.state.phase;
        if !phase.is_question_active() {
            return Err(SessionError::InvalidAction {
                action: "skip",
                phase,
            });
        }

        self.countdown.cancel();
        self.cancel_speech().await;

        let partial = match self.recording.take() {
            Some(recording) => {
                let partial = recording.partial_text();
                recording.release(self.config.transcriber_stop_grace());
                partial
            }
            None => String::new(),
        };

        let Some(question) = self.state.current_question() else {
            return Ok(());
        };
        let answer = Answer::skipped(question, &partial);

        self.notify(Notice::info("Question skipped. Moving to next question."));
        self.advance(answer).await;
        Ok(())
    }

    /// Store the answer for the current question and move on
    async fn advance(&mut self, answer: Answer) {
        if self.state.record_answer(answer) {
            self.load_question().await;
        } else {
            self.finish_interview().await;
        }
    }

    async fn finish_interview(&mut self) {
        self.countdown.cancel();
        self.set_phase(Phase::Scoring);
        self.publish();

        let profile_name = self.candidate.as_ref().and_then(|c| c.display_name());
        let payload = scoring::build_payload(&self.state, profile_name);

        let result = match self.service.score_answers(&payload).await {
            Ok(response) => ScoringResult::from_response(response),
            Err(e) => {
                error!("Scoring failed: {}", e);
                self.notify(Notice::warning("Scoring failed, but interview is saved."));
                ScoringResult::fallback(&self.state.answers, payload.interview_data.len())
            }
        };

        info!(
            "Interview {} completed: {}/100 ({:?})",
            self.state.session_id, result.overall_score, result.source
        );

        self.state.result = Some(result);
        self.state.completed_at = Some(Utc::now());
        self.set_phase(Phase::Completed);
        self.publish();

        self.autosave().await;
    }

    async fn autosave(&self) {
        let Some(record) = InterviewRecord::from_session(&self.state, self.candidate.clone())
        else {
            return;
        };

        if let Err(e) = self.store.save(&record).await {
            error!("Failed to save interview {}: {:#}", record.session_id, e);
            self.notify(Notice::error("Interview could not be saved."));
        }
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    /// Abandon the open recording; any late transcript is ignored
    fn close_recording(&mut self) {
        if let Some(recording) = self.recording.take() {
            recording.release(self.config.transcriber_stop_grace());
        }
    }

    async fn teardown(&mut self) {
        self.countdown.cancel();
        self.cancel_speech().await;
        if let Some(mut recording) = self.recording.take() {
            recording.request_stop();
            recording.task.abort();
        }
    }

    fn notify(&self, notice: Notice) {
        info!("Notice ({:?}): {}", notice.level, notice.message);
        // No subscribers is fine
        let _ = self.notices_tx.send(notice);
    }

    fn publish(&self) {
        let snapshot =
            SessionSnapshot::capture(&self.state, self.countdown.kind(), self.candidate.clone());
        self.snapshot_tx.send_replace(snapshot);
    }
}
