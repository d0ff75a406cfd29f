// Integration tests for the interview session controller
//
// Time is paused so countdowns and speech delays advance deterministically;
// the runtime jumps straight to the next timer whenever every task is idle.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use voice_interview::api::messages::PersonalInfo;
use voice_interview::api::{
    ApiError, GenerateQuestionsResponse, InterviewService, ParsedResume, ProfileUpdate,
    ScoringPayload, ScoringResponse,
};
use voice_interview::session::{
    AnswerOutcome, Difficulty, InterviewController, Phase, Question, ScoreSource, SessionConfig,
    SessionError, SessionHandle, SessionSnapshot, SKIPPED_TEXT, TIME_EXPIRED_TEXT,
};
use voice_interview::speech::{NoSpeech, SpeechOutput, Transcriber, TranscriptionRequest};
use voice_interview::storage::MemoryStore;

// ============================================================================
// Collaborators
// ============================================================================

struct MockService {
    questions: Vec<Question>,
    generate_fails: AtomicBool,
    scoring_fails: AtomicBool,
    generate_calls: AtomicUsize,
    payloads: Mutex<Vec<ScoringPayload>>,
}

impl MockService {
    fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            generate_fails: AtomicBool::new(false),
            scoring_fails: AtomicBool::new(false),
            generate_calls: AtomicUsize::new(0),
            payloads: Mutex::new(Vec::new()),
        }
    }

    fn payloads(&self) -> Vec<ScoringPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl InterviewService for MockService {
    async fn generate_questions(
        &self,
        _resume: &ParsedResume,
    ) -> Result<GenerateQuestionsResponse, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.generate_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 503,
                message: "model unavailable".to_string(),
            });
        }
        Ok(GenerateQuestionsResponse {
            questions: self.questions.clone(),
            technology: "Rust".to_string(),
            candidate_name: "Ada".to_string(),
        })
    }

    async fn score_answers(&self, payload: &ScoringPayload) -> Result<ScoringResponse, ApiError> {
        self.payloads.lock().unwrap().push(payload.clone());
        // Keeps the session in Scoring long enough to be observed
        tokio::time::sleep(Duration::from_secs(1)).await;

        if self.scoring_fails.load(Ordering::SeqCst) {
            return Err(ApiError::Api {
                status: 500,
                message: "scorer crashed".to_string(),
            });
        }
        Ok(serde_json::from_value(serde_json::json!({
            "candidate_name": "Ada Lovelace",
            "total_questions": payload.interview_data.len(),
            "questions_attempted": 1,
            "final_score": {"overall_score": 72.6},
            "overall_feedback": "Solid fundamentals",
            "recommendation": "Proceed"
        }))
        .unwrap())
    }
}

/// Speech output that finishes (or fails) after a fixed delay
struct TimedSpeech {
    delay: Duration,
    fail: bool,
    cancels: AtomicUsize,
}

impl TimedSpeech {
    fn instant() -> Self {
        Self::new(Duration::ZERO, false)
    }

    fn new(delay: Duration, fail: bool) -> Self {
        Self {
            delay,
            fail,
            cancels: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechOutput for TimedSpeech {
    async fn speak(&self, _text: &str) -> Result<()> {
        tokio::time::sleep(self.delay).await;
        if self.fail {
            anyhow::bail!("audio device lost");
        }
        Ok(())
    }

    async fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "timed"
    }
}

/// What the scripted transcriber does for one recording
enum Reply {
    /// Return `text` after `delay`
    After(Duration, &'static str),
    /// Publish `interim`, wait for stop, then return `final_text`
    OnStop {
        interim: &'static str,
        final_text: &'static str,
    },
    /// Publish `interim` and never return
    Hang { interim: &'static str },
}

struct ScriptedTranscriber {
    replies: Mutex<VecDeque<Reply>>,
    /// Hung transcriptions whose future was dropped
    abandoned: Arc<AtomicUsize>,
}

impl ScriptedTranscriber {
    fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            abandoned: Arc::new(AtomicUsize::new(0)),
        }
    }
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transcriber for ScriptedTranscriber {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String> {
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::After(delay, text)) => {
                tokio::time::sleep(delay).await;
                Ok(text.to_string())
            }
            Some(Reply::OnStop {
                interim,
                final_text,
            }) => {
                request.interim.push(interim);
                let _ = request.stop.await;
                Ok(final_text.to_string())
            }
            Some(Reply::Hang { interim }) => {
                let _dropped = DropCounter(self.abandoned.clone());
                request.interim.push(interim);
                std::future::pending::<()>().await;
                unreachable!()
            }
            None => anyhow::bail!("no scripted reply"),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn question(id: u32, difficulty: Difficulty) -> Question {
    Question {
        id,
        text: format!("Question number {}", id),
        difficulty,
        category: "systems".to_string(),
        expected_topics: vec!["ownership".to_string()],
    }
}

fn three_questions() -> Vec<Question> {
    vec![
        question(1, Difficulty::Easy),
        question(2, Difficulty::Medium),
        question(3, Difficulty::Hard),
    ]
}

fn resume() -> ParsedResume {
    ParsedResume {
        personal_info: PersonalInfo {
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: "+44 20 7946 0000".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

struct Harness {
    session: SessionHandle,
    service: Arc<MockService>,
    store: Arc<MemoryStore>,
    controller: JoinHandle<()>,
}

fn spawn(
    service: MockService,
    speech: Arc<dyn SpeechOutput>,
    transcriber: ScriptedTranscriber,
) -> Harness {
    let service = Arc::new(service);
    let store = Arc::new(MemoryStore::new());
    let (controller, session) = InterviewController::new(
        SessionConfig::default(),
        service.clone(),
        speech,
        Arc::new(transcriber),
        store.clone(),
    );

    Harness {
        session,
        service,
        store,
        controller: tokio::spawn(controller.run()),
    }
}

async fn wait(
    session: &SessionHandle,
    predicate: impl FnMut(&SessionSnapshot) -> bool,
) -> SessionSnapshot {
    tokio::time::timeout(Duration::from_secs(3600), session.wait_for(predicate))
        .await
        .expect("session never reached the expected state")
        .expect("controller stopped")
}

async fn waiting_on(session: &SessionHandle, index: usize) -> SessionSnapshot {
    wait(session, |s| {
        s.phase == Phase::WaitingToStart && s.current_question_index == index
    })
    .await
}

async fn started(harness: &Harness) {
    harness.session.set_profile(resume()).await.unwrap();
    harness.session.start().await.unwrap();
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_answer_timeout_and_skip_scenario() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![Reply::After(Duration::from_secs(40), "text A")]),
    );

    let mut phases = harness.session.watch();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while phases.changed().await.is_ok() {
            let phase = phases.borrow_and_update().phase;
            if seen.last() != Some(&phase) {
                seen.push(phase);
            }
            if phase == Phase::Completed {
                break;
            }
        }
        seen
    });

    started(&harness).await;

    // Q1: answered normally after 40s
    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();

    // Q2: start window runs out
    waiting_on(&harness.session, 1).await;

    // Q3: skipped
    waiting_on(&harness.session, 2).await;
    harness.session.skip().await.unwrap();

    let done = wait(&harness.session, |s| s.phase == Phase::Completed).await;
    let seen = observer.await.unwrap();
    assert!(seen.ends_with(&[Phase::Scoring, Phase::Completed]), "{:?}", seen);

    let answers = &done.answers;
    assert_eq!(answers.len(), 3);
    assert_eq!(done.current_question_index, 3);

    assert_eq!(answers[0].answer_text, "text A");
    assert_eq!(answers[0].time_taken_secs, 40);
    assert_eq!(answers[0].outcome, AnswerOutcome::Answered);

    assert_eq!(answers[1].answer_text, TIME_EXPIRED_TEXT);
    assert_eq!(answers[1].outcome, AnswerOutcome::TimeExpired);
    assert_eq!(answers[1].time_taken_secs, 0);

    assert_eq!(answers[2].answer_text, SKIPPED_TEXT);
    assert_eq!(answers[2].outcome, AnswerOutcome::Skipped);
    assert_eq!(answers[2].time_taken_secs, 0);

    for (i, answer) in answers.iter().enumerate() {
        assert_eq!(answer.question_id, (i + 1) as u32);
    }

    let result = done.result.expect("scored");
    assert_eq!(result.overall_score, 73);
    assert_eq!(result.source, ScoreSource::Service);
    assert_eq!(result.summary, "Solid fundamentals");

    // Scorer sees the idealized per-difficulty budget, not the 30s/120s windows
    let payloads = harness.service.payloads();
    assert_eq!(payloads.len(), 1);
    let budgets: Vec<u64> = payloads[0]
        .interview_data
        .iter()
        .map(|i| i.max_time_allowed)
        .collect();
    assert_eq!(budgets, vec![20, 60, 120]);
    assert_eq!(payloads[0].candidate_info.name, "Ada Lovelace");
    assert_eq!(payloads[0].candidate_info.technology, "Rust");
    assert_eq!(payloads[0].interview_data[0].time_taken, 40);

    let saved = harness.store.records().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].answers, *answers);

    harness.session.shutdown().await.unwrap();
    harness.controller.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_window_expires_after_thirty_seconds() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Easy)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    let mut notices = harness.session.subscribe_notices();
    started(&harness).await;

    let waiting = waiting_on(&harness.session, 0).await;
    assert_eq!(waiting.time_remaining_secs, 30);
    let t0 = Instant::now();

    let ticking = wait(&harness.session, |s| s.time_remaining_secs == 10).await;
    assert_eq!(ticking.phase, Phase::WaitingToStart);
    assert_eq!(t0.elapsed(), Duration::from_secs(20));

    let after = wait(&harness.session, |s| s.answers.len() == 1).await;
    assert_eq!(t0.elapsed(), Duration::from_secs(30));
    assert_eq!(after.answers[0].outcome, AnswerOutcome::TimeExpired);

    let notice = notices.recv().await.unwrap();
    assert!(notice.message.contains("Time expired"), "{:?}", notice);
}

#[tokio::test(start_paused = true)]
async fn test_answer_window_expiry_without_transcription() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Hard)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![Reply::Hang { interim: "" }]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();
    let t0 = Instant::now();

    let recording = harness.session.snapshot();
    assert_eq!(recording.phase, Phase::Recording);
    assert_eq!(recording.time_remaining_secs, 120);

    let after = wait(&harness.session, |s| s.current_question_index == 1).await;
    assert_eq!(t0.elapsed(), Duration::from_secs(120));
    assert_eq!(after.answers.len(), 1);
    assert_eq!(after.answers[0].answer_text, TIME_EXPIRED_TEXT);
    assert_eq!(after.answers[0].outcome, AnswerOutcome::Answered);
    assert_eq!(after.answers[0].time_taken_secs, 120);

    wait(&harness.session, |s| s.phase == Phase::Completed).await;
}

#[tokio::test(start_paused = true)]
async fn test_answer_window_expiry_keeps_interim_text() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Medium)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![Reply::OnStop {
            interim: "I would start with a ring buffer",
            final_text: "late final text",
        }]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();

    let done = wait(&harness.session, |s| s.phase == Phase::Completed).await;
    assert_eq!(done.answers.len(), 1);
    assert_eq!(done.answers[0].answer_text, "I would start with a ring buffer");
    assert_eq!(done.answers[0].time_taken_secs, 120);
}

#[tokio::test(start_paused = true)]
async fn test_manual_stop_submits_final_transcript() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Easy), question(2, Difficulty::Easy)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![Reply::OnStop {
            interim: "draft",
            final_text: "Borrowing lets you reference data without owning it",
        }]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;
    harness.session.stop_recording().await.unwrap();

    let next = waiting_on(&harness.session, 1).await;
    assert_eq!(next.answers.len(), 1);
    assert_eq!(
        next.answers[0].answer_text,
        "Borrowing lets you reference data without owning it"
    );
    assert_eq!(next.answers[0].time_taken_secs, 10);
}

#[tokio::test(start_paused = true)]
async fn test_skip_while_recording_keeps_partial_text() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Easy), question(2, Difficulty::Easy)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![Reply::OnStop {
            interim: "half an answer",
            final_text: "should never be used",
        }]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;
    harness.session.skip().await.unwrap();

    let snapshot = harness.session.snapshot();
    assert_eq!(snapshot.answers.len(), 1);
    assert_eq!(snapshot.current_question_index, 1);
    assert_eq!(
        snapshot.answers[0].answer_text,
        "half an answer (Question skipped by candidate)"
    );
    assert_eq!(snapshot.answers[0].outcome, AnswerOutcome::Skipped);

    // The transcript that arrives after the skip must not add a second answer
    let next = waiting_on(&harness.session, 1).await;
    assert_eq!(next.answers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_skip_during_reading_advances_exactly_once() {
    let speech = Arc::new(TimedSpeech::new(Duration::from_secs(10), false));
    let harness = spawn(
        MockService::new(three_questions()),
        speech.clone(),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;

    assert_eq!(harness.session.snapshot().phase, Phase::Reading);
    harness.session.skip().await.unwrap();

    let snapshot = harness.session.snapshot();
    assert_eq!(snapshot.answers.len(), 1);
    assert_eq!(snapshot.current_question_index, 1);
    assert_eq!(snapshot.phase, Phase::Reading);
    assert!(speech.cancels.load(Ordering::SeqCst) >= 1);

    // Past the point where the first prompt would have finished
    let waiting = waiting_on(&harness.session, 1).await;
    assert_eq!(waiting.answers.len(), 1);
    tokio::time::sleep(Duration::from_secs(15)).await;
    let later = harness.session.snapshot();
    assert_eq!(later.current_question_index, 1);
    assert_eq!(later.answers.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_skip_outside_question_is_rejected() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );

    let err = harness.session.skip().await.unwrap_err();
    assert_eq!(
        err,
        SessionError::InvalidAction {
            action: "skip",
            phase: Phase::Idle
        }
    );
    let err = harness.session.start_recording().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidAction { .. }));
    assert!(harness.session.snapshot().answers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scoring_failure_falls_back() {
    let service = MockService::new(vec![question(1, Difficulty::Easy), question(2, Difficulty::Hard)]);
    service.scoring_fails.store(true, Ordering::SeqCst);
    let harness = spawn(
        service,
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.skip().await.unwrap();
    waiting_on(&harness.session, 1).await;
    harness.session.skip().await.unwrap();

    let done = wait(&harness.session, |s| s.phase == Phase::Completed).await;
    let result = done.result.expect("fallback result");
    assert_eq!(result.source, ScoreSource::Fallback);
    assert!(result.overall_score <= 100);
    // "Question skipped by candidate" is 29 chars -> 29/50*60+20 = 54.8
    assert_eq!(result.overall_score, 55);
    assert_eq!(
        result.summary,
        "Interview completed with 2 questions answered. Scoring service temporarily unavailable."
    );

    // Persisted even though scoring failed
    let saved = harness.store.records().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].result.source, ScoreSource::Fallback);
}

#[tokio::test(start_paused = true)]
async fn test_generation_failure_returns_to_idle() {
    let service = MockService::new(three_questions());
    service.generate_fails.store(true, Ordering::SeqCst);
    let harness = spawn(
        service,
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );

    harness.session.set_profile(resume()).await.unwrap();
    let failed_id = harness.session.snapshot().session_id;
    let err = harness.session.start().await.unwrap_err();
    assert!(matches!(err, SessionError::ServiceUnavailable(_)), "{:?}", err);

    let snapshot = harness.session.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.answers.is_empty());
    assert_eq!(snapshot.total_questions, 0);
    assert!(snapshot.profile.is_some());

    // Retry once the service recovers
    harness.service.generate_fails.store(false, Ordering::SeqCst);
    harness.session.start().await.unwrap();
    let retried = harness.session.snapshot();
    assert_eq!(retried.phase, Phase::Reading);
    assert_eq!(retried.total_questions, 3);
    assert_eq!(retried.current_question_index, 0);
    assert_ne!(retried.session_id, failed_id);
    assert_eq!(harness.service.generate_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_empty_question_set_is_a_failure() {
    let harness = spawn(
        MockService::new(vec![]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    harness.session.set_profile(resume()).await.unwrap();

    let err = harness.session.start().await.unwrap_err();
    assert_eq!(err, SessionError::NoQuestions);
    assert_eq!(harness.session.snapshot().phase, Phase::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_start_requires_profile() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );

    let err = harness.session.start().await.unwrap_err();
    assert_eq!(err, SessionError::MissingProfile);
    assert_eq!(harness.session.snapshot().phase, Phase::Idle);
    assert_eq!(harness.service.generate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_start_rejected_while_in_progress() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;

    let err = harness.session.start().await.unwrap_err();
    assert_eq!(err, SessionError::InterviewInProgress(Phase::Reading));
    let err = harness.session.set_profile(resume()).await.unwrap_err();
    assert!(matches!(err, SessionError::InterviewInProgress(_)));
}

#[tokio::test(start_paused = true)]
async fn test_clear_profile_resets_session() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.skip().await.unwrap();
    waiting_on(&harness.session, 1).await;

    harness.session.clear_profile().await.unwrap();
    let snapshot = harness.session.snapshot();
    assert_eq!(snapshot.phase, Phase::Idle);
    assert!(snapshot.answers.is_empty());
    assert!(snapshot.profile.is_none());
    assert_eq!(snapshot.countdown, None);

    // The cancelled countdown must not fire into the fresh session
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(harness.session.snapshot().answers.is_empty());

    let err = harness.session.start().await.unwrap_err();
    assert_eq!(err, SessionError::MissingProfile);
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_speech_uses_grace_delay() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(NoSpeech),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;
    let t0 = Instant::now();

    waiting_on(&harness.session, 0).await;
    assert_eq!(t0.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_speech_failure_still_reaches_waiting() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::new(Duration::from_secs(3), true)),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;

    let waiting = waiting_on(&harness.session, 0).await;
    assert_eq!(waiting.time_remaining_secs, 30);
    assert!(waiting.answers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_recording_allowed_while_reading() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Easy)]),
        Arc::new(TimedSpeech::new(Duration::from_secs(30), false)),
        ScriptedTranscriber::new(vec![Reply::After(Duration::from_secs(8), "quick answer")]),
    );
    started(&harness).await;

    assert_eq!(harness.session.snapshot().phase, Phase::Reading);
    harness.session.start_recording().await.unwrap();
    assert_eq!(harness.session.snapshot().phase, Phase::Recording);

    let done = wait(&harness.session, |s| s.phase == Phase::Completed).await;
    assert_eq!(done.answers[0].answer_text, "quick answer");
    assert_eq!(done.answers[0].time_taken_secs, 8);
}

#[tokio::test(start_paused = true)]
async fn test_new_interview_after_completion() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Easy)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.skip().await.unwrap();
    let first = wait(&harness.session, |s| s.phase == Phase::Completed).await;

    harness.session.start().await.unwrap();
    let second = harness.session.snapshot();
    assert_ne!(second.session_id, first.session_id);
    assert!(second.answers.is_empty());
    assert!(second.result.is_none());
    assert_eq!(second.phase, Phase::Reading);

    assert_eq!(harness.store.records().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_controller() {
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;
    waiting_on(&harness.session, 0).await;

    harness.session.shutdown().await.unwrap();
    harness.controller.await.unwrap();

    let err = harness.session.skip().await.unwrap_err();
    assert_eq!(err, SessionError::ControllerClosed);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_reading_silences_prompt() {
    let speech = Arc::new(TimedSpeech::new(Duration::from_secs(20), false));
    let harness = spawn(
        MockService::new(three_questions()),
        speech.clone(),
        ScriptedTranscriber::new(vec![]),
    );
    started(&harness).await;
    assert_eq!(harness.session.snapshot().phase, Phase::Reading);

    harness.session.shutdown().await.unwrap();
    harness.controller.await.unwrap();
    assert!(speech.cancels.load(Ordering::SeqCst) >= 1);

    // Neither the prompt nor a countdown outlives the controller
    tokio::time::sleep(Duration::from_secs(60)).await;
    let last = harness.session.snapshot();
    assert_eq!(last.phase, Phase::Reading);
    assert!(last.answers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_while_recording_drops_transcriber() {
    let transcriber = ScriptedTranscriber::new(vec![Reply::Hang {
        interim: "so basically",
    }]);
    let abandoned = transcriber.abandoned.clone();
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        transcriber,
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    harness.session.shutdown().await.unwrap();
    harness.controller.await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(abandoned.load(Ordering::SeqCst), 1);

    // The answer window would have expired by now
    tokio::time::sleep(Duration::from_secs(200)).await;
    let last = harness.session.snapshot();
    assert_eq!(last.phase, Phase::Recording);
    assert!(last.answers.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stuck_transcriber_aborted_after_skip() {
    let transcriber = ScriptedTranscriber::new(vec![Reply::Hang { interim: "umm" }]);
    let abandoned = transcriber.abandoned.clone();
    let harness = spawn(
        MockService::new(three_questions()),
        Arc::new(TimedSpeech::instant()),
        transcriber,
    );
    started(&harness).await;

    waiting_on(&harness.session, 0).await;
    harness.session.start_recording().await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    harness.session.skip().await.unwrap();

    // The transcriber gets the stop grace period before it is aborted
    assert_eq!(abandoned.load(Ordering::SeqCst), 0);
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(abandoned.load(Ordering::SeqCst), 1);

    let snapshot = harness.session.snapshot();
    assert_eq!(snapshot.answers.len(), 1);
    assert_eq!(snapshot.answers[0].outcome, AnswerOutcome::Skipped);
}

#[tokio::test(start_paused = true)]
async fn test_profile_edits_reach_scoring() {
    let harness = spawn(
        MockService::new(vec![question(1, Difficulty::Easy)]),
        Arc::new(TimedSpeech::instant()),
        ScriptedTranscriber::new(vec![]),
    );

    let mut incomplete = resume();
    incomplete.personal_info.phone.clear();
    harness.session.set_profile(incomplete).await.unwrap();
    let profile = harness.session.snapshot().profile.unwrap();
    assert_eq!(profile.missing_fields(), vec!["phone"]);

    // An edit that leaves a mandatory field blank is refused as a whole
    let err = harness
        .session
        .update_profile(ProfileUpdate {
            email: Some("   ".to_string()),
            phone: Some("555-0100".to_string()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err, SessionError::IncompleteProfile(vec!["email".to_string()]));
    let profile = harness.session.snapshot().profile.unwrap();
    assert_eq!(profile.email, "ada@example.com");
    assert!(profile.phone.is_empty());

    harness
        .session
        .update_profile(ProfileUpdate {
            name: Some("Ada King".to_string()),
            phone: Some("555-0100".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    let profile = harness.session.snapshot().profile.unwrap();
    assert!(profile.missing_fields().is_empty());
    assert_eq!(profile.name, "Ada King");

    harness.session.start().await.unwrap();
    let err = harness
        .session
        .update_profile(ProfileUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::InterviewInProgress(_)));

    waiting_on(&harness.session, 0).await;
    harness.session.skip().await.unwrap();
    wait(&harness.session, |s| s.phase == Phase::Completed).await;

    let payloads = harness.service.payloads();
    assert_eq!(payloads[0].candidate_info.name, "Ada King");
}
