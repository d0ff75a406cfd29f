use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::countdown::CountdownKind;
use super::model::{Answer, Phase, Question};
use crate::api::{CandidateProfile, ScoringResponse};

/// The single live interview, exclusively owned and mutated by the controller
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: Uuid,
    pub phase: Phase,
    pub current_question_index: usize,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub time_remaining_secs: u64,
    pub started_at_epoch_ms: i64,
    pub technology: String,
    pub candidate_name: String,
    pub result: Option<ScoringResult>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            phase: Phase::Idle,
            current_question_index: 0,
            questions: Vec::new(),
            answers: Vec::new(),
            time_remaining_secs: 0,
            started_at_epoch_ms: Utc::now().timestamp_millis(),
            technology: String::new(),
            candidate_name: String::new(),
            result: None,
            completed_at: None,
        }
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current_question_index)
    }

    /// Append the answer for the current question and move past it.
    ///
    /// Returns true while questions remain.
    pub fn record_answer(&mut self, answer: Answer) -> bool {
        debug_assert_eq!(self.answers.len(), self.current_question_index);
        debug_assert_eq!(
            self.current_question().map(|q| q.id),
            Some(answer.question_id)
        );

        self.answers.push(answer);
        self.current_question_index += 1;
        self.time_remaining_secs = 0;
        self.current_question_index < self.questions.len()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Where the final score came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreSource {
    Service,
    /// Local heuristic used while the scoring service is unavailable
    Fallback,
}

/// Outcome of scoring, attached to the session on completion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResult {
    /// Rounded, 0-100
    pub overall_score: u8,
    pub summary: String,
    pub source: ScoreSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<ScoringResponse>,
}

/// Read-only view of the session published after every transition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub phase: Phase,
    pub current_question_index: usize,
    pub total_questions: usize,
    pub current_question: Option<Question>,
    pub countdown: Option<CountdownKind>,
    pub time_remaining_secs: u64,
    pub answers: Vec<Answer>,
    pub started_at_epoch_ms: i64,
    pub technology: String,
    pub result: Option<ScoringResult>,
    pub profile: Option<CandidateProfile>,
}

impl SessionSnapshot {
    pub(crate) fn capture(
        state: &SessionState,
        countdown: Option<CountdownKind>,
        profile: Option<CandidateProfile>,
    ) -> Self {
        let current_question = if state.phase.is_question_active() {
            state.current_question().cloned()
        } else {
            None
        };

        Self {
            session_id: state.session_id,
            phase: state.phase,
            current_question_index: state.current_question_index,
            total_questions: state.questions.len(),
            current_question,
            countdown,
            time_remaining_secs: state.time_remaining_secs,
            answers: state.answers.clone(),
            started_at_epoch_ms: state.started_at_epoch_ms,
            technology: state.technology.clone(),
            result: state.result.clone(),
            profile,
        }
    }
}

/// Non-blocking message for the candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}
