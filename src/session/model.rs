use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Answer text recorded when the start window expires without a recording
pub const TIME_EXPIRED_TEXT: &str = "No answer provided (time expired)";

/// Answer text recorded when the candidate skips before saying anything
pub const SKIPPED_TEXT: &str = "Question skipped by candidate";

/// Suffix appended to partial text when the candidate skips mid-recording
pub const SKIPPED_SUFFIX: &str = " (Question skipped by candidate)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Idealized answer budget sent to the scorer.
    ///
    /// Independent of the runtime recording window.
    pub fn max_time_allowed(self) -> u64 {
        match self {
            Difficulty::Easy => 20,
            Difficulty::Medium => 60,
            Difficulty::Hard => 120,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated interview question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,

    /// Question text, `question` on the wire
    #[serde(rename = "question")]
    pub text: String,

    pub difficulty: Difficulty,

    pub category: String,

    #[serde(default)]
    pub expected_topics: Vec<String>,
}

/// How an answer came to be recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Produced by a transcription (manual stop or answer window timeout)
    Answered,
    /// Start window expired before recording began
    TimeExpired,
    /// Candidate skipped the question
    Skipped,
}

/// The candidate's answer to one question. Never mutated once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question_id: u32,
    pub question_text: String,
    pub answer_text: String,
    pub timestamp: DateTime<Utc>,
    pub difficulty: Difficulty,
    pub category: String,
    pub time_taken_secs: u64,
    pub outcome: AnswerOutcome,
}

impl Answer {
    pub(crate) fn for_question(
        question: &Question,
        answer_text: String,
        time_taken_secs: u64,
        outcome: AnswerOutcome,
    ) -> Self {
        Self {
            question_id: question.id,
            question_text: question.text.clone(),
            answer_text,
            timestamp: Utc::now(),
            difficulty: question.difficulty,
            category: question.category.clone(),
            time_taken_secs,
            outcome,
        }
    }

    /// Sentinel answer for a start window that ran out
    pub(crate) fn time_expired(question: &Question) -> Self {
        Self::for_question(question, TIME_EXPIRED_TEXT.to_string(), 0, AnswerOutcome::TimeExpired)
    }

    /// Answer for a skip; keeps whatever was transcribed so far
    pub(crate) fn skipped(question: &Question, partial: &str) -> Self {
        let partial = partial.trim();
        let text = if partial.is_empty() {
            SKIPPED_TEXT.to_string()
        } else {
            format!("{}{}", partial, SKIPPED_SUFFIX)
        };
        Self::for_question(question, text, 0, AnswerOutcome::Skipped)
    }

    /// Answer from a finished transcription
    pub(crate) fn transcribed(question: &Question, text: &str, time_taken_secs: u64) -> Self {
        let text = text.trim();
        let text = if text.is_empty() {
            TIME_EXPIRED_TEXT.to_string()
        } else {
            text.to_string()
        };
        Self::for_question(question, text, time_taken_secs, AnswerOutcome::Answered)
    }
}

/// Named state of the interview session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Generating,
    Reading,
    WaitingToStart,
    Recording,
    Submitting,
    Scoring,
    Completed,
}

impl Phase {
    /// Phases in which a question is on screen and can be skipped
    pub fn is_question_active(self) -> bool {
        matches!(self, Phase::Reading | Phase::WaitingToStart | Phase::Recording)
    }

    /// Phases from which a fresh interview may be started
    pub fn can_start(self) -> bool {
        matches!(self, Phase::Idle | Phase::Completed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Generating => "generating",
            Phase::Reading => "reading",
            Phase::WaitingToStart => "waiting_to_start",
            Phase::Recording => "recording",
            Phase::Submitting => "submitting",
            Phase::Scoring => "scoring",
            Phase::Completed => "completed",
        };
        f.write_str(name)
    }
}
