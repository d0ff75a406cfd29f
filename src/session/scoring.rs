use super::model::Answer;
use super::state::{ScoreSource, ScoringResult, SessionState};
use crate::api::{CandidateInfo, InterviewItem, ScoringPayload, ScoringResponse};

pub const UNKNOWN_CANDIDATE: &str = "Unknown Candidate";
pub const DEFAULT_TECHNOLOGY: &str = "General";

/// Build the scorer request, one item per question in question order
pub fn build_payload(state: &SessionState, profile_name: Option<&str>) -> ScoringPayload {
    let name = profile_name
        .filter(|n| !n.is_empty())
        .or_else(|| Some(state.candidate_name.as_str()).filter(|n| !n.is_empty()))
        .unwrap_or(UNKNOWN_CANDIDATE)
        .to_string();

    let technology = if state.technology.is_empty() {
        DEFAULT_TECHNOLOGY.to_string()
    } else {
        state.technology.clone()
    };

    let interview_data = state
        .questions
        .iter()
        .map(|q| {
            let answer = state.answers.iter().find(|a| a.question_id == q.id);
            InterviewItem {
                question_id: q.id,
                question: q.text.clone(),
                difficulty: q.difficulty,
                category: q.category.clone(),
                expected_topics: q.expected_topics.clone(),
                answer: answer
                    .map(|a| a.answer_text.clone())
                    .unwrap_or_else(|| "No answer provided".to_string()),
                time_taken: answer.map(|a| a.time_taken_secs).unwrap_or(0),
                max_time_allowed: q.difficulty.max_time_allowed(),
            }
        })
        .collect();

    ScoringPayload {
        candidate_info: CandidateInfo { name, technology },
        interview_data,
    }
}

/// Round and clamp a 0-100 score
pub fn round_score(score: f64) -> u8 {
    if score.is_nan() {
        return 0;
    }
    score.clamp(0.0, 100.0).round() as u8
}

impl ScoringResult {
    pub fn from_response(response: ScoringResponse) -> Self {
        Self {
            overall_score: round_score(response.final_score.overall_score),
            summary: response.overall_feedback.clone(),
            source: ScoreSource::Service,
            response: Some(response),
        }
    }

    /// Heuristic score from average answer length, used when the scorer is down
    pub fn fallback(answers: &[Answer], questions_answered: usize) -> Self {
        Self {
            overall_score: round_score(fallback_score(answers)),
            summary: format!(
                "Interview completed with {} questions answered. Scoring service temporarily unavailable.",
                questions_answered
            ),
            source: ScoreSource::Fallback,
            response: None,
        }
    }
}

/// `(average answer chars / 50) * 60 + 20`, clamped to 0-100
pub fn fallback_score(answers: &[Answer]) -> f64 {
    if answers.is_empty() {
        return 20.0;
    }

    let total: usize = answers.iter().map(|a| a.answer_text.chars().count()).sum();
    let average = total as f64 / answers.len() as f64;

    ((average / 50.0) * 60.0 + 20.0).clamp(0.0, 100.0)
}
