use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::session::{Difficulty, Question};

// ============================================================================
// Parsed resume (parse-resume response, generate-questions request)
// ============================================================================
//
// The parser's output is sent back verbatim for question generation, so
// every struct keeps unknown keys in `extra` and accepts `null` where it
// expects a string, list or object.

/// `null` reads as the default value
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Structured resume as returned by the parser and sent back for question generation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedResume {
    #[serde(deserialize_with = "nullable")]
    pub personal_info: PersonalInfo,
    #[serde(deserialize_with = "nullable")]
    pub education: Vec<Education>,
    #[serde(deserialize_with = "nullable")]
    pub experience: Vec<Experience>,
    #[serde(deserialize_with = "nullable")]
    pub projects: Vec<Project>,
    #[serde(deserialize_with = "nullable")]
    pub skills: Skills,
    #[serde(deserialize_with = "nullable")]
    pub certifications: Vec<Certification>,
    #[serde(deserialize_with = "nullable")]
    pub achievements: Vec<String>,
    pub publications: Option<String>,
    pub languages: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalInfo {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub email: String,
    #[serde(deserialize_with = "nullable")]
    pub phone: String,
    pub linkedin: Option<String>,
    pub github: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    #[serde(deserialize_with = "nullable")]
    pub institution: String,
    #[serde(deserialize_with = "nullable")]
    pub degree: String,
    pub field_of_study: Option<String>,
    pub grade: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub start_date: String,
    pub end_date: Option<String>,
    pub achievements: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    #[serde(deserialize_with = "nullable")]
    pub company: String,
    #[serde(deserialize_with = "nullable")]
    pub role: String,
    #[serde(deserialize_with = "nullable")]
    pub start_date: String,
    pub end_date: Option<String>,
    pub duration: Option<String>,
    pub location: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub responsibilities: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub technologies_used: Vec<String>,
    pub key_achievements: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub role: String,
    #[serde(deserialize_with = "nullable")]
    pub technologies: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub key_features: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub challenges_solved: Vec<String>,
    pub link: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub duration: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skills {
    #[serde(deserialize_with = "nullable")]
    pub languages: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub frameworks: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub databases: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub tools: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub cloud_platforms: Vec<String>,
    #[serde(deserialize_with = "nullable")]
    pub other: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Skills {
    pub fn flatten(&self) -> Vec<String> {
        self.languages
            .iter()
            .chain(&self.frameworks)
            .chain(&self.databases)
            .chain(&self.tools)
            .chain(&self.cloud_platforms)
            .chain(&self.other)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Certification {
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub issuer: String,
    pub issue_date: Option<String>,
    pub expiry_date: Option<String>,
    pub credential_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Question generation
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateQuestionsResponse {
    pub questions: Vec<Question>,
    #[serde(default)]
    pub technology: String,
    #[serde(default)]
    pub candidate_name: String,
}

// ============================================================================
// Scoring
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPayload {
    pub candidate_info: CandidateInfo,
    pub interview_data: Vec<InterviewItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub name: String,
    pub technology: String,
}

/// One question/answer pair as the scorer expects it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewItem {
    pub question_id: u32,
    pub question: String,
    pub difficulty: Difficulty,
    pub category: String,
    pub expected_topics: Vec<String>,
    pub answer: String,
    pub time_taken: u64,
    pub max_time_allowed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: u32,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub candidate_answer: String,
    #[serde(default)]
    pub time_taken: f64,
    /// 0-10
    pub score: f64,
    #[serde(default)]
    pub feedback: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub key_points_covered: Vec<String>,
    #[serde(default)]
    pub key_points_missed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScore {
    /// 0-100
    pub overall_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub technology: Option<String>,
    #[serde(default)]
    pub total_questions: u32,
    #[serde(default)]
    pub questions_attempted: u32,
    #[serde(default)]
    pub question_scores: Vec<QuestionScore>,
    pub final_score: FinalScore,
    #[serde(default)]
    pub overall_feedback: String,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub strengths_summary: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
}

/// Error body returned by the ML service, e.g. FastAPI's `{"detail": "..."}`
#[derive(Debug, Deserialize)]
pub(crate) struct ServiceErrorBody {
    #[serde(alias = "error", alias = "message")]
    pub detail: String,
}
