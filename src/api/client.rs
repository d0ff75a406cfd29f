use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::messages::{
    GenerateQuestionsResponse, ParsedResume, ScoringPayload, ScoringResponse, ServiceErrorBody,
};
use super::upload::{ResumeUpload, UploadError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Remote question generation and scoring, as seen by the interview controller
#[async_trait]
pub trait InterviewService: Send + Sync {
    async fn generate_questions(
        &self,
        resume: &ParsedResume,
    ) -> Result<GenerateQuestionsResponse, ApiError>;

    async fn score_answers(&self, payload: &ScoringPayload) -> Result<ScoringResponse, ApiError>;
}

/// Turns an uploaded resume file into a structured resume
#[async_trait]
pub trait ResumeParser: Send + Sync {
    async fn parse_resume(&self, upload: ResumeUpload) -> Result<ParsedResume, ApiError>;
}

/// HTTP client for the ML backend
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    /// GET /health
    pub async fn health(&self) -> Result<(), ApiError> {
        let response = self.client.get(self.url("health")).send().await?;
        check_status(response).await?;
        Ok(())
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        read_json(response).await
    }
}

#[async_trait]
impl InterviewService for ApiClient {
    async fn generate_questions(
        &self,
        resume: &ParsedResume,
    ) -> Result<GenerateQuestionsResponse, ApiError> {
        info!(
            "Requesting questions for {} ({} experience, {} projects)",
            if resume.personal_info.name.is_empty() {
                "unknown candidate"
            } else {
                resume.personal_info.name.as_str()
            },
            resume.experience.len(),
            resume.projects.len()
        );

        let response: GenerateQuestionsResponse =
            self.post_json("generate-questions", resume).await?;

        info!(
            "Received {} questions (technology: {})",
            response.questions.len(),
            response.technology
        );

        Ok(response)
    }

    async fn score_answers(&self, payload: &ScoringPayload) -> Result<ScoringResponse, ApiError> {
        info!(
            "Scoring {} answers for {}",
            payload.interview_data.len(),
            payload.candidate_info.name
        );

        let response: ScoringResponse = self.post_json("score-answers", payload).await?;

        info!(
            "Overall score {:.1} ({} of {} attempted)",
            response.final_score.overall_score,
            response.questions_attempted,
            response.total_questions
        );

        Ok(response)
    }
}

#[async_trait]
impl ResumeParser for ApiClient {
    /// POST /parse-resume with the resume file as multipart `file`
    async fn parse_resume(&self, upload: ResumeUpload) -> Result<ParsedResume, ApiError> {
        info!(
            "Uploading {} ({} bytes, {}) for parsing",
            upload.file_name,
            upload.bytes.len(),
            upload.format.mime()
        );

        let part = multipart::Part::bytes(upload.bytes)
            .file_name(upload.file_name)
            .mime_str(upload.format.mime())?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("parse-resume"))
            .multipart(form)
            .send()
            .await?;

        let resume: ParsedResume = read_json(response).await?;

        info!(
            "Parsed resume: {} experience entries, {} projects, {} skills",
            resume.experience.len(),
            resume.projects.len(),
            resume.skills.flatten().len()
        );

        Ok(resume)
    }
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ServiceErrorBody>(&body)
        .map(|e| e.detail)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                body
            }
        });

    warn!("ML service returned {}: {}", status, message);

    Err(ApiError::Api {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
