use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::CandidateProfile;
use crate::session::{Answer, Question, ScoringResult, SessionState};

/// A completed interview as handed to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewRecord {
    pub session_id: Uuid,
    pub candidate: Option<CandidateProfile>,
    pub candidate_name: String,
    pub technology: String,
    pub questions: Vec<Question>,
    pub answers: Vec<Answer>,
    pub result: ScoringResult,
    pub started_at_epoch_ms: i64,
    pub completed_at: DateTime<Utc>,
}

impl InterviewRecord {
    /// Snapshot a completed session. None while the session has no result.
    pub fn from_session(state: &SessionState, candidate: Option<CandidateProfile>) -> Option<Self> {
        let result = state.result.clone()?;
        let candidate_name = candidate
            .as_ref()
            .and_then(|c| c.display_name())
            .unwrap_or(state.candidate_name.as_str())
            .to_string();

        Some(Self {
            session_id: state.session_id,
            candidate,
            candidate_name,
            technology: state.technology.clone(),
            questions: state.questions.clone(),
            answers: state.answers.clone(),
            result,
            started_at_epoch_ms: state.started_at_epoch_ms,
            completed_at: state.completed_at.unwrap_or_else(Utc::now),
        })
    }

    pub fn summary(&self) -> InterviewSummary {
        InterviewSummary {
            session_id: self.session_id,
            candidate_name: self.candidate_name.clone(),
            technology: self.technology.clone(),
            overall_score: self.result.overall_score,
            questions: self.questions.len(),
            completed_at: self.completed_at,
        }
    }
}

/// One line of the saved interview list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterviewSummary {
    pub session_id: Uuid,
    pub candidate_name: String,
    pub technology: String,
    pub overall_score: u8,
    pub questions: usize,
    pub completed_at: DateTime<Utc>,
}

/// Persistence for completed interviews
#[async_trait::async_trait]
pub trait InterviewStore: Send + Sync {
    async fn save(&self, record: &InterviewRecord) -> Result<()>;

    async fn load(&self, session_id: Uuid) -> Result<Option<InterviewRecord>>;

    /// Saved interviews, newest first
    async fn list(&self) -> Result<Vec<InterviewSummary>>;
}

/// One pretty-printed JSON file per interview: `<dir>/<session_id>.json`
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, session_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    async fn read_record(path: &Path) -> Result<InterviewRecord> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Invalid record {}", path.display()))
    }
}

#[async_trait::async_trait]
impl InterviewStore for JsonFileStore {
    async fn save(&self, record: &InterviewRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .context("Failed to create interviews directory")?;

        let path = self.path_for(record.session_id);
        let json = serde_json::to_vec_pretty(record)?;

        // Write then rename so readers never see a partial file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move record into {}", path.display()))?;

        info!("Saved interview {} to {}", record.session_id, path.display());

        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<InterviewRecord>> {
        let path = self.path_for(session_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(None);
        }
        Self::read_record(&path).await.map(Some)
    }

    async fn list(&self) -> Result<Vec<InterviewSummary>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to list interviews directory"),
        };

        let mut summaries = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::read_record(&path).await {
                Ok(record) => summaries.push(record.summary()),
                Err(e) => warn!("Skipping unreadable interview record: {:#}", e),
            }
        }

        summaries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(summaries)
    }
}

/// Keeps records in memory; for tests and throwaway runs
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<InterviewRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<InterviewRecord> {
        self.records.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl InterviewStore for MemoryStore {
    async fn save(&self, record: &InterviewRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        records.retain(|r| r.session_id != record.session_id);
        records.push(record.clone());
        Ok(())
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<InterviewRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.session_id == session_id).cloned())
    }

    async fn list(&self) -> Result<Vec<InterviewSummary>> {
        let records = self.records.lock().await;
        let mut summaries: Vec<_> = records.iter().map(|r| r.summary()).collect();
        summaries.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(summaries)
    }
}
