use anyhow::{Context, Result};
use serde::Deserialize;

use crate::session::SessionConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub api: ApiConfig,
    pub interview: SessionConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

/// Remote ML service (resume parsing, question generation, scoring)
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub interviews_path: String,
}

impl Config {
    /// Load configuration from an optional file, `VOICE_INTERVIEW__*` env vars and defaults.
    ///
    /// `VOICE_INTERVIEW__API__BASE_URL=http://ml:8002` overrides `api.base_url`.
    pub fn load(path: &str) -> Result<Self> {
        let defaults = SessionConfig::default();

        let settings = config::Config::builder()
            .set_default("service.name", "voice-interview")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 8090)?
            .set_default("api.base_url", "http://localhost:8002")?
            .set_default("api.timeout_secs", 30)?
            .set_default("interview.start_timeout_secs", defaults.start_timeout_secs)?
            .set_default("interview.answer_timeout_secs", defaults.answer_timeout_secs)?
            .set_default("interview.speech_grace_ms", defaults.speech_grace_ms)?
            .set_default("interview.speech_settle_ms", defaults.speech_settle_ms)?
            .set_default(
                "interview.transcriber_stop_grace_ms",
                defaults.transcriber_stop_grace_ms,
            )?
            .set_default("storage.interviews_path", "data/interviews")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("VOICE_INTERVIEW").separator("__"))
            .build()
            .with_context(|| format!("Failed to build configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.service.http.bind, self.service.http.port)
    }
}
