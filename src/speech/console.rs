use anyhow::Result;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::debug;

use super::backend::SpeechOutput;

/// Roughly 170 spoken words per minute
const MILLIS_PER_WORD: u64 = 350;
const MIN_READING: Duration = Duration::from_secs(1);

/// Prints prompts to the terminal and waits as long as reading them aloud would take
#[derive(Default)]
pub struct ConsoleSpeech {
    cancelled: Notify,
}

impl ConsoleSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reading_time(text: &str) -> Duration {
        let words = text.split_whitespace().count() as u64;
        Duration::from_millis(words * MILLIS_PER_WORD).max(MIN_READING)
    }
}

#[async_trait::async_trait]
impl SpeechOutput for ConsoleSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        println!("\n🔊 {}", text);

        let reading = Self::reading_time(text);
        debug!("Reading prompt for {:?}", reading);

        tokio::select! {
            _ = tokio::time::sleep(reading) => Ok(()),
            _ = self.cancelled.notified() => anyhow::bail!("Speech cancelled"),
        }
    }

    async fn cancel(&self) {
        self.cancelled.notify_waiters();
    }

    fn name(&self) -> &str {
        "console"
    }
}
