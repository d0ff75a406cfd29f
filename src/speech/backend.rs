use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};

/// Speech output channel: reads a prompt aloud
///
/// Implementations:
/// - `SpeechRelay`: playback happens in an external driver (browser, terminal)
/// - `ConsoleSpeech`: prints the prompt and waits for a reading delay
/// - `NoSpeech`: speech unsupported; the controller substitutes a grace delay
#[async_trait::async_trait]
pub trait SpeechOutput: Send + Sync {
    /// Whether this channel can speak at all
    fn is_supported(&self) -> bool {
        true
    }

    /// Speak `text`, resolving once playback finished or failed
    async fn speak(&self, text: &str) -> Result<()>;

    /// Silence any in-flight playback
    async fn cancel(&self);

    /// Channel name for logging
    fn name(&self) -> &str;
}

/// Speech input channel: captures and transcribes one spoken answer
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    /// Capture until `request.stop` fires or `request.max_duration` elapses,
    /// then return the final text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String>;

    /// Channel name for logging
    fn name(&self) -> &str;
}

/// One bounded transcription window
pub struct TranscriptionRequest {
    /// Upper bound on capture time
    pub max_duration: Duration,

    /// Fires on manual stop or when the controller gives up on the window
    pub stop: oneshot::Receiver<()>,

    /// Where interim text is published while capturing
    pub interim: InterimSink,
}

/// Latest interim transcript of the current recording
#[derive(Clone)]
pub struct InterimSink {
    tx: Arc<watch::Sender<String>>,
}

impl InterimSink {
    pub fn channel() -> (Self, watch::Receiver<String>) {
        let (tx, rx) = watch::channel(String::new());
        (Self { tx: Arc::new(tx) }, rx)
    }

    /// Replace the interim text
    pub fn push(&self, text: impl Into<String>) {
        self.tx.send_replace(text.into());
    }

    /// Append a fragment to the interim text
    pub fn append(&self, fragment: &str) {
        self.tx.send_modify(|text| {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(fragment.trim());
        });
    }

    pub fn latest(&self) -> String {
        self.tx.borrow().clone()
    }
}

/// Speech output for environments without speech synthesis
pub struct NoSpeech;

#[async_trait::async_trait]
impl SpeechOutput for NoSpeech {
    fn is_supported(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> Result<()> {
        anyhow::bail!("Speech synthesis is not supported")
    }

    async fn cancel(&self) {}

    fn name(&self) -> &str {
        "none"
    }
}
