use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

use super::backend::{InterimSink, SpeechOutput, Transcriber, TranscriptionRequest};

/// Speech channels whose playback and capture happen in an external driver
///
/// The controller calls `speak`/`transcribe` as usual; the driver (HTTP client or
/// terminal loop) polls `pending_prompt`, plays it, and reports back through
/// `finish_speech`/`fail_speech`, `push_interim` and `finish_transcript`.
#[derive(Clone, Default)]
pub struct SpeechRelay {
    state: Arc<Mutex<RelayState>>,
}

#[derive(Default)]
struct RelayState {
    prompt: Option<String>,
    speech_tx: Option<oneshot::Sender<Result<(), String>>>,
    transcript: Option<ActiveTranscript>,
}

struct ActiveTranscript {
    final_tx: oneshot::Sender<String>,
    interim: InterimSink,
}

impl SpeechRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prompt waiting to be played by the driver
    pub async fn pending_prompt(&self) -> Option<String> {
        self.state.lock().await.prompt.clone()
    }

    /// Driver finished playing the prompt. Returns false if nothing was playing.
    pub async fn finish_speech(&self) -> bool {
        self.resolve_speech(Ok(())).await
    }

    /// Driver failed to play the prompt
    pub async fn fail_speech(&self, reason: impl Into<String>) -> bool {
        self.resolve_speech(Err(reason.into())).await
    }

    async fn resolve_speech(&self, outcome: Result<(), String>) -> bool {
        let tx = {
            let mut state = self.state.lock().await;
            state.prompt = None;
            state.speech_tx.take()
        };

        match tx {
            Some(tx) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    /// Whether a transcription window is open
    pub async fn is_listening(&self) -> bool {
        self.state.lock().await.transcript.is_some()
    }

    /// Replace the interim transcript of the open window
    pub async fn push_interim(&self, text: impl Into<String>) -> bool {
        let state = self.state.lock().await;
        match &state.transcript {
            Some(active) => {
                active.interim.push(text);
                true
            }
            None => false,
        }
    }

    /// Append a spoken fragment to the interim transcript of the open window
    pub async fn append_interim(&self, fragment: &str) -> bool {
        let state = self.state.lock().await;
        match &state.transcript {
            Some(active) => {
                active.interim.append(fragment);
                true
            }
            None => false,
        }
    }

    /// Deliver the final transcript of the open window
    pub async fn finish_transcript(&self, text: impl Into<String>) -> bool {
        let active = self.state.lock().await.transcript.take();
        match active {
            Some(active) => active.final_tx.send(text.into()).is_ok(),
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl SpeechOutput for SpeechRelay {
    async fn speak(&self, text: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            // Dropping a previous sender fails its speak call
            state.prompt = Some(text.to_string());
            state.speech_tx = Some(tx);
        }

        debug!("Relaying prompt ({} chars)", text.len());

        match rx.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(reason)) => Err(anyhow!("Speech playback failed: {}", reason)),
            Err(_) => Err(anyhow!("Speech playback cancelled")),
        }
    }

    async fn cancel(&self) {
        let mut state = self.state.lock().await;
        state.prompt = None;
        state.speech_tx = None;
    }

    fn name(&self) -> &str {
        "relay"
    }
}

#[async_trait::async_trait]
impl Transcriber for SpeechRelay {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<String> {
        let TranscriptionRequest {
            max_duration,
            stop,
            interim,
        } = request;

        let (final_tx, final_rx) = oneshot::channel();
        {
            let mut state = self.state.lock().await;
            state.transcript = Some(ActiveTranscript {
                final_tx,
                interim: interim.clone(),
            });
        }

        info!("Listening for up to {}s", max_duration.as_secs());

        let text = tokio::select! {
            result = final_rx => result.unwrap_or_else(|_| interim.latest()),
            _ = stop => interim.latest(),
            _ = tokio::time::sleep(max_duration) => interim.latest(),
        };

        self.state.lock().await.transcript = None;

        Ok(text)
    }

    fn name(&self) -> &str {
        "relay"
    }
}
