//! Speech output (text-to-speech) and speech input (transcription) channels
//!
//! The interview controller only sees the `SpeechOutput` and `Transcriber`
//! traits; concrete channels live here.

pub mod backend;
pub mod console;
pub mod relay;

pub use backend::{InterimSink, NoSpeech, SpeechOutput, Transcriber, TranscriptionRequest};
pub use console::ConsoleSpeech;
pub use relay::SpeechRelay;
