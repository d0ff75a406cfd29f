//! Persistence of completed interviews

mod store;

pub use store::{InterviewRecord, InterviewStore, InterviewSummary, JsonFileStore, MemoryStore};
