//! Gemini video analysis client.
//!
//! Uploads a source video through the Files API, waits (bounded) for it to
//! become active, then asks the model for candidate short segments. The
//! response is returned as raw text; parsing and validation happen in the
//! worker.

pub mod analyzer;
pub mod client;
pub mod error;
pub mod poll;
pub mod prompt;
pub mod retry;
pub mod types;

pub use analyzer::SegmentAnalyzer;
pub use client::{GeminiClient, GeminiConfig};
pub use error::{AnalysisError, AnalysisResult};
pub use poll::{PollPolicy, PollState};
pub use prompt::{build_prompt, SegmentProposal};
pub use retry::{retry_async, RetryConfig};
pub use types::{FileResource, FileState};
