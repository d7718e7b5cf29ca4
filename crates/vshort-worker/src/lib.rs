//! Shorts pipeline worker.
//!
//! This crate provides:
//! - Parsing of analysis payloads into candidate segments
//! - Segment validation and the transcript heuristic selector
//! - Source fetching for URLs and Telegram attachments
//! - The delivery sequencer and run coordinator
//! - The Telegram bot loop

pub mod caption;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod metrics;
pub mod payload;
pub mod poller;
pub mod selector;
pub mod sequencer;
pub mod transcript;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PipelineConfig, SelectionMode, StoreKind};
pub use coordinator::RunCoordinator;
pub use error::{SegmentError, WorkerError, WorkerResult};
pub use fetch::{FetchError, FetchErrorKind, FetchedSource, Fetcher, SourceFetcher};
pub use logging::{init_tracing, RunLogger};
pub use payload::{parse_candidates, PayloadError};
pub use poller::BotPoller;
pub use sequencer::{DeliverySequencer, SequenceOutcome};
pub use validator::{validate, Priority, ValidationError};
