//! Shared data models for the vshort pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Source references and probed source videos
//! - Candidate and selected segments, transcript cues and spans
//! - Caption tracks and progress-bar descriptors for rendered clips
//! - Delivery results and run summaries
//! - Run records used for dedup
//! - Encoding configuration and timestamp parsing

pub mod caption;
pub mod delivery;
pub mod encoding;
pub mod run;
pub mod segment;
pub mod source;
pub mod timestamp;

// Re-export common types
pub use caption::{CaptionCue, CaptionTrack, ProgressBar};
pub use delivery::{BatchReport, DeliveryResult, DeliveryStatus, RunOutcome, RunSummary};
pub use encoding::EncodingConfig;
pub use run::{RunId, RunRecord};
pub use segment::{
    CandidateSegment, SegmentLimits, SelectedSegment, TranscriptCue, TranscriptSpan,
};
pub use source::{SourceRef, SourceRefError, SourceVideo};
pub use timestamp::{format_seconds, parse_timestamp, TimestampError};
