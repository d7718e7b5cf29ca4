//! Run identifiers and dedup records.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Record of a successfully completed run, keyed by source id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunRecord {
    pub source_id: String,
    pub processed_at: DateTime<Utc>,
    pub segment_count: usize,
}

impl RunRecord {
    pub fn new(source_id: impl Into<String>, segment_count: usize) -> Self {
        Self {
            source_id: source_id.into(),
            processed_at: Utc::now(),
            segment_count,
        }
    }

    /// Check whether this record still suppresses re-runs at `now`.
    pub fn is_within(&self, window: Duration, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.processed_at) < window
    }
}
