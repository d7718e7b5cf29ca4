//! In-process claim/record bookkeeping shared by the memory and file stores.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use vshort_models::RunRecord;

/// Outcome of trying to claim a source for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the source until it completes or releases it.
    Acquired,
    /// A completed run inside the dedup window exists.
    AlreadyProcessed(RunRecord),
    /// Another run holds a live claim.
    InProgress,
}

impl Claim {
    pub fn is_acquired(&self) -> bool {
        matches!(self, Claim::Acquired)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
enum Entry {
    Claimed { claimed_at: DateTime<Utc> },
    Completed { record: RunRecord },
}

/// Source id → claim or completed record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunLedger {
    #[serde(default)]
    entries: HashMap<String, Entry>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-then-claim in one step.
    ///
    /// Claims older than `claim_ttl` are treated as abandoned (a crashed run)
    /// and can be taken over.
    pub fn claim(
        &mut self,
        source_id: &str,
        window: Duration,
        claim_ttl: Duration,
        now: DateTime<Utc>,
    ) -> Claim {
        match self.entries.get(source_id) {
            Some(Entry::Completed { record }) if record.is_within(window, now) => {
                return Claim::AlreadyProcessed(record.clone());
            }
            Some(Entry::Claimed { claimed_at })
                if now.signed_duration_since(*claimed_at) < claim_ttl =>
            {
                return Claim::InProgress;
            }
            _ => {}
        }
        self.entries
            .insert(source_id.to_string(), Entry::Claimed { claimed_at: now });
        Claim::Acquired
    }

    /// Replace the claim with the completed record.
    pub fn complete(&mut self, record: RunRecord) {
        self.entries
            .insert(record.source_id.clone(), Entry::Completed { record });
    }

    /// Drop a claim so a later run may retry. Completed records are kept.
    pub fn release(&mut self, source_id: &str) {
        if matches!(self.entries.get(source_id), Some(Entry::Claimed { .. })) {
            self.entries.remove(source_id);
        }
    }

    pub fn record(&self, source_id: &str) -> Option<&RunRecord> {
        match self.entries.get(source_id) {
            Some(Entry::Completed { record }) => Some(record),
            _ => None,
        }
    }

    /// Remove completed records that fell out of the window. Returns how many.
    pub fn prune(&mut self, window: Duration, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| match entry {
            Entry::Completed { record } => record.is_within(window, now),
            Entry::Claimed { .. } => true,
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
