//! Run store trait and local implementations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};
use vshort_models::RunRecord;

use crate::error::{StoreError, StoreResult};
use crate::ledger::{Claim, RunLedger};

/// Default lifetime of an unfinished claim.
pub const DEFAULT_CLAIM_TTL_SECS: i64 = 2 * 60 * 60;

/// Dedup store for completed runs.
///
/// `claim` must be atomic: two concurrent callers for the same source never
/// both get [`Claim::Acquired`].
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn claim(&self, source_id: &str, window: Duration) -> StoreResult<Claim>;

    /// Record a completed run and drop the claim.
    async fn complete(&self, record: RunRecord, window: Duration) -> StoreResult<()>;

    /// Drop the claim without recording anything.
    async fn release(&self, source_id: &str) -> StoreResult<()>;

    async fn get(&self, source_id: &str) -> StoreResult<Option<RunRecord>>;
}

/// Process-local store; forgets everything on restart.
pub struct MemoryRunStore {
    ledger: Mutex<RunLedger>,
    claim_ttl: Duration,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(RunLedger::new()),
            claim_ttl: Duration::seconds(DEFAULT_CLAIM_TTL_SECS),
        }
    }

    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }
}

impl Default for MemoryRunStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn claim(&self, source_id: &str, window: Duration) -> StoreResult<Claim> {
        let mut ledger = self.ledger.lock().await;
        let now = Utc::now();
        let pruned = ledger.prune(window, now);
        if pruned > 0 {
            debug!(pruned, "Pruned expired run records");
        }
        Ok(ledger.claim(source_id, window, self.claim_ttl, now))
    }

    async fn complete(&self, record: RunRecord, _window: Duration) -> StoreResult<()> {
        self.ledger.lock().await.complete(record);
        Ok(())
    }

    async fn release(&self, source_id: &str) -> StoreResult<()> {
        self.ledger.lock().await.release(source_id);
        Ok(())
    }

    async fn get(&self, source_id: &str) -> StoreResult<Option<RunRecord>> {
        Ok(self.ledger.lock().await.record(source_id).cloned())
    }
}

/// JSON file store for single-host deployments.
///
/// The whole ledger is rewritten atomically (temp file + rename) on every
/// change. Only one process may use a given file.
pub struct FileRunStore {
    path: PathBuf,
    lock: Mutex<()>,
    claim_ttl: Duration,
}

impl FileRunStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
            claim_ttl: Duration::seconds(DEFAULT_CLAIM_TTL_SECS),
        }
    }

    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> StoreResult<RunLedger> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(RunLedger::new()),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
                key: self.path.display().to_string(),
                message: e.to_string(),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(RunLedger::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, ledger: &RunLedger) -> StoreResult<()> {
        let json = serde_json::to_vec_pretty(ledger)?;
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, &json))
            .await
            .map_err(|e| StoreError::persist(e.to_string()))?
    }

    async fn update<T>(&self, f: impl FnOnce(&mut RunLedger) -> T) -> StoreResult<T> {
        let _guard = self.lock.lock().await;
        let mut ledger = self.load().await?;
        let out = f(&mut ledger);
        self.save(&ledger).await?;
        Ok(out)
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> StoreResult<()> {
    use std::io::Write;

    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| StoreError::persist(e.error.to_string()))?;
    Ok(())
}

#[async_trait]
impl RunStore for FileRunStore {
    async fn claim(&self, source_id: &str, window: Duration) -> StoreResult<Claim> {
        let ttl = self.claim_ttl;
        let claim = self
            .update(|ledger| {
                let now = Utc::now();
                let pruned = ledger.prune(window, now);
                if pruned > 0 {
                    debug!(pruned, "Pruned expired run records");
                }
                ledger.claim(source_id, window, ttl, now)
            })
            .await?;
        Ok(claim)
    }

    async fn complete(&self, record: RunRecord, _window: Duration) -> StoreResult<()> {
        self.update(|ledger| ledger.complete(record)).await
    }

    async fn release(&self, source_id: &str) -> StoreResult<()> {
        if let Err(e) = self.update(|ledger| ledger.release(source_id)).await {
            warn!(source_id, error = %e, "Failed to release claim");
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, source_id: &str) -> StoreResult<Option<RunRecord>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await?.record(source_id).cloned())
    }
}
