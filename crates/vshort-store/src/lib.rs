//! Run record store.
//!
//! Prevents the same source from being processed twice inside a dedup
//! window. Every backend offers an atomic check-then-claim so concurrent
//! runs for one source cannot both proceed.

pub mod error;
pub mod ledger;
pub mod redis_store;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

pub use error::{StoreError, StoreResult};
pub use ledger::{Claim, RunLedger};
pub use redis_store::RedisRunStore;
pub use store::{FileRunStore, MemoryRunStore, RunStore, DEFAULT_CLAIM_TTL_SECS};

/// Which backend to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    File(PathBuf),
    Redis(String),
}

impl StoreBackend {
    pub fn name(&self) -> &'static str {
        match self {
            StoreBackend::Memory => "memory",
            StoreBackend::File(_) => "file",
            StoreBackend::Redis(_) => "redis",
        }
    }
}

/// Open the configured store.
pub fn open_store(backend: &StoreBackend) -> StoreResult<Arc<dyn RunStore>> {
    let store: Arc<dyn RunStore> = match backend {
        StoreBackend::Memory => Arc::new(MemoryRunStore::new()),
        StoreBackend::File(path) => Arc::new(FileRunStore::new(path.clone())),
        StoreBackend::Redis(url) => Arc::new(RedisRunStore::new(url)?),
    };
    tracing::info!(backend = backend.name(), "Opened run store");
    Ok(store)
}
