//! Redis-backed run store for multi-worker deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use redis::{AsyncCommands, Script};
use tokio::sync::Mutex;
use tracing::{debug, info};
use vshort_models::RunRecord;

use crate::error::{StoreError, StoreResult};
use crate::ledger::Claim;
use crate::store::{RunStore, DEFAULT_CLAIM_TTL_SECS};

const KEY_PREFIX: &str = "vshort";

/// Delete the claim key only while it still holds our token.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
"#;

/// Store keeping one record key (expiring with the dedup window) and one
/// claim key (`SET NX EX`) per source.
///
/// Each claim is written with a fresh token. A claim that expired and was
/// taken over by another worker is left alone when the original holder
/// completes or releases.
pub struct RedisRunStore {
    client: redis::Client,
    claim_ttl_secs: u64,
    /// Source id → token of the claim this instance holds
    tokens: Mutex<HashMap<String, String>>,
}

impl RedisRunStore {
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self {
            client,
            claim_ttl_secs: DEFAULT_CLAIM_TTL_SECS as u64,
            tokens: Mutex::new(HashMap::new()),
        })
    }

    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl_secs = ttl.num_seconds().max(1) as u64;
        self
    }

    fn record_key(source_id: &str) -> String {
        format!("{KEY_PREFIX}:run:{source_id}")
    }

    fn claim_key(source_id: &str) -> String {
        format!("{KEY_PREFIX}:claim:{source_id}")
    }

    fn new_token() -> String {
        format!("worker:{}", uuid::Uuid::new_v4())
    }

    /// Drop the claim key if this instance still owns it.
    async fn drop_claim(
        &self,
        conn: &mut redis::aio::MultiplexedConnection,
        source_id: &str,
    ) -> StoreResult<()> {
        let Some(token) = self.tokens.lock().await.remove(source_id) else {
            debug!(source_id, "No claim held, nothing to release");
            return Ok(());
        };
        let deleted: i32 = Script::new(RELEASE_SCRIPT)
            .key(Self::claim_key(source_id))
            .arg(&token)
            .invoke_async(conn)
            .await?;
        if deleted == 0 {
            debug!(source_id, "Claim expired or taken over, left in place");
        }
        Ok(())
    }

    async fn read_record(
        conn: &mut redis::aio::MultiplexedConnection,
        source_id: &str,
    ) -> StoreResult<Option<RunRecord>> {
        let key = Self::record_key(source_id);
        let raw: Option<String> = conn.get(&key).await?;
        raw.map(|json| {
            serde_json::from_str(&json).map_err(|e| StoreError::Corrupt {
                key,
                message: e.to_string(),
            })
        })
        .transpose()
    }
}

#[async_trait]
impl RunStore for RedisRunStore {
    async fn claim(&self, source_id: &str, window: Duration) -> StoreResult<Claim> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        if let Some(record) = Self::read_record(&mut conn, source_id).await? {
            if record.is_within(window, Utc::now()) {
                return Ok(Claim::AlreadyProcessed(record));
            }
        }

        let token = Self::new_token();
        let set: Option<String> = redis::cmd("SET")
            .arg(Self::claim_key(source_id))
            .arg(&token)
            .arg("NX")
            .arg("EX")
            .arg(self.claim_ttl_secs)
            .query_async(&mut conn)
            .await?;
        if set.is_none() {
            debug!(source_id, "Claim held by another run");
            return Ok(Claim::InProgress);
        }
        self.tokens.lock().await.insert(source_id.to_string(), token);

        // A run may have completed between the record read and the claim.
        if let Some(record) = Self::read_record(&mut conn, source_id).await? {
            if record.is_within(window, Utc::now()) {
                self.drop_claim(&mut conn, source_id).await?;
                return Ok(Claim::AlreadyProcessed(record));
            }
        }

        Ok(Claim::Acquired)
    }

    async fn complete(&self, record: RunRecord, window: Duration) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let ttl = window.num_seconds().max(1) as u64;
        let payload = serde_json::to_string(&record)?;

        conn.set_ex::<_, _, ()>(Self::record_key(&record.source_id), payload, ttl)
            .await?;
        self.drop_claim(&mut conn, &record.source_id).await?;

        info!(source_id = %record.source_id, ttl_secs = ttl, "Recorded completed run");
        Ok(())
    }

    async fn release(&self, source_id: &str) -> StoreResult<()> {
        if !self.tokens.lock().await.contains_key(source_id) {
            return Ok(());
        }
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        self.drop_claim(&mut conn, source_id).await
    }

    async fn get(&self, source_id: &str) -> StoreResult<Option<RunRecord>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        Self::read_record(&mut conn, source_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(RedisRunStore::record_key("url:https://x"), "vshort:run:url:https://x");
        assert_eq!(RedisRunStore::claim_key("tg:u"), "vshort:claim:tg:u");
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(RedisRunStore::new("not-a-redis-url").is_err());
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(RedisRunStore::new_token(), RedisRunStore::new_token());
    }

    #[tokio::test]
    async fn test_release_without_claim_skips_redis() {
        // Nothing listens on port 1; any connection attempt would fail
        let store = RedisRunStore::new("redis://127.0.0.1:1").unwrap();
        store.release("url:never-claimed").await.unwrap();
    }

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into())
    }

    // Requires a local Redis; run with `--ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_redis_claim_lifecycle() {
        let store = RedisRunStore::new(&redis_url()).unwrap();
        let id = format!("test:{}", uuid_like());
        let window = Duration::minutes(5);

        assert!(store.claim(&id, window).await.unwrap().is_acquired());
        assert_eq!(store.claim(&id, window).await.unwrap(), Claim::InProgress);

        store.release(&id).await.unwrap();
        assert!(store.claim(&id, window).await.unwrap().is_acquired());

        store.complete(RunRecord::new(&id, 2), window).await.unwrap();
        assert!(matches!(
            store.claim(&id, window).await.unwrap(),
            Claim::AlreadyProcessed(_)
        ));
    }

    // Requires a local Redis; run with `--ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_stale_holder_cannot_release_new_claim() {
        let first = RedisRunStore::new(&redis_url()).unwrap().with_claim_ttl(Duration::seconds(1));
        let second = RedisRunStore::new(&redis_url()).unwrap();
        let third = RedisRunStore::new(&redis_url()).unwrap();
        let id = format!("test:{}", uuid_like());
        let window = Duration::minutes(5);

        assert!(first.claim(&id, window).await.unwrap().is_acquired());
        tokio::time::sleep(std::time::Duration::from_millis(1500)).await;
        assert!(second.claim(&id, window).await.unwrap().is_acquired());

        first.release(&id).await.unwrap();
        assert_eq!(third.claim(&id, window).await.unwrap(), Claim::InProgress);

        second.release(&id).await.unwrap();
        assert!(third.claim(&id, window).await.unwrap().is_acquired());
        third.release(&id).await.unwrap();
    }

    fn uuid_like() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }
}
