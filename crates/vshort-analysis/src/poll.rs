//! Bounded polling for long-running remote state.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

use crate::error::{AnalysisError, AnalysisResult};

/// Result of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState<T> {
    Ready(T),
    Pending,
}

/// How long to wait for a remote resource to leave its processing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    pub max_attempts: u32,
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Call `check` until it reports ready, at most `max_attempts` times.
    ///
    /// Sleeps `interval` between attempts. Errors from `check` end polling
    /// immediately. Exhausting the attempts yields
    /// [`AnalysisError::PollTimeout`].
    pub async fn run<F, Fut, T>(&self, mut check: F) -> AnalysisResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = AnalysisResult<PollState<T>>>,
    {
        for attempt in 1..=self.max_attempts {
            match check(attempt).await? {
                PollState::Ready(value) => return Ok(value),
                PollState::Pending => {
                    debug!(attempt, max_attempts = self.max_attempts, "Still processing");
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.interval).await;
                    }
                }
            }
        }

        Err(AnalysisError::PollTimeout {
            attempts: self.max_attempts,
            waited_secs: self.interval.as_secs() * u64::from(self.max_attempts.saturating_sub(1)),
        })
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_on_third_attempt() {
        let policy = PollPolicy::new(5, Duration::from_millis(1));
        let result = policy
            .run(|attempt| async move {
                if attempt == 3 {
                    Ok(PollState::Ready(attempt))
                } else {
                    Ok(PollState::Pending)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_typed() {
        let policy = PollPolicy::new(3, Duration::from_millis(1));
        let mut calls = 0;
        let result: AnalysisResult<()> = policy
            .run(|_| {
                calls += 1;
                async { Ok(PollState::Pending) }
            })
            .await;
        assert!(matches!(
            result,
            Err(AnalysisError::PollTimeout { attempts: 3, .. })
        ));
        assert_eq!(calls, 3);
    }

    #[tokio::test]
    async fn test_error_stops_polling() {
        let policy = PollPolicy::new(10, Duration::from_millis(1));
        let mut calls = 0;
        let result: AnalysisResult<()> = policy
            .run(|_| {
                calls += 1;
                async { Err(AnalysisError::ProcessingFailed("FAILED".into())) }
            })
            .await;
        assert!(matches!(result, Err(AnalysisError::ProcessingFailed(_))));
        assert_eq!(calls, 1);
    }
}
