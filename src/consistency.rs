//! Read-after-write wait for eventually consistent storage.
//!
//! Some backends do not make a just-completed upload visible to metadata reads
//! right away. [`ConsistencyWaiter`] re-lists the written path a bounded number
//! of times; running out of attempts is not an error, callers fall back to a
//! locally known timestamp.

use std::fmt;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shipyard_storage::{FileStatus, Storage, StorageError, StoragePath};
use tracing::{debug, warn};

/// Bounded retry budget for the listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of listing attempts.
    pub attempts: u32,
    /// Pause between two attempts.
    #[serde(rename = "delay_ms", with = "millis")]
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_millis(100),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

/// A pause was cut short.
#[derive(Debug, Clone, thiserror::Error)]
#[error("wait interrupted: {0}")]
pub struct Interrupted(pub String);

/// How the waiter pauses between attempts.
pub trait Delay {
    fn wait(&self, duration: Duration) -> Result<(), Interrupted>;
}

/// Blocks the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
    fn wait(&self, duration: Duration) -> Result<(), Interrupted> {
        thread::sleep(duration);
        Ok(())
    }
}

/// Re-lists a freshly written path until it becomes visible.
pub struct ConsistencyWaiter {
    policy: RetryPolicy,
    delay: Box<dyn Delay>,
}

impl ConsistencyWaiter {
    pub fn new(policy: RetryPolicy) -> Self {
        Self::with_delay(policy, ThreadSleep)
    }

    pub fn with_delay(policy: RetryPolicy, delay: impl Delay + 'static) -> Self {
        Self {
            policy,
            delay: Box::new(delay),
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// First non-empty listing of `path`, or `None` once the budget is spent.
    ///
    /// Only "not found" and empty listings are retried; any other storage
    /// failure is returned immediately.
    pub fn wait_for_listing<S: Storage + ?Sized>(
        &self,
        storage: &S,
        path: &StoragePath,
    ) -> Result<Option<Vec<FileStatus>>, StorageError> {
        for attempt in 1..=self.policy.attempts {
            match storage.list_status(path) {
                Ok(statuses) if !statuses.is_empty() => return Ok(Some(statuses)),
                Ok(_) => debug!(%path, attempt, "uploaded resource listed empty"),
                Err(e) if e.is_not_found() => {
                    debug!(%path, attempt, "uploaded resource not visible yet")
                }
                Err(e) => return Err(e),
            }

            if attempt < self.policy.attempts {
                self.pause(attempt);
            }
        }
        Ok(None)
    }

    fn pause(&self, attempt: u32) {
        debug!(delay_ms = self.policy.delay.as_millis() as u64, "sleeping before next listing");
        if let Err(e) = self.delay.wait(self.policy.delay) {
            warn!(
                attempt,
                delay_ms = self.policy.delay.as_millis() as u64,
                error = %e,
                "wait interrupted while fetching uploaded resource; continuing"
            );
        }
    }
}

impl Default for ConsistencyWaiter {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

impl fmt::Debug for ConsistencyWaiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsistencyWaiter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
