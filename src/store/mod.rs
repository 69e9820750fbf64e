//! Key-value cache contract used by the OTP gatekeeper.
//!
//! The gatekeeper only needs four primitives from its cache: read, write with
//! expiry, multi-key delete and an atomic "increment unless the counter already
//! reached a limit". The last one lets request tracking and failed-attempt
//! counting run as a single round trip, so concurrent requests for the same
//! identifier cannot both observe a stale count.

mod memory;
mod redis_store;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("value at {key} is not a counter")]
    NotACounter { key: String },
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Read a live value; expired keys read as absent.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write a value, replacing any previous value and expiry.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    /// Remove keys; missing keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Atomically increment the counter at `key` and refresh its expiry to `ttl`,
    /// unless the current count (absent = 0) is already `>= limit`.
    ///
    /// Returns the new count, or `None` when the limit was reached and nothing
    /// was written.
    async fn increment_below(
        &self,
        key: &str,
        limit: u64,
        ttl: Duration,
    ) -> Result<Option<u64>, StoreError>;

    /// Round trip used by the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Redis `EX` arguments are whole seconds; sub-second TTLs round up so a key
/// is never written without expiry.
pub(crate) fn ttl_seconds(ttl: Duration) -> u64 {
    let seconds = ttl.as_secs();
    if ttl.subsec_nanos() > 0 {
        seconds + 1
    } else {
        seconds.max(1)
    }
}
