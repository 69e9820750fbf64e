//! Process-local store for tests and single-node development.
//!
//! Expiry is measured with the tokio clock, so tests running with a paused
//! runtime can move time forward with `tokio::time::advance`.

use super::{OtpStore, StoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remaining lifetime of a live key.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at - now)
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|entry| entry.is_live(now)).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl OtpStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().await;
        for key in keys {
            entries.remove(key);
        }
        Ok(())
    }

    async fn increment_below(
        &self,
        key: &str,
        limit: u64,
        ttl: Duration,
    ) -> Result<Option<u64>, StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;

        let current = match entries.get(key) {
            Some(entry) if entry.is_live(now) => {
                entry
                    .value
                    .parse::<u64>()
                    .map_err(|_| StoreError::NotACounter {
                        key: key.to_string(),
                    })?
            }
            _ => 0,
        };

        if current >= limit {
            return Ok(None);
        }

        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(Some(next))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    #[tokio::test(start_paused = true)]
    async fn values_expire_with_the_clock() -> Result<()> {
        let store = MemoryStore::new();
        store.set("otp:a@x.com", "1234", Duration::from_secs(300)).await?;
        assert_eq!(store.get("otp:a@x.com").await?.as_deref(), Some("1234"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(store.get("otp:a@x.com").await?.is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(store.get("otp:a@x.com").await?.is_none());
        assert!(store.is_empty().await);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn increment_below_stops_at_limit() -> Result<()> {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);

        assert_eq!(store.increment_below("count", 2, ttl).await?, Some(1));
        assert_eq!(store.increment_below("count", 2, ttl).await?, Some(2));
        assert_eq!(store.increment_below("count", 2, ttl).await?, None);
        // Frozen at the limit rather than growing.
        assert_eq!(store.get("count").await?.as_deref(), Some("2"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn increment_below_refreshes_ttl() -> Result<()> {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(300);

        store.increment_below("attempts", 2, ttl).await?;
        tokio::time::advance(Duration::from_secs(200)).await;
        store.increment_below("attempts", 2, ttl).await?;

        assert_eq!(store.ttl("attempts").await, Some(ttl));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn increment_below_restarts_after_expiry() -> Result<()> {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(10);

        store.increment_below("count", 1, ttl).await?;
        assert_eq!(store.increment_below("count", 1, ttl).await?, None);

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.increment_below("count", 1, ttl).await?, Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn increment_below_rejects_non_counters() -> Result<()> {
        let store = MemoryStore::new();
        store.set("flag", "locked", Duration::from_secs(10)).await?;
        let result = store.increment_below("flag", 2, Duration::from_secs(10)).await;
        assert!(matches!(result, Err(StoreError::NotACounter { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn delete_ignores_missing_keys() -> Result<()> {
        let store = MemoryStore::new();
        store.set("a", "1", Duration::from_secs(10)).await?;
        store
            .delete(&["a".to_string(), "missing".to_string()])
            .await?;
        assert!(store.get("a").await?.is_none());
        Ok(())
    }
}
