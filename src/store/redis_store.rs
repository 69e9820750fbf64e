//! Redis-backed store.
//!
//! Uses a multiplexed `ConnectionManager`, which reconnects on its own and is
//! cheap to clone per call.

use super::{OtpStore, StoreError, ttl_seconds};
use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::{AsyncCommands, Script, aio::ConnectionManager};
use std::time::Duration;
use tracing::{Instrument, info_span};

// KEYS[1] counter, ARGV[1] limit, ARGV[2] ttl seconds.
// Returns nil (no write) once the counter reached the limit.
const INCREMENT_BELOW_LUA: &str = r"
local current = tonumber(redis.call('GET', KEYS[1]) or '0')
if current == nil then
  return redis.error_reply('value is not a counter')
end
if current >= tonumber(ARGV[1]) then
  return false
end
local count = redis.call('INCR', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[2])
return count
";

#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    increment_below: Script,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore").finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Connect to Redis.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the first connection fails.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("Invalid Redis URL")?;
        let connection = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        Ok(Self {
            connection,
            increment_below: Script::new(INCREMENT_BELOW_LUA),
        })
    }
}

#[async_trait]
impl OtpStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let span = info_span!("cache.query", db.system = "redis", db.operation = "GET");
        let value: Option<String> = conn.get(key).instrument(span).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let span = info_span!("cache.query", db.system = "redis", db.operation = "SET");
        let (): () = conn
            .set_ex(key, value, ttl_seconds(ttl))
            .instrument(span)
            .await?;
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let span = info_span!("cache.query", db.system = "redis", db.operation = "DEL");
        let _removed: u64 = conn.del(keys).instrument(span).await?;
        Ok(())
    }

    async fn increment_below(
        &self,
        key: &str,
        limit: u64,
        ttl: Duration,
    ) -> Result<Option<u64>, StoreError> {
        let mut conn = self.connection.clone();
        let span = info_span!(
            "cache.query",
            db.system = "redis",
            db.operation = "EVALSHA"
        );
        let count: Option<u64> = self
            .increment_below
            .key(key)
            .arg(limit)
            .arg(ttl_seconds(ttl))
            .invoke_async(&mut conn)
            .instrument(span)
            .await?;
        Ok(count)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        let _pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::bail;
    use std::path::Path;
    use testcontainers::{
        ContainerAsync, GenericImage,
        core::{IntoContainerPort, WaitFor},
        runners::AsyncRunner,
    };

    const REDIS_PORT: u16 = 6379;
    const TEST_URL_ENV: &str = "AUTHGATE_TEST_REDIS_URL";

    /// Live Redis for the test: `AUTHGATE_TEST_REDIS_URL` if set, otherwise a
    /// throwaway container. `None` when neither is available.
    async fn redis() -> Result<Option<(RedisStore, Option<ContainerAsync<GenericImage>>)>> {
        if let Ok(url) = std::env::var(TEST_URL_ENV) {
            return Ok(Some((RedisStore::connect(&url).await?, None)));
        }
        if std::env::var("DOCKER_HOST").is_err() && !Path::new("/var/run/docker.sock").exists() {
            eprintln!("Skipping integration test: no container runtime and {TEST_URL_ENV} unset");
            return Ok(None);
        }

        let container = GenericImage::new("redis", "7-alpine")
            .with_exposed_port(REDIS_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"))
            .start()
            .await
            .context("Failed to start Redis container")?;
        let port = container
            .get_host_port_ipv4(REDIS_PORT.tcp())
            .await
            .context("Failed to resolve Redis host port")?;
        let store = RedisStore::connect(&format!("redis://127.0.0.1:{port}")).await?;
        Ok(Some((store, Some(container))))
    }

    fn unique_key(name: &str) -> String {
        format!("authgate-test:{name}:{}", ulid::Ulid::new())
    }

    async fn ttl_of(store: &RedisStore, key: &str) -> Result<i64> {
        let mut conn = store.connection.clone();
        Ok(redis::cmd("TTL").arg(key).query_async(&mut conn).await?)
    }

    #[tokio::test]
    async fn increment_below_stops_at_limit() -> Result<()> {
        let Some((store, _container)) = redis().await? else {
            return Ok(());
        };
        let key = unique_key("count");
        let ttl = Duration::from_secs(3600);

        assert_eq!(store.increment_below(&key, 2, ttl).await?, Some(1));
        assert_eq!(store.increment_below(&key, 2, ttl).await?, Some(2));
        assert_eq!(store.increment_below(&key, 2, ttl).await?, None);
        assert_eq!(store.increment_below(&key, 2, ttl).await?, None);
        assert_eq!(store.get(&key).await?.as_deref(), Some("2"));

        store.delete(&[key]).await?;
        Ok(())
    }

    #[tokio::test]
    async fn increment_below_refreshes_ttl() -> Result<()> {
        let Some((store, _container)) = redis().await? else {
            return Ok(());
        };
        let key = unique_key("ttl");

        store
            .increment_below(&key, 5, Duration::from_secs(100))
            .await?;
        let first = ttl_of(&store, &key).await?;
        assert!((1..=100).contains(&first), "unexpected ttl {first}");

        store
            .increment_below(&key, 5, Duration::from_secs(1000))
            .await?;
        let refreshed = ttl_of(&store, &key).await?;
        assert!(refreshed > 100, "ttl not refreshed: {refreshed}");

        store.delete(&[key]).await?;
        Ok(())
    }

    #[tokio::test]
    async fn increment_below_rejects_non_counter() -> Result<()> {
        let Some((store, _container)) = redis().await? else {
            return Ok(());
        };
        let key = unique_key("flag");
        store.set(&key, "locked", Duration::from_secs(60)).await?;

        match store
            .increment_below(&key, 2, Duration::from_secs(60))
            .await
        {
            Err(_) => {}
            Ok(count) => bail!("expected an error, got {count:?}"),
        }
        assert_eq!(store.get(&key).await?.as_deref(), Some("locked"));

        store.delete(&[key]).await?;
        Ok(())
    }

    #[tokio::test]
    async fn set_get_delete_round_trip() -> Result<()> {
        let Some((store, _container)) = redis().await? else {
            return Ok(());
        };
        let key = unique_key("otp");

        store.set(&key, "4821", Duration::from_secs(300)).await?;
        assert_eq!(store.get(&key).await?.as_deref(), Some("4821"));
        let ttl = ttl_of(&store, &key).await?;
        assert!((1..=300).contains(&ttl));

        store.delete(&[key.clone()]).await?;
        assert_eq!(store.get(&key).await?, None);
        store.ping().await?;
        Ok(())
    }
}
