//! Redis cache backend.
//!
//! Bulk operations are pipelined without MULTI, so each SET applies on its
//! own and a failing key does not roll back the others.

use async_trait::async_trait;
use augment_core::{Error, Result};
use redis::aio::MultiplexedConnection;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::store::CacheStore;

/// Redis-backed [`CacheStore`].
pub struct RedisCacheStore {
    client: redis::Client,
    /// Lazily established, shared multiplexed connection
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisCacheStore {
    /// Creates the store; the connection is opened on first use.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::cache(format!("Invalid Redis URL: {}", e)))?;

        info!("Created Redis cache store");

        Ok(Self {
            client,
            connection: RwLock::new(None),
        })
    }

    async fn ensure_connected(&self) -> Result<MultiplexedConnection> {
        {
            let conn = self.connection.read().await;
            if let Some(ref c) = *conn {
                return Ok(c.clone());
            }
        }

        let conn = self
            .client
            .get_multiplexed_tokio_connection()
            .await
            .map_err(|e| Error::cache(format!("Failed to connect to Redis: {}", e)))?;

        {
            let mut guard = self.connection.write().await;
            *guard = Some(conn.clone());
        }

        debug!("Redis cache connection established");
        Ok(conn)
    }

    /// Drops the cached connection so the next call reconnects.
    pub async fn reset_connection(&self) {
        let mut conn = self.connection.write().await;
        *conn = None;
        info!("Redis cache connection reset");
    }

    async fn on_error(&self, op: &str, e: redis::RedisError) -> Error {
        warn!(op = op, error = %e, "Redis cache command failed");
        if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
            self.reset_connection().await;
        }
        Error::cache(format!("{} failed: {}", op, e))
    }
}

fn ttl_secs(ttl: Duration) -> u64 {
    // SET EX rejects 0.
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.ensure_connected().await?;
        match redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await
        {
            Ok(value) => Ok(value),
            Err(e) => Err(self.on_error("GET", e).await),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut conn = self.ensure_connected().await?;
        match redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(ttl_secs(ttl))
            .query_async::<_, ()>(&mut conn)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error("SET", e).await),
        }
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut conn = self.ensure_connected().await?;
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("GET").arg(key);
        }

        match pipe.query_async::<_, Vec<Option<String>>>(&mut conn).await {
            Ok(values) => Ok(values),
            Err(e) => Err(self.on_error("pipelined GET", e).await),
        }
    }

    async fn set_many(&self, entries: Vec<(String, String)>, ttl: Duration) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut conn = self.ensure_connected().await?;
        let mut pipe = redis::pipe();
        let secs = ttl_secs(ttl);
        for (key, value) in entries {
            pipe.cmd("SET").arg(key).arg(value).arg("EX").arg(secs).ignore();
        }

        match pipe.query_async::<_, ()>(&mut conn).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error("pipelined SET", e).await),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.ensure_connected().await?;
        match redis::cmd("DEL")
            .arg(key)
            .query_async::<_, i64>(&mut conn)
            .await
        {
            Ok(removed) => Ok(removed > 0),
            Err(e) => Err(self.on_error("DEL", e).await),
        }
    }

    async fn flush_all(&self) -> Result<()> {
        let mut conn = self.ensure_connected().await?;
        // FLUSHDB keeps other databases on the same server intact.
        match redis::cmd("FLUSHDB").query_async::<_, ()>(&mut conn).await {
            Ok(()) => Ok(()),
            Err(e) => Err(self.on_error("FLUSHDB", e).await),
        }
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self.ensure_connected().await?;
        match redis::cmd("PING").query_async::<_, String>(&mut conn).await {
            Ok(_) => Ok(()),
            Err(e) => Err(self.on_error("PING", e).await),
        }
    }
}
