//! Key/value backend abstraction.

use async_trait::async_trait;
use augment_core::Result;
use std::time::Duration;

/// Key/value store behind the cache client.
///
/// Values are opaque strings; expiry is applied by the backend where it
/// supports it and re-checked by the client against the stored timestamp.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// One round trip; the result is positionally aligned with `keys`.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>>;

    /// One round trip; each entry is applied independently.
    async fn set_many(&self, entries: Vec<(String, String)>, ttl: Duration) -> Result<()>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Removes every entry in this store's keyspace.
    async fn flush_all(&self) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}
