//! Blob store backend trait.

use async_trait::async_trait;
use augment_core::Result;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use std::fmt::Write;

/// One uploaded part, as passed to [`BlobStore::complete_multipart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPart {
    /// 1-based part number
    pub part_number: u32,
    /// Completion token returned by [`BlobStore::upload_part`]
    pub etag: String,
}

/// Container/key addressed object storage.
///
/// A multipart object becomes visible only when `complete_multipart`
/// succeeds; staged parts are never readable through `get`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get(&self, container: &str, key: &str) -> Result<Bytes>;

    async fn put(&self, container: &str, key: &str, body: Bytes) -> Result<()>;

    /// Starts a multipart upload and returns its id.
    async fn create_multipart(&self, container: &str, key: &str) -> Result<String>;

    /// Stages one part and returns its etag.
    async fn upload_part(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<String>;

    /// Assembles the parts in the given order and publishes the object.
    async fn complete_multipart(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()>;

    /// Discards an upload and its staged parts.
    async fn abort_multipart(&self, container: &str, key: &str, upload_id: &str) -> Result<()>;

    async fn ping(&self) -> Result<()>;
}

/// Etag of a part body: hex SHA-256.
pub fn part_etag(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{:02x}", byte);
    }
    hex
}

/// Part numbers must start at 1 and strictly increase.
pub(crate) fn check_part_order(parts: &[CompletedPart]) -> Result<()> {
    if parts.is_empty() {
        return Err(augment_core::Error::storage("multipart upload has no parts"));
    }
    let mut previous = 0;
    for part in parts {
        if part.part_number <= previous {
            return Err(augment_core::Error::storage(format!(
                "part {} out of order after part {}",
                part.part_number, previous
            )));
        }
        previous = part.part_number;
    }
    Ok(())
}
