//! Filesystem blob store.
//!
//! Objects live at `root/<container>/<key>`. Every write lands in a
//! temporary sibling first and is renamed into place, so readers never see
//! a partial object. Multipart parts are staged under
//! `root/.multipart/<upload_id>/` until the upload completes.

use async_trait::async_trait;
use augment_core::{Error, Result};
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::store::{check_part_order, part_etag, BlobStore, CompletedPart};

const STAGING_DIR: &str = ".multipart";
const TARGET_FILE: &str = "target";

pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf> {
        let container = checked_relative(container)?;
        let key = checked_relative(key)?;
        Ok(self.root.join(container).join(key))
    }

    fn staging_path(&self, upload_id: &str) -> Result<PathBuf> {
        if upload_id.is_empty() || !upload_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::storage(format!("invalid upload id: {}", upload_id)));
        }
        Ok(self.root.join(STAGING_DIR).join(upload_id))
    }

    async fn read_target(&self, staging: &Path) -> Result<String> {
        fs::read_to_string(staging.join(TARGET_FILE))
            .await
            .map_err(|e| io_error("unknown multipart upload", e))
    }
}

fn target_marker(container: &str, key: &str) -> String {
    format!("{}\n{}", container, key)
}

/// Rejects absolute paths and `..` so keys stay inside the root.
fn checked_relative(path: &str) -> Result<&Path> {
    let candidate = Path::new(path);
    let valid = !path.is_empty()
        && candidate
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if valid {
        Ok(candidate)
    } else {
        Err(Error::storage(format!("invalid object path: {}", path)))
    }
}

fn io_error(context: &str, e: std::io::Error) -> Error {
    Error::storage(format!("{}: {}", context, e))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("failed to create directory", e))?;
    }
    Ok(())
}

#[async_trait]
impl BlobStore for FsBlobStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes> {
        let path = self.object_path(container, key)?;
        let data = fs::read(&path).await.map_err(|e| {
            io_error(&format!("failed to read {}/{}", container, key), e)
        })?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, container: &str, key: &str, body: Bytes) -> Result<()> {
        let path = self.object_path(container, key)?;
        ensure_parent(&path).await?;

        let tmp = temp_sibling(&path);
        if let Err(e) = fs::write(&tmp, &body).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_error("failed to write object", e));
        }
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("failed to publish object", e))?;

        debug!(container = %container, key = %key, bytes = body.len(), "Object written");
        Ok(())
    }

    async fn create_multipart(&self, container: &str, key: &str) -> Result<String> {
        self.object_path(container, key)?;
        let upload_id = Uuid::new_v4().simple().to_string();
        let staging = self.staging_path(&upload_id)?;

        fs::create_dir_all(&staging)
            .await
            .map_err(|e| io_error("failed to create staging directory", e))?;
        fs::write(staging.join(TARGET_FILE), target_marker(container, key))
            .await
            .map_err(|e| io_error("failed to record upload target", e))?;

        debug!(container = %container, key = %key, upload_id = %upload_id, "Multipart upload started");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: Bytes,
    ) -> Result<String> {
        if part_number == 0 {
            return Err(Error::storage("part numbers start at 1"));
        }
        let staging = self.staging_path(upload_id)?;
        if self.read_target(&staging).await? != target_marker(container, key) {
            return Err(Error::storage(format!(
                "upload {} does not belong to {}/{}",
                upload_id, container, key
            )));
        }

        fs::write(staging.join(format!("{:05}", part_number)), &body)
            .await
            .map_err(|e| io_error("failed to stage part", e))?;
        Ok(part_etag(&body))
    }

    async fn complete_multipart(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        check_part_order(&parts)?;
        let staging = self.staging_path(upload_id)?;
        if self.read_target(&staging).await? != target_marker(container, key) {
            return Err(Error::storage(format!(
                "upload {} does not belong to {}/{}",
                upload_id, container, key
            )));
        }

        let path = self.object_path(container, key)?;
        ensure_parent(&path).await?;
        let tmp = temp_sibling(&path);

        let assembled = async {
            let mut out = fs::File::create(&tmp)
                .await
                .map_err(|e| io_error("failed to create object", e))?;
            for part in &parts {
                let body = fs::read(staging.join(format!("{:05}", part.part_number)))
                    .await
                    .map_err(|e| io_error(&format!("missing part {}", part.part_number), e))?;
                if part_etag(&body) != part.etag {
                    return Err(Error::storage(format!(
                        "etag mismatch for part {}",
                        part.part_number
                    )));
                }
                out.write_all(&body)
                    .await
                    .map_err(|e| io_error("failed to assemble object", e))?;
            }
            out.flush()
                .await
                .map_err(|e| io_error("failed to flush object", e))
        }
        .await;

        if let Err(e) = assembled {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }

        fs::rename(&tmp, &path)
            .await
            .map_err(|e| io_error("failed to publish object", e))?;
        if let Err(e) = fs::remove_dir_all(&staging).await {
            warn!(upload_id = %upload_id, error = %e, "Failed to remove staged parts");
        }

        debug!(container = %container, key = %key, parts = parts.len(), "Multipart upload complete");
        Ok(())
    }

    async fn abort_multipart(&self, _container: &str, _key: &str, upload_id: &str) -> Result<()> {
        let staging = self.staging_path(upload_id)?;
        match fs::remove_dir_all(&staging).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("failed to abort upload", e)),
        }
    }

    async fn ping(&self) -> Result<()> {
        fs::create_dir_all(&self.root)
            .await
            .map_err(|e| io_error("storage root unavailable", e))
    }
}
