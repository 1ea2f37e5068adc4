//! In-memory blob store for tests and single-process runs.

use async_trait::async_trait;
use augment_core::{Error, Result};
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use crate::store::{check_part_order, part_etag, BlobStore, CompletedPart};

struct Upload {
    container: String,
    key: String,
    parts: BTreeMap<u32, Bytes>,
}

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<(String, String), Bytes>>,
    uploads: Mutex<HashMap<String, Upload>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys in `container` starting with `prefix`, sorted.
    pub fn keys(&self, container: &str, prefix: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .keys()
            .filter(|(c, k)| c == container && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn object(&self, container: &str, key: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .get(&(container.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }

    pub fn pending_uploads(&self) -> usize {
        self.uploads.lock().len()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, container: &str, key: &str) -> Result<Bytes> {
        self.object(container, key)
            .ok_or_else(|| Error::storage(format!("object not found: {}/{}", container, key)))
    }

    async fn put(&self, container: &str, key: &str, body: Bytes) -> Result<()> {
        self.objects
            .lock()
            .insert((container.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn create_multipart(&self, container: &str, key: &str) -> Result<String> {
        let upload_id = Uuid::new_v4().simple().to_string();
        self.uploads.lock().insert(
            upload_id.clone(),
            Upload {
                container: container.to_string(),
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
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
        let mut uploads = self.uploads.lock();
        let upload = uploads
            .get_mut(upload_id)
            .filter(|u| u.container == container && u.key == key)
            .ok_or_else(|| Error::storage(format!("unknown multipart upload: {}", upload_id)))?;

        let etag = part_etag(&body);
        upload.parts.insert(part_number, body);
        Ok(etag)
    }

    async fn complete_multipart(
        &self,
        container: &str,
        key: &str,
        upload_id: &str,
        parts: Vec<CompletedPart>,
    ) -> Result<()> {
        check_part_order(&parts)?;

        let body = {
            let uploads = self.uploads.lock();
            let upload = uploads
                .get(upload_id)
                .filter(|u| u.container == container && u.key == key)
                .ok_or_else(|| Error::storage(format!("unknown multipart upload: {}", upload_id)))?;

            let mut body = BytesMut::new();
            for part in &parts {
                let staged = upload.parts.get(&part.part_number).ok_or_else(|| {
                    Error::storage(format!("missing part {}", part.part_number))
                })?;
                if part_etag(staged) != part.etag {
                    return Err(Error::storage(format!(
                        "etag mismatch for part {}",
                        part.part_number
                    )));
                }
                body.extend_from_slice(staged);
            }
            body.freeze()
        };

        self.uploads.lock().remove(upload_id);
        self.objects
            .lock()
            .insert((container.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn abort_multipart(&self, _container: &str, _key: &str, upload_id: &str) -> Result<()> {
        self.uploads.lock().remove(upload_id);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
