//! Message bodies.

use augment_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Location of one input unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileRef {
    pub bucket: String,
    pub key: String,
}

impl FileRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body).map_err(|e| Error::invalid_message(format!("file reference: {}", e)))
    }

    /// True when the key ends with one of `extensions`.
    pub fn has_extension(&self, extensions: &[String]) -> bool {
        extensions.iter().any(|ext| self.key.ends_with(ext.as_str()))
    }
}

impl std::fmt::Display for FileRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Storage event notification in the S3 event layout:
/// `{"Records":[{"s3":{"bucket":{"name":..},"object":{"key":..}}}]}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    #[serde(rename = "eventName", default, skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    pub key: String,
}

impl StorageNotification {
    pub fn from_body(body: &str) -> Result<Self> {
        serde_json::from_str(body)
            .map_err(|e| Error::invalid_message(format!("storage notification: {}", e)))
    }

    /// Builds a notification for the given files.
    pub fn for_files<'a>(files: impl IntoIterator<Item = &'a FileRef>) -> Self {
        Self {
            records: files
                .into_iter()
                .map(|file| NotificationRecord {
                    event_name: Some("ObjectCreated:Put".to_string()),
                    s3: S3Entity {
                        bucket: S3Bucket {
                            name: file.bucket.clone(),
                        },
                        object: S3Object {
                            key: file.key.clone(),
                        },
                    },
                })
                .collect(),
        }
    }

    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn files(&self) -> Vec<FileRef> {
        self.records
            .iter()
            .map(|r| FileRef::new(&r.s3.bucket.name, &r.s3.object.key))
            .collect()
    }
}
