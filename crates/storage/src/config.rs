//! Storage and writer configuration.

use augment_core::limits::{DEFAULT_MULTIPART_THRESHOLD, DEFAULT_PART_SIZE};
use augment_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    Memory,
}

/// Blob store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the filesystem backend; one subdirectory per container
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from("./data")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            root: default_root(),
        }
    }
}

/// Output writer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    /// Container receiving augmented batches
    #[serde(default = "default_output_container")]
    pub output_container: String,
    /// Payloads larger than this many bytes go through multipart upload
    #[serde(default = "default_multipart_threshold")]
    pub multipart_threshold: usize,
    /// Multipart chunk size in bytes
    #[serde(default = "default_part_size")]
    pub part_size: usize,
}

fn default_output_container() -> String {
    "job-postings".to_string()
}

fn default_multipart_threshold() -> usize {
    DEFAULT_MULTIPART_THRESHOLD
}

fn default_part_size() -> usize {
    DEFAULT_PART_SIZE
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            output_container: default_output_container(),
            multipart_threshold: default_multipart_threshold(),
            part_size: default_part_size(),
        }
    }
}

impl WriterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_container.is_empty() {
            return Err(Error::config("writer.output_container must not be empty"));
        }
        if self.part_size == 0 {
            return Err(Error::config("writer.part_size must be positive"));
        }
        Ok(())
    }
}
