//! Persistence collaborator
//!
//! The recorder only needs [`RecordingStore::create`]; `list` and `read`
//! serve the recordings list that sits next to it.

pub mod local;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use local::LocalRecordingStore;
pub use memory::MemoryRecordingStore;

/// Storage-related errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Recording not found: {0}")]
    NotFound(Uuid),

    #[error("Upload rejected: {0}")]
    Rejected(String),
}

/// A recording persisted by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecording {
    pub id: Uuid,
    pub filename: String,
    pub filesize: u64,
    pub created_at: DateTime<Utc>,
}

/// Remote (or local) store of finished recordings
#[async_trait]
pub trait RecordingStore: Send + Sync {
    /// All stored recordings, newest first
    async fn list(&self) -> Result<Vec<StoredRecording>, StorageError>;

    /// Persist one recording in a single operation
    async fn create(&self, data: Bytes, filename: &str) -> Result<StoredRecording, StorageError>;

    async fn read(&self, id: Uuid) -> Result<Bytes, StorageError>;
}

/// Human-readable size: "0 Bytes", "512 Bytes", "1.5 KB", "2.25 MB"
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
