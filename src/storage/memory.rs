//! In-memory recording store

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use uuid::Uuid;

use super::{RecordingStore, StorageError, StoredRecording};

/// Store that keeps recordings in memory; can be told to reject uploads
#[derive(Default)]
pub struct MemoryRecordingStore {
    records: Mutex<Vec<(StoredRecording, Bytes)>>,
    failing: AtomicBool,
    attempts: AtomicUsize,
}

impl MemoryRecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create` calls fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `create` calls, successful or not
    pub fn create_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordingStore for MemoryRecordingStore {
    async fn list(&self) -> Result<Vec<StoredRecording>, StorageError> {
        let mut records: Vec<_> = self.records.lock().iter().map(|(r, _)| r.clone()).collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn create(&self, data: Bytes, filename: &str) -> Result<StoredRecording, StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected("store unavailable".to_string()));
        }

        let record = StoredRecording {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            filesize: data.len() as u64,
            created_at: Utc::now(),
        };
        self.records.lock().push((record.clone(), data));
        Ok(record)
    }

    async fn read(&self, id: Uuid) -> Result<Bytes, StorageError> {
        self.records
            .lock()
            .iter()
            .find(|(r, _)| r.id == id)
            .map(|(_, data)| data.clone())
            .ok_or(StorageError::NotFound(id))
    }
}
