//! Local filesystem recording store
//!
//! Each recording is stored as `<id>.webm` next to a `<id>.json` metadata
//! file. The metadata is written last, so a recording only shows up in
//! listings once its data is complete.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{RecordingStore, StorageError, StoredRecording};

const DATA_EXTENSION: &str = "webm";
const METADATA_EXTENSION: &str = "json";
const PARTIAL_EXTENSION: &str = "part";

/// Directory-backed recording store
#[derive(Debug, Clone)]
pub struct LocalRecordingStore {
    root: PathBuf,
}

impl LocalRecordingStore {
    /// Open (and create if needed) a store rooted at `root`
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        tracing::info!("Recording store at {:?}", root);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn metadata_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", id, METADATA_EXTENSION))
    }

    /// Data file name never depends on the caller's filename
    fn data_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", id, DATA_EXTENSION))
    }

    async fn read_metadata(&self, id: Uuid) -> Result<StoredRecording, StorageError> {
        let path = self.metadata_path(id);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StorageError::NotFound(id)),
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }
}

#[async_trait]
impl RecordingStore for LocalRecordingStore {
    async fn list(&self) -> Result<Vec<StoredRecording>, StorageError> {
        let mut records = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == METADATA_EXTENSION) {
                let content = tokio::fs::read_to_string(&path).await?;
                match serde_json::from_str::<StoredRecording>(&content) {
                    Ok(record) => records.push(record),
                    Err(e) => tracing::warn!("Skipping unreadable metadata {:?}: {}", path, e),
                }
            }
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn create(&self, data: Bytes, filename: &str) -> Result<StoredRecording, StorageError> {
        let record = StoredRecording {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            filesize: data.len() as u64,
            created_at: Utc::now(),
        };

        let data_path = self.data_path(record.id);
        let partial = data_path.with_extension(PARTIAL_EXTENSION);
        tokio::fs::write(&partial, &data).await?;
        tokio::fs::rename(&partial, &data_path).await?;

        let metadata = serde_json::to_string_pretty(&record)?;
        tokio::fs::write(self.metadata_path(record.id), metadata).await?;

        tracing::debug!("Stored {} as {:?} ({} bytes)", filename, data_path, record.filesize);
        Ok(record)
    }

    async fn read(&self, id: Uuid) -> Result<Bytes, StorageError> {
        self.read_metadata(id).await?;
        let data = tokio::fs::read(self.data_path(id)).await?;
        Ok(Bytes::from(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_list_read() {
        let dir = tempdir().unwrap();
        let store = LocalRecordingStore::open(dir.path().join("recordings")).await.unwrap();

        let first = store
            .create(Bytes::from_static(b"first"), "screen-recording-a.webm")
            .await
            .unwrap();
        let second = store
            .create(Bytes::from_static(b"second!"), "screen-recording-b.webm")
            .await
            .unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].created_at >= listed[1].created_at);
        assert!(listed.contains(&first));
        assert!(listed.contains(&second));

        assert_eq!(&store.read(second.id).await.unwrap()[..], b"second!");
        assert_eq!(second.filesize, 7);
    }

    #[tokio::test]
    async fn test_read_missing() {
        let dir = tempdir().unwrap();
        let store = LocalRecordingStore::open(dir.path()).await.unwrap();

        let err = store.read(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_filename_extension_does_not_clobber_metadata() {
        let dir = tempdir().unwrap();
        let store = LocalRecordingStore::open(dir.path()).await.unwrap();

        let record = store.create(Bytes::from_static(b"video bytes"), "clip.json").await.unwrap();

        assert_eq!(&store.read(record.id).await.unwrap()[..], b"video bytes");
        assert_eq!(store.list().await.unwrap(), vec![record.clone()]);
        assert_eq!(record.filename, "clip.json");
    }

    #[tokio::test]
    async fn test_list_ignores_data_files() {
        let dir = tempdir().unwrap();
        let store = LocalRecordingStore::open(dir.path()).await.unwrap();
        store.create(Bytes::from_static(b"x"), "clip.webm").await.unwrap();
        std::fs::write(dir.path().join("stray.webm"), b"junk").unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
