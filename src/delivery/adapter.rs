//! Delivery of the finished artifact
//!
//! Holds the artifact of the last completed session and exposes it for a
//! local save (repeatable, no network) or an upload to a [`RecordingStore`]
//! (exclusive; the artifact is only discarded once the upload succeeded).

use bytes::Bytes;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use super::artifact::Artifact;
use crate::recorder::events::{NoticeKind, Notifier};
use crate::storage::{RecordingStore, StorageError, StoredRecording};

/// Delivery errors
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("No recording available")]
    NoArtifact,

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Upload failed: {0}")]
    Upload(#[source] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Clears the busy flag on every exit path
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Exposes the current artifact for local save and upload
pub struct DeliveryAdapter {
    artifact: Mutex<Option<Artifact>>,
    uploading: AtomicBool,
    notifier: Notifier,
}

impl DeliveryAdapter {
    pub fn new(notifier: Notifier) -> Self {
        Self {
            artifact: Mutex::new(None),
            uploading: AtomicBool::new(false),
            notifier,
        }
    }

    /// Make `artifact` the current one, discarding any previous artifact
    pub fn replace(&self, artifact: Artifact) {
        if let Some(previous) = self.artifact.lock().replace(artifact) {
            tracing::debug!("Discarding previous artifact {}", previous.filename());
        }
    }

    pub fn artifact(&self) -> Option<Artifact> {
        self.artifact.lock().clone()
    }

    pub fn has_artifact(&self) -> bool {
        self.artifact.lock().is_some()
    }

    /// Busy flag shown while an upload is in flight
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    /// Drop the current artifact without saving it
    pub fn discard(&self) -> bool {
        self.artifact.lock().take().is_some()
    }

    /// "New Recording": discard the artifact and announce readiness
    pub fn reset(&self) {
        self.discard();
        self.notifier.info(NoticeKind::Reset, "Ready for new recording");
    }

    /// Bytes and filename for a client-side download. Does not consume the
    /// artifact.
    pub fn local_copy(&self) -> Result<(Bytes, String), DeliveryError> {
        let guard = self.artifact.lock();
        let artifact = guard.as_ref().ok_or(DeliveryError::NoArtifact)?;
        Ok((artifact.bytes(), artifact.filename().to_string()))
    }

    /// Write the artifact into `dir` under its own filename.
    pub async fn save_to(&self, dir: &Path) -> Result<PathBuf, DeliveryError> {
        let (data, filename) = self.local_copy()?;

        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(&filename);
        tokio::fs::write(&path, &data).await?;

        tracing::info!("Saved {} bytes to {:?}", data.len(), path);
        self.notifier.success(NoticeKind::DownloadStarted, "Download started!");
        Ok(path)
    }

    /// Submit the artifact to `store`.
    ///
    /// On success the artifact is discarded (unless a newer one replaced it
    /// meanwhile); on failure it is kept so the user can retry or save it
    /// locally. The caller is expected to refresh its listing afterwards.
    pub async fn upload(&self, store: &dyn RecordingStore) -> Result<StoredRecording, DeliveryError> {
        let _busy = BusyGuard::acquire(&self.uploading).ok_or(DeliveryError::UploadInProgress)?;

        let artifact = self.artifact().ok_or(DeliveryError::NoArtifact)?;
        tracing::info!("Uploading {} ({} bytes)", artifact.filename(), artifact.len());

        match store.create(artifact.bytes(), artifact.filename()).await {
            Ok(record) => {
                let mut current = self.artifact.lock();
                if current.as_ref().is_some_and(|a| a.id() == artifact.id()) {
                    current.take();
                }
                drop(current);

                self.notifier
                    .success(NoticeKind::UploadSucceeded, "Recording uploaded successfully!");
                Ok(record)
            }
            Err(e) => {
                tracing::error!("Upload error: {}", e);
                self.notifier
                    .error(NoticeKind::UploadFailed, "Failed to upload recording");
                Err(DeliveryError::Upload(e))
            }
        }
    }
}
