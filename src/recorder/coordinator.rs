//! Recording coordinator
//!
//! Owns the capture device, the encoder factory and at most one running
//! session, and manages the record/stop lifecycle on the user's behalf.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::channel::{event_channel, EventSender, RecordingError, RecordingResult};
use super::encoder::EncoderFactory;
use super::events::{Notice, Notifier};
use super::runner::run_session;
use super::session::RecordingSession;
use super::state::{SessionState, SessionStatus, StopReason};
use super::timer::format_clock;
use crate::capture::CaptureDevice;
use crate::config::RecorderConfig;
use crate::delivery::{Artifact, DeliveryAdapter, DeliveryError};
use crate::storage::{RecordingStore, StoredRecording};

/// A session whose event loop is running
struct ActiveSession {
    id: Uuid,
    events: EventSender,
    task: JoinHandle<RecordingSession>,
}

/// Manages recording sessions and the delivery of their artifacts
pub struct Recorder {
    config: RecorderConfig,
    device: Arc<dyn CaptureDevice>,
    encoders: Arc<dyn EncoderFactory>,
    notifier: Notifier,
    delivery: Arc<DeliveryAdapter>,
    status: Arc<watch::Sender<SessionStatus>>,
    active: Option<ActiveSession>,
    last_stop: Option<StopReason>,
}

impl Recorder {
    /// Create a new recorder
    pub fn new(config: RecorderConfig, device: Arc<dyn CaptureDevice>, encoders: Arc<dyn EncoderFactory>) -> Self {
        let notifier = Notifier::new(config.notice_capacity);
        let (status, _) = watch::channel(SessionStatus::default());
        Self {
            delivery: Arc::new(DeliveryAdapter::new(notifier.clone())),
            config,
            device,
            encoders,
            notifier,
            status: Arc::new(status),
            active: None,
            last_stop: None,
        }
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Subscribe to user-visible notices
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    /// Follow state and elapsed time as they change
    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    pub fn state(&self) -> SessionState {
        self.status().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == SessionState::Recording
    }

    /// Id of the running (or last, not yet collected) session
    pub fn session_id(&self) -> Option<Uuid> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Why the last collected session stopped
    pub fn last_stop_reason(&self) -> Option<&StopReason> {
        self.last_stop.as_ref()
    }

    /// "MM:SS / MM:SS" progress line
    pub fn clock_display(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.status().elapsed_secs),
            format_clock(self.config.max_duration_secs)
        )
    }

    pub fn delivery(&self) -> Arc<DeliveryAdapter> {
        self.delivery.clone()
    }

    /// Start a new session.
    ///
    /// Any previous artifact is discarded once the new session is running.
    /// On failure the recorder is idle again, the previous artifact is kept
    /// and the error has also been surfaced as a notice.
    pub async fn start(&mut self) -> RecordingResult<()> {
        if self.active.is_some() && self.is_recording() {
            return Err(RecordingError::AlreadyRecording);
        }

        // A session that stopped on its own is collected first
        self.collect(false).await?;

        let mut session = RecordingSession::new(self.config.clone(), self.notifier.clone());
        let (events, receiver) = event_channel();
        let encoder = self.encoders.create();

        if let Err(e) = session.start(self.device.as_ref(), encoder, events.clone()).await {
            self.status.send_replace(SessionStatus::default());
            return Err(e);
        }

        // The previous artifact survives a cancelled or failed start
        self.delivery.discard();

        let id = session.id();
        self.status.send_replace(session.status());
        let task = tokio::spawn(run_session(
            session,
            receiver,
            self.config.tick_period(),
            self.status.clone(),
            self.delivery.clone(),
        ));

        self.active = Some(ActiveSession { id, events, task });
        tracing::info!("Recording started (session {})", id);
        Ok(())
    }

    /// Stop the running session and return its artifact.
    ///
    /// Returns `Ok(None)` when there is nothing to stop.
    pub async fn stop(&mut self) -> RecordingResult<Option<Artifact>> {
        self.collect(true).await
    }

    /// Wait for the running session to stop by itself (time limit, revoked
    /// screen share, encoder fault) and return its artifact.
    pub async fn wait(&mut self) -> RecordingResult<Option<Artifact>> {
        self.collect(false).await
    }

    async fn collect(&mut self, request_stop: bool) -> RecordingResult<Option<Artifact>> {
        let Some(active) = self.active.take() else {
            return Ok(None);
        };

        if request_stop {
            // Already stopped sessions no longer listen
            active.events.request_stop();
        }

        let session = active
            .task
            .await
            .map_err(|e| RecordingError::Task(e.to_string()))?;

        self.last_stop = session.stop_reason().cloned();
        Ok(self.delivery.artifact())
    }

    /// Save the current artifact into `dir`
    pub async fn save_local(&self, dir: &Path) -> Result<PathBuf, DeliveryError> {
        self.delivery.save_to(dir).await
    }

    /// Upload the current artifact to `store`
    pub async fn upload(&self, store: &dyn RecordingStore) -> Result<StoredRecording, DeliveryError> {
        self.delivery.upload(store).await
    }

    /// Discard the current artifact and get ready for a new recording
    pub fn reset(&self) {
        self.delivery.reset();
        if !self.is_recording() {
            self.status.send_replace(SessionStatus::default());
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.events.request_stop();
        }
    }
}
