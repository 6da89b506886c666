//! User-visible notices
//!
//! Every failure and lifecycle change is surfaced as a [`Notice`] on a
//! broadcast channel; nothing is swallowed silently.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// What a notice is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoticeKind {
    DevicesGranted,
    /// Microphone unavailable; recording with screen audio only
    MicrophoneDenied,
    /// Screen capture refused; the start attempt failed
    CaptureDenied,
    RecordingStarted,
    UserStopped,
    MaxDurationReached,
    ExternalTermination,
    EncoderFault,
    RecordingCompleted,
    DownloadStarted,
    UploadSucceeded,
    UploadFailed,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub level: NoticeLevel,
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            level,
            kind,
            message: message.into(),
        }
    }
}

/// Broadcast sender shared by the session, recorder and delivery adapter
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn notify(&self, level: NoticeLevel, kind: NoticeKind, message: impl Into<String>) {
        let notice = Notice::new(level, kind, message);
        match notice.level {
            NoticeLevel::Error => tracing::error!("{}", notice.message),
            NoticeLevel::Warning => tracing::warn!("{}", notice.message),
            _ => tracing::info!("{}", notice.message),
        }
        // No subscribers is fine
        let _ = self.tx.send(notice);
    }

    pub fn info(&self, kind: NoticeKind, message: impl Into<String>) {
        self.notify(NoticeLevel::Info, kind, message);
    }

    pub fn success(&self, kind: NoticeKind, message: impl Into<String>) {
        self.notify(NoticeLevel::Success, kind, message);
    }

    pub fn warning(&self, kind: NoticeKind, message: impl Into<String>) {
        self.notify(NoticeLevel::Warning, kind, message);
    }

    pub fn error(&self, kind: NoticeKind, message: impl Into<String>) {
        self.notify(NoticeLevel::Error, kind, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(100)
    }
}
