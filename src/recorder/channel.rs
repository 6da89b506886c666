//! Session event channel
//!
//! Device and encoder callbacks are turned into [`SessionEvent`] messages on a
//! single channel, so one task applies them to the session in order.

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::capture::CaptureError;

/// Errors that can occur while driving a recording session
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Session already finished; start a new session")]
    SessionFinished,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Encoding error: {0}")]
    Encoder(String),

    #[error("Session task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for recording operations
pub type RecordingResult<T> = Result<T, RecordingError>;

/// Everything that can happen to a session while it records
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Periodic chunk from the encoder
    Chunk(Bytes),
    /// One-second clock tick
    Tick,
    /// A track ended outside our control
    TrackEnded(String),
    /// Unrecoverable encoder error
    EncoderFault(String),
    /// Explicit stop from the user
    StopRequested,
}

/// Sending half of a session's event channel
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSender {
    /// Returns false once the session stopped listening.
    pub fn send(&self, event: SessionEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn chunk(&self, data: impl Into<Bytes>) -> bool {
        self.send(SessionEvent::Chunk(data.into()))
    }

    pub fn fault(&self, message: impl Into<String>) -> bool {
        self.send(SessionEvent::EncoderFault(message.into()))
    }

    pub fn track_ended(&self, track_id: impl Into<String>) -> bool {
        self.send(SessionEvent::TrackEnded(track_id.into()))
    }

    pub fn request_stop(&self) -> bool {
        self.send(SessionEvent::StopRequested)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half of a session's event channel
pub type EventReceiver = mpsc::UnboundedReceiver<SessionEvent>;

/// Create a new session event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, rx)
}
