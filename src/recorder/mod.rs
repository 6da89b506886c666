//! Recording system module
//!
//! This module implements the recording session manager:
//! - RecordingSession state machine fed by SessionEvent messages
//! - run_session event loop that owns a running session
//! - Recorder to start, stop and collect sessions

pub mod channel;
pub mod chunks;
pub mod coordinator;
pub mod encoder;
pub mod events;
pub mod runner;
pub mod session;
pub mod state;
pub mod timer;

pub use channel::{event_channel, EventSender, RecordingError, RecordingResult, SessionEvent};
pub use chunks::ChunkBuffer;
pub use coordinator::Recorder;
pub use encoder::{
    EncoderFactory, MediaEncoder, MediaFormat, SimulatedEncoder, SimulatedEncoderConfig, SimulatedEncoderFactory,
};
pub use events::{Notice, NoticeKind, NoticeLevel, Notifier};
pub use session::RecordingSession;
pub use state::{SessionState, SessionStatus, StopReason};
pub use timer::{format_clock, ElapsedTimer};
