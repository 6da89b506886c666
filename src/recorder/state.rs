//! Recording state management
//!
//! Defines the session state machine states and the reasons a session stops.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current state of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Not started, or start failed
    #[default]
    Idle,
    /// Capturing and collecting chunks
    Recording,
    /// Finished; terminal for this session
    Stopped,
}

/// Why a session left the Recording state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "message")]
pub enum StopReason {
    /// Explicit stop
    User,
    /// Elapsed time hit the configured maximum
    MaxDuration,
    /// The video track ended outside our control
    ExternalTermination,
    /// The encoder reported an unrecoverable error
    EncoderFault(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::User => write!(f, "stopped by user"),
            StopReason::MaxDuration => write!(f, "maximum duration reached"),
            StopReason::ExternalTermination => write!(f, "screen sharing ended"),
            StopReason::EncoderFault(msg) => write!(f, "encoder fault: {}", msg),
        }
    }
}

/// Snapshot published to observers after every session event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub state: SessionState,
    pub elapsed_secs: u32,
}
