//! Capture source acquisition
//!
//! Requests the display stream (required) and the microphone stream
//! (optional), then merges them into one [`CombinedStream`].

use super::stream::CombinedStream;
use super::traits::{CaptureDevice, CaptureError, CaptureRequest, CaptureResult};

/// Outcome of the microphone request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MicrophoneStatus {
    Granted,
    /// Denied or unavailable; recording continues with display audio only
    Denied(String),
    /// Not requested
    Disabled,
}

/// Result of a successful acquisition
#[derive(Debug)]
pub struct Acquisition {
    pub stream: CombinedStream,
    pub microphone: MicrophoneStatus,
}

/// Acquire the display and microphone streams for one session attempt.
///
/// A display failure aborts the attempt with [`CaptureError::Denied`]. A
/// microphone failure only degrades the result.
pub async fn acquire(device: &dyn CaptureDevice, request: &CaptureRequest) -> CaptureResult<Acquisition> {
    let display = device
        .request_display(&request.display_constraints())
        .await
        .map_err(|e| match e {
            CaptureError::Denied(msg) => CaptureError::Denied(msg),
            other => CaptureError::Denied(other.to_string()),
        })?;

    if display.video_tracks().next().is_none() {
        display.stop_all();
        return Err(CaptureError::Denied("display stream has no video track".to_string()));
    }

    let video_count = display.video_tracks().count();
    let audio_count = display.audio_tracks().count();
    tracing::info!(
        "Display stream acquired: {} video, {} audio tracks",
        video_count,
        audio_count
    );

    let (microphone, status) = if request.microphone {
        match device.request_microphone(&request.audio).await {
            Ok(stream) => (Some(stream), MicrophoneStatus::Granted),
            Err(e) => {
                tracing::warn!("Microphone access denied, continuing with screen audio only: {}", e);
                (None, MicrophoneStatus::Denied(e.to_string()))
            }
        }
    } else {
        (None, MicrophoneStatus::Disabled)
    };

    Ok(Acquisition {
        stream: CombinedStream::merge(display, microphone),
        microphone: status,
    })
}
