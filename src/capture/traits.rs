//! Capture trait definitions
//!
//! Device-agnostic types for capture sources: constraints, tracks and the
//! provider contract that hands out display and microphone streams.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Errors reported by a capture device provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The user cancelled the picker or screen capture is not permitted
    #[error("Screen capture denied: {0}")]
    Denied(String),

    /// Microphone access was refused
    #[error("Microphone access denied: {0}")]
    MicrophoneDenied(String),

    #[error("Capture device error: {0}")]
    Device(String),
}

/// Result type for capture operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Kind of surface to capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Screen,
    Window,
    Tab,
}

/// Desired video constraints for the display stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoConstraints {
    pub source: SourceKind,
    pub ideal_width: u32,
    pub ideal_height: u32,
}

impl Default for VideoConstraints {
    fn default() -> Self {
        Self {
            source: SourceKind::Screen,
            ideal_width: 1920,
            ideal_height: 1080,
        }
    }
}

/// Desired audio processing for screen and microphone audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AudioConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub sample_rate: u32,
}

impl Default for AudioConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            sample_rate: 44_100,
        }
    }
}

/// Constraints passed to the display request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConstraints {
    pub video: VideoConstraints,
    /// Screen audio, when the platform supports it
    pub audio: Option<AudioConstraints>,
}

/// Everything needed for one acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRequest {
    pub video: VideoConstraints,
    pub audio: AudioConstraints,
    pub display_audio: bool,
    pub microphone: bool,
}

impl CaptureRequest {
    pub fn display_constraints(&self) -> DisplayConstraints {
        DisplayConstraints {
            video: self.video.clone(),
            audio: self.display_audio.then(|| self.audio.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
}

/// Which device stream a track came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackSource {
    Display,
    Microphone,
}

impl fmt::Display for TrackSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackSource::Display => write!(f, "display"),
            TrackSource::Microphone => write!(f, "microphone"),
        }
    }
}

/// Lifecycle of a device track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackState {
    /// Delivering media
    Live,
    /// Ended by the device or OS (e.g. screen sharing revoked)
    Ended,
    /// Released by its owner
    Stopped,
}

/// Device-side hook invoked when a track is released
pub trait TrackControl: Send + Sync {
    fn stop(&self);
}

/// A live media track handed out by a capture device
///
/// Clones share state, so the provider can keep a handle to end the track
/// while the session owns the stream.
#[derive(Clone)]
pub struct MediaTrack {
    id: String,
    kind: TrackKind,
    source: TrackSource,
    label: String,
    state: Arc<watch::Sender<TrackState>>,
    control: Arc<dyn TrackControl>,
}

impl MediaTrack {
    pub fn new(
        kind: TrackKind,
        source: TrackSource,
        label: impl Into<String>,
        control: Arc<dyn TrackControl>,
    ) -> Self {
        let (state, _) = watch::channel(TrackState::Live);
        Self {
            id: Uuid::new_v4().to_string(),
            kind,
            source,
            label: label.into(),
            state: Arc::new(state),
            control,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn source(&self) -> TrackSource {
        self.source
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> TrackState {
        *self.state.borrow()
    }

    pub fn is_live(&self) -> bool {
        self.state() == TrackState::Live
    }

    /// Mark the track as ended from the device side.
    pub fn end(&self) {
        self.state.send_if_modified(|state| {
            if *state == TrackState::Live {
                *state = TrackState::Ended;
                true
            } else {
                false
            }
        });
    }

    /// Release the track. Returns false if it was already stopped.
    pub fn stop(&self) -> bool {
        let changed = self.state.send_if_modified(|state| {
            if *state == TrackState::Stopped {
                false
            } else {
                *state = TrackState::Stopped;
                true
            }
        });
        if changed {
            self.control.stop();
        }
        changed
    }

    /// Resolves once the device ends the track. Never resolves if the track
    /// is stopped by its owner instead.
    pub async fn ended(&self) {
        let mut rx = self.state.subscribe();
        let ended = rx
            .wait_for(|state| *state != TrackState::Live)
            .await
            .map(|state| *state == TrackState::Ended)
            .unwrap_or(false);
        if !ended {
            std::future::pending::<()>().await;
        }
    }
}

impl fmt::Debug for MediaTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("source", &self.source)
            .field("label", &self.label)
            .field("state", &self.state())
            .finish()
    }
}

/// Tracks returned by a single device request
#[derive(Debug, Clone, Default)]
pub struct DeviceStream {
    pub tracks: Vec<MediaTrack>,
}

impl DeviceStream {
    pub fn new(tracks: Vec<MediaTrack>) -> Self {
        Self { tracks }
    }

    pub fn video_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    /// Stop every track in this stream.
    pub fn stop_all(&self) {
        for track in &self.tracks {
            track.stop();
        }
    }
}

/// Provider of display and microphone streams
///
/// Both requests may suspend for as long as the user takes to answer the OS
/// permission prompt.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    async fn request_display(&self, constraints: &DisplayConstraints) -> CaptureResult<DeviceStream>;

    async fn request_microphone(&self, constraints: &AudioConstraints) -> CaptureResult<DeviceStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingControl(AtomicUsize);

    impl TrackControl for CountingControl {
        fn stop(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_stop_releases_once() {
        let control = Arc::new(CountingControl::default());
        let track = MediaTrack::new(TrackKind::Video, TrackSource::Display, "screen", control.clone());

        assert!(track.stop());
        assert!(!track.stop());
        assert_eq!(track.state(), TrackState::Stopped);
        assert_eq!(control.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_ended_track_can_still_be_stopped() {
        let control = Arc::new(CountingControl::default());
        let track = MediaTrack::new(TrackKind::Video, TrackSource::Display, "screen", control.clone());

        track.end();
        assert_eq!(track.state(), TrackState::Ended);
        assert!(track.stop());
        assert_eq!(track.state(), TrackState::Stopped);
        assert_eq!(control.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_display_constraints_without_screen_audio() {
        let request = CaptureRequest {
            video: VideoConstraints::default(),
            audio: AudioConstraints::default(),
            display_audio: false,
            microphone: true,
        };
        assert!(request.display_constraints().audio.is_none());
    }

    #[tokio::test]
    async fn test_ended_resolves_on_device_end() {
        let control = Arc::new(CountingControl::default());
        let track = MediaTrack::new(TrackKind::Video, TrackSource::Display, "screen", control);
        let watcher = track.clone();

        let handle = tokio::spawn(async move { watcher.ended().await });
        track.end();
        handle.await.unwrap();
    }
}
