//! Simulated capture device
//!
//! Stands in for the OS screen/microphone pickers. Grants or denies each
//! request according to its configuration and keeps handles to every track
//! it hands out, so callers can revoke screen sharing or inspect releases.

use super::traits::{
    AudioConstraints, CaptureDevice, CaptureError, CaptureResult, DeviceStream, DisplayConstraints, MediaTrack,
    TrackControl, TrackKind, TrackSource, TrackState,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Behaviour of a [`SimulatedDevice`]
#[derive(Debug, Clone)]
pub struct SimulatedDeviceConfig {
    pub grant_display: bool,
    /// Whether the "platform" can capture screen audio
    pub display_audio_supported: bool,
    pub grant_microphone: bool,
}

impl Default for SimulatedDeviceConfig {
    fn default() -> Self {
        Self {
            grant_display: true,
            display_audio_supported: true,
            grant_microphone: true,
        }
    }
}

#[derive(Default)]
struct ReleaseCounter(AtomicUsize);

impl TrackControl for ReleaseCounter {
    fn stop(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Capture device backed by synthetic tracks
pub struct SimulatedDevice {
    config: SimulatedDeviceConfig,
    display_granted: AtomicBool,
    issued: Mutex<Vec<MediaTrack>>,
    releases: Arc<ReleaseCounter>,
    display_requests: AtomicUsize,
    microphone_requests: AtomicUsize,
}

impl SimulatedDevice {
    pub fn new(config: SimulatedDeviceConfig) -> Self {
        Self {
            display_granted: AtomicBool::new(config.grant_display),
            config,
            issued: Mutex::new(Vec::new()),
            releases: Arc::new(ReleaseCounter::default()),
            display_requests: AtomicUsize::new(0),
            microphone_requests: AtomicUsize::new(0),
        }
    }

    fn issue(&self, kind: TrackKind, source: TrackSource, label: &str) -> MediaTrack {
        let track = MediaTrack::new(kind, source, label, self.releases.clone());
        self.issued.lock().push(track.clone());
        track
    }

    /// Every track handed out so far, in issue order
    pub fn issued_tracks(&self) -> Vec<MediaTrack> {
        self.issued.lock().clone()
    }

    /// Tracks that have not been stopped yet
    pub fn active_tracks(&self) -> usize {
        self.issued
            .lock()
            .iter()
            .filter(|t| t.state() != TrackState::Stopped)
            .count()
    }

    /// Total number of track releases observed by the device
    pub fn release_count(&self) -> usize {
        self.releases.0.load(Ordering::SeqCst)
    }

    /// Change the answer to later display requests, as when the user
    /// cancels the picker on a second attempt.
    pub fn set_display_granted(&self, granted: bool) {
        self.display_granted.store(granted, Ordering::SeqCst);
    }

    pub fn display_requests(&self) -> usize {
        self.display_requests.load(Ordering::SeqCst)
    }

    pub fn microphone_requests(&self) -> usize {
        self.microphone_requests.load(Ordering::SeqCst)
    }

    /// End every live display video track, as when the user clicks
    /// "Stop sharing" in the OS chrome.
    pub fn revoke_display(&self) {
        for track in self.issued.lock().iter() {
            if track.source() == TrackSource::Display && track.kind() == TrackKind::Video {
                track.end();
            }
        }
    }
}

#[async_trait]
impl CaptureDevice for SimulatedDevice {
    async fn request_display(&self, constraints: &DisplayConstraints) -> CaptureResult<DeviceStream> {
        self.display_requests.fetch_add(1, Ordering::SeqCst);
        if !self.display_granted.load(Ordering::SeqCst) {
            return Err(CaptureError::Denied("Permission denied by user".to_string()));
        }

        let label = format!(
            "screen:{}x{}",
            constraints.video.ideal_width, constraints.video.ideal_height
        );
        let mut tracks = vec![self.issue(TrackKind::Video, TrackSource::Display, &label)];
        if constraints.audio.is_some() && self.config.display_audio_supported {
            tracks.push(self.issue(TrackKind::Audio, TrackSource::Display, "screen-audio"));
        }

        Ok(DeviceStream::new(tracks))
    }

    async fn request_microphone(&self, constraints: &AudioConstraints) -> CaptureResult<DeviceStream> {
        self.microphone_requests.fetch_add(1, Ordering::SeqCst);
        if !self.config.grant_microphone {
            return Err(CaptureError::MicrophoneDenied("Permission denied".to_string()));
        }

        let label = format!("microphone@{}Hz", constraints.sample_rate);
        Ok(DeviceStream::new(vec![self.issue(
            TrackKind::Audio,
            TrackSource::Microphone,
            &label,
        )]))
    }
}
