//! Recording session state machine
//!
//! A [`RecordingSession`] goes `Idle -> Recording -> Stopped` exactly once.
//! Everything that happens while recording arrives as a [`SessionEvent`] and
//! is applied by [`RecordingSession::handle`]; every stop trigger funnels into
//! the guarded [`RecordingSession::stop`].

use chrono::Utc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::channel::{EventSender, RecordingError, RecordingResult, SessionEvent};
use super::chunks::ChunkBuffer;
use super::encoder::MediaEncoder;
use super::events::{NoticeKind, Notifier};
use super::state::{SessionState, SessionStatus, StopReason};
use super::timer::{ElapsedTimer, Tick};
use crate::capture::{acquire, CaptureDevice, CombinedStream, MicrophoneStatus};
use crate::config::RecorderConfig;
use crate::delivery::artifact::{assemble, Artifact};

/// One recording attempt, from device acquisition to a finished artifact
pub struct RecordingSession {
    id: Uuid,
    config: RecorderConfig,
    state: SessionState,
    stream: Option<CombinedStream>,
    encoder: Option<Box<dyn MediaEncoder>>,
    chunks: ChunkBuffer,
    timer: ElapsedTimer,
    /// Watches the video track for an external end
    watcher: Option<JoinHandle<()>>,
    stop_reason: Option<StopReason>,
    artifact: Option<Artifact>,
    notifier: Notifier,
}

impl RecordingSession {
    /// Create an idle session
    pub fn new(config: RecorderConfig, notifier: Notifier) -> Self {
        let timer = ElapsedTimer::new(config.max_duration_secs);
        Self {
            id: Uuid::new_v4(),
            config,
            state: SessionState::Idle,
            stream: None,
            encoder: None,
            chunks: ChunkBuffer::new(),
            timer,
            watcher: None,
            stop_reason: None,
            artifact: None,
            notifier,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.timer.elapsed_secs()
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            elapsed_secs: self.timer.elapsed_secs(),
        }
    }

    /// The combined stream, kept after release so its tracks can be inspected
    pub fn stream(&self) -> Option<&CombinedStream> {
        self.stream.as_ref()
    }

    pub fn stop_reason(&self) -> Option<&StopReason> {
        self.stop_reason.as_ref()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn take_artifact(&mut self) -> Option<Artifact> {
        self.artifact.take()
    }

    /// Bytes collected so far
    pub fn buffered_bytes(&self) -> usize {
        self.chunks.byte_len()
    }

    /// Acquire devices and start encoding.
    ///
    /// On failure the session stays `Idle` and the error is also surfaced as
    /// a notice.
    pub async fn start(
        &mut self,
        device: &dyn CaptureDevice,
        mut encoder: Box<dyn MediaEncoder>,
        events: EventSender,
    ) -> RecordingResult<()> {
        match self.state {
            SessionState::Recording => return Err(RecordingError::AlreadyRecording),
            SessionState::Stopped => return Err(RecordingError::SessionFinished),
            SessionState::Idle if self.stream.is_some() => return Err(RecordingError::AlreadyRecording),
            SessionState::Idle => {}
        }

        tracing::info!("Starting recording session {}", self.id);

        let acquisition = match acquire(device, &self.config.capture_request()).await {
            Ok(acquisition) => acquisition,
            Err(e) => {
                self.notifier
                    .error(NoticeKind::CaptureDenied, format!("Failed to start recording: {}", e));
                return Err(e.into());
            }
        };

        match &acquisition.microphone {
            MicrophoneStatus::Granted => self
                .notifier
                .success(NoticeKind::DevicesGranted, "Screen and microphone access granted"),
            MicrophoneStatus::Denied(_) => self.notifier.warning(
                NoticeKind::MicrophoneDenied,
                "Microphone access denied, using screen audio only",
            ),
            MicrophoneStatus::Disabled => {}
        }

        let mut stream = acquisition.stream;
        if let Err(e) = encoder.start(&stream, &self.config.format, self.config.timeslice(), events.clone()) {
            stream.release();
            self.notifier
                .error(NoticeKind::EncoderFault, format!("Failed to start recording: {}", e));
            return Err(e);
        }

        if let Some(video) = stream.video_track() {
            let track = video.clone();
            let events = events.clone();
            self.watcher = Some(tokio::spawn(async move {
                track.ended().await;
                events.track_ended(track.id());
            }));
        }

        self.chunks.clear();
        self.timer.reset();
        self.stream = Some(stream);
        self.encoder = Some(encoder);
        self.state = SessionState::Recording;

        self.notifier.success(NoticeKind::RecordingStarted, "Recording started!");
        Ok(())
    }

    /// Apply one event. Returns true if the event stopped the session.
    ///
    /// Events arriving outside `Recording` are ignored.
    pub fn handle(&mut self, event: SessionEvent) -> bool {
        if self.state != SessionState::Recording {
            tracing::trace!("Ignoring {:?} in state {:?}", event, self.state);
            return false;
        }

        match event {
            SessionEvent::Chunk(data) => {
                self.chunks.push(data);
                false
            }
            SessionEvent::Tick => match self.timer.tick() {
                Tick::Elapsed(_) => false,
                Tick::LimitReached => self.stop(StopReason::MaxDuration),
            },
            SessionEvent::TrackEnded(track_id) => {
                let is_video = self
                    .stream
                    .as_ref()
                    .and_then(|s| s.video_track())
                    .is_some_and(|t| t.id() == track_id);
                if is_video {
                    self.stop(StopReason::ExternalTermination)
                } else {
                    tracing::debug!("Non-video track {} ended", track_id);
                    false
                }
            }
            SessionEvent::EncoderFault(message) => self.stop(StopReason::EncoderFault(message)),
            SessionEvent::StopRequested => self.stop(StopReason::User),
        }
    }

    /// Leave `Recording`: halt the encoder, keep its final flush, release
    /// every track and assemble the artifact.
    ///
    /// Only the first call while recording does anything; returns whether
    /// this call performed the transition.
    pub fn stop(&mut self, reason: StopReason) -> bool {
        if self.state != SessionState::Recording {
            return false;
        }
        self.state = SessionState::Stopped;

        if let Some(mut encoder) = self.encoder.take() {
            if let Some(tail) = encoder.stop() {
                self.chunks.push(tail);
            }
        }

        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }

        if let Some(stream) = self.stream.as_mut() {
            stream.release();
        }

        match &reason {
            StopReason::User => {
                self.notifier.info(NoticeKind::UserStopped, "Recording stopped")
            }
            StopReason::MaxDuration => self.notifier.warning(
                NoticeKind::MaxDurationReached,
                format!(
                    "Maximum recording time reached ({})",
                    describe_duration(self.timer.max_secs())
                ),
            ),
            StopReason::ExternalTermination => self
                .notifier
                .info(NoticeKind::ExternalTermination, "Screen sharing ended"),
            StopReason::EncoderFault(message) => self
                .notifier
                .error(NoticeKind::EncoderFault, format!("Recording failed: {}", message)),
        }

        let chunks = std::mem::take(&mut self.chunks);
        let artifact = assemble(chunks, &self.config.format, &self.config.filename_prefix, Utc::now());

        tracing::info!(
            "Recording session {} stopped ({}): {} bytes after {}s",
            self.id,
            reason,
            artifact.len(),
            self.timer.elapsed_secs()
        );

        self.artifact = Some(artifact);
        self.stop_reason = Some(reason);
        self.notifier
            .success(NoticeKind::RecordingCompleted, "Recording completed successfully!");
        true
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.take() {
            watcher.abort();
        }
        if let Some(mut encoder) = self.encoder.take() {
            encoder.stop();
        }
    }
}

/// "3 minutes", "1 minute", "90 seconds"
fn describe_duration(secs: u32) -> String {
    match (secs / 60, secs % 60) {
        (1, 0) => "1 minute".to_string(),
        (mins, 0) if mins > 0 => format!("{} minutes", mins),
        _ => format!("{} seconds", secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{SimulatedDevice, SimulatedDeviceConfig, TrackState};
    use crate::recorder::channel::{event_channel, EventReceiver};
    use crate::recorder::encoder::MediaFormat;
    use crate::recorder::events::{Notice, NoticeLevel};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Encoder that only emits what the test pushes, and counts stops
    struct ManualEncoder {
        tail: Option<Bytes>,
        stops: Arc<AtomicUsize>,
        fail_start: bool,
    }

    impl ManualEncoder {
        fn boxed(stops: &Arc<AtomicUsize>) -> Box<dyn MediaEncoder> {
            Box::new(Self {
                tail: None,
                stops: stops.clone(),
                fail_start: false,
            })
        }
    }

    impl MediaEncoder for ManualEncoder {
        fn start(
            &mut self,
            _stream: &CombinedStream,
            _format: &MediaFormat,
            _timeslice: Duration,
            _sink: EventSender,
        ) -> RecordingResult<()> {
            if self.fail_start {
                return Err(RecordingError::Encoder("unsupported codec".to_string()));
            }
            Ok(())
        }

        fn stop(&mut self) -> Option<Bytes> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.tail.take()
        }
    }

    struct Fixture {
        session: RecordingSession,
        device: SimulatedDevice,
        stops: Arc<AtomicUsize>,
        notices: broadcast::Receiver<Notice>,
        _events: EventReceiver,
        sender: EventSender,
    }

    fn fixture(device: SimulatedDeviceConfig, max_duration_secs: u32) -> Fixture {
        let notifier = Notifier::default();
        let notices = notifier.subscribe();
        let config = RecorderConfig {
            max_duration_secs,
            ..RecorderConfig::default()
        };
        let (sender, events) = event_channel();
        Fixture {
            session: RecordingSession::new(config, notifier),
            device: SimulatedDevice::new(device),
            stops: Arc::new(AtomicUsize::new(0)),
            notices,
            _events: events,
            sender,
        }
    }

    async fn started(device: SimulatedDeviceConfig, max_duration_secs: u32) -> Fixture {
        let mut f = fixture(device, max_duration_secs);
        let encoder = ManualEncoder::boxed(&f.stops);
        f.session
            .start(&f.device, encoder, f.sender.clone())
            .await
            .unwrap();
        f
    }

    fn drain(notices: &mut broadcast::Receiver<Notice>) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = notices.try_recv() {
            out.push(notice);
        }
        out
    }

    #[tokio::test]
    async fn test_start_with_display_and_microphone() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;

        assert_eq!(f.session.state(), SessionState::Recording);
        assert_eq!(f.session.elapsed_secs(), 0);
        assert_eq!(f.session.stream().unwrap().track_count(), 3);

        let kinds: Vec<_> = drain(&mut f.notices).into_iter().map(|n| n.kind).collect();
        assert_eq!(kinds, vec![NoticeKind::DevicesGranted, NoticeKind::RecordingStarted]);
    }

    #[tokio::test]
    async fn test_microphone_denied_warns_once() {
        let mut f = started(
            SimulatedDeviceConfig {
                grant_microphone: false,
                ..Default::default()
            },
            180,
        )
        .await;

        assert_eq!(f.session.state(), SessionState::Recording);
        assert_eq!(f.session.stream().unwrap().track_count(), 2);

        let notices = drain(&mut f.notices);
        let denied = notices
            .iter()
            .filter(|n| n.kind == NoticeKind::MicrophoneDenied)
            .count();
        assert_eq!(denied, 1);
        assert!(notices.iter().all(|n| n.kind != NoticeKind::DevicesGranted));
    }

    #[tokio::test]
    async fn test_capture_denied_stays_idle() {
        let mut f = fixture(
            SimulatedDeviceConfig {
                grant_display: false,
                ..Default::default()
            },
            180,
        );
        let encoder = ManualEncoder::boxed(&f.stops);
        let err = f
            .session
            .start(&f.device, encoder, f.sender.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, RecordingError::Capture(_)));
        assert_eq!(f.session.state(), SessionState::Idle);
        assert!(f.session.stream().is_none());

        let notices = drain(&mut f.notices);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::CaptureDenied);
        assert_eq!(notices[0].level, NoticeLevel::Error);
    }

    #[tokio::test]
    async fn test_encoder_start_failure_releases_tracks() {
        let mut f = fixture(SimulatedDeviceConfig::default(), 180);
        let encoder = Box::new(ManualEncoder {
            tail: None,
            stops: f.stops.clone(),
            fail_start: true,
        });
        let err = f
            .session
            .start(&f.device, encoder, f.sender.clone())
            .await
            .unwrap_err();

        assert!(matches!(err, RecordingError::Encoder(_)));
        assert_eq!(f.session.state(), SessionState::Idle);
        assert_eq!(f.device.active_tracks(), 0);
    }

    #[tokio::test]
    async fn test_explicit_stop_assembles_chunks() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;

        let sizes = [1000usize, 0, 2500, 10, 700, 4096];
        for size in sizes {
            f.session.handle(SessionEvent::Chunk(Bytes::from(vec![7u8; size])));
            f.session.handle(SessionEvent::Tick);
        }
        assert!(f.session.handle(SessionEvent::StopRequested));

        let artifact = f.session.artifact().unwrap();
        assert_eq!(artifact.len(), sizes.iter().sum::<usize>());
        assert_eq!(f.session.stop_reason(), Some(&StopReason::User));
        assert!(f.session.stream().unwrap().all_stopped());
        assert_eq!(f.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_final_flush_is_appended_last() {
        let mut f = fixture(SimulatedDeviceConfig::default(), 180);
        let encoder = Box::new(ManualEncoder {
            tail: Some(Bytes::from_static(b"tail")),
            stops: f.stops.clone(),
            fail_start: false,
        });
        f.session.start(&f.device, encoder, f.sender.clone()).await.unwrap();

        f.session.handle(SessionEvent::Chunk(Bytes::from_static(b"head-")));
        f.session.stop(StopReason::User);

        assert_eq!(f.session.artifact().unwrap().as_slice(), b"head-tail");
    }

    #[tokio::test]
    async fn test_second_stop_is_noop() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;
        f.session.handle(SessionEvent::Chunk(Bytes::from_static(b"data")));

        assert!(f.session.stop(StopReason::MaxDuration));
        let first_id = f.session.artifact().unwrap().id();
        let releases = f.device.release_count();
        drain(&mut f.notices);

        assert!(!f.session.stop(StopReason::User));
        assert!(!f.session.handle(SessionEvent::StopRequested));
        assert!(!f.session.handle(SessionEvent::EncoderFault("late".to_string())));

        assert_eq!(f.session.artifact().unwrap().id(), first_id);
        assert_eq!(f.device.release_count(), releases);
        assert_eq!(f.stops.load(Ordering::SeqCst), 1);
        assert_eq!(f.session.stop_reason(), Some(&StopReason::MaxDuration));
        assert!(drain(&mut f.notices).is_empty());
    }

    #[tokio::test]
    async fn test_chunks_after_stop_are_ignored() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;
        f.session.handle(SessionEvent::Chunk(Bytes::from_static(b"kept")));
        f.session.stop(StopReason::User);
        f.session.handle(SessionEvent::Chunk(Bytes::from_static(b"late")));

        assert_eq!(f.session.artifact().unwrap().as_slice(), b"kept");
    }

    #[tokio::test]
    async fn test_max_duration_stops_at_cap_minus_one() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;

        let mut observed = Vec::new();
        for _ in 0..500 {
            if f.session.handle(SessionEvent::Tick) {
                break;
            }
            observed.push(f.session.elapsed_secs());
        }

        assert_eq!(f.session.state(), SessionState::Stopped);
        assert_eq!(observed.len(), 179);
        assert_eq!(observed.last(), Some(&179));
        assert!(observed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(f.session.elapsed_secs(), 179);
        assert_eq!(f.session.stop_reason(), Some(&StopReason::MaxDuration));

        let notices = drain(&mut f.notices);
        let warning = notices
            .iter()
            .find(|n| n.kind == NoticeKind::MaxDurationReached)
            .unwrap();
        assert_eq!(warning.message, "Maximum recording time reached (3 minutes)");
    }

    #[tokio::test]
    async fn test_external_termination() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;
        let video_id = f.session.stream().unwrap().video_track().unwrap().id().to_string();
        drain(&mut f.notices);

        assert!(f.session.handle(SessionEvent::TrackEnded(video_id)));

        assert_eq!(f.session.stop_reason(), Some(&StopReason::ExternalTermination));
        assert!(f.session.stream().unwrap().all_stopped());

        let kinds: Vec<_> = drain(&mut f.notices).into_iter().map(|n| n.kind).collect();
        assert!(kinds.contains(&NoticeKind::ExternalTermination));
        assert!(!kinds.contains(&NoticeKind::UserStopped));
    }

    #[tokio::test]
    async fn test_audio_track_end_keeps_recording() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;
        let audio_id = f.session.stream().unwrap().audio_tracks().next().unwrap().id().to_string();

        assert!(!f.session.handle(SessionEvent::TrackEnded(audio_id)));
        assert_eq!(f.session.state(), SessionState::Recording);
    }

    #[tokio::test]
    async fn test_encoder_fault_forces_stop() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;
        f.session.handle(SessionEvent::Chunk(Bytes::from_static(b"partial")));
        drain(&mut f.notices);

        assert!(f.session.handle(SessionEvent::EncoderFault("disk full".to_string())));

        assert_eq!(f.session.state(), SessionState::Stopped);
        assert!(f.session.stream().unwrap().all_stopped());
        assert_eq!(f.session.artifact().unwrap().as_slice(), b"partial");

        let notices = drain(&mut f.notices);
        let fault = notices.iter().find(|n| n.kind == NoticeKind::EncoderFault).unwrap();
        assert_eq!(fault.level, NoticeLevel::Error);
        assert_eq!(fault.message, "Recording failed: disk full");
    }

    #[tokio::test]
    async fn test_stopped_session_cannot_restart() {
        let mut f = started(SimulatedDeviceConfig::default(), 180).await;
        f.session.stop(StopReason::User);

        let encoder = ManualEncoder::boxed(&f.stops);
        let err = f
            .session
            .start(&f.device, encoder, f.sender.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, RecordingError::SessionFinished));
    }

    #[tokio::test]
    async fn test_revoked_display_reaches_event_channel() {
        let mut f = fixture(SimulatedDeviceConfig::default(), 180);
        let (sender, mut events) = event_channel();
        let encoder = ManualEncoder::boxed(&f.stops);
        f.session.start(&f.device, encoder, sender).await.unwrap();

        f.device.revoke_display();
        let event = events.recv().await.unwrap();
        assert!(matches!(event, SessionEvent::TrackEnded(_)));

        assert!(f.session.handle(event));
        assert!(f
            .device
            .issued_tracks()
            .iter()
            .all(|t| t.state() == TrackState::Stopped));
    }

    #[test]
    fn test_describe_duration() {
        assert_eq!(describe_duration(180), "3 minutes");
        assert_eq!(describe_duration(60), "1 minute");
        assert_eq!(describe_duration(90), "90 seconds");
    }
}
