//! Combined capture stream
//!
//! Merges the display and microphone streams into the single set of tracks
//! the encoder records from.

use super::traits::{DeviceStream, MediaTrack, TrackKind, TrackState};

/// Merged display + microphone tracks owned by one recording session
#[derive(Debug)]
pub struct CombinedStream {
    tracks: Vec<MediaTrack>,
    released: bool,
}

impl CombinedStream {
    /// Merge display video, display audio and microphone audio.
    ///
    /// Only the first display video track is kept; any extra video track is
    /// released immediately. Microphone video tracks are ignored the same way.
    pub fn merge(display: DeviceStream, microphone: Option<DeviceStream>) -> Self {
        let mut tracks = Vec::with_capacity(display.tracks.len() + 1);
        let mut has_video = false;

        for track in display.tracks {
            match track.kind() {
                TrackKind::Video if has_video => {
                    tracing::warn!("Dropping extra display video track {}", track.id());
                    track.stop();
                }
                TrackKind::Video => {
                    has_video = true;
                    tracks.push(track);
                }
                TrackKind::Audio => tracks.push(track),
            }
        }

        if let Some(microphone) = microphone {
            for track in microphone.tracks {
                if track.kind() == TrackKind::Audio {
                    tracks.push(track);
                } else {
                    track.stop();
                }
            }
        }

        Self {
            tracks,
            released: false,
        }
    }

    pub fn tracks(&self) -> &[MediaTrack] {
        &self.tracks
    }

    pub fn video_track(&self) -> Option<&MediaTrack> {
        self.tracks.iter().find(|t| t.kind() == TrackKind::Video)
    }

    pub fn audio_tracks(&self) -> impl Iterator<Item = &MediaTrack> {
        self.tracks.iter().filter(|t| t.kind() == TrackKind::Audio)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop every track. Only the first call has any effect; returns the
    /// number of tracks stopped by this call.
    pub fn release(&mut self) -> usize {
        if self.released {
            return 0;
        }
        self.released = true;

        let stopped = self.tracks.iter().filter(|t| t.stop()).count();
        tracing::debug!("Released combined stream ({} tracks stopped)", stopped);
        stopped
    }

    pub fn all_stopped(&self) -> bool {
        self.tracks.iter().all(|t| t.state() == TrackState::Stopped)
    }
}

impl Drop for CombinedStream {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::traits::{TrackControl, TrackSource};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl TrackControl for Counter {
        fn stop(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn track(kind: TrackKind, source: TrackSource, counter: &Arc<Counter>) -> MediaTrack {
        MediaTrack::new(kind, source, "test", counter.clone())
    }

    #[test]
    fn test_merge_display_and_microphone() {
        let counter = Arc::new(Counter::default());
        let display = DeviceStream::new(vec![
            track(TrackKind::Video, TrackSource::Display, &counter),
            track(TrackKind::Audio, TrackSource::Display, &counter),
        ]);
        let mic = DeviceStream::new(vec![track(TrackKind::Audio, TrackSource::Microphone, &counter)]);

        let stream = CombinedStream::merge(display, Some(mic));

        assert_eq!(stream.track_count(), 3);
        assert!(stream.video_track().is_some());
        assert_eq!(stream.audio_tracks().count(), 2);
    }

    #[test]
    fn test_merge_keeps_single_video_track() {
        let counter = Arc::new(Counter::default());
        let extra = track(TrackKind::Video, TrackSource::Display, &counter);
        let display = DeviceStream::new(vec![
            track(TrackKind::Video, TrackSource::Display, &counter),
            extra.clone(),
        ]);

        let stream = CombinedStream::merge(display, None);

        assert_eq!(stream.track_count(), 1);
        assert_eq!(extra.state(), TrackState::Stopped);
    }

    #[test]
    fn test_release_is_idempotent() {
        let counter = Arc::new(Counter::default());
        let display = DeviceStream::new(vec![
            track(TrackKind::Video, TrackSource::Display, &counter),
            track(TrackKind::Audio, TrackSource::Display, &counter),
        ]);
        let mut stream = CombinedStream::merge(display, None);

        assert_eq!(stream.release(), 2);
        assert_eq!(stream.release(), 0);
        assert!(stream.all_stopped());
        drop(stream);
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }
}
