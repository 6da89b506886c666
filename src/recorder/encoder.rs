//! Encoder contract
//!
//! An encoder records from a [`CombinedStream`] into a fixed container and
//! pushes encoded chunks through the session event channel.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::channel::{EventSender, RecordingResult};
use crate::capture::CombinedStream;

/// Fixed container/codec target of every recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaFormat {
    /// Full MIME type handed to the encoder, codecs included
    pub mime_type: String,
    /// Container type of the assembled artifact
    pub container: String,
    pub extension: String,
}

impl MediaFormat {
    pub fn webm() -> Self {
        Self {
            mime_type: "video/webm;codecs=vp9,opus".to_string(),
            container: "video/webm".to_string(),
            extension: "webm".to_string(),
        }
    }
}

impl Default for MediaFormat {
    fn default() -> Self {
        Self::webm()
    }
}

/// Chunk-producing encoder bound to one session
pub trait MediaEncoder: Send {
    /// Begin encoding, emitting a chunk through `sink` every `timeslice`.
    /// Faults are reported with [`EventSender::fault`].
    fn start(
        &mut self,
        stream: &CombinedStream,
        format: &MediaFormat,
        timeslice: Duration,
        sink: EventSender,
    ) -> RecordingResult<()>;

    /// Halt emission and return whatever was still buffered.
    /// No chunk is emitted through the sink after this returns.
    fn stop(&mut self) -> Option<Bytes>;
}

/// Builds a fresh encoder for every session
pub trait EncoderFactory: Send + Sync {
    fn create(&self) -> Box<dyn MediaEncoder>;
}

/// Settings of a [`SimulatedEncoder`]
#[derive(Debug, Clone)]
pub struct SimulatedEncoderConfig {
    /// Bytes per emitted chunk
    pub chunk_size: usize,
    /// Bytes returned by the final flush
    pub tail_size: usize,
    /// Report a fault after this many chunks
    pub fail_after: Option<usize>,
}

impl Default for SimulatedEncoderConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            tail_size: 512,
            fail_after: None,
        }
    }
}

/// Encoder emitting synthetic chunks on a timer
pub struct SimulatedEncoder {
    config: SimulatedEncoderConfig,
    task: Option<JoinHandle<()>>,
}

impl SimulatedEncoder {
    pub fn new(config: SimulatedEncoderConfig) -> Self {
        Self { config, task: None }
    }
}

impl MediaEncoder for SimulatedEncoder {
    fn start(
        &mut self,
        stream: &CombinedStream,
        format: &MediaFormat,
        timeslice: Duration,
        sink: EventSender,
    ) -> RecordingResult<()> {
        if self.task.is_some() {
            return Err(super::channel::RecordingError::AlreadyRecording);
        }

        tracing::debug!(
            "Simulated encoder started: {} ({} tracks, {:?} timeslice)",
            format.mime_type,
            stream.track_count(),
            timeslice
        );

        let config = self.config.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + timeslice, timeslice);
            let mut emitted = 0usize;

            loop {
                interval.tick().await;

                if config.fail_after == Some(emitted) {
                    sink.fault("simulated encoder failure");
                    break;
                }

                let fill = (emitted % 251) as u8;
                if !sink.chunk(vec![fill; config.chunk_size]) {
                    break;
                }
                emitted += 1;
            }
        });

        self.task = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Option<Bytes> {
        let task = self.task.take()?;
        task.abort();

        (self.config.tail_size > 0).then(|| Bytes::from(vec![0xff; self.config.tail_size]))
    }
}

impl Drop for SimulatedEncoder {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Factory for [`SimulatedEncoder`]s sharing one configuration
#[derive(Debug, Clone, Default)]
pub struct SimulatedEncoderFactory {
    pub config: SimulatedEncoderConfig,
}

impl EncoderFactory for SimulatedEncoderFactory {
    fn create(&self) -> Box<dyn MediaEncoder> {
        Box::new(SimulatedEncoder::new(self.config.clone()))
    }
}
