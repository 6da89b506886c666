//! Recorder configuration
//!
//! Loaded from a JSON file; every field has a default so partial files work.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::capture::{AudioConstraints, CaptureRequest, VideoConstraints};
use crate::recorder::encoder::MediaFormat;
use crate::utils::error::{AppError, AppResult};

/// Settings for recording sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Hard cap on a recording, in seconds
    pub max_duration_secs: u32,

    /// How often the encoder emits a chunk
    pub timeslice_ms: u64,

    /// Period of the elapsed-time clock
    pub tick_ms: u64,

    pub video: VideoConstraints,

    pub audio: AudioConstraints,

    /// Request screen audio along with the display
    pub capture_display_audio: bool,

    pub capture_microphone: bool,

    pub format: MediaFormat,

    /// Artifact filenames are `<prefix>-<timestamp>.<ext>`
    pub filename_prefix: String,

    /// Buffered notices per subscriber
    pub notice_capacity: usize,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: 180,
            timeslice_ms: 1000,
            tick_ms: 1000,
            video: VideoConstraints::default(),
            audio: AudioConstraints::default(),
            capture_display_audio: true,
            capture_microphone: true,
            format: MediaFormat::webm(),
            filename_prefix: "screen-recording".to_string(),
            notice_capacity: 100,
        }
    }
}

impl RecorderConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;

        tracing::debug!("Loaded recorder config from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.max_duration_secs == 0 {
            return Err(AppError::Config("maxDurationSecs must be greater than 0".to_string()));
        }
        if self.timeslice_ms == 0 || self.tick_ms == 0 {
            return Err(AppError::Config("timesliceMs and tickMs must be greater than 0".to_string()));
        }
        if self.filename_prefix.trim().is_empty() {
            return Err(AppError::Config("filenamePrefix must not be empty".to_string()));
        }
        if self.notice_capacity == 0 {
            return Err(AppError::Config("noticeCapacity must be greater than 0".to_string()));
        }
        Ok(())
    }

    pub fn capture_request(&self) -> CaptureRequest {
        CaptureRequest {
            video: self.video.clone(),
            audio: self.audio.clone(),
            display_audio: self.capture_display_audio,
            microphone: self.capture_microphone,
        }
    }

    pub fn timeslice(&self) -> Duration {
        Duration::from_millis(self.timeslice_ms)
    }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = RecorderConfig::default();
        assert_eq!(config.max_duration_secs, 180);
        assert_eq!(config.timeslice(), Duration::from_secs(1));
        assert_eq!(config.format.mime_type, "video/webm;codecs=vp9,opus");
        assert_eq!(config.audio.sample_rate, 44_100);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(&path, r#"{ "maxDurationSecs": 60, "captureMicrophone": false }"#).unwrap();

        let config = RecorderConfig::load(&path).unwrap();

        assert_eq!(config.max_duration_secs, 60);
        assert!(!config.capture_microphone);
        assert_eq!(config.filename_prefix, "screen-recording");
        assert!(!config.capture_request().microphone);
    }

    #[test]
    fn test_rejects_zero_duration() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("recorder.json");
        std::fs::write(&path, r#"{ "maxDurationSecs": 0 }"#).unwrap();

        assert!(matches!(RecorderConfig::load(&path), Err(AppError::Config(_))));
    }
}
