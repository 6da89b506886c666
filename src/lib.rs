//! Screen Recorder - capture the screen and microphone into a video.
//!
//! This is the library crate for the recording session manager. It acquires
//! the capture devices, drives the record/stop/time-limit state machine,
//! assembles encoded chunks into a finished recording and hands it off for
//! local save or upload.

pub mod capture;
pub mod config;
pub mod delivery;
pub mod recorder;
pub mod storage;
pub mod utils;

pub use config::RecorderConfig;
pub use recorder::Recorder;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. `RUST_LOG` overrides the default filter.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "screen_recorder=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Screen Recorder v{}", env!("CARGO_PKG_VERSION"));
}
