use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use screen_recorder::capture::{SimulatedDevice, SimulatedDeviceConfig};
use screen_recorder::recorder::{NoticeLevel, SimulatedEncoderFactory};
use screen_recorder::storage::{format_file_size, LocalRecordingStore, RecordingStore};
use screen_recorder::utils::{AppError, ErrorResponse};
use screen_recorder::{Recorder, RecorderConfig};

/// Record the screen from simulated capture devices
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// JSON recorder configuration
    #[arg(short, long, env = "SCREEN_RECORDER_CONFIG")]
    config: Option<PathBuf>,

    /// Stop after this many seconds (default: run until the time limit)
    #[arg(short, long)]
    seconds: Option<u64>,

    /// End screen sharing after this many seconds, as the OS would
    #[arg(long)]
    revoke_after: Option<u64>,

    /// Refuse microphone access
    #[arg(long)]
    deny_microphone: bool,

    /// Save the recording into this directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Upload the recording into a store at this directory
    #[arg(long, env = "SCREEN_RECORDER_STORE")]
    store_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    screen_recorder::init_logging();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RecorderConfig::load(path).map_err(report)?,
        None => RecorderConfig::default(),
    };

    let device = Arc::new(SimulatedDevice::new(SimulatedDeviceConfig {
        grant_microphone: !args.deny_microphone,
        ..Default::default()
    }));
    let mut recorder = Recorder::new(config, device.clone(), Arc::new(SimulatedEncoderFactory::default()));

    let mut notices = recorder.subscribe();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            let tag = match notice.level {
                NoticeLevel::Info => "info",
                NoticeLevel::Success => "ok",
                NoticeLevel::Warning => "warn",
                NoticeLevel::Error => "error",
            };
            println!("[{}] {}", tag, notice.message);
        }
    });

    recorder.start().await.map_err(|e| report(e.into()))?;

    if let Some(secs) = args.revoke_after {
        let device = device.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            device.revoke_display();
        });
    }

    let artifact = match args.seconds {
        Some(secs) => {
            let mut status = recorder.watch_status();
            let deadline = tokio::time::sleep(Duration::from_secs(secs));
            tokio::pin!(deadline);
            loop {
                tokio::select! {
                    _ = &mut deadline => break,
                    changed = status.changed() => {
                        if changed.is_err() || !recorder.is_recording() {
                            break;
                        }
                        println!("{}", recorder.clock_display());
                    }
                }
            }
            recorder.stop().await
        }
        None => recorder.wait().await,
    }
    .map_err(|e| report(e.into()))?
    .context("recording produced no artifact")?;

    println!(
        "{} ({}, {})",
        artifact.filename(),
        format_file_size(artifact.len() as u64),
        recorder
            .last_stop_reason()
            .map(|r| r.to_string())
            .unwrap_or_default()
    );

    if let Some(dir) = &args.output_dir {
        let path = recorder.save_local(dir).await.map_err(|e| report(e.into()))?;
        println!("Saved to {}", path.display());
    }

    if let Some(dir) = &args.store_dir {
        let store = LocalRecordingStore::open(dir).await.map_err(|e| report(e.into()))?;
        recorder.upload(&store).await.map_err(|e| report(e.into()))?;

        for record in store.list().await.map_err(|e| report(e.into()))? {
            println!(
                "{}  {}  {}  {}",
                record.id,
                record.filename,
                format_file_size(record.filesize),
                record.created_at.to_rfc3339()
            );
        }
    }

    Ok(())
}

/// Print the error as a JSON error response and hand it on to anyhow.
fn report(error: AppError) -> anyhow::Error {
    let message = error.to_string();
    let response = ErrorResponse::from(error);
    match serde_json::to_string(&response) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}: {}", response.code, response.message),
    }
    anyhow::anyhow!(message)
}
