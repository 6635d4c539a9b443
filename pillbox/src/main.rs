// Pillbox - pill photo identification and dosage alarms
// Headless entry point: identify the images given on the command line,
// then keep ringing alarms until Ctrl-C.

use anyhow::Context;
use pillbox::app::{resolve_data_dir, AppState};
use pillbox::detection::{AnalysisWorker, DetectorOptions, UnavailableDetector};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pillbox=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Pillbox");

    let state = AppState::initialize(resolve_data_dir())
        .await
        .context("failed to initialize application state")?;

    let mut alarm_events = state.alarms.subscribe().await;
    state.alarms.clone().start_scheduler();

    let (worker, mut identifications) =
        AnalysisWorker::spawn(Arc::new(UnavailableDetector), DetectorOptions::default());

    let paths: Vec<PathBuf> = std::env::args_os().skip(1).map(PathBuf::from).collect();
    if !paths.is_empty() {
        let added = state
            .import_captures(&worker, &mut identifications, &paths)
            .await;
        tracing::info!("Added {} of {} captures to the medicine list", added.len(), paths.len());
    }

    if let Some((alarm, at)) = state
        .alarms
        .next_due(chrono::Local::now().naive_local())
        .await
    {
        tracing::info!("Next alarm: {} at {}", alarm.medicine_name, at);
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            Some(event) = alarm_events.recv() => {
                tracing::info!(
                    "Time to take {} ({}) sound={} vibration={}",
                    event.medicine_name,
                    event.time,
                    event.sound,
                    event.vibration
                );
            }
        }
    }

    tracing::info!("Shutting down");
    worker.shutdown().await;
    state.save_snapshot().await?;

    Ok(())
}
