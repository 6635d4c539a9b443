//! Frame analysis worker
//!
//! One background task serves a single-slot mailbox. Submitting a frame
//! overwrites whatever frame is still waiting, so a slow detector never
//! builds a backlog: at most one inference runs, and the newest frame is
//! the next one analysed.

use super::{analyze, Detector, DetectorOptions, FallbackReason, Frame, Identification};
use crate::config::IDENTIFICATION_CHANNEL_CAPACITY;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Handle to the running analysis task
pub struct AnalysisWorker {
    slot: watch::Sender<Option<Arc<Frame>>>,
    handle: JoinHandle<()>,
}

impl AnalysisWorker {
    /// Start the worker. Identifications arrive on the returned receiver.
    pub fn spawn(
        detector: Arc<dyn Detector>,
        options: DetectorOptions,
    ) -> (Self, mpsc::Receiver<Identification>) {
        let (slot_tx, slot_rx) = watch::channel(None);
        let (result_tx, result_rx) = mpsc::channel(IDENTIFICATION_CHANNEL_CAPACITY);

        let handle = tokio::spawn(run(slot_rx, detector, options, result_tx));

        (
            Self {
                slot: slot_tx,
                handle,
            },
            result_rx,
        )
    }

    /// Offer a frame for analysis without waiting.
    ///
    /// Returns `false` once the worker has stopped.
    pub fn submit(&self, frame: Frame) -> bool {
        if self.slot.is_closed() {
            tracing::debug!("Analysis worker stopped, frame discarded");
            return false;
        }
        self.slot.send_replace(Some(Arc::new(frame)));
        true
    }

    /// Stop accepting frames and wait for the worker to exit.
    ///
    /// The frame under analysis is finished first. There is no timeout: a
    /// detector call that never returns keeps this waiting.
    pub async fn shutdown(self) {
        let Self { slot, handle } = self;
        drop(slot);

        if let Err(e) = handle.await {
            tracing::error!("Analysis worker ended abnormally: {}", e);
        }
    }
}

async fn run(
    mut slot: watch::Receiver<Option<Arc<Frame>>>,
    detector: Arc<dyn Detector>,
    options: DetectorOptions,
    results: mpsc::Sender<Identification>,
) {
    tracing::info!("Frame analysis worker started");

    while slot.changed().await.is_ok() {
        let next = slot.borrow_and_update().clone();
        let Some(frame) = next else {
            continue;
        };

        let detector = Arc::clone(&detector);
        let identification =
            match tokio::task::spawn_blocking(move || analyze(detector.as_ref(), &options, &frame))
                .await
            {
                Ok(identification) => identification,
                Err(e) => {
                    tracing::error!("Detector task failed: {}", e);
                    Identification::fallback(FallbackReason::DetectorFailed)
                }
            };

        if results.send(identification).await.is_err() {
            tracing::debug!("Identification receiver dropped");
            break;
        }
    }

    tracing::info!("Frame analysis worker stopped");
}
