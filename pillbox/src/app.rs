//! Application state and initialization
//!
//! This module manages the central application state and lifecycle.
//! All services are built here around one shared repository and made
//! available through AppState. Nothing is global: tests build as many
//! independent states as they like.

use crate::config::{DATA_DIR_ENV, PHOTOS_DIR_NAME};
use crate::detection::{AnalysisWorker, Frame, Identification};
use crate::error::{AppError, Result};
use crate::services::{AlarmsService, MedicineService, SettingsService, SnapshotService};
use crate::storage::PhotoStore;
use crate::store::{self, Medicine, SharedRepository};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub repo: SharedRepository,
    pub medicines: MedicineService,
    pub alarms: AlarmsService,
    pub settings: SettingsService,
    pub snapshots: SnapshotService,
    pub photos: PhotoStore,
}

impl AppState {
    /// Prepare the data directory and restore the last saved records
    pub async fn initialize(data_dir: PathBuf) -> Result<Self> {
        tracing::info!("Initializing application");
        tracing::info!("App data directory: {:?}", data_dir);

        tokio::fs::create_dir_all(&data_dir).await?;

        let photos = PhotoStore::new(data_dir.join(PHOTOS_DIR_NAME));
        photos.initialize().await?;

        let settings = SettingsService::new(data_dir.clone());
        let loaded = settings.load().await?;
        tracing::debug!("Loaded settings: {:?}", loaded);

        let snapshots = SnapshotService::new(&data_dir);
        let repo = store::shared(snapshots.load().await?);

        let medicines = MedicineService::new(repo.clone(), photos.clone());
        let alarms = AlarmsService::new(repo.clone(), settings.clone());

        tracing::info!("Application initialized successfully");

        Ok(Self {
            data_dir,
            repo,
            medicines,
            alarms,
            settings,
            snapshots,
            photos,
        })
    }

    /// Persist the current records
    pub async fn save_snapshot(&self) -> Result<()> {
        let repo = self.repo.read().await;
        self.snapshots.save(&repo).await
    }

    /// Identify each captured image file and add it to the medicine list.
    ///
    /// A file that cannot be read, decoded or stored is logged and skipped;
    /// the rest are still imported. Stops early if the worker has stopped.
    pub async fn import_captures(
        &self,
        worker: &AnalysisWorker,
        results: &mut mpsc::Receiver<Identification>,
        paths: &[PathBuf],
    ) -> Vec<Medicine> {
        let mut added = Vec::new();

        for path in paths {
            match self.import_capture(worker, results, path).await {
                Ok(medicine) => added.push(medicine),
                Err(AppError::Detection(e)) => {
                    tracing::error!("Stopping import: {}", e);
                    break;
                }
                Err(e) => tracing::warn!("Skipping {:?}: {}", path, e),
            }
        }

        added
    }

    async fn import_capture(
        &self,
        worker: &AnalysisWorker,
        results: &mut mpsc::Receiver<Identification>,
        path: &Path,
    ) -> Result<Medicine> {
        let bytes = tokio::fs::read(path).await?;
        let frame = Frame::from_encoded(&bytes)?;

        let stopped = || AppError::Detection("analysis worker stopped".to_string());
        if !worker.submit(frame) {
            return Err(stopped());
        }
        let identification = results.recv().await.ok_or_else(stopped)?;

        tracing::info!(
            "{:?}: {} ({:?}, confidence {:.2})",
            path,
            identification.entry.name,
            identification.outcome,
            identification.confidence
        );

        self.medicines
            .add_identified(&identification, Some(bytes.as_slice()))
            .await
    }
}

/// Where application data lives: `PILLBOX_DATA_DIR` if set, otherwise the
/// platform data directory.
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    match ProjectDirs::from("org", "Pillbox", "Pillbox") {
        Some(dirs) => dirs.data_dir().to_path_buf(),
        None => {
            tracing::warn!("No home directory found, using ./data");
            Path::new("data").to_path_buf()
        }
    }
}
