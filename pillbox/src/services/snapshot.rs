//! Snapshot service
//!
//! Optional durability around the in-memory store: the whole repository is
//! loaded once at startup and saved as one JSON document. The repository's
//! own contract does not change.

use crate::config::{SNAPSHOT_FILE_NAME, SNAPSHOT_VERSION};
use crate::error::{AppError, Result};
use crate::store::{Alarm, Medicine, MedicineRepository};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// On-disk snapshot layout
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub medicines: Vec<Medicine>,
    pub alarms: Vec<Alarm>,
}

#[derive(Clone)]
pub struct SnapshotService {
    path: PathBuf,
}

impl SnapshotService {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SNAPSHOT_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved repository, or an empty one if nothing was saved yet
    pub async fn load(&self) -> Result<MedicineRepository> {
        if !self.path.exists() {
            tracing::info!("No snapshot at {:?}, starting with an empty store", self.path);
            return Ok(MedicineRepository::new());
        }

        let content = fs::read_to_string(&self.path).await?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        if snapshot.version > SNAPSHOT_VERSION {
            return Err(AppError::Snapshot(format!(
                "Snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        tracing::info!(
            "Loaded snapshot from {}: {} medicines, {} alarms",
            snapshot.saved_at,
            snapshot.medicines.len(),
            snapshot.alarms.len()
        );

        Ok(MedicineRepository::from_parts(snapshot.medicines, snapshot.alarms))
    }

    /// Write every record to disk, replacing the previous snapshot
    pub async fn save(&self, repo: &MedicineRepository) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            medicines: repo.get_all_medicines(),
            alarms: repo.get_all_alarms(),
        };
        let content = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, content).await?;
        fs::rename(&temp_path, &self.path).await?;

        tracing::info!(
            "Saved snapshot: {} medicines, {} alarms",
            snapshot.medicines.len(),
            snapshot.alarms.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{AlarmDay, MedicineCategory, NewAlarm, NewMedicine};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_snapshot_loads_empty_store() {
        let temp = TempDir::new().unwrap();
        let service = SnapshotService::new(temp.path());

        let repo = service.load().await.unwrap();
        assert!(repo.get_all_medicines().is_empty());
        assert!(repo.get_all_alarms().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_preserves_records() {
        let temp = TempDir::new().unwrap();
        let service = SnapshotService::new(temp.path());

        let mut repo = MedicineRepository::new();
        let m = repo.add_medicine(NewMedicine::new("Centrum Multivitamin", MedicineCategory::Supplement));
        let alarm = repo.add_alarm(NewAlarm {
            medicine_id: m.id,
            medicine_name: m.name.clone(),
            time: "19:30".to_string(),
            days: AlarmDay::every_day(),
            sound_enabled: true,
            vibration_enabled: false,
            enabled: false,
        });

        service.save(&repo).await.unwrap();
        let loaded = service.load().await.unwrap();

        assert_eq!(loaded.get_all_medicines(), vec![m]);
        assert_eq!(loaded.get_all_alarms(), vec![alarm]);
        assert!(!service.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_newer_version_is_rejected() {
        let temp = TempDir::new().unwrap();
        let service = SnapshotService::new(temp.path());

        let future = serde_json::json!({
            "version": SNAPSHOT_VERSION + 1,
            "saved_at": Utc::now(),
            "medicines": [],
            "alarms": [],
        });
        std::fs::write(service.path(), future.to_string()).unwrap();

        assert!(matches!(service.load().await, Err(AppError::Snapshot(_))));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_an_error() {
        let temp = TempDir::new().unwrap();
        let service = SnapshotService::new(temp.path());
        std::fs::write(service.path(), "{ not json").unwrap();

        assert!(matches!(service.load().await, Err(AppError::Serialization(_))));
    }
}
