//! In-memory repository for medicines and alarms
//!
//! The store is the single source of truth for the lifetime of the process.
//! It performs no locking of its own: every mutation takes `&mut self`, so
//! callers serialize access (see `AppState`). Lookups that miss return
//! `None`/`false`, never an error.

use super::models::*;
use chrono::Utc;
use std::collections::HashSet;

/// Repository holding both collections in insertion order
#[derive(Debug, Default)]
pub struct MedicineRepository {
    medicines: Vec<Medicine>,
    alarms: Vec<Alarm>,
}

impl MedicineRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a repository from previously saved records.
    ///
    /// Duplicate ids keep the first record. Alarms pointing at a medicine
    /// that is not present are dropped.
    pub fn from_parts(medicines: Vec<Medicine>, alarms: Vec<Alarm>) -> Self {
        let mut seen_medicines = HashSet::new();
        let medicines: Vec<Medicine> = medicines
            .into_iter()
            .filter(|m| {
                let fresh = seen_medicines.insert(m.id);
                if !fresh {
                    tracing::warn!("Skipping duplicate medicine record: {}", m.id);
                }
                fresh
            })
            .collect();

        let mut seen_alarms = HashSet::new();
        let alarms = alarms
            .into_iter()
            .filter(|a| {
                if !seen_medicines.contains(&a.medicine_id) {
                    tracing::warn!("Skipping alarm {} for missing medicine {}", a.id, a.medicine_id);
                    return false;
                }
                let fresh = seen_alarms.insert(a.id);
                if !fresh {
                    tracing::warn!("Skipping duplicate alarm record: {}", a.id);
                }
                fresh
            })
            .collect();

        Self { medicines, alarms }
    }

    pub fn into_parts(self) -> (Vec<Medicine>, Vec<Alarm>) {
        (self.medicines, self.alarms)
    }

    // ===== Medicines =====

    /// Store a new medicine under a freshly assigned id
    pub fn add_medicine(&mut self, req: NewMedicine) -> Medicine {
        let medicine = Medicine {
            id: MedicineId::generate(),
            name: req.name,
            category: req.category,
            manufacturer: req.manufacturer,
            main_ingredient: req.main_ingredient,
            description: req.description,
            image_uri: req.image_uri,
            created_at: Utc::now(),
            active: req.active,
        };

        self.medicines.push(medicine.clone());

        tracing::debug!("Added medicine: {}", medicine.id);
        medicine
    }

    pub fn get_all_medicines(&self) -> Vec<Medicine> {
        self.medicines.clone()
    }

    pub fn get_medicines_by_category(&self, filter: CategoryFilter) -> Vec<Medicine> {
        self.medicines
            .iter()
            .filter(|m| filter.matches(m.category))
            .cloned()
            .collect()
    }

    pub fn get_medicine_by_id(&self, id: MedicineId) -> Option<Medicine> {
        self.medicines.iter().find(|m| m.id == id).cloned()
    }

    /// Replace the medicine with the same id. Returns `false` if there is none.
    pub fn update_medicine(&mut self, medicine: Medicine) -> bool {
        match self.medicines.iter_mut().find(|m| m.id == medicine.id) {
            Some(slot) => {
                tracing::debug!("Updated medicine: {}", medicine.id);
                *slot = medicine;
                true
            }
            None => false,
        }
    }

    /// Remove a medicine together with all of its alarms
    pub fn delete_medicine(&mut self, id: MedicineId) -> bool {
        let before = self.medicines.len();
        self.medicines.retain(|m| m.id != id);
        if self.medicines.len() == before {
            return false;
        }

        let alarms_before = self.alarms.len();
        self.alarms.retain(|a| a.medicine_id != id);

        tracing::debug!(
            "Deleted medicine: {} ({} alarms removed)",
            id,
            alarms_before - self.alarms.len()
        );
        true
    }

    // ===== Alarms =====

    /// Store a new alarm under a freshly assigned id.
    ///
    /// The owning medicine is not checked here; `AlarmsService` does that.
    pub fn add_alarm(&mut self, req: NewAlarm) -> Alarm {
        let alarm = Alarm {
            id: AlarmId::generate(),
            medicine_id: req.medicine_id,
            medicine_name: req.medicine_name,
            time: req.time,
            days: req.days,
            sound_enabled: req.sound_enabled,
            vibration_enabled: req.vibration_enabled,
            enabled: req.enabled,
            created_at: Utc::now(),
        };

        self.alarms.push(alarm.clone());

        tracing::debug!("Added alarm: {} for medicine: {}", alarm.id, alarm.medicine_id);
        alarm
    }

    pub fn get_all_alarms(&self) -> Vec<Alarm> {
        self.alarms.clone()
    }

    pub fn get_alarm_by_id(&self, id: AlarmId) -> Option<Alarm> {
        self.alarms.iter().find(|a| a.id == id).cloned()
    }

    pub fn get_alarms_by_medicine(&self, medicine_id: MedicineId) -> Vec<Alarm> {
        self.alarms
            .iter()
            .filter(|a| a.medicine_id == medicine_id)
            .cloned()
            .collect()
    }

    /// Replace the alarm with the same id. Returns `false` if there is none.
    pub fn update_alarm(&mut self, alarm: Alarm) -> bool {
        match self.alarms.iter_mut().find(|a| a.id == alarm.id) {
            Some(slot) => {
                tracing::debug!("Updated alarm: {}", alarm.id);
                *slot = alarm;
                true
            }
            None => false,
        }
    }

    pub fn delete_alarm(&mut self, id: AlarmId) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|a| a.id != id);
        let removed = self.alarms.len() != before;
        if removed {
            tracing::debug!("Deleted alarm: {}", id);
        }
        removed
    }

    /// Alarms whose enabled flag is set
    pub fn get_active_alarms(&self) -> Vec<Alarm> {
        self.alarms.iter().filter(|a| a.enabled).cloned().collect()
    }

    /// Flip the enabled flag, returning the new value
    pub fn toggle_alarm_enabled(&mut self, id: AlarmId) -> Option<bool> {
        let alarm = self.alarms.iter_mut().find(|a| a.id == id)?;
        alarm.enabled = !alarm.enabled;
        tracing::debug!("Toggled alarm {} -> enabled={}", id, alarm.enabled);
        Some(alarm.enabled)
    }
}
