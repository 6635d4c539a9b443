//! Services module
//!
//! Business logic services that coordinate between callers and the store.

pub mod alarms;
pub mod medicines;
pub mod settings;
pub mod snapshot;

pub use alarms::{due_alarms, AlarmEvent, AlarmsService};
pub use medicines::MedicineService;
pub use settings::{AlarmSettings, AppSettings, DisplaySettings, SettingsService, TextSize};
pub use snapshot::{Snapshot, SnapshotService};
