//! Application configuration constants
//!
//! Central location for detector defaults, scheduler timing,
//! and on-disk file names used throughout the application.

// ===== Detection =====

/// Maximum number of detections kept per frame
pub const DETECTOR_MAX_RESULTS: usize = 5;

/// Detections scoring below this are discarded before identification
pub const DETECTOR_SCORE_THRESHOLD: f32 = 0.5;

/// Identifications at or below this confidence should prompt a retake
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.8;

// ===== Alarm Scheduler =====

/// Interval between scheduler checks in seconds.
/// Alarms are minute-granular, so anything under a minute is enough.
pub const SCHEDULER_TICK_SECS: u64 = 30;

/// Longest stretch of missed minutes replayed after a late tick
pub const SCHEDULER_MAX_CATCH_UP_MINUTES: i64 = 60;

/// Capacity of the alarm event channel
pub const ALARM_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Capacity of the identification result channel
pub const IDENTIFICATION_CHANNEL_CAPACITY: usize = 16;

// ===== Files and Directories =====

/// Settings file name inside the data directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Snapshot file name inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "pillbox.json";

/// Directory holding captured photos
pub const PHOTOS_DIR_NAME: &str = "photos";

/// URI scheme used for photo references stored on medicines
pub const PHOTO_URI_SCHEME: &str = "photo://";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "PILLBOX_DATA_DIR";

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;
