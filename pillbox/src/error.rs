//! Error types for Pillbox
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized for a presentation layer.

use crate::store::{AlarmId, MedicineId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Medicine not found: {0}")]
    MedicineNotFound(MedicineId),

    #[error("Alarm not found: {0}")]
    AlarmNotFound(AlarmId),

    #[error("Invalid alarm time: {0:?}")]
    InvalidAlarmTime(String),

    #[error("Detection error: {0}")]
    Detection(String),

    #[error("Photo store error: {0}")]
    PhotoStore(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
