//! Store module
//!
//! This module provides the in-memory record store:
//! - Model definitions (medicines, alarms, categories, weekdays)
//! - Repository layer for CRUD operations and cascade delete

pub mod models;
pub mod repository;

pub use models::*;
pub use repository::MedicineRepository;

use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the one repository of a running application.
///
/// Every repository call happens under a single lock acquisition, which is
/// what makes a cascade delete atomic for other callers.
pub type SharedRepository = Arc<RwLock<MedicineRepository>>;

pub fn shared(repo: MedicineRepository) -> SharedRepository {
    Arc::new(RwLock::new(repo))
}
