//! Pillbox library
//!
//! This library exposes the core functionality of Pillbox: the medicine and
//! alarm store, pill identification from captured frames, and the services
//! a presentation layer drives.

pub mod app;
pub mod config;
pub mod detection;
pub mod error;
pub mod services;
pub mod storage;
pub mod store;
