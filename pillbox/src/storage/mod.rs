//! Storage module
//!
//! Provides on-disk storage for captured photos.

pub mod photo_store;

pub use photo_store::{hash_from_uri, image_uri_for, PhotoStore};
