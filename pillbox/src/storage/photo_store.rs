//! Content-addressed photo storage
//!
//! Captured pill photos are stored under their SHA-256 hash, in a
//! two-level directory fan-out: hash "abcd1234..." lives at
//! "photos/ab/cd/abcd1234...". Medicines refer to them as `photo://<hash>`.

use crate::config::PHOTO_URI_SCHEME;
use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Content-addressed photo store
#[derive(Clone)]
pub struct PhotoStore {
    root: PathBuf,
}

impl PhotoStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root directory if needed
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Photo store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Store photo bytes, returns the SHA-256 hash
    pub async fn write(&self, data: &[u8]) -> Result<String> {
        let hash = hash_bytes(data);
        let path = self.path_for(&hash)?;

        if path.exists() {
            tracing::debug!("Photo already stored: {}", hash);
            return Ok(hash);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // temp file + rename so a crash never leaves a partial photo under its hash
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        fs::rename(temp_path, &path).await?;

        tracing::debug!("Stored photo: {} ({} bytes)", hash, data.len());

        Ok(hash)
    }

    pub async fn read(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.path_for(hash)?;

        if !path.exists() {
            return Err(AppError::PhotoStore(format!("Photo not found: {}", hash)));
        }

        Ok(fs::read(&path).await?)
    }

    /// Read the photo behind a `photo://` reference
    pub async fn read_uri(&self, uri: &str) -> Result<Vec<u8>> {
        let hash = hash_from_uri(uri)
            .ok_or_else(|| AppError::PhotoStore(format!("Not a photo reference: {}", uri)))?;
        self.read(hash).await
    }

    pub async fn exists(&self, hash: &str) -> bool {
        self.path_for(hash).map(|p| p.exists()).unwrap_or(false)
    }

    /// Remove a photo. Missing photos are not an error.
    pub async fn delete(&self, hash: &str) -> Result<()> {
        let path = self.path_for(hash)?;

        if !path.exists() {
            return Ok(());
        }

        fs::remove_file(&path).await?;
        tracing::debug!("Deleted photo: {}", hash);

        Ok(())
    }

    /// Hashes of every stored photo
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut hashes = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            if !dir.exists() {
                continue;
            }

            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if path.is_dir() {
                    pending.push(path);
                } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    if is_hash(name) {
                        hashes.push(name.to_string());
                    }
                }
            }
        }

        Ok(hashes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, hash: &str) -> Result<PathBuf> {
        if !is_hash(hash) {
            return Err(AppError::PhotoStore(format!("Invalid photo hash: {}", hash)));
        }
        Ok(self.root.join(&hash[0..2]).join(&hash[2..4]).join(hash))
    }
}

/// `photo://<hash>` reference for a stored photo
pub fn image_uri_for(hash: &str) -> String {
    format!("{}{}", PHOTO_URI_SCHEME, hash)
}

/// Hash part of a `photo://` reference
pub fn hash_from_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(PHOTO_URI_SCHEME).filter(|h| is_hash(h))
}

fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn is_hash(s: &str) -> bool {
    s.len() == 64 && s.chars().all(|c| c.is_ascii_hexdigit())
}
