//! Persisted cache of the last successful liked-videos listing.
//!
//! The cache serves two purposes: it short-circuits a fetch entirely while
//! the entry is fresh, and it is the degraded-mode data source when the
//! catalog service reports quota exhaustion (served regardless of age in
//! that case). A failed fetch never touches the stored entry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::api::LikedVideo;

/// The stored listing plus its fetch time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedListing {
    pub fetched_at: DateTime<Utc>,
    pub videos: Vec<LikedVideo>,
}

/// File-backed response cache, replaced wholesale on every store
pub struct ResponseCache {
    path: PathBuf,
    ttl: Duration,
    entry: Option<CachedListing>,
}

impl ResponseCache {
    /// Load the cache file if present.
    ///
    /// An unparseable file is logged and treated as empty rather than
    /// blocking startup; it will be overwritten by the next successful fetch.
    pub fn load(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let entry = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(listing) => Some(listing),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring unparseable cache file");
                    None
                }
            },
            Err(_) => None,
        };

        Self { path, ttl, entry }
    }

    /// The stored listing, only while younger than the TTL
    pub fn fresh(&self) -> Option<&CachedListing> {
        self.entry.as_ref().filter(|listing| !self.is_expired(listing))
    }

    /// The stored listing regardless of age. Quota-fallback path only.
    pub fn stale(&self) -> Option<&CachedListing> {
        self.entry.as_ref()
    }

    /// Replace the stored listing with a new fetch.
    ///
    /// The file is written before memory is updated, so a write failure
    /// leaves the previous entry intact.
    pub fn store(&mut self, videos: Vec<LikedVideo>) -> Result<()> {
        let listing = CachedListing {
            fetched_at: Utc::now(),
            videos,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create cache dir: {}", parent.display()))?;
        }

        let content = serde_json::to_string_pretty(&listing)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write cache file: {}", self.path.display()))?;

        self.entry = Some(listing);
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_expired(&self, listing: &CachedListing) -> bool {
        Utc::now()
            .signed_duration_since(listing.fetched_at)
            .to_std()
            .map(|age| age >= self.ttl)
            // A future fetched_at means a clock step backwards; treat as fresh
            .unwrap_or(false)
    }
}
