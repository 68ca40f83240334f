//! Persisted set of fully processed video ids.
//!
//! This is the at-most-once guard across restarts: an id present here is
//! never re-downloaded or re-delivered. The set is append-only during normal
//! operation and persisted synchronously on every mark, so a crash right
//! after a successful delivery cannot lose the mark. A crash *before* the
//! mark completes re-processes the item on the next pass (accepted
//! at-least-once edge).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::youtube::LikedVideo;

pub struct ProcessedSet {
    path: PathBuf,
    /// Insertion order, mirrored on disk as a JSON array
    ids: Vec<String>,
    index: HashSet<String>,
}

impl ProcessedSet {
    /// Load the set from disk; a missing file is an empty set.
    ///
    /// An unparseable file is an error: starting empty would silently
    /// re-deliver everything the set was guarding.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let ids: Vec<String> = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read processed set: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse processed set: {}", path.display()))?
        } else {
            Vec::new()
        };

        let index = ids.iter().cloned().collect();
        Ok(Self { path, ids, index })
    }

    /// Filter a listing down to ids not yet processed, preserving input order
    pub fn filter_new<'a>(&self, videos: &'a [LikedVideo]) -> Vec<&'a LikedVideo> {
        videos
            .iter()
            .filter(|video| !self.index.contains(&video.id))
            .collect()
    }

    /// Record an id as fully processed.
    ///
    /// Idempotent: an already-present id is a no-op (no file rewrite). The
    /// updated set is persisted before this returns; a write failure is an
    /// error and the in-memory set is left unchanged.
    pub fn mark(&mut self, id: &str) -> Result<()> {
        if self.index.contains(id) {
            return Ok(());
        }

        self.ids.push(id.to_string());
        if let Err(e) = self.persist() {
            self.ids.pop();
            return Err(e);
        }
        self.index.insert(id.to_string());

        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create state dir: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(&self.ids)?;
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write processed set: {}", self.path.display()))
    }
}
