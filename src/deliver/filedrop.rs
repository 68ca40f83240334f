//! File-drop transport: copy the artifact into a shared watch directory.
//!
//! The analyzer polls that directory on its own schedule; its behavior is
//! out of scope here. A sidecar metadata document with the artifact's base
//! name makes the pair self-describing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::DeliveryMetadata;

pub struct FileDropSink {
    watch_dir: PathBuf,
}

impl FileDropSink {
    pub fn new(watch_dir: impl Into<PathBuf>) -> Self {
        Self {
            watch_dir: watch_dir.into(),
        }
    }

    pub async fn send(&self, audio_path: &Path, metadata: &DeliveryMetadata) -> Result<()> {
        tokio::fs::create_dir_all(&self.watch_dir)
            .await
            .with_context(|| {
                format!("Failed to create watch dir: {}", self.watch_dir.display())
            })?;

        let file_name = audio_path
            .file_name()
            .context("Artifact path has no file name")?;
        let target = self.watch_dir.join(file_name);

        tokio::fs::copy(audio_path, &target)
            .await
            .with_context(|| format!("Failed to copy artifact to {}", target.display()))?;

        // Sidecar: same base name, .json extension
        let sidecar = target.with_extension("json");
        let content = serde_json::to_string_pretty(metadata)?;
        tokio::fs::write(&sidecar, content)
            .await
            .with_context(|| format!("Failed to write metadata sidecar: {}", sidecar.display()))?;

        Ok(())
    }
}
