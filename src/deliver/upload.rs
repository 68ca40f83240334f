//! Direct multipart upload to the analyzer's ingestion endpoint.

use std::path::Path;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use super::DeliveryMetadata;

pub struct UploadSink {
    url: String,
    mime: &'static str,
    client: reqwest::Client,
}

impl UploadSink {
    pub fn new(url: impl Into<String>, audio_format: &str) -> Self {
        Self {
            url: url.into(),
            mime: mime_for_format(audio_format),
            client: reqwest::Client::new(),
        }
    }

    /// One POST: binary `file` part plus a `metadata` JSON text part.
    /// Success is strictly HTTP 200.
    pub async fn send(&self, audio_path: &Path, metadata: &DeliveryMetadata) -> Result<()> {
        let file_name = audio_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let bytes = tokio::fs::read(audio_path)
            .await
            .with_context(|| format!("Failed to read artifact: {}", audio_path.display()))?;

        let file_part = Part::bytes(bytes).file_name(file_name).mime_str(self.mime)?;

        let form = Form::new()
            .part("file", file_part)
            .text("metadata", serde_json::to_string(metadata)?);

        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach analyzer ingestion endpoint")?;

        if response.status() != StatusCode::OK {
            anyhow::bail!("Analyzer returned status {}", response.status());
        }

        Ok(())
    }
}

/// MIME type for the configured audio format
fn mime_for_format(format: &str) -> &'static str {
    match format {
        "mp3" => "audio/mpeg",
        "m4a" | "aac" => "audio/mp4",
        "opus" | "ogg" | "vorbis" => "audio/ogg",
        "flac" => "audio/flac",
        "wav" => "audio/wav",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_mapping() {
        assert_eq!(mime_for_format("mp3"), "audio/mpeg");
        assert_eq!(mime_for_format("m4a"), "audio/mp4");
        assert_eq!(mime_for_format("flac"), "audio/flac");
        assert_eq!(mime_for_format("weird"), "application/octet-stream");
    }
}
