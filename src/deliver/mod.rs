//! Delivery of audio artifacts to the downstream analysis service.
//!
//! Exactly one transport is selected at startup from configuration; there is
//! no cross-transport fallback. Every transport reports failure as `false`
//! from `deliver` instead of letting errors escape, so the orchestrator can
//! log and move on to the next item.

use std::path::Path;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::DeliveryConfig;
use crate::youtube::LikedVideo;

pub mod amqp;
pub mod filedrop;
pub mod redis_list;
pub mod upload;

pub use amqp::AmqpSink;
pub use filedrop::FileDropSink;
pub use redis_list::RedisListSink;
pub use upload::UploadSink;

/// Per-item metadata handed to the analyzer alongside the audio.
///
/// Derived from the liked video, never persisted as state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryMetadata {
    pub source: String,
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
}

impl DeliveryMetadata {
    pub fn for_video(video: &LikedVideo) -> Self {
        Self {
            source: "youtube".to_string(),
            video_id: video.id.clone(),
            title: video.title.clone(),
            channel: video.channel.clone(),
            description: video.description.clone(),
            published_at: video.published_at,
        }
    }
}

/// JSON envelope published by both queue transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEnvelope {
    pub audio_path: String,
    pub metadata: DeliveryMetadata,
}

/// Transport selection, as it appears in config and on the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    DirectUpload,
    FileDrop,
    QueueDurable,
    QueueList,
}

/// The configured delivery transport, built once at startup
pub enum AnalyzerSink {
    DirectUpload(UploadSink),
    FileDrop(FileDropSink),
    QueueDurable(AmqpSink),
    QueueList(RedisListSink),
}

impl AnalyzerSink {
    /// Build the selected transport, validating that its settings are present
    pub fn from_config(delivery: &DeliveryConfig, audio_format: &str) -> Result<Self> {
        match delivery.transport {
            TransportKind::DirectUpload => {
                let url = delivery.analyzer_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("delivery.analyzer_url is required for direct_upload")
                })?;
                Ok(Self::DirectUpload(UploadSink::new(url, audio_format)))
            }
            TransportKind::FileDrop => {
                let dir = delivery.watch_dir.clone().ok_or_else(|| {
                    anyhow::anyhow!("delivery.watch_dir is required for file_drop")
                })?;
                Ok(Self::FileDrop(FileDropSink::new(dir)))
            }
            TransportKind::QueueDurable => {
                let url = delivery.amqp_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("delivery.amqp_url is required for queue_durable")
                })?;
                Ok(Self::QueueDurable(AmqpSink::new(url, delivery.queue.clone())))
            }
            TransportKind::QueueList => {
                let url = delivery.redis_url.clone().ok_or_else(|| {
                    anyhow::anyhow!("delivery.redis_url is required for queue_list")
                })?;
                Ok(Self::QueueList(RedisListSink::new(url, delivery.queue.clone())))
            }
        }
    }

    /// Transport name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::DirectUpload(_) => "direct-upload",
            Self::FileDrop(_) => "file-drop",
            Self::QueueDurable(_) => "queue-durable",
            Self::QueueList(_) => "queue-list",
        }
    }

    /// Hand an artifact plus metadata to the analyzer.
    ///
    /// Returns true on success. All failures, including a missing artifact
    /// file, are logged here and reported as false; nothing is retried
    /// internally (the next poll pass retries the whole item).
    pub async fn deliver(&self, audio_path: &Path, metadata: &DeliveryMetadata) -> bool {
        if !audio_path.exists() {
            error!(
                transport = self.name(),
                path = %audio_path.display(),
                "Artifact file missing, cannot deliver"
            );
            return false;
        }

        let result = match self {
            Self::DirectUpload(sink) => sink.send(audio_path, metadata).await,
            Self::FileDrop(sink) => sink.send(audio_path, metadata).await,
            Self::QueueDurable(sink) => sink.send(audio_path, metadata).await,
            Self::QueueList(sink) => sink.send(audio_path, metadata).await,
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                error!(
                    transport = self.name(),
                    video = %metadata.video_id,
                    error = format!("{:#}", e),
                    "Delivery failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video() -> LikedVideo {
        LikedVideo {
            id: "abc123".to_string(),
            title: "A Song".to_string(),
            channel: "A Channel".to_string(),
            description: "desc".to_string(),
            published_at: None,
            category_id: "10".to_string(),
        }
    }

    #[test]
    fn test_metadata_shape() {
        let meta = DeliveryMetadata::for_video(&video());
        let json: serde_json::Value = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["source"], "youtube");
        assert_eq!(json["video_id"], "abc123");
        assert_eq!(json["title"], "A Song");
        assert_eq!(json["channel"], "A Channel");
    }

    #[test]
    fn test_transport_kind_config_names() {
        let kind: TransportKind = serde_json::from_str("\"queue_durable\"").unwrap();
        assert_eq!(kind, TransportKind::QueueDurable);

        let kind: TransportKind = serde_json::from_str("\"direct_upload\"").unwrap();
        assert_eq!(kind, TransportKind::DirectUpload);
    }

    #[test]
    fn test_from_config_requires_transport_settings() {
        let delivery = DeliveryConfig::default();
        // direct_upload is the default and needs analyzer_url
        assert!(AnalyzerSink::from_config(&delivery, "mp3").is_err());

        let mut delivery = DeliveryConfig::default();
        delivery.transport = TransportKind::FileDrop;
        assert!(AnalyzerSink::from_config(&delivery, "mp3").is_err());
        delivery.watch_dir = Some("/tmp/inbox".into());
        let sink = AnalyzerSink::from_config(&delivery, "mp3").unwrap();
        assert_eq!(sink.name(), "file-drop");
    }
}
