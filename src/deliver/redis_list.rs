//! List-queue transport: LPUSH the envelope onto a redis list.

use std::path::Path;

use anyhow::{Context, Result};
use redis::AsyncCommands;
use tracing::debug;

use super::{DeliveryMetadata, QueueEnvelope};

pub struct RedisListSink {
    url: String,
    list: String,
}

impl RedisListSink {
    pub fn new(url: impl Into<String>, list: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            list: list.into(),
        }
    }

    pub async fn send(&self, audio_path: &Path, metadata: &DeliveryMetadata) -> Result<()> {
        let client = redis::Client::open(self.url.as_str())
            .context("Invalid redis URL")?;

        let mut connection = client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to redis")?;

        let envelope = QueueEnvelope {
            audio_path: audio_path.to_string_lossy().to_string(),
            metadata: metadata.clone(),
        };
        let payload = serde_json::to_string(&envelope)?;

        connection
            .lpush::<_, _, ()>(&self.list, payload)
            .await
            .with_context(|| format!("Failed to push envelope onto list '{}'", self.list))?;

        debug!(list = %self.list, video = %metadata.video_id, "Pushed envelope onto redis list");
        Ok(())
    }
}
