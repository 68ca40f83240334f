//! Durable-queue transport over AMQP.
//!
//! A connection is opened per delivery and closed after the publish. The
//! queue is declared durable and messages are marked persistent
//! (delivery mode 2) so the envelope survives a broker restart.

use std::path::Path;

use anyhow::{Context, Result};
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::publisher_confirm::Confirmation;
use lapin::types::FieldTable;
use lapin::{BasicProperties, Connection, ConnectionProperties};
use tracing::{debug, warn};

use super::{DeliveryMetadata, QueueEnvelope};

pub struct AmqpSink {
    url: String,
    queue: String,
}

impl AmqpSink {
    pub fn new(url: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            queue: queue.into(),
        }
    }

    pub async fn send(&self, audio_path: &Path, metadata: &DeliveryMetadata) -> Result<()> {
        let connection = Connection::connect(&self.url, ConnectionProperties::default())
            .await
            .context("Failed to connect to AMQP broker")?;

        let channel = connection
            .create_channel()
            .await
            .context("Failed to create AMQP channel")?;

        // Publisher confirms, so a broker that drops the message is a
        // delivery failure rather than a silent loss
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .context("Failed to enable publisher confirms")?;

        channel
            .queue_declare(
                &self.queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .with_context(|| format!("Failed to declare queue '{}'", self.queue))?;

        let envelope = QueueEnvelope {
            audio_path: audio_path.to_string_lossy().to_string(),
            metadata: metadata.clone(),
        };
        let payload = serde_json::to_vec(&envelope)?;

        let confirmation = channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .context("Failed to publish envelope")?
            .await
            .context("Broker did not confirm the publish")?;

        if let Confirmation::Nack(_) = confirmation {
            anyhow::bail!("Broker nacked the publish to queue '{}'", self.queue);
        }

        debug!(queue = %self.queue, video = %metadata.video_id, "Published envelope to AMQP queue");

        // The message is already durable on the broker; a noisy close is
        // not a delivery failure.
        if let Err(e) = connection.close(200, "done").await {
            warn!(error = %e, "AMQP connection close failed after publish");
        }

        Ok(())
    }
}
