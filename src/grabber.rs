//! Orchestrator loop: poll liked videos, extract audio, deliver, mark.
//!
//! One pass processes items strictly sequentially. Download and delivery
//! failures are isolated per item (logged, item retried on the next pass);
//! a failure to persist the processed set aborts the pass, since continuing
//! would desynchronize in-memory and on-disk dedup state.
//!
//! Daemon mode repeats passes on an interval measured from pass end, and
//! honors a shutdown signal between passes only, never mid-item.
//!
//! Running two instances against the same state directory is unsupported:
//! each state file assumes a single in-process writer and there is no
//! inter-process locking.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::deliver::{AnalyzerSink, DeliveryMetadata};
use crate::download::{Downloader, DownloadArchive, YtDlpDownloader};
use crate::filter::is_music;
use crate::state::ProcessedSet;
use crate::youtube::{LikedVideo, LikesPoller, RequestSpacer, ResponseCache, YouTubeApi};

/// Outcome of one full pass
#[derive(Debug, Clone, Copy, Default)]
pub struct PassSummary {
    /// Items in the fetched listing
    pub listed: usize,
    /// Items that survived dedup (and the music filter, when enabled)
    pub new: usize,
    /// Items delivered and marked processed
    pub delivered: usize,
    /// Items that failed download or delivery this pass
    pub failed: usize,
}

pub struct Grabber {
    poller: LikesPoller,
    processed: ProcessedSet,
    downloader: Arc<dyn Downloader>,
    sink: AnalyzerSink,
    music_only: bool,
}

impl Grabber {
    pub fn new(
        poller: LikesPoller,
        processed: ProcessedSet,
        downloader: Arc<dyn Downloader>,
        sink: AnalyzerSink,
        music_only: bool,
    ) -> Self {
        Self {
            poller,
            processed,
            downloader,
            sink,
            music_only,
        }
    }

    /// Build the full component stack from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let api = YouTubeApi::new(config.credential()?);
        let cache = ResponseCache::load(config.cache_path(), config.cache_ttl());
        let spacer = RequestSpacer::new(config.min_request_interval());
        let poller = LikesPoller::new(
            Arc::new(api),
            cache,
            spacer,
            config.youtube.page_size,
            config.youtube.max_pages,
            config.page_delay(),
        );

        let processed = ProcessedSet::load(config.processed_path())?;

        let downloader = YtDlpDownloader::new(
            config.download.binary.clone(),
            config.download_dir(),
            DownloadArchive::new(config.archive_path()),
            config.download.audio_format.clone(),
        );

        let sink = AnalyzerSink::from_config(&config.delivery, &config.download.audio_format)?;

        Ok(Self::new(
            poller,
            processed,
            Arc::new(downloader),
            sink,
            config.youtube.filter_music_only,
        ))
    }

    /// Run a single pass: fetch, filter, then download/deliver/mark per item
    pub async fn run_once(&mut self) -> Result<PassSummary> {
        let listing = self.poller.fetch_liked().await?;

        let new: Vec<_> = self
            .processed
            .filter_new(&listing)
            .into_iter()
            .filter(|video| !self.music_only || is_music(video))
            .cloned()
            .collect();

        let mut summary = PassSummary {
            listed: listing.len(),
            new: new.len(),
            ..Default::default()
        };

        if new.is_empty() {
            info!(listed = summary.listed, "No new liked videos");
            return Ok(summary);
        }

        info!(new = summary.new, "Processing new liked videos");

        for video in &new {
            match self.process_item(video).await {
                Ok(true) => summary.delivered += 1,
                Ok(false) => summary.failed += 1,
                // Persistence failure: stop the pass
                Err(e) => return Err(e),
            }
        }

        info!(
            delivered = summary.delivered,
            failed = summary.failed,
            "Pass complete"
        );
        Ok(summary)
    }

    /// Handle one item. Ok(true) = delivered and marked, Ok(false) = skipped
    /// this pass, Err = state persistence failed (fatal for the pass).
    async fn process_item(&mut self, video: &LikedVideo) -> Result<bool> {
        let audio_path = match self.downloader.fetch_audio(video).await {
            Ok(path) => path,
            Err(e) => {
                error!(video = %video.id, error = %e, "Audio extraction failed, will retry next pass");
                return Ok(false);
            }
        };

        let metadata = DeliveryMetadata::for_video(video);
        if !self.sink.deliver(&audio_path, &metadata).await {
            warn!(video = %video.id, "Delivery failed, will retry next pass");
            return Ok(false);
        }

        self.processed
            .mark(&video.id)
            .context("Failed to persist processed set")?;

        info!(video = %video.id, title = %video.title, "Delivered and marked processed");
        Ok(true)
    }

    /// Run passes forever, sleeping `interval` between them.
    ///
    /// A failed fetch is logged and treated as an empty pass. Ctrl-C stops
    /// the loop at the next between-pass checkpoint.
    pub async fn run_daemon(&mut self, interval: Duration) -> Result<()> {
        self.run_daemon_until(interval, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                // Without a signal handler there is no orderly shutdown;
                // run on until killed.
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Daemon loop with an explicit shutdown future.
    ///
    /// The future is created once and polled across the whole loop, so a
    /// signal arriving while a pass is executing is not lost: it is observed
    /// at the next between-pass checkpoint. Shutdown never interrupts an
    /// item mid-flight.
    pub async fn run_daemon_until(
        &mut self,
        interval: Duration,
        shutdown: impl Future<Output = ()>,
    ) -> Result<()> {
        info!(interval_secs = interval.as_secs(), "Starting daemon loop");
        tokio::pin!(shutdown);

        loop {
            match self.run_once().await {
                Ok(summary) => {
                    if summary.delivered > 0 || summary.failed > 0 {
                        info!(
                            delivered = summary.delivered,
                            failed = summary.failed,
                            "Daemon pass finished"
                        );
                    }
                }
                Err(e) => {
                    error!(error = format!("{:#}", e), "Pass failed, treating as empty");
                }
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, stopping daemon loop");
                    return Ok(());
                }
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    /// Number of ids marked processed so far
    pub fn processed_len(&self) -> usize {
        self.processed.len()
    }

    /// Path of the processed-set file (for CLI output)
    pub fn processed_path(&self) -> &Path {
        self.processed.path()
    }
}
