//! Command-line interface for tunegrab.
//!
//! Provides commands for running the ingestion loop, listing liked videos,
//! downloading a single video manually, and inspecting configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::config::Config;
use crate::deliver::TransportKind;
use crate::download::{DownloadArchive, Downloader, YtDlpDownloader};
use crate::grabber::Grabber;
use crate::youtube::LikedVideo;

/// tunegrab - liked-video audio ingestion and delivery agent
#[derive(Parser, Debug)]
#[command(name = "tunegrab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path (default: $TUNEGRAB_HOME/config.yaml)
    #[arg(short, long, env = "TUNEGRAB_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the ingestion pipeline
    Run {
        /// Run a single pass and exit instead of looping
        #[arg(long)]
        once: bool,

        /// Override the poll interval (seconds) for daemon mode
        #[arg(long)]
        interval: Option<u64>,

        /// Override the configured delivery transport
        #[arg(long, value_enum)]
        transport: Option<TransportKind>,
    },

    /// List currently liked videos (uses the same cache and quota rules)
    Liked {
        /// Maximum number of videos to show
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Download a single video's audio without delivering it
    Download {
        /// Video id
        video_id: String,
    },

    /// Show resolved configuration
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Run {
                once,
                interval,
                transport,
            } => run(config, once, interval, transport).await,
            Commands::Liked { limit } => list_liked(config, limit).await,
            Commands::Download { video_id } => download_one(config, &video_id).await,
            Commands::Config => show_config(&config),
        }
    }
}

async fn run(
    mut config: Config,
    once: bool,
    interval: Option<u64>,
    transport: Option<TransportKind>,
) -> Result<()> {
    if let Some(kind) = transport {
        config.delivery.transport = kind;
    }

    let mut grabber = Grabber::from_config(&config)?;

    if once {
        let summary = grabber.run_once().await?;
        println!(
            "Pass complete: {} listed, {} new, {} delivered, {} failed",
            summary.listed, summary.new, summary.delivered, summary.failed
        );
        return Ok(());
    }

    let interval = interval
        .map(Duration::from_secs)
        .unwrap_or_else(|| config.poll_interval());
    grabber.run_daemon(interval).await
}

async fn list_liked(config: Config, limit: usize) -> Result<()> {
    let mut poller = build_poller(&config)?;
    let videos = poller.fetch_liked().await?;

    if videos.is_empty() {
        println!("No liked videos found");
        return Ok(());
    }

    println!("Liked videos ({} total):", videos.len());
    for video in videos.iter().take(limit) {
        print_video(video);
    }

    if videos.len() > limit {
        println!("  ... and {} more", videos.len() - limit);
    }

    Ok(())
}

fn print_video(video: &LikedVideo) {
    let published = video
        .published_at
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {}  {}  {}  ({})",
        video.id, published, video.title, video.channel
    );
}

async fn download_one(config: Config, video_id: &str) -> Result<()> {
    let downloader = YtDlpDownloader::new(
        config.download.binary.clone(),
        config.download_dir(),
        DownloadArchive::new(config.archive_path()),
        config.download.audio_format.clone(),
    );

    // Manual downloads only need the id; the rest of the metadata is not
    // used by the extraction tool.
    let video = LikedVideo {
        id: video_id.to_string(),
        title: video_id.to_string(),
        channel: String::new(),
        description: String::new(),
        published_at: None,
        category_id: String::new(),
    };

    let path = downloader
        .fetch_audio(&video)
        .await
        .with_context(|| format!("Failed to download video {}", video_id))?;

    println!("Downloaded: {}", path.display());
    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    println!("State dir:       {}", config.state_dir().display());
    println!("Download dir:    {}", config.download_dir().display());
    println!("Processed set:   {}", config.processed_path().display());
    println!("Listing cache:   {}", config.cache_path().display());
    println!("Download archive: {}", config.archive_path().display());
    println!();
    println!("Page size:       {}", config.youtube.page_size);
    println!("Max pages:       {}", config.youtube.max_pages);
    println!("Cache TTL:       {}s", config.youtube.cache_ttl_secs);
    println!("Music filter:    {}", config.youtube.filter_music_only);
    println!("Poll interval:   {}s", config.poll_interval_secs);
    println!("Audio format:    {}", config.download.audio_format);
    println!("Transport:       {:?}", config.delivery.transport);

    match config.credential() {
        Ok(crate::config::Credential::ApiKey(_)) => println!("Credential:      API key"),
        Ok(crate::config::Credential::Bearer(_)) => println!("Credential:      bearer token"),
        Err(_) => println!("Credential:      NOT CONFIGURED"),
    }

    Ok(())
}

/// The liked listing does not need a delivery sink or downloader; build only
/// the poller half of the stack. Cache and quota behavior are identical to
/// the loop's.
fn build_poller(config: &Config) -> Result<crate::youtube::LikesPoller> {
    use crate::youtube::{LikesPoller, RequestSpacer, ResponseCache, YouTubeApi};

    let api = YouTubeApi::new(config.credential()?);
    let cache = ResponseCache::load(config.cache_path(), config.cache_ttl());
    let spacer = RequestSpacer::new(config.min_request_interval());

    Ok(LikesPoller::new(
        Arc::new(api),
        cache,
        spacer,
        config.youtube.page_size,
        config.youtube.max_pages,
        config.page_delay(),
    ))
}
