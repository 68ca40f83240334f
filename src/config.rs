//! Configuration for tunegrab.
//!
//! Configuration sources (highest priority first):
//! 1. Explicit `--config` path (or TUNEGRAB_CONFIG env)
//! 2. $TUNEGRAB_HOME/config.yaml
//! 3. ~/.tunegrab/config.yaml
//! 4. Defaults
//!
//! There is no global config singleton: `Config::load` is called once in the
//! CLI and the resolved value is passed down to every component explicitly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::deliver::TransportKind;

/// Top-level config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Daemon-mode sleep between passes, measured from pass end
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube: YouTubeConfig::default(),
            paths: PathsConfig::default(),
            download: DownloadConfig::default(),
            delivery: DeliveryConfig::default(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Catalog-service (YouTube Data API) settings
#[derive(Debug, Clone, Deserialize)]
pub struct YouTubeConfig {
    /// API key credential (preferred when set)
    pub api_key: Option<String>,
    /// File holding a delegated OAuth bearer token (maintained externally)
    pub token_file: Option<PathBuf>,
    /// How long a cached listing stays fresh
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// Items requested per page (API maximum is 50)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Page cap for a single listing fetch
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    /// Minimum spacing between outbound API requests
    #[serde(default = "default_min_request_interval")]
    pub min_request_interval_ms: u64,
    /// Extra delay between successive pages of one fetch
    #[serde(default = "default_page_delay")]
    pub page_delay_secs: u64,
    /// Restrict new items to music-looking content
    #[serde(default)]
    pub filter_music_only: bool,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            token_file: None,
            cache_ttl_secs: default_cache_ttl(),
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            min_request_interval_ms: default_min_request_interval(),
            page_delay_secs: default_page_delay(),
            filter_music_only: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory holding processed.json, likes_cache.json and the
    /// yt-dlp archive (default: $TUNEGRAB_HOME or ~/.tunegrab)
    pub state_dir: Option<PathBuf>,
    /// Where extracted audio files land (default: <state_dir>/downloads)
    pub download_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadConfig {
    /// Output codec passed to yt-dlp's --audio-format
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    /// yt-dlp binary name or path
    #[serde(default = "default_ytdlp_binary")]
    pub binary: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            audio_format: default_audio_format(),
            binary: default_ytdlp_binary(),
        }
    }
}

/// Analyzer delivery settings; only the fields for the selected transport
/// need to be present.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    #[serde(default)]
    pub transport: TransportKind,
    /// Ingestion endpoint URL (direct-upload)
    pub analyzer_url: Option<String>,
    /// Shared watch directory (file-drop)
    pub watch_dir: Option<PathBuf>,
    /// AMQP broker URL (queue-durable)
    pub amqp_url: Option<String>,
    /// Redis URL (queue-list)
    pub redis_url: Option<String>,
    /// Queue / list name for both broker transports
    #[serde(default = "default_queue_name")]
    pub queue: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::default(),
            analyzer_url: None,
            watch_dir: None,
            amqp_url: None,
            redis_url: None,
            queue: default_queue_name(),
        }
    }
}

fn default_poll_interval() -> u64 {
    900
} // 15 min
fn default_cache_ttl() -> u64 {
    3600
} // 1 hour
fn default_page_size() -> u32 {
    50
}
fn default_max_pages() -> u32 {
    10
}
fn default_min_request_interval() -> u64 {
    1000
}
fn default_page_delay() -> u64 {
    1
}
fn default_audio_format() -> String {
    "mp3".to_string()
}
fn default_ytdlp_binary() -> String {
    "yt-dlp".to_string()
}
fn default_queue_name() -> String {
    "tunegrab.audio".to_string()
}

/// Catalog API credential, resolved from the config once at startup
#[derive(Debug, Clone)]
pub enum Credential {
    /// `key=` query parameter
    ApiKey(String),
    /// `Authorization: Bearer` header, token read from a file
    Bearer(String),
}

impl Config {
    /// Load configuration.
    ///
    /// With an explicit path the file must exist and parse. Otherwise the
    /// default location is tried and a missing file yields pure defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let path = Self::default_home().join("config.yaml");
                if path.exists() {
                    Self::from_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Default state home: $TUNEGRAB_HOME, else ~/.tunegrab
    pub fn default_home() -> PathBuf {
        if let Ok(home) = std::env::var("TUNEGRAB_HOME") {
            return PathBuf::from(home);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tunegrab")
    }

    /// Resolved state directory
    pub fn state_dir(&self) -> PathBuf {
        self.paths
            .state_dir
            .clone()
            .unwrap_or_else(Self::default_home)
    }

    /// Resolved download directory
    pub fn download_dir(&self) -> PathBuf {
        self.paths
            .download_dir
            .clone()
            .unwrap_or_else(|| self.state_dir().join("downloads"))
    }

    /// Path to the processed-id list
    pub fn processed_path(&self) -> PathBuf {
        self.state_dir().join("processed.json")
    }

    /// Path to the cached liked-videos listing
    pub fn cache_path(&self) -> PathBuf {
        self.state_dir().join("likes_cache.json")
    }

    /// Path to yt-dlp's download archive (tool-owned)
    pub fn archive_path(&self) -> PathBuf {
        self.state_dir().join("yt-dlp-archive.txt")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.youtube.cache_ttl_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.youtube.min_request_interval_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_secs(self.youtube.page_delay_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Resolve the catalog credential.
    ///
    /// API key wins when both are configured; the token file is read fresh
    /// here so an externally refreshed token is picked up on restart.
    pub fn credential(&self) -> Result<Credential> {
        if let Some(ref key) = self.youtube.api_key {
            return Ok(Credential::ApiKey(key.clone()));
        }

        if let Some(ref token_file) = self.youtube.token_file {
            let token = std::fs::read_to_string(token_file)
                .with_context(|| format!("Failed to read token file: {}", token_file.display()))?;
            return Ok(Credential::Bearer(token.trim().to_string()));
        }

        anyhow::bail!("No catalog credential configured: set youtube.api_key or youtube.token_file")
    }
}
