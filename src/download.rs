//! Audio extraction via the external yt-dlp tool.
//!
//! yt-dlp maintains its own download archive (line-oriented `source id`
//! pairs). We consult it before invoking the tool: an archived id was
//! converted in a prior run, so the existing local file is located by
//! filename pattern instead of re-encoding. This covers the crash window
//! between a finished download and the processed-set mark.
//!
//! Output path recovery after a successful run, in order:
//! 1. The `Destination:` line from the tool's stdout log
//! 2. A filename match on the `[<id>]` tag in the output directory
//! 3. The newest file of the expected extension modified within the last
//!    60 seconds. This is racy under concurrent downloads and is logged as
//!    a warning whenever used; the loop is strictly sequential so it holds
//!    in practice.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use async_trait::async_trait;
use glob::Pattern;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::youtube::LikedVideo;

/// Source tag yt-dlp writes into its archive for YouTube downloads
pub const ARCHIVE_SOURCE: &str = "youtube";

/// How recent a file must be for the newest-file recovery heuristic
const RECENT_FILE_WINDOW: Duration = Duration::from_secs(60);

/// Errors from the extraction boundary
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },

    #[error("yt-dlp exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    #[error("download succeeded but the output file could not be located for video {0}")]
    OutputNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Seam for the extraction step, stubbed in pipeline tests
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Produce a local audio file for the video, returning its path
    async fn fetch_audio(&self, video: &LikedVideo) -> Result<PathBuf, DownloadError>;
}

/// Read-only view of yt-dlp's download archive file.
///
/// The file is owned and appended by the tool itself; we only check
/// membership.
pub struct DownloadArchive {
    path: PathBuf,
}

impl DownloadArchive {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when `<source> <id>` appears as an exact line in the archive
    pub fn contains(&self, source: &str, id: &str) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read download archive: {}", self.path.display()))?;

        let entry = format!("{} {}", source, id);
        Ok(content.lines().any(|line| line.trim() == entry))
    }
}

/// Real downloader shelling out to yt-dlp
pub struct YtDlpDownloader {
    binary: String,
    download_dir: PathBuf,
    archive: DownloadArchive,
    audio_format: String,
}

impl YtDlpDownloader {
    pub fn new(
        binary: impl Into<String>,
        download_dir: impl Into<PathBuf>,
        archive: DownloadArchive,
        audio_format: impl Into<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            download_dir: download_dir.into(),
            archive,
            audio_format: audio_format.into(),
        }
    }

    fn video_url(id: &str) -> String {
        format!("https://www.youtube.com/watch?v={}", id)
    }

    /// Output template tags the filename with the video id so a prior
    /// download can be located deterministically.
    fn output_template(&self) -> String {
        format!(
            "{}/%(title)s [%(id)s].%(ext)s",
            self.download_dir.display()
        )
    }

    async fn invoke(&self, video: &LikedVideo) -> Result<PathBuf, DownloadError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .with_context(|| {
                format!(
                    "Failed to create download dir: {}",
                    self.download_dir.display()
                )
            })?;

        let url = Self::video_url(&video.id);
        info!(video = %video.id, title = %video.title, "Extracting audio");

        let output = Command::new(&self.binary)
            .arg("-x")
            .args(["--audio-format", &self.audio_format])
            .args(["--audio-quality", "0"])
            .arg("--download-archive")
            .arg(self.archive.path())
            .arg("--output")
            .arg(self.output_template())
            .arg("--no-progress")
            .arg("--force-ipv4")
            .args(["--throttled-rate", "100K"])
            .args(["--retries", "3"])
            .arg(&url)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| DownloadError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(DownloadError::Failed {
                code: output.status.code().unwrap_or(-1),
                stderr,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        self.recover_output_path(&video.id, &stdout)
    }

    /// Locate the produced file after a successful run
    fn recover_output_path(&self, id: &str, stdout: &str) -> Result<PathBuf, DownloadError> {
        if let Some(path) = parse_destination(stdout) {
            if path.exists() {
                debug!(path = %path.display(), "Recovered output path from tool log");
                return Ok(path);
            }
        }

        if let Some(path) = locate_by_id(&self.download_dir, id, &self.audio_format) {
            debug!(path = %path.display(), "Recovered output path by id pattern");
            return Ok(path);
        }

        if let Some(path) = newest_recent(&self.download_dir, &self.audio_format, RECENT_FILE_WINDOW)
        {
            warn!(
                path = %path.display(),
                video = %id,
                "Falling back to newest-file heuristic for output recovery"
            );
            return Ok(path);
        }

        Err(DownloadError::OutputNotFound(id.to_string()))
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    async fn fetch_audio(&self, video: &LikedVideo) -> Result<PathBuf, DownloadError> {
        if self.archive.contains(ARCHIVE_SOURCE, &video.id)? {
            // Converted in a prior run; skip the tool and find the file
            info!(video = %video.id, "Already in download archive, locating existing file");
            return locate_by_id(&self.download_dir, &video.id, &self.audio_format)
                .ok_or_else(|| DownloadError::OutputNotFound(video.id.clone()));
        }

        self.invoke(video).await
    }
}

/// Extract the destination path from yt-dlp's stdout.
///
/// The post-processing step logs a line like
/// `[ExtractAudio] Destination: /path/to/Title [id].mp3`; the plain download
/// step logs `[download] Destination: ...`. The last such line wins since
/// post-processing runs last.
fn parse_destination(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .filter_map(|line| line.split_once("Destination: ").map(|(_, path)| path))
        .last()
        .map(|path| PathBuf::from(path.trim()))
}

/// Find a file in `dir` whose name carries the `[<id>]` tag with the
/// expected extension
fn locate_by_id(dir: &Path, id: &str, ext: &str) -> Option<PathBuf> {
    // The id tag is bracketed, and brackets are glob metacharacters
    let pattern = format!(
        "{}/*{}.{}",
        Pattern::escape(&dir.to_string_lossy()),
        Pattern::escape(&format!("[{}]", id)),
        ext
    );

    glob::glob(&pattern).ok()?.filter_map(|entry| entry.ok()).next()
}

/// Newest file of the expected extension modified within `window`
fn newest_recent(dir: &Path, ext: &str, window: Duration) -> Option<PathBuf> {
    let cutoff = SystemTime::now().checked_sub(window)?;
    let entries = std::fs::read_dir(dir).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|e| e == ext).unwrap_or(false))
        .filter_map(|path| {
            let modified = path.metadata().ok()?.modified().ok()?;
            (modified >= cutoff).then_some((path, modified))
        })
        .max_by_key(|(_, modified)| *modified)
        .map(|(path, _)| path)
}
