//! tunegrab - liked-video audio ingestion and delivery agent
//!
//! Periodically discovers newly liked YouTube videos, extracts each one's
//! audio exactly once via yt-dlp, and hands the artifact plus metadata to a
//! downstream analysis service over a configurable transport.
//!
//! # Architecture
//!
//! - Quota-aware polling: the listing fetch is spaced by a rate limiter,
//!   served from a TTL cache when fresh, and falls back to stale cached
//!   data when the API reports quota exhaustion
//! - Idempotent processing: a persisted processed-id set plus yt-dlp's own
//!   download archive make every item at-most-once across restarts (a crash
//!   between delivery and mark re-processes that one item)
//! - Pluggable delivery: direct multipart upload, watch-directory file
//!   drop, durable AMQP queue, or redis list
//!
//! # Modules
//!
//! - `youtube`: catalog API client, response cache, rate limiter, poller
//! - `state`: persisted processed-id set
//! - `filter`: heuristic music classifier
//! - `download`: yt-dlp invocation and download-archive handling
//! - `deliver`: delivery transports
//! - `grabber`: the orchestrator loop
//! - `cli`: command-line interface
//!
//! # Constraints
//!
//! The state files (`processed.json`, `likes_cache.json`, the yt-dlp
//! archive) each assume a single in-process writer. Running two instances
//! against the same state directory is unsupported.
//!
//! # Usage
//!
//! ```bash
//! # One pass
//! tunegrab run --once
//!
//! # Daemon mode
//! tunegrab run --interval 900
//!
//! # Manual operations
//! tunegrab liked --limit 10
//! tunegrab download dQw4w9WgXcQ
//! ```

pub mod cli;
pub mod config;
pub mod deliver;
pub mod download;
pub mod filter;
pub mod grabber;
pub mod state;
pub mod youtube;

// Re-export main types at crate root for convenience
pub use config::Config;
pub use deliver::{AnalyzerSink, DeliveryMetadata, QueueEnvelope, TransportKind};
pub use download::{DownloadArchive, Downloader, YtDlpDownloader};
pub use grabber::{Grabber, PassSummary};
pub use state::ProcessedSet;
pub use youtube::{ApiError, CachedListing, LikedVideo, LikesApi, LikesPoller};
