//! YouTube Data API v3 client for the liked-videos listing.
//!
//! Only `videos.list?myRating=like` is used. Quota exhaustion (HTTP 403 with
//! reason `quotaExceeded`) is mapped to a distinguished error variant so the
//! poller can fall back to cached data instead of failing the pass.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Credential;

/// Errors from the catalog service boundary
#[derive(Debug, Error)]
pub enum ApiError {
    /// The daily request quota is exhausted; recoverable via cache fallback
    #[error("YouTube API quota exhausted")]
    QuotaExceeded,

    /// Network-level failure (DNS, connect, timeout)
    #[error("YouTube API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status other than quota exhaustion
    #[error("YouTube API returned status {status}: {body}")]
    Status { status: u16, body: String },
}

/// A single liked video as returned by the catalog service.
///
/// Immutable once fetched; this is also the shape stored in the response
/// cache file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikedVideo {
    /// Video id, unique per source
    pub id: String,
    pub title: String,
    /// Channel (uploader) name
    pub channel: String,
    #[serde(default)]
    pub description: String,
    pub published_at: Option<DateTime<Utc>>,
    /// Platform category id ("10" is Music)
    #[serde(default)]
    pub category_id: String,
}

/// One page of the liked-videos listing
#[derive(Debug, Clone)]
pub struct LikedPage {
    pub videos: Vec<LikedVideo>,
    pub next_page_token: Option<String>,
}

/// Seam for the paginated listing endpoint, stubbed in poller tests
#[async_trait]
pub trait LikesApi: Send + Sync {
    async fn list_page(
        &self,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<LikedPage, ApiError>;
}

/// Real Data API v3 client
pub struct YouTubeApi {
    client: reqwest::Client,
    base_url: String,
    credential: Credential,
}

// ---- Wire schema (response subset we consume) ----

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<VideoResource>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideoResource {
    id: String,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "publishedAt")]
    published_at: Option<DateTime<Utc>>,
    #[serde(rename = "categoryId", default)]
    category_id: String,
}

impl From<VideoResource> for LikedVideo {
    fn from(resource: VideoResource) -> Self {
        Self {
            id: resource.id,
            title: resource.snippet.title,
            channel: resource.snippet.channel_title,
            description: resource.snippet.description,
            published_at: resource.snippet.published_at,
            category_id: resource.snippet.category_id,
        }
    }
}

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

impl YouTubeApi {
    /// Create a client against the public API endpoint
    pub fn new(credential: Credential) -> Self {
        Self::with_base_url(credential, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL (used by tests)
    pub fn with_base_url(credential: Credential, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            credential,
        }
    }

    /// True when the error body names the quota as the rejection reason
    fn is_quota_exhausted(status: u16, body: &str) -> bool {
        status == 403 && (body.contains("quotaExceeded") || body.contains("rateLimitExceeded"))
    }
}

#[async_trait]
impl LikesApi for YouTubeApi {
    async fn list_page(
        &self,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<LikedPage, ApiError> {
        let url = format!("{}/videos", self.base_url);

        let mut query: Vec<(&str, String)> = vec![
            ("part", "snippet".to_string()),
            ("myRating", "like".to_string()),
            ("maxResults", page_size.to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        // Credential mode changes request decoration only; the listing
        // algorithm is identical for both.
        let mut request = self.client.get(&url).query(&query);
        request = match &self.credential {
            Credential::ApiKey(key) => request.query(&[("key", key.as_str())]),
            Credential::Bearer(token) => request.bearer_auth(token),
        };

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if Self::is_quota_exhausted(status.as_u16(), &body) {
                return Err(ApiError::QuotaExceeded);
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ListResponse = response.json().await?;
        debug!(
            items = parsed.items.len(),
            has_next = parsed.next_page_token.is_some(),
            "Fetched liked-videos page"
        );

        Ok(LikedPage {
            videos: parsed.items.into_iter().map(LikedVideo::from).collect(),
            next_page_token: parsed.next_page_token,
        })
    }
}
