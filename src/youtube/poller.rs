//! Quota-aware fetch of the full liked-videos listing.
//!
//! Order of preference:
//! 1. Fresh cache entry (zero API calls)
//! 2. Paginated fetch, spaced by the request limiter, capped at `max_pages`
//! 3. On quota exhaustion, any prior cache entry regardless of age
//!
//! Other API errors propagate; retries belong to the HTTP client and to the
//! next poll pass, not to this layer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::api::{ApiError, LikedVideo, LikesApi};
use super::cache::ResponseCache;
use super::limiter::RequestSpacer;

pub struct LikesPoller {
    api: Arc<dyn LikesApi>,
    cache: ResponseCache,
    spacer: RequestSpacer,
    page_size: u32,
    max_pages: u32,
    page_delay: Duration,
}

impl LikesPoller {
    pub fn new(
        api: Arc<dyn LikesApi>,
        cache: ResponseCache,
        spacer: RequestSpacer,
        page_size: u32,
        max_pages: u32,
        page_delay: Duration,
    ) -> Self {
        Self {
            api,
            cache,
            spacer,
            page_size,
            max_pages,
            page_delay,
        }
    }

    /// Fetch the complete liked-videos listing.
    pub async fn fetch_liked(&mut self) -> Result<Vec<LikedVideo>> {
        if let Some(listing) = self.cache.fresh() {
            debug!(
                videos = listing.videos.len(),
                fetched_at = %listing.fetched_at,
                "Serving liked videos from cache"
            );
            return Ok(listing.videos.clone());
        }

        let mut videos: Vec<LikedVideo> = Vec::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0u32;

        loop {
            self.spacer.acquire().await;

            let page = match self.api.list_page(self.page_size, page_token.as_deref()).await {
                Ok(page) => page,
                Err(ApiError::QuotaExceeded) => {
                    if let Some(listing) = self.cache.stale() {
                        warn!(
                            fetched_at = %listing.fetched_at,
                            "Quota exhausted; serving cached listing (degraded mode)"
                        );
                        return Ok(listing.videos.clone());
                    }
                    return Err(ApiError::QuotaExceeded)
                        .context("Quota exhausted and no cached listing to fall back to");
                }
                Err(e) => {
                    return Err(e).context("Liked-videos page fetch failed");
                }
            };

            videos.extend(page.videos);
            pages += 1;
            page_token = page.next_page_token;

            if page_token.is_none() || pages >= self.max_pages {
                break;
            }

            tokio::time::sleep(self.page_delay).await;
        }

        info!(videos = videos.len(), pages, "Fetched liked-videos listing");
        self.cache
            .store(videos.clone())
            .context("Failed to persist liked-videos cache")?;

        Ok(videos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    use crate::youtube::api::LikedPage;

    fn video(id: &str) -> LikedVideo {
        LikedVideo {
            id: id.to_string(),
            title: format!("Video {}", id),
            channel: "Channel".to_string(),
            description: String::new(),
            published_at: None,
            category_id: String::new(),
        }
    }

    /// Stub API returning a fixed page per call, or a fixed error
    struct StubApi {
        pages: Vec<LikedPage>,
        quota_exhausted: bool,
        calls: AtomicUsize,
    }

    impl StubApi {
        fn with_pages(pages: Vec<LikedPage>) -> Self {
            Self {
                pages,
                quota_exhausted: false,
                calls: AtomicUsize::new(0),
            }
        }

        fn quota_exhausted() -> Self {
            Self {
                pages: Vec::new(),
                quota_exhausted: true,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LikesApi for StubApi {
        async fn list_page(
            &self,
            _page_size: u32,
            page_token: Option<&str>,
        ) -> Result<LikedPage, ApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);

            if self.quota_exhausted {
                return Err(ApiError::QuotaExceeded);
            }

            let index = match page_token {
                None => 0,
                Some(token) => token.parse::<usize>().unwrap(),
            };
            assert_eq!(index, call, "pages must be requested in order");

            Ok(self.pages[index].clone())
        }
    }

    fn poller(api: Arc<StubApi>, cache: ResponseCache, max_pages: u32) -> LikesPoller {
        LikesPoller::new(
            api,
            cache,
            RequestSpacer::new(Duration::ZERO),
            50,
            max_pages,
            Duration::ZERO,
        )
    }

    fn empty_cache(temp: &TempDir, ttl: Duration) -> ResponseCache {
        ResponseCache::load(temp.path().join("cache.json"), ttl)
    }

    #[tokio::test]
    async fn test_single_page_fetch_populates_cache() {
        let temp = TempDir::new().unwrap();
        let api = Arc::new(StubApi::with_pages(vec![LikedPage {
            videos: vec![video("a"), video("b")],
            next_page_token: None,
        }]));

        let mut poller = poller(api.clone(), empty_cache(&temp, Duration::from_secs(60)), 10);
        let videos = poller.fetch_liked().await.unwrap();

        assert_eq!(videos.len(), 2);
        assert_eq!(api.call_count(), 1);

        // Second fetch is served from the fresh cache, zero API calls
        let videos = poller.fetch_liked().await.unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pagination_follows_tokens_in_order() {
        let temp = TempDir::new().unwrap();
        let api = Arc::new(StubApi::with_pages(vec![
            LikedPage {
                videos: vec![video("a")],
                next_page_token: Some("1".to_string()),
            },
            LikedPage {
                videos: vec![video("b")],
                next_page_token: Some("2".to_string()),
            },
            LikedPage {
                videos: vec![video("c")],
                next_page_token: None,
            },
        ]));

        let mut poller = poller(api.clone(), empty_cache(&temp, Duration::from_secs(60)), 10);
        let videos = poller.fetch_liked().await.unwrap();

        assert_eq!(
            videos.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test]
    async fn test_page_cap_stops_with_token_remaining() {
        let temp = TempDir::new().unwrap();
        // Every page advertises a next page; the cap must stop the loop
        let api = Arc::new(StubApi::with_pages(vec![
            LikedPage {
                videos: vec![video("a")],
                next_page_token: Some("1".to_string()),
            },
            LikedPage {
                videos: vec![video("b")],
                next_page_token: Some("2".to_string()),
            },
            LikedPage {
                videos: vec![video("c")],
                next_page_token: Some("3".to_string()),
            },
        ]));

        let mut poller = poller(api.clone(), empty_cache(&temp, Duration::from_secs(60)), 3);
        let videos = poller.fetch_liked().await.unwrap();

        assert_eq!(videos.len(), 3);
        assert_eq!(api.call_count(), 3);
    }

    #[tokio::test]
    async fn test_quota_fallback_serves_expired_cache() {
        let temp = TempDir::new().unwrap();

        // Seed the cache file, then reopen it with a zero TTL so the entry
        // is expired but still present.
        let mut seed = empty_cache(&temp, Duration::from_secs(60));
        seed.store(vec![video("cached")]).unwrap();
        let cache = empty_cache(&temp, Duration::ZERO);
        assert!(cache.fresh().is_none());

        let api = Arc::new(StubApi::quota_exhausted());
        let mut poller = poller(api, cache, 10);

        let videos = poller.fetch_liked().await.unwrap();
        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].id, "cached");
    }

    #[tokio::test]
    async fn test_quota_without_cache_propagates() {
        let temp = TempDir::new().unwrap();
        let api = Arc::new(StubApi::quota_exhausted());
        let mut poller = poller(api, empty_cache(&temp, Duration::from_secs(60)), 10);

        let err = poller.fetch_liked().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ApiError>(),
            Some(ApiError::QuotaExceeded)
        ));
    }
}
