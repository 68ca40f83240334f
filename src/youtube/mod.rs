//! YouTube catalog integration.
//!
//! - `api`: Data API v3 client for the liked-videos listing
//! - `cache`: persisted response cache with TTL and stale fallback
//! - `limiter`: request spacing gate
//! - `poller`: quota-aware paginated listing fetch

pub mod api;
pub mod cache;
pub mod limiter;
pub mod poller;

pub use api::{ApiError, LikedPage, LikedVideo, LikesApi, YouTubeApi};
pub use cache::{CachedListing, ResponseCache};
pub use limiter::RequestSpacer;
pub use poller::LikesPoller;
