//! Heuristic music classifier for liked videos.

use crate::youtube::LikedVideo;

/// YouTube's category id for Music
pub const MUSIC_CATEGORY_ID: &str = "10";

const MUSIC_KEYWORDS: &[&str] = &["music", "song", "audio", "remix", "track"];

/// True when the video looks like music content.
///
/// Either the platform tagged it with the Music category, or the title or
/// channel name contains a music keyword (case-insensitive substring).
/// False positives and negatives are accepted.
pub fn is_music(video: &LikedVideo) -> bool {
    if video.category_id == MUSIC_CATEGORY_ID {
        return true;
    }

    let title = video.title.to_lowercase();
    let channel = video.channel.to_lowercase();
    MUSIC_KEYWORDS
        .iter()
        .any(|kw| title.contains(kw) || channel.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn video(title: &str, channel: &str, category_id: &str) -> LikedVideo {
        LikedVideo {
            id: "x".to_string(),
            title: title.to_string(),
            channel: channel.to_string(),
            description: String::new(),
            published_at: None,
            category_id: category_id.to_string(),
        }
    }

    #[test]
    fn test_music_category_retained_regardless_of_title() {
        assert!(is_music(&video("Cooking pasta at home", "Kitchen TV", "10")));
    }

    #[test]
    fn test_keyword_in_title_retained() {
        assert!(is_music(&video("Official Remix", "Some Uploader", "22")));
    }

    #[test]
    fn test_keyword_in_channel_retained() {
        assert!(is_music(&video("Late night set", "Trance Music Hub", "22")));
        // Case-insensitive
        assert!(is_music(&video("new SONG premiere", "uploader", "22")));
    }

    #[test]
    fn test_neither_category_nor_keyword_dropped() {
        assert!(!is_music(&video("Woodworking basics", "Shop Class", "26")));
    }
}
