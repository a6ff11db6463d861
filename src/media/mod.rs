use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical 11-character YouTube video identifier.
///
/// Only the URL normalizer constructs these, so holding a `VideoId` means
/// the token already passed the grammar check.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

impl VideoId {
    pub const LEN: usize = 11;

    /// Parse a raw token. Accepts exactly 11 characters of `[A-Za-z0-9_-]`.
    pub fn parse(token: &str) -> Option<Self> {
        if token.len() == Self::LEN
            && token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            Some(Self(token.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata resolved once per request, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoMetadata {
    /// Video title
    pub title: String,

    /// Duration in seconds; 0 means "unknown" when produced by the
    /// degraded identifier-only fallback
    pub duration_secs: u64,

    /// Thumbnail URL
    pub thumbnail: String,

    /// Canonical identifier
    pub id: VideoId,

    /// Channel or uploader name
    pub author: String,
}

/// Check whether a URL matches one of the supported YouTube shapes.
pub fn is_valid_youtube_url(url: &str) -> bool {
    extract_video_id(url).is_some()
}

/// Extract the canonical identifier from any supported URL shape.
///
/// Pure and total: unsupported or malformed input returns `None`, it never
/// panics and never touches the network. Two URLs for the same media
/// normalize to the same identifier.
pub fn extract_video_id(url: &str) -> Option<VideoId> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    let candidate = rest
        .strip_prefix("youtube.com/watch?v=")
        .or_else(|| rest.strip_prefix("youtu.be/"))
        .or_else(|| rest.strip_prefix("youtube.com/embed/"))
        .or_else(|| rest.strip_prefix("youtube.com/v/"))
        .or_else(|| rest.strip_prefix("m.youtube.com/watch?v="))?;

    // Trailing query parameters or path segments after the token are fine;
    // the identifier is always the first 11 characters.
    VideoId::parse(candidate.get(..VideoId::LEN)?)
}

/// Best-guess thumbnail derived purely from the identifier, used when no
/// strategy could fetch real metadata.
pub fn default_thumbnail(id: &VideoId) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id)
}

/// Canonical watch-page URL for an identifier.
pub fn watch_url(id: &VideoId) -> String {
    format!("https://www.youtube.com/watch?v={}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_extract_from_all_accepted_shapes() {
        let urls = [
            format!("https://www.youtube.com/watch?v={ID}"),
            format!("https://youtube.com/watch?v={ID}"),
            format!("http://www.youtube.com/watch?v={ID}"),
            format!("youtube.com/watch?v={ID}"),
            format!("https://youtu.be/{ID}"),
            format!("https://www.youtube.com/embed/{ID}"),
            format!("https://www.youtube.com/v/{ID}"),
            format!("https://m.youtube.com/watch?v={ID}"),
        ];
        for url in &urls {
            let id = extract_video_id(url).unwrap_or_else(|| panic!("rejected: {url}"));
            assert_eq!(id.as_str(), ID, "wrong id for {url}");
            assert!(is_valid_youtube_url(url));
        }
    }

    #[test]
    fn test_trailing_query_parameters_ignored() {
        let id = extract_video_id(&format!("https://www.youtube.com/watch?v={ID}&t=10s")).unwrap();
        assert_eq!(id.as_str(), ID);
        let id = extract_video_id(&format!("https://youtu.be/{ID}?si=abc123")).unwrap();
        assert_eq!(id.as_str(), ID);
    }

    #[test]
    fn test_rejects_malformed_urls() {
        let bad = [
            "https://example.com/notyoutube",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/watch?v=",
            "https://www.youtube.com/watch?list=PLabc",
            "https://youtu.be/way_too_long_for_an_id",
            "https://youtube.com/watch?v=dQw4w9WgXc!",
            "not a url at all",
            "",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
        ];
        for url in bad {
            assert!(extract_video_id(url).is_none(), "accepted: {url}");
            assert!(!is_valid_youtube_url(url));
        }
    }

    #[test]
    fn test_id_with_wrong_charset_too_long_rejected() {
        // 11 chars but one outside the allowed set
        assert!(extract_video_id("https://youtu.be/dQw4w9WgXc!").is_none());
        assert!(VideoId::parse("dQw4w9WgXcQ").is_some());
        assert!(VideoId::parse("dQw4w9WgXc").is_none());
        assert!(VideoId::parse("dQw4w9WgXcQQ").is_none());
    }

    #[test]
    fn test_same_media_normalizes_to_same_id() {
        let a = extract_video_id(&format!("https://youtu.be/{ID}")).unwrap();
        let b = extract_video_id(&format!("https://www.youtube.com/watch?v={ID}")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_default_thumbnail_derived_from_id() {
        let id = VideoId::parse(ID).unwrap();
        assert_eq!(
            default_thumbnail(&id),
            "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg"
        );
    }
}
