use async_trait::async_trait;

use super::headers::RequestProfile;
use super::MetadataStrategy;
use crate::error::Result;
use crate::media::{default_thumbnail, VideoId, VideoMetadata};

/// Last-resort strategy synthesizing minimal metadata from the identifier
/// alone. Never touches the network and never fails.
///
/// Duration 0 here means "unknown", not zero-length; callers must treat
/// it accordingly.
pub struct IdentifierOnly;

#[async_trait]
impl MetadataStrategy for IdentifierOnly {
    fn name(&self) -> &'static str {
        "identifier-only"
    }

    async fn resolve(&self, id: &VideoId, _profile: &RequestProfile) -> Result<VideoMetadata> {
        Ok(VideoMetadata {
            title: "Unknown Title".to_string(),
            duration_secs: 0,
            thumbnail: default_thumbnail(id),
            id: id.clone(),
            author: "Unknown".to_string(),
        })
    }
}
