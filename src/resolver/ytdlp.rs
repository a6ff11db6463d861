use async_trait::async_trait;
use serde_json::Value;

use super::headers::RequestProfile;
use super::MetadataStrategy;
use crate::error::Result;
use crate::media::{default_thumbnail, watch_url, VideoId, VideoMetadata};
use crate::ytdlp::YtDlp;

/// Structured extraction with full browser-like headers.
pub struct YtDlpFull {
    ytdlp: YtDlp,
}

impl YtDlpFull {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl MetadataStrategy for YtDlpFull {
    fn name(&self) -> &'static str {
        "ytdlp-full"
    }

    async fn resolve(&self, id: &VideoId, profile: &RequestProfile) -> Result<VideoMetadata> {
        let info = self.ytdlp.dump_json(&watch_url(id), Some(profile)).await?;
        Ok(metadata_from_json(id, &info))
    }
}

/// Structured extraction with the tool's default headers. Sometimes
/// succeeds where the browser-like profile is being challenged.
pub struct YtDlpBasic {
    ytdlp: YtDlp,
}

impl YtDlpBasic {
    pub fn new(ytdlp: YtDlp) -> Self {
        Self { ytdlp }
    }
}

#[async_trait]
impl MetadataStrategy for YtDlpBasic {
    fn name(&self) -> &'static str {
        "ytdlp-basic"
    }

    async fn resolve(&self, id: &VideoId, _profile: &RequestProfile) -> Result<VideoMetadata> {
        let info = self.ytdlp.dump_json(&watch_url(id), None).await?;
        Ok(metadata_from_json(id, &info))
    }
}

fn metadata_from_json(id: &VideoId, info: &Value) -> VideoMetadata {
    VideoMetadata {
        title: info["title"]
            .as_str()
            .unwrap_or("Unknown Title")
            .to_string(),
        duration_secs: info["duration"].as_f64().unwrap_or(0.0).max(0.0) as u64,
        thumbnail: info["thumbnail"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| default_thumbnail(id)),
        id: id.clone(),
        author: info["uploader"]
            .as_str()
            .or_else(|| info["channel"].as_str())
            .unwrap_or("Unknown")
            .to_string(),
    }
}
