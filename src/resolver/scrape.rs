use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use super::headers::RequestProfile;
use super::MetadataStrategy;
use crate::error::{ConvertError, Result};
use crate::media::{default_thumbnail, VideoId, VideoMetadata};

/// Metadata strategy that fetches the watch page directly and reads the
/// embedded player response, avoiding the external extractor entirely.
pub struct PageScrape {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl PageScrape {
    pub fn new(timeout: Duration) -> Self {
        Self::with_base_url("https://www.youtube.com", timeout)
    }

    /// Base URL override for tests against a local fake upstream.
    pub fn with_base_url(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl MetadataStrategy for PageScrape {
    fn name(&self) -> &'static str {
        "page-scrape"
    }

    async fn resolve(&self, id: &VideoId, profile: &RequestProfile) -> Result<VideoMetadata> {
        let url = format!("{}/watch?v={}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, profile.user_agent)
            .header(ACCEPT_LANGUAGE, profile.accept_language)
            .timeout(self.timeout)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ConvertError::NotFound),
            StatusCode::FORBIDDEN => return Err(ConvertError::BotDetection),
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(ConvertError::UpstreamTransient("HTTP 429".into()))
            }
            status if !status.is_success() => {
                return Err(ConvertError::UpstreamTransient(format!("HTTP {status}")))
            }
            _ => {}
        }

        let body = response.text().await?;

        let player = extract_player_response(&body).ok_or_else(|| {
            if body.contains("Sign in to confirm") {
                ConvertError::BotDetection
            } else {
                ConvertError::UpstreamTransient("player response missing from page".into())
            }
        })?;

        check_playability(&player)?;

        let details = &player["videoDetails"];
        let title = details["title"]
            .as_str()
            .ok_or_else(|| ConvertError::UpstreamTransient("page missing video details".into()))?;

        Ok(VideoMetadata {
            title: title.to_string(),
            duration_secs: details["lengthSeconds"]
                .as_str()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            thumbnail: details["thumbnail"]["thumbnails"]
                .as_array()
                .and_then(|t| t.last())
                .and_then(|t| t["url"].as_str())
                .map(str::to_string)
                .unwrap_or_else(|| default_thumbnail(id)),
            id: id.clone(),
            author: details["author"].as_str().unwrap_or("Unknown").to_string(),
        })
    }
}

/// Map the embedded playability verdict to a classified error.
fn check_playability(player: &Value) -> Result<()> {
    let status = player["playabilityStatus"]["status"]
        .as_str()
        .unwrap_or("OK");
    let reason = player["playabilityStatus"]["reason"]
        .as_str()
        .unwrap_or("")
        .to_lowercase();

    match status {
        "OK" => Ok(()),
        "LOGIN_REQUIRED" if reason.contains("bot") => Err(ConvertError::BotDetection),
        "LOGIN_REQUIRED" if reason.contains("age") => Err(ConvertError::AgeRestricted),
        "LOGIN_REQUIRED" => Err(ConvertError::PrivateOrRestricted),
        "AGE_CHECK_REQUIRED" | "AGE_VERIFICATION_REQUIRED" => Err(ConvertError::AgeRestricted),
        "UNPLAYABLE" if reason.contains("country") || reason.contains("region") => {
            Err(ConvertError::RegionBlocked)
        }
        "UNPLAYABLE" if reason.contains("private") => Err(ConvertError::PrivateOrRestricted),
        "ERROR" => Err(ConvertError::NotFound),
        other => Err(ConvertError::UpstreamTransient(format!(
            "unplayable: {other}"
        ))),
    }
}

/// Locate and parse the `ytInitialPlayerResponse` JSON object embedded in
/// the watch-page HTML.
fn extract_player_response(body: &str) -> Option<Value> {
    let start = body.find("ytInitialPlayerResponse")?;
    let rest = &body[start..];
    let brace = rest.find('{')?;
    let json = balanced_object(&rest[brace..])?;
    serde_json::from_str(json).ok()
}

/// Slice out one balanced `{...}` object, respecting string literals and
/// escapes.
fn balanced_object(s: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }

    None
}
