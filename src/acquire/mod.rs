use futures_util::StreamExt;
use reqwest::header::USER_AGENT;
use std::time::Duration;

use crate::config::AcquisitionConfig;
use crate::error::{ConvertError, Result};
use crate::lifecycle::{unique_stem, ScopedArtifact, Workspace};
use crate::media::{watch_url, VideoId};
use crate::resolver::headers::{self, RequestProfile};
use crate::ytdlp::YtDlp;

/// Format selectors tried in order: highest-quality audio-only, then
/// lowest, then any representation containing audio.
const FORMAT_FALLBACK: &[&str] = &["bestaudio", "worstaudio", "best"];

const RETRY_DELAY_MS: u64 = 200;
const RETRY_JITTER_MS: u64 = 400;

/// Fetches the audio bitstream for a video, either as a completed
/// in-memory buffer (streaming mode) or as a finished MP3 on disk
/// (batch mode, where the external tool also transcodes).
pub struct AudioAcquirer {
    ytdlp: YtDlp,
    client: reqwest::Client,
    config: AcquisitionConfig,
}

impl AudioAcquirer {
    pub fn new(ytdlp: YtDlp, config: AcquisitionConfig) -> Self {
        Self {
            ytdlp,
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Streaming mode: walk the format-fallback chain until one selector
    /// yields a complete stream.
    pub async fn acquire_stream(&self, id: &VideoId) -> Result<Vec<u8>> {
        let mut failures: Vec<ConvertError> = Vec::new();
        let budget = self.config.max_attempts.min(FORMAT_FALLBACK.len()).max(1);

        for (index, format) in FORMAT_FALLBACK.iter().take(budget).enumerate() {
            let profile = headers::pick_profile(&mut rand::thread_rng());

            match self.try_stream(id, format, &profile).await {
                Ok(buffer) => {
                    tracing::info!(
                        video_id = %id,
                        format,
                        bytes = buffer.len(),
                        "audio stream acquired"
                    );
                    return Ok(buffer);
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    tracing::warn!(video_id = %id, format, error = %e, "stream attempt failed");
                    failures.push(e);
                }
            }

            if index + 1 < budget {
                let delay = headers::jittered_delay(
                    RETRY_DELAY_MS,
                    RETRY_JITTER_MS,
                    &mut rand::thread_rng(),
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(surface(failures))
    }

    async fn try_stream(
        &self,
        id: &VideoId,
        format: &str,
        profile: &RequestProfile,
    ) -> Result<Vec<u8>> {
        let stream_url = self
            .ytdlp
            .resolve_stream_url(&watch_url(id), format, profile)
            .await?;

        self.download_stream(&stream_url, profile).await
    }

    /// Download a direct media URL to completion.
    ///
    /// Success requires at least one data chunk plus a clean end of
    /// stream; a mid-transfer error discards everything accumulated so
    /// far rather than resuming from the failure point.
    async fn download_stream(&self, stream_url: &str, profile: &RequestProfile) -> Result<Vec<u8>> {
        let open_timeout = Duration::from_secs(self.config.stream_open_timeout_secs);

        let response = tokio::time::timeout(
            open_timeout,
            self.client
                .get(stream_url)
                .header(USER_AGENT, profile.user_agent)
                .send(),
        )
        .await
        .map_err(|_| ConvertError::UpstreamTransient("stream open timed out".to_string()))??;

        if !response.status().is_success() {
            return Err(ConvertError::UpstreamTransient(format!(
                "stream responded HTTP {}",
                response.status()
            )));
        }

        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                ConvertError::UpstreamTransient(format!("stream interrupted: {e}"))
            })?;
            buffer.extend_from_slice(&chunk);
        }

        if buffer.is_empty() {
            // Clean end of stream with nothing in it is a failure, not an
            // empty success
            return Err(ConvertError::NoAudioAvailable);
        }

        Ok(buffer)
    }

    /// Batch mode: one external extract+transcode invocation against a
    /// request-unique output template. The returned artifact owns the
    /// finished MP3.
    pub async fn acquire_batch(&self, id: &VideoId, workspace: &Workspace) -> Result<ScopedArtifact> {
        let stem = unique_stem(id);
        let template = workspace.path().join(format!("{stem}.%(ext)s"));
        let final_path = workspace.path().join(format!("{stem}.mp3"));

        // Armed before the call so partial output is cleaned on any
        // failure path below
        let artifact = ScopedArtifact::new(final_path);

        let profile = headers::pick_profile(&mut rand::thread_rng());
        let batch_timeout = Duration::from_secs(self.config.batch_timeout_secs);

        tokio::time::timeout(
            batch_timeout,
            self.ytdlp
                .extract_audio(&watch_url(id), &template.to_string_lossy(), &profile),
        )
        .await
        .map_err(|_| ConvertError::UpstreamTransient("batch extraction timed out".to_string()))??;

        let size = fs_err::metadata(artifact.path()).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(ConvertError::NoAudioAvailable);
        }

        tracing::info!(video_id = %id, bytes = size, "batch audio extracted");
        Ok(artifact)
    }
}

/// Pick the most specific recorded failure; first seen wins ties.
fn surface(failures: Vec<ConvertError>) -> ConvertError {
    let mut best: Option<ConvertError> = None;
    for failure in failures {
        match &best {
            Some(b) if failure.specificity() <= b.specificity() => {}
            _ => best = Some(failure),
        }
    }
    best.unwrap_or_else(|| ConvertError::Internal("no acquisition attempts made".to_string()))
}
