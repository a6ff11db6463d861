use async_trait::async_trait;

pub mod degraded;
pub mod headers;
pub mod scrape;
pub mod ytdlp;

use crate::config::ResolverConfig;
use crate::error::{ConvertError, Result};
use crate::media::{VideoId, VideoMetadata};
use crate::ytdlp::YtDlp;
use headers::RequestProfile;

/// One interchangeable way of resolving video metadata.
#[async_trait]
pub trait MetadataStrategy: Send + Sync {
    /// Short stable name for logs and attempt records
    fn name(&self) -> &'static str;

    /// Resolve metadata for the given identifier, classifying any failure
    async fn resolve(&self, id: &VideoId, profile: &RequestProfile) -> Result<VideoMetadata>;
}

/// Record of one failed strategy attempt, kept only to pick the most
/// specific error once the chain exhausts.
struct AttemptRecord {
    strategy: &'static str,
    error: ConvertError,
}

/// Walks an ordered chain of metadata strategies.
///
/// Fatal classifications short-circuit; retryable ones fall through to
/// the next strategy after a jittered delay with a freshly rotated
/// request profile.
pub struct MetadataResolver {
    strategies: Vec<Box<dyn MetadataStrategy>>,
    delay_base_ms: u64,
    delay_jitter_ms: u64,
}

impl MetadataResolver {
    /// Build the default chain: page scrape, structured extraction with
    /// full headers, basic structured extraction, identifier-only.
    pub fn from_config(config: &ResolverConfig, ytdlp: YtDlp) -> Self {
        let timeout = std::time::Duration::from_secs(config.page_fetch_timeout_secs);
        Self::with_strategies(
            vec![
                Box::new(scrape::PageScrape::new(timeout)),
                Box::new(ytdlp::YtDlpFull::new(ytdlp.clone())),
                Box::new(ytdlp::YtDlpBasic::new(ytdlp)),
                Box::new(degraded::IdentifierOnly),
            ],
            config.strategy_delay_ms,
            config.strategy_jitter_ms,
        )
    }

    pub fn with_strategies(
        strategies: Vec<Box<dyn MetadataStrategy>>,
        delay_base_ms: u64,
        delay_jitter_ms: u64,
    ) -> Self {
        Self {
            strategies,
            delay_base_ms,
            delay_jitter_ms,
        }
    }

    pub async fn resolve(&self, id: &VideoId) -> Result<VideoMetadata> {
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for (index, strategy) in self.strategies.iter().enumerate() {
            let profile = headers::pick_profile(&mut rand::thread_rng());

            match strategy.resolve(id, &profile).await {
                Ok(metadata) => {
                    tracing::debug!(
                        strategy = strategy.name(),
                        video_id = %id,
                        "metadata resolved"
                    );
                    return Ok(metadata);
                }
                Err(e) if e.is_fatal() => {
                    // Metadata will not change on another strategy
                    tracing::info!(
                        strategy = strategy.name(),
                        video_id = %id,
                        error = %e,
                        "fatal classification, stopping chain"
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        strategy = strategy.name(),
                        video_id = %id,
                        error = %e,
                        "strategy failed, trying next"
                    );
                    attempts.push(AttemptRecord {
                        strategy: strategy.name(),
                        error: e,
                    });
                }
            }

            if index + 1 < self.strategies.len() {
                let delay = headers::jittered_delay(
                    self.delay_base_ms,
                    self.delay_jitter_ms,
                    &mut rand::thread_rng(),
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(most_specific(attempts))
    }
}

/// Surface the clearest recorded failure; first seen wins ties.
fn most_specific(attempts: Vec<AttemptRecord>) -> ConvertError {
    let mut best: Option<AttemptRecord> = None;
    for attempt in attempts {
        match &best {
            Some(b) if attempt.error.specificity() <= b.error.specificity() => {}
            _ => best = Some(attempt),
        }
    }

    match best {
        Some(attempt) => {
            tracing::debug!(strategy = attempt.strategy, "surfacing most specific failure");
            attempt.error
        }
        None => ConvertError::Internal("no metadata strategies configured".to_string()),
    }
}
