use std::sync::Arc;

use crate::config::Config;
use crate::convert::ConversionPipeline;
use crate::ratelimit::RateLimiter;

/// Shared application state accessible to all route handlers.
///
/// Cloned per request; everything inside is behind an Arc.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub pipeline: Arc<ConversionPipeline>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        pipeline: Arc<ConversionPipeline>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            config,
            pipeline,
            limiter,
        }
    }
}
