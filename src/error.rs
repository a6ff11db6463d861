use thiserror::Error;

/// Result type used throughout the conversion pipeline
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Classified failure for every stage of the conversion pipeline.
///
/// Strategies and engines return these directly instead of stringly-typed
/// errors, so fallback decisions (fatal vs retryable) and the HTTP mapping
/// happen in exactly one place.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    #[error("video is too long: {duration_secs}s exceeds the {limit_secs}s limit")]
    DurationExceeded { duration_secs: u64, limit_secs: u64 },

    #[error("video not found or unavailable")]
    NotFound,

    #[error("video is private or restricted")]
    PrivateOrRestricted,

    #[error("video is age-restricted")]
    AgeRestricted,

    #[error("video is not available in this region")]
    RegionBlocked,

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("upstream bot detection triggered")]
    BotDetection,

    #[error("transient upstream failure: {0}")]
    UpstreamTransient(String),

    #[error("no audio representation available")]
    NoAudioAvailable,

    #[error("transcode failed: {0}")]
    TranscodeFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

impl ConvertError {
    /// Fatal classifications short-circuit strategy chains: trying another
    /// acquisition strategy cannot change the outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidUrl(_)
                | ConvertError::DurationExceeded { .. }
                | ConvertError::NotFound
                | ConvertError::PrivateOrRestricted
                | ConvertError::AgeRestricted
                | ConvertError::RegionBlocked
        )
    }

    /// Retryable classifications let the caller fall through to the next
    /// strategy or format selector.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConvertError::BotDetection | ConvertError::UpstreamTransient(_) => true,
            // Filesystem/environment hiccups may clear up on the next strategy
            ConvertError::Io(_) => true,
            ConvertError::Network(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// HTTP status for the boundary mapping (§ error taxonomy).
    pub fn status_code(&self) -> u16 {
        match self {
            ConvertError::InvalidUrl(_) | ConvertError::DurationExceeded { .. } => 400,
            ConvertError::NotFound => 404,
            ConvertError::PrivateOrRestricted
            | ConvertError::AgeRestricted
            | ConvertError::RegionBlocked => 403,
            ConvertError::RateLimited { .. } => 429,
            _ => 500,
        }
    }

    /// Machine-readable error code for JSON bodies and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConvertError::InvalidUrl(_) => "invalid_url",
            ConvertError::DurationExceeded { .. } => "duration_exceeded",
            ConvertError::NotFound => "not_found",
            ConvertError::PrivateOrRestricted => "private_or_restricted",
            ConvertError::AgeRestricted => "age_restricted",
            ConvertError::RegionBlocked => "region_blocked",
            ConvertError::RateLimited { .. } => "rate_limited",
            ConvertError::BotDetection => "bot_detection",
            ConvertError::UpstreamTransient(_) => "upstream_transient",
            ConvertError::NoAudioAvailable => "no_audio_available",
            ConvertError::TranscodeFailed(_) => "transcode_failed",
            ConvertError::Io(_) => "io_error",
            ConvertError::Network(_) => "network_error",
            ConvertError::Internal(_) => "internal_error",
        }
    }

    /// User-facing message. Upstream error text never leaks through here.
    pub fn public_message(&self) -> &'static str {
        match self {
            ConvertError::InvalidUrl(_) => "Invalid YouTube URL",
            ConvertError::DurationExceeded { .. } => "Video is too long (max 10 minutes)",
            ConvertError::NotFound => "Video not found or unavailable",
            ConvertError::PrivateOrRestricted => "Video is private or restricted",
            ConvertError::AgeRestricted => "Video is age-restricted",
            ConvertError::RegionBlocked => "Video is not available in your region",
            ConvertError::RateLimited { .. } => "Too many requests",
            ConvertError::NoAudioAvailable => "No audio could be extracted from this video",
            ConvertError::TranscodeFailed(_) => "Failed to convert video to MP3",
            _ => "Internal server error",
        }
    }

    /// Ranking used when a strategy chain exhausts: surface the clearest
    /// recorded failure rather than whichever happened last.
    pub fn specificity(&self) -> u8 {
        match self {
            _ if self.is_fatal() => 3,
            ConvertError::BotDetection | ConvertError::NoAudioAvailable => 2,
            ConvertError::UpstreamTransient(_)
            | ConvertError::Network(_)
            | ConvertError::Io(_) => 1,
            _ => 0,
        }
    }
}

/// Map yt-dlp stderr output to a classified error.
///
/// This is substring matching on upstream wording and is best-effort by
/// nature: the phrases change without notice. Every pattern lives in this
/// one table so wording drift shows up as a single test delta instead of
/// scattered breakage.
pub fn classify_extractor_output(stderr: &str) -> ConvertError {
    let text = stderr.to_lowercase();

    // Age check precedes bot check: "Sign in to confirm your age" would
    // otherwise match the bot-challenge phrase "Sign in to confirm".
    if text.contains("confirm your age") || text.contains("age-restricted") {
        return ConvertError::AgeRestricted;
    }
    if text.contains("not available in your country")
        || text.contains("geo restriction")
        || text.contains("blocked it in your country")
    {
        return ConvertError::RegionBlocked;
    }
    if text.contains("sign in to confirm") || text.contains("not a bot") {
        return ConvertError::BotDetection;
    }
    if text.contains("private video") || text.contains("video is private") {
        return ConvertError::PrivateOrRestricted;
    }
    if text.contains("video unavailable")
        || text.contains("not found")
        || text.contains("does not exist")
        || text.contains("no longer available")
    {
        return ConvertError::NotFound;
    }
    if text.contains("restricted") {
        return ConvertError::PrivateOrRestricted;
    }
    if text.contains("requested format is not available") || text.contains("no audio") {
        return ConvertError::NoAudioAvailable;
    }
    if text.contains("timed out")
        || text.contains("timeout")
        || text.contains("connection")
        || text.contains("temporary failure")
        || text.contains("http error 429")
        || text.contains("http error 5")
    {
        return ConvertError::UpstreamTransient(truncate(stderr, 200));
    }

    ConvertError::Internal(truncate(stderr, 200))
}

fn truncate(text: &str, max: usize) -> String {
    let trimmed = text.trim();
    if trimmed.len() <= max {
        trimmed.to_string()
    } else {
        let mut end = max;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        trimmed[..end].to_string()
    }
}
