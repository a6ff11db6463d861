use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Request admission limits
    pub limits: LimitsConfig,

    /// Metadata resolution settings
    pub resolver: ResolverConfig,

    /// Audio acquisition settings
    pub acquisition: AcquisitionConfig,

    /// Transcode settings
    pub transcode: TranscodeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,

    /// Bind port
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum media duration accepted for conversion, in seconds
    pub max_duration_secs: u64,

    /// Conversion requests allowed per client per window
    pub rate_limit: u64,

    /// Rate limit window length in seconds
    pub rate_window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Timeout for watch-page fetches, in seconds
    pub page_fetch_timeout_secs: u64,

    /// Base delay between acquisition strategies, in milliseconds
    pub strategy_delay_ms: u64,

    /// Additional random jitter on top of the base delay, in milliseconds
    pub strategy_jitter_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Streaming (live byte stream + local transcode) or batch
    /// (single external extract+transcode invocation)
    pub mode: AcquisitionMode,

    /// Timeout for opening a remote audio stream, in seconds
    pub stream_open_timeout_secs: u64,

    /// Overall timeout for one batch extraction, in seconds
    pub batch_timeout_secs: u64,

    /// Format-fallback attempt budget in streaming mode
    pub max_attempts: usize,
}

/// How the audio bitstream is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionMode {
    /// Resolve a direct audio URL and stream it down, then transcode locally
    Streaming,
    /// Let the extraction tool download and transcode in one call
    Batch,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeConfig {
    /// Target audio codec
    pub codec: String,

    /// Target bitrate in kbps
    pub bitrate_kbps: u32,

    /// Target sample rate in Hz
    pub sample_rate_hz: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            limits: LimitsConfig {
                max_duration_secs: 600,
                rate_limit: 5,
                rate_window_secs: 3600,
            },
            resolver: ResolverConfig {
                page_fetch_timeout_secs: 15,
                strategy_delay_ms: 200,
                strategy_jitter_ms: 400,
            },
            acquisition: AcquisitionConfig {
                mode: AcquisitionMode::Batch,
                stream_open_timeout_secs: 10,
                batch_timeout_secs: 120,
                max_attempts: 3,
            },
            transcode: TranscodeConfig {
                codec: "libmp3lame".to_string(),
                bitrate_kbps: 192,
                sample_rate_hz: 44100,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("tubeconv").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_duration_secs == 0 {
            anyhow::bail!("limits.max_duration_secs must be positive");
        }
        if self.limits.rate_limit == 0 {
            anyhow::bail!("limits.rate_limit must be positive");
        }
        if self.limits.rate_window_secs == 0 {
            anyhow::bail!("limits.rate_window_secs must be positive");
        }
        if self.acquisition.max_attempts == 0 {
            anyhow::bail!("acquisition.max_attempts must be positive");
        }
        if self.transcode.bitrate_kbps == 0 || self.transcode.sample_rate_hz == 0 {
            anyhow::bail!("transcode bitrate and sample rate must be positive");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        println!("  Duration cap: {}s", self.limits.max_duration_secs);
        println!(
            "  Rate limit: {} requests / {}s",
            self.limits.rate_limit, self.limits.rate_window_secs
        );
        println!("  Acquisition mode: {:?}", self.acquisition.mode);
        println!(
            "  Transcode: {} @ {} kbps / {} Hz",
            self.transcode.codec, self.transcode.bitrate_kbps, self.transcode.sample_rate_hz
        );
    }
}
