use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tubeconv",
    about = "tubeconv - Convert YouTube videos to MP3 over a simple HTTP API",
    version,
    long_about = "HTTP service that resolves YouTube video metadata and converts videos to MP3. Applies per-client rate limiting, a strict duration cap, and multi-strategy metadata acquisition with fallback."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Bind address (overrides config)
        #[arg(long, value_name = "HOST")]
        host: Option<String>,

        /// Bind port (overrides config)
        #[arg(short, long, value_name = "PORT")]
        port: Option<u16>,
    },

    /// Check availability of required external tools (yt-dlp, ffmpeg)
    Check,

    /// Show the effective configuration
    Config,
}
