use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tubeconv::api::{self, AppState};
use tubeconv::cli::{Cli, Commands};
use tubeconv::config::Config;
use tubeconv::convert::ConversionPipeline;
use tubeconv::ratelimit::{MemoryCounterStore, RateLimiter};
use tubeconv::utils;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let default_filter = if cli.verbose {
        "tubeconv=debug"
    } else {
        "tubeconv=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Check for required external dependencies (non-fatal at startup)
    let missing_deps = utils::check_dependencies().await;
    if !missing_deps.is_empty() {
        eprintln!("⚠️  Dependency check warnings:");
        for dep in &missing_deps {
            eprintln!("   • {}", dep);
        }
        eprintln!("   (Continuing anyway - tools may be installed later)");
    }

    let config = Config::load().await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let pipeline = ConversionPipeline::new(config.clone())?;
            let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::new()));
            let state = AppState::new(
                Arc::new(config),
                Arc::new(pipeline),
                Arc::new(limiter),
            );

            api::serve(state, &host, port).await?;
        }
        Commands::Check => {
            if missing_deps.is_empty() {
                println!("All required tools are available");
            } else {
                println!("Missing tools:");
                for dep in &missing_deps {
                    println!("  • {}", dep);
                }
                std::process::exit(1);
            }
        }
        Commands::Config => {
            config.display();
        }
    }

    Ok(())
}
