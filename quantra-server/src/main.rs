//! Binary crate for the `quantra` weather assistant.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Interactive configuration
//! - Serving the web pages and the JSON query API

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the key may come from the config file instead.
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
