use anyhow::Result;
use clap::Parser;

mod cli;
mod config;
mod data;
mod remote;
mod search;
mod storage;
mod store;
mod types;
mod user;
mod validate;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    cli.run().await
}
