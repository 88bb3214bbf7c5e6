//! Tramitero CLI — ingest scraped trámite batches and answer questions
//! about them.
//!
//! Merges scraper JSON exports into a deduplicated document set, publishes
//! it to a vector index, and serves grounded answers over it.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
