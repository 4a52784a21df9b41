//! CrisisDesk CLI: crisis simulation reports from a briefing.
//!
//! Combines a briefing with the instruction template, asks the model for a
//! report, and renders the reply as a paginated document.

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
