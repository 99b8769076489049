//! copyforge CLI — staged, quality-gated article generation.
//!
//! Turns a content brief into a publish-ready article with verified
//! facts, SEO optimization, and structured data.

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
