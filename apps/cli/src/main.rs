//! linkpost CLI: publish Dropmark bookmark collections as Hugo content.
//!
//! Fetches a collection, resolves each bookmarked link, and writes one
//! Markdown document with front matter per link.

mod commands;
mod progress;
mod settings;

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
