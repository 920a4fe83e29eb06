//! Narrator CLI: fetch and clean encyclopedia text, then keyword-annotate it.
//!
//! Produces the `content.json` document consumed by the image, audio, and
//! video stages.

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
