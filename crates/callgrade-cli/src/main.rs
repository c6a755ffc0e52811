mod app;
mod args;
mod commands;

use anyhow::Result;
use clap::Parser;

use args::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    callgrade_core::logging::init(cli.verbose);

    match cli.command {
        Commands::Analyze(args) => commands::analyze::run(args).await,
        Commands::Transcribe(args) => commands::transcribe::run(args).await,
        Commands::CheckKeys => commands::check_keys::run().await,
        Commands::Score(args) => commands::score::run(args),
        Commands::Setup => commands::setup::run(),
    }
}
