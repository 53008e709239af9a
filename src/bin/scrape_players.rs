use std::process::ExitCode;

use clap::Parser;
use scorpion_scraper::cli::{self, ScrapeArgs};
use scorpion_scraper::StageDescriptor;

/// Fetch profiles of players referenced by stored matches.
#[derive(Parser)]
#[command(name = "scrape_players", version)]
struct Cli {
    #[command(flatten)]
    args: ScrapeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();
    let cli = Cli::parse();
    cli::run(&[StageDescriptor::PLAYERS], cli.args).await
}
