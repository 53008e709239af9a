use std::process::ExitCode;

use clap::Parser;
use scorpion_scraper::cli::{self, ScrapeArgs};
use scorpion_scraper::StageDescriptor;

/// Discover tournaments from the newest archive pages.
#[derive(Parser)]
#[command(name = "scrape_tournaments", version)]
struct Cli {
    #[command(flatten)]
    args: ScrapeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();
    let cli = Cli::parse();
    cli::run(&[StageDescriptor::TOURNAMENTS], cli.args).await
}
