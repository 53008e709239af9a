use std::process::ExitCode;

use clap::Parser;
use scorpion_scraper::cli::{self, ScrapeArgs};
use scorpion_scraper::StageDescriptor;

/// Scrape the matches of stored individual tournaments.
#[derive(Parser)]
#[command(name = "scrape_matches", version)]
struct Cli {
    #[command(flatten)]
    args: ScrapeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();
    let cli = Cli::parse();
    cli::run(&[StageDescriptor::MATCHES], cli.args).await
}
