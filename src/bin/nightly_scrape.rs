use std::process::ExitCode;

use clap::Parser;
use scorpion_scraper::cli::{self, ScrapeArgs};
use scorpion_scraper::NIGHTLY;

/// Scrape new tournaments, their matches and the players in them.
#[derive(Parser)]
#[command(name = "nightly_scrape", version)]
struct Cli {
    #[command(flatten)]
    args: ScrapeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();
    let cli = Cli::parse();
    cli::run(NIGHTLY, cli.args).await
}
