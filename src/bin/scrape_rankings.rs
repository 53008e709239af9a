use std::process::ExitCode;

use clap::Parser;
use scorpion_scraper::cli::{self, ScrapeArgs};
use scorpion_scraper::RANKINGS;

/// Fetch the monthly ITHF world ranking lists.
#[derive(Parser)]
#[command(name = "scrape_rankings", version)]
struct Cli {
    #[command(flatten)]
    args: ScrapeArgs,
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();
    let cli = Cli::parse();
    cli::run(RANKINGS, cli.args).await
}
