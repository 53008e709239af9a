use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use scorpion_scraper::cli;
use scorpion_scraper::{ScorpionClient, ScrapeConfig};
use tracing::error;

/// Print the monthly ITHF ranking history of one player as CSV.
#[derive(Parser)]
#[command(name = "player_ranking", version)]
struct Cli {
    /// Player id on the ITHF ranking site
    #[arg(long)]
    ithf_id: u32,

    /// ITHF ranking site
    #[arg(long, env = "SCORPION_RANKING_URL", default_value = scorpion_scraper::config::RANKING_BASE_URL)]
    ranking_url: String,

    /// Per-request timeout
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::init_logging();
    let cli = Cli::parse();

    let config = ScrapeConfig {
        ranking_base_url: cli.ranking_url.trim_end_matches('/').to_owned(),
        timeout: Duration::from_secs(cli.timeout_secs),
        ..ScrapeConfig::default()
    };
    let client = match ScorpionClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "could not set up the http client");
            return ExitCode::FAILURE;
        }
    };

    let history = match client.get_player_ranking(cli.ithf_id).await {
        Ok(history) => history,
        Err(e) => {
            error!(error = %e, ithf_id = cli.ithf_id, "could not fetch ranking history");
            return ExitCode::FAILURE;
        }
    };

    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for point in &history {
        if let Err(e) = writer.serialize(point) {
            error!(error = %e, "could not write ranking history");
            return ExitCode::FAILURE;
        }
    }
    if let Err(e) = writer.flush() {
        error!(error = %e, "could not write ranking history");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
