//! Shared command line handling for the scraping binaries.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Args;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::client::ScorpionClient;
use crate::config::{OutputFormats, ScrapeConfig, RANKING_BASE_URL, SCORPION_BASE_URL};
use crate::fetch::RetryPolicy;
use crate::error::Result;
use crate::pipeline::{Orchestrator, StageDescriptor, StageSummary};
use crate::store::Format;

/// Options common to every scraping binary.
#[derive(Debug, Clone, Args)]
pub struct ScrapeArgs {
    /// Directory holding the snapshot files
    #[arg(long, env = "SCORPION_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Tournament site
    #[arg(long, env = "SCORPION_BASE_URL", default_value = SCORPION_BASE_URL)]
    pub base_url: String,

    /// ITHF ranking site
    #[arg(long, env = "SCORPION_RANKING_URL", default_value = RANKING_BASE_URL)]
    pub ranking_url: String,

    /// Requests in flight at once
    #[arg(long, default_value_t = 10)]
    pub concurrency: usize,

    /// Attempts per URL before giving up
    #[arg(long, default_value_t = 3)]
    pub retries: u32,

    /// Delay before the first retry, doubled on each further one
    #[arg(long, default_value_t = 500)]
    pub retry_delay_ms: u64,

    /// Per-request timeout
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Newest archive pages to scan for tournaments
    #[arg(long, default_value_t = 5)]
    pub archive_pages: u32,

    /// User agent sent with every request
    #[arg(long, default_value = "Mozilla/5.0")]
    pub user_agent: String,

    /// Write every snapshot in this format instead of the per-entity default
    #[arg(long, value_enum)]
    pub format: Option<Format>,

    /// Re-fetch records that are already in the snapshots
    #[arg(long)]
    pub refresh: bool,
}

impl ScrapeArgs {
    pub fn into_config(self) -> ScrapeConfig {
        ScrapeConfig {
            data_dir: self.data_dir,
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            ranking_base_url: self.ranking_url.trim_end_matches('/').to_owned(),
            user_agent: self.user_agent,
            timeout: Duration::from_secs(self.timeout_secs),
            concurrency: self.concurrency,
            retry: RetryPolicy::new(self.retries, Duration::from_millis(self.retry_delay_ms)),
            archive_pages: self.archive_pages,
            refresh: self.refresh,
            formats: self
                .format
                .map(OutputFormats::uniform)
                .unwrap_or_default(),
        }
    }
}

/// Install the log subscriber on stderr; `RUST_LOG` overrides the default
/// `info`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run `stages` against the live sites.
pub async fn run(stages: &[StageDescriptor], args: ScrapeArgs) -> ExitCode {
    let config = args.into_config();
    let client = match ScorpionClient::from_config(&config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "could not set up the http client");
            return ExitCode::FAILURE;
        }
    };

    let outcome = Orchestrator::new(client, config).run(stages).await;
    exit_code(&outcome)
}

/// Success when every stage completed, even with failed pages; failure
/// only for an error that aborted the run.
fn exit_code(outcome: &Result<Vec<StageSummary>>) -> ExitCode {
    match outcome {
        Ok(summaries) => {
            let failed: usize = summaries.iter().map(|s| s.failed()).sum();
            info!(stages = summaries.len(), failed_urls = failed, "run complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "run aborted");
            ExitCode::FAILURE
        }
    }
}
