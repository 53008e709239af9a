//! Scraper for table hockey tournaments, matches and players from
//! th.sportscorpion.com, plus the ITHF world ranking lists.
//!
//! Each run walks an ordered list of stages. A stage fetches pages through a
//! [`PageSource`], extracts records, merges them into the snapshot already on
//! disk and writes the result back atomically.
//!
//! ```no_run
//! # async fn example() -> scorpion_scraper::Result<()> {
//! use scorpion_scraper::{Orchestrator, ScorpionClient, ScrapeConfig, NIGHTLY};
//!
//! let config = ScrapeConfig::default();
//! let client = ScorpionClient::from_config(&config)?;
//! for summary in Orchestrator::new(client, config).run(NIGHTLY).await? {
//!     println!("{summary}");
//! }
//! # Ok(())
//! # }
//! ```

pub use client::ScorpionClient;
pub use config::{OutputFormats, ScrapeConfig};
pub use error::{ErrorKind, Result, ScorpionError};
pub use fetch::{FetchReport, Fetcher, PageSource, RetryPolicy};
pub use merge::{merge, MergeStats};
pub use model::*;
pub use pipeline::{Orchestrator, StageDescriptor, StageSummary, NIGHTLY, RANKINGS};
pub use store::{Format, SnapshotStore};

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod scraper;
pub mod store;
