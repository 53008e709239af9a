use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::RetryPolicy;
use crate::model::Entity;
use crate::store::Format;

pub const SCORPION_BASE_URL: &str = "https://th.sportscorpion.com";
pub const RANKING_BASE_URL: &str = "https://stiga.trefik.cz/ithf/ranking";

/// Everything a run needs, passed explicitly to each stage.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub data_dir: PathBuf,
    pub base_url: String,
    pub ranking_base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Newest archive pages to walk; the run is nightly so only recent
    /// tournaments need to be discovered.
    pub archive_pages: u32,
    /// Re-fetch records that already exist in the snapshot.
    pub refresh: bool,
    pub formats: OutputFormats,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            base_url: SCORPION_BASE_URL.to_owned(),
            ranking_base_url: RANKING_BASE_URL.to_owned(),
            user_agent: "Mozilla/5.0".to_owned(),
            timeout: Duration::from_secs(10),
            concurrency: 10,
            retry: RetryPolicy::default(),
            archive_pages: 5,
            refresh: false,
            formats: OutputFormats::default(),
        }
    }
}

/// Snapshot format per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormats {
    pub tournaments: Format,
    pub matches: Format,
    pub players: Format,
    pub rankings: Format,
}

impl OutputFormats {
    pub fn uniform(format: Format) -> Self {
        Self {
            tournaments: format,
            matches: format,
            players: format,
            rankings: format,
        }
    }

    pub fn get(&self, entity: Entity) -> Format {
        match entity {
            Entity::Tournaments => self.tournaments,
            Entity::Matches => self.matches,
            Entity::Players => self.players,
            Entity::Rankings => self.rankings,
        }
    }
}

impl Default for OutputFormats {
    fn default() -> Self {
        Self {
            tournaments: Format::Csv,
            matches: Format::Parquet,
            players: Format::Csv,
            rankings: Format::Parquet,
        }
    }
}
