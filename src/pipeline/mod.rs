//! Ordered scrape, extract, merge and write stages.

mod matches;
mod players;
mod rankings;
mod tournaments;

use std::fmt;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument, warn};

use crate::config::ScrapeConfig;
use crate::error::{Result, ScorpionError};
use crate::fetch::{FetchReport, Fetcher, PageSource};
use crate::merge::{merge, MergeStats};
use crate::model::{Entity, Record, Snapshot};
use crate::store::SnapshotStore;

/// One stage of a run and the snapshot it reads its work from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDescriptor {
    pub entity: Entity,
    pub depends_on: Option<Entity>,
}

impl StageDescriptor {
    pub const TOURNAMENTS: Self = Self {
        entity: Entity::Tournaments,
        depends_on: None,
    };
    pub const MATCHES: Self = Self {
        entity: Entity::Matches,
        depends_on: Some(Entity::Tournaments),
    };
    pub const PLAYERS: Self = Self {
        entity: Entity::Players,
        depends_on: Some(Entity::Matches),
    };
    pub const RANKINGS: Self = Self {
        entity: Entity::Rankings,
        depends_on: None,
    };
}

/// The nightly run: tournaments, then their matches, then the players seen in them.
pub const NIGHTLY: &[StageDescriptor] = &[
    StageDescriptor::TOURNAMENTS,
    StageDescriptor::MATCHES,
    StageDescriptor::PLAYERS,
];

/// ITHF ranking lists, independent of the other stages.
pub const RANKINGS: &[StageDescriptor] = &[StageDescriptor::RANKINGS];

/// What one stage did.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub entity: Entity,
    /// Distinct URLs attempted.
    pub requested: usize,
    pub fetched: usize,
    pub failed_urls: Vec<String>,
    /// Pages that were fetched but did not have the expected layout.
    pub parse_failures: usize,
    /// Records extracted from this run's pages.
    pub extracted: usize,
    /// Work units (tournaments for the matches stage) withheld from the
    /// snapshot so the next run retries them.
    pub held_back: usize,
    /// References to players that could not be resolved to a profile.
    pub unresolved: usize,
    pub merge: MergeStats,
    pub output: Option<PathBuf>,
}

impl StageSummary {
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            requested: 0,
            fetched: 0,
            failed_urls: vec![],
            parse_failures: 0,
            extracted: 0,
            held_back: 0,
            unresolved: 0,
            merge: MergeStats::default(),
            output: None,
        }
    }

    pub fn failed(&self) -> usize {
        self.failed_urls.len()
    }

    fn record_fetch(&mut self, report: &FetchReport) {
        self.requested += report.requested();
        self.fetched += report.pages.len();
        self.failed_urls
            .extend(report.failed_urls().map(str::to_owned));
    }

    fn parse_failed(&mut self, url: &str, error: &ScorpionError) {
        warn!(url, error = %error, "skipping unparsable page");
        self.parse_failures += 1;
    }
}

impl fmt::Display for StageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}/{} pages fetched, {} failed, {} unparsable, {} records extracted",
            self.entity,
            self.fetched,
            self.requested,
            self.failed(),
            self.parse_failures,
            self.extracted
        )?;
        if self.held_back > 0 {
            write!(f, ", {} held back", self.held_back)?;
        }
        if self.unresolved > 0 {
            write!(f, ", {} unresolved", self.unresolved)?;
        }
        write!(f, " ({})", self.merge)?;
        if let Some(path) = &self.output {
            write!(f, " -> {}", path.display())?;
        }
        Ok(())
    }
}

/// Shared access for the stage implementations.
pub(crate) struct StageContext<'a, S> {
    pub fetcher: &'a Fetcher<S>,
    pub store: &'a SnapshotStore,
    pub config: &'a ScrapeConfig,
    pub today: NaiveDate,
}

impl<S: PageSource> StageContext<'_, S> {
    /// Fetch a batch and account for it in `summary`.
    pub async fn fetch(
        &self,
        urls: impl IntoIterator<Item = String>,
        summary: &mut StageSummary,
    ) -> FetchReport {
        let report = self.fetcher.fetch_all(urls).await;
        summary.record_fetch(&report);
        report
    }

    /// The stage's own previous snapshot, empty on the first run.
    pub fn previous<R: Record>(&self) -> Result<Snapshot<R>> {
        Ok(self
            .store
            .load::<R>(self.config.formats.get(R::ENTITY))?
            .unwrap_or_default())
    }

    /// The snapshot a downstream stage reads its work from.
    pub fn upstream<R: Record>(&self, entity: Entity) -> Result<Snapshot<R>> {
        self.store
            .load::<R>(self.config.formats.get(R::ENTITY))?
            .ok_or(ScorpionError::MissingUpstream {
                entity,
                upstream: R::ENTITY,
            })
    }

    /// Merge `fresh` into `previous` and rewrite the snapshot.
    ///
    /// Nothing is written when every fetch of the stage failed.
    pub fn commit<R: Record>(
        &self,
        previous: Snapshot<R>,
        fresh: Vec<R>,
        summary: &mut StageSummary,
    ) -> Result<Snapshot<R>> {
        if summary.fetched == 0 && summary.failed() > 0 {
            return Err(ScorpionError::SourceUnreachable {
                entity: summary.entity,
                failed: summary.failed(),
            });
        }
        summary.extracted = fresh.len();
        let (merged, stats) = merge(previous, fresh);
        summary.merge = stats;
        let path = self
            .store
            .save(&merged, self.config.formats.get(R::ENTITY))?;
        summary.output = Some(path);
        Ok(merged)
    }
}

/// Runs stage sequences against one page source and data directory.
pub struct Orchestrator<S> {
    fetcher: Fetcher<S>,
    store: SnapshotStore,
    config: ScrapeConfig,
    today: NaiveDate,
}

impl<S: PageSource> Orchestrator<S> {
    pub fn new(source: S, config: ScrapeConfig) -> Self {
        Self {
            fetcher: Fetcher::new(source, config.concurrency, config.retry),
            store: SnapshotStore::new(config.data_dir.clone()),
            config,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin the date that decides which monthly ranking lists are due.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn source(&self) -> &S {
        self.fetcher.source()
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run `stages` in order, stopping at the first fatal error.
    ///
    /// A stage only starts when its upstream snapshot exists, either from
    /// an earlier stage of this run or from a previous run. Stages already
    /// completed are not rolled back when a later one fails.
    pub async fn run(&self, stages: &[StageDescriptor]) -> Result<Vec<StageSummary>> {
        let mut summaries = Vec::with_capacity(stages.len());
        for stage in stages {
            if let Some(upstream) = stage.depends_on {
                let written_now = summaries
                    .iter()
                    .any(|s: &StageSummary| s.entity == upstream && s.output.is_some());
                if !written_now && !self.store.exists(upstream) {
                    return Err(ScorpionError::MissingUpstream {
                        entity: stage.entity,
                        upstream,
                    });
                }
            }
            let summary = self.run_stage(stage.entity).await?;
            info!(%summary, "stage finished");
            summaries.push(summary);
        }
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn run_stage(&self, entity: Entity) -> Result<StageSummary> {
        let ctx = StageContext {
            fetcher: &self.fetcher,
            store: &self.store,
            config: &self.config,
            today: self.today,
        };
        match entity {
            Entity::Tournaments => tournaments::run(&ctx).await,
            Entity::Matches => matches::run(&ctx).await,
            Entity::Players => players::run(&ctx).await,
            Entity::Rankings => rankings::run(&ctx).await,
        }
    }
}
