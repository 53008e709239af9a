use std::collections::HashMap;

use tracing::{debug, instrument};

use super::{StageContext, StageSummary};
use crate::error::Result;
use crate::fetch::{FetchReport, PageSource};
use crate::model::{Entity, RankingEntry};
use crate::scraper::{self, ranking};

/// Fetch the monthly world ranking lists published since the newest one on
/// disk. `--refresh` starts over from the reference list.
#[instrument(skip(ctx))]
pub(crate) async fn run<S: PageSource>(ctx: &StageContext<'_, S>) -> Result<StageSummary> {
    let mut summary = StageSummary::new(Entity::Rankings);
    let base_url = ctx.config.ranking_base_url.as_str();

    let previous = ctx.previous::<RankingEntry>()?;
    let latest = previous
        .values()
        .map(|entry| entry.date)
        .max()
        .filter(|_| !ctx.config.refresh);
    let ids = ranking::ranking_ids(latest, ctx.today);
    debug!(?latest, first = ids.start(), last = ids.end(), "selected ranking lists");

    let urls: Vec<String> = ids
        .clone()
        .map(|id| ranking::ranking_history_url(base_url, id))
        .collect();
    let pending: HashMap<String, u32> = urls.iter().cloned().zip(ids).collect();
    let report = ctx.fetch(urls, &mut summary).await;
    let fresh = extract_entries(&report, &pending, &mut summary);

    ctx.commit(previous, fresh, &mut summary)?;
    Ok(summary)
}

fn extract_entries(
    report: &FetchReport,
    pending: &HashMap<String, u32>,
    summary: &mut StageSummary,
) -> Vec<RankingEntry> {
    let mut entries = vec![];
    for page in &report.pages {
        let Some(&id) = pending.get(&page.url) else {
            continue;
        };
        let document = scraper::parse_document(&page.body);
        let parsed = ranking::parse_ranking_history(&document, id);
        match parsed {
            Ok(rows) => {
                let before = entries.len();
                entries.extend(rows);
                if entries.len() == before {
                    debug!(id, "ranking list not published");
                }
            }
            Err(e) => summary.parse_failed(&page.url, &e),
        }
    }
    entries
}
