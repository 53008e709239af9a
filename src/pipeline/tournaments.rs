use std::collections::HashMap;

use itertools::Itertools;
use tracing::{debug, instrument};

use super::{StageContext, StageSummary};
use crate::error::Result;
use crate::fetch::{FetchReport, PageSource};
use crate::model::{Entity, Tournament, TournamentListing};
use crate::scraper::{self, archive, tournament};

/// Walk the newest archive pages and add the tournaments not seen before.
#[instrument(skip(ctx))]
pub(crate) async fn run<S: PageSource>(ctx: &StageContext<'_, S>) -> Result<StageSummary> {
    let mut summary = StageSummary::new(Entity::Tournaments);
    let base_url = ctx.config.base_url.as_str();

    let archive_urls = (1..=ctx.config.archive_pages).map(|page| archive::archive_url(base_url, page));
    let report = ctx.fetch(archive_urls, &mut summary).await;
    let listings = extract_listings(&report, &mut summary);

    let previous = ctx.previous::<Tournament>()?;
    let selected: HashMap<String, TournamentListing> = listings
        .into_iter()
        .filter(|listing| ctx.config.refresh || !previous.contains_key(&listing.id))
        .map(|listing| (tournament::tournament_url(base_url, listing.id), listing))
        .collect();
    debug!(new = selected.len(), known = previous.len(), "selected tournaments");

    let report = ctx.fetch(selected.keys().cloned().sorted(), &mut summary).await;
    let fresh = extract_tournaments(&report, &selected, base_url, &mut summary);

    ctx.commit(previous, fresh, &mut summary)?;
    Ok(summary)
}

/// Archive listings in page order, first listing of an id wins.
fn extract_listings(report: &FetchReport, summary: &mut StageSummary) -> Vec<TournamentListing> {
    let mut listings = vec![];
    for page in &report.pages {
        let document = scraper::parse_document(&page.body);
        let parsed = archive::parse_archive(&document);
        match parsed {
            Ok(rows) => {
                let before = listings.len();
                listings.extend(rows);
                debug!(url = %page.url, count = listings.len() - before, "parsed archive page");
            }
            Err(e) => summary.parse_failed(&page.url, &e),
        }
    }
    listings.into_iter().unique_by(|l| l.id).collect()
}

fn extract_tournaments(
    report: &FetchReport,
    selected: &HashMap<String, TournamentListing>,
    base_url: &str,
    summary: &mut StageSummary,
) -> Vec<Tournament> {
    let mut tournaments = vec![];
    for page in &report.pages {
        let Some(listing) = selected.get(&page.url) else {
            continue;
        };
        let document = scraper::parse_document(&page.body);
        match tournament::parse_tournament_page(&document, base_url) {
            Ok(detail) => tournaments.push(detail.into_tournament(listing.id, &listing.name)),
            Err(e) => summary.parse_failed(&page.url, &e),
        }
    }
    tournaments
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::fetch::testing::StaticSource;
    use crate::model::TournamentKind;
    use crate::pipeline::testing::{orchestrator, BASE};
    use crate::pipeline::StageDescriptor;
    use crate::store::Format;

    fn archive_page(ids: impl IntoIterator<Item = u32>) -> String {
        let rows = ids
            .into_iter()
            .map(|id| {
                format!(r#"<tr><td><a href="/eng/tournament/id/{id}/">Cup {id}</a></td></tr>"#)
            })
            .join("");
        format!(r#"<table class="sTable">{rows}</table>"#)
    }

    fn detail_page(id: u32) -> String {
        format!(
            r#"<h1 id="header">Cup {id}</h1>
               <table class="iTable">
                 <tr><th>Tournament type</th><td>Individual</td></tr>
                 <tr><th>Date of the tournament</th><td>04.05.2024</td></tr>
               </table>"#
        )
    }

    fn archive_url() -> String {
        archive::archive_url(BASE, 1)
    }

    #[tokio::test]
    async fn test_partial_failure_persists_the_rest() {
        let dir = TempDir::new().unwrap();
        let mut source = StaticSource::new().page(archive_url(), archive_page(1..=10));
        // Ids 3 and 7 have no page and time out on every attempt.
        for id in (1..=10).filter(|id| *id != 3 && *id != 7) {
            source = source.page(tournament::tournament_url(BASE, id), detail_page(id));
        }
        let orchestrator = orchestrator(source, dir.path());

        let summaries = orchestrator
            .run(&[StageDescriptor::TOURNAMENTS])
            .await
            .unwrap();
        let summary = &summaries[0];
        assert_eq!(summary.requested, 11);
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.extracted, 8);
        assert_eq!(orchestrator.source().calls(&tournament::tournament_url(BASE, 3)), 2);

        let stored = orchestrator
            .store()
            .load::<Tournament>(Format::Csv)
            .unwrap()
            .unwrap();
        assert_eq!(stored.len(), 8);
        assert!(!stored.contains_key(&3) && !stored.contains_key(&7));
        assert_eq!(stored[&1].kind, TournamentKind::Individual);
        assert_eq!(stored[&1].name, "Cup 1");
    }

    #[tokio::test]
    async fn test_known_tournaments_are_not_refetched() {
        let dir = TempDir::new().unwrap();
        let source = StaticSource::new()
            .page(archive_url(), archive_page([1, 2]))
            .page(tournament::tournament_url(BASE, 1), detail_page(1))
            .page(tournament::tournament_url(BASE, 2), detail_page(2));
        let orchestrator = orchestrator(source, dir.path());

        orchestrator.run(&[StageDescriptor::TOURNAMENTS]).await.unwrap();
        let summaries = orchestrator.run(&[StageDescriptor::TOURNAMENTS]).await.unwrap();

        assert_eq!(summaries[0].requested, 1);
        assert_eq!(summaries[0].merge.retained, 2);
        assert_eq!(orchestrator.source().calls(&tournament::tournament_url(BASE, 1)), 1);
    }

    #[tokio::test]
    async fn test_total_failure_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        let source = StaticSource::new()
            .page(archive_url(), archive_page([1]))
            .page(tournament::tournament_url(BASE, 1), detail_page(1));
        orchestrator(source, dir.path())
            .run(&[StageDescriptor::TOURNAMENTS])
            .await
            .unwrap();
        let path = dir.path().join("tournaments.csv");
        let before = std::fs::read_to_string(&path).unwrap();

        let offline = orchestrator(StaticSource::new(), dir.path());
        let err = offline
            .run(&[StageDescriptor::TOURNAMENTS])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ScorpionError::SourceUnreachable { failed: 1, .. }
        ));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_unparsable_detail_page_is_skipped() {
        let dir = TempDir::new().unwrap();
        let source = StaticSource::new()
            .page(archive_url(), archive_page([1, 2]))
            .page(tournament::tournament_url(BASE, 1), detail_page(1))
            .page(tournament::tournament_url(BASE, 2), "<p>maintenance</p>");
        let orchestrator = orchestrator(source, dir.path());

        let summaries = orchestrator.run(&[StageDescriptor::TOURNAMENTS]).await.unwrap();
        assert_eq!(summaries[0].parse_failures, 1);
        assert_eq!(summaries[0].extracted, 1);
        assert_eq!(summaries[0].failed(), 0);
    }
}
