use std::collections::{BTreeSet, HashMap};

use tracing::{debug, instrument, warn};

use super::{StageContext, StageSummary};
use crate::error::Result;
use crate::fetch::{FetchReport, PageSource};
use crate::model::{Entity, Match, Player};
use crate::scraper::{self, player};

/// Fetch the profiles of players that appear in matches but not yet in the
/// players snapshot.
#[instrument(skip(ctx))]
pub(crate) async fn run<S: PageSource>(ctx: &StageContext<'_, S>) -> Result<StageSummary> {
    let mut summary = StageSummary::new(Entity::Players);
    let base_url = ctx.config.base_url.as_str();

    let matches = ctx.upstream::<Match>(Entity::Players)?;
    let referenced: BTreeSet<u32> = matches.values().flat_map(Match::player_ids).collect();
    let previous = ctx.previous::<Player>()?;

    let pending: HashMap<String, u32> = referenced
        .iter()
        .filter(|id| ctx.config.refresh || !previous.contains_key(*id))
        .map(|&id| (player::player_url(base_url, id), id))
        .collect();
    debug!(
        pending = pending.len(),
        referenced = referenced.len(),
        "selected players"
    );

    let mut urls: Vec<String> = pending.keys().cloned().collect();
    urls.sort();
    let report = ctx.fetch(urls, &mut summary).await;
    let fresh = extract_players(&report, &pending, &mut summary);

    let merged = ctx.commit(previous, fresh, &mut summary)?;
    summary.unresolved = referenced
        .iter()
        .filter(|id| !merged.contains_key(*id))
        .count();
    if summary.unresolved > 0 {
        warn!(
            unresolved = summary.unresolved,
            "match players without a profile, will retry next run"
        );
    }
    Ok(summary)
}

fn extract_players(
    report: &FetchReport,
    pending: &HashMap<String, u32>,
    summary: &mut StageSummary,
) -> Vec<Player> {
    let mut players = vec![];
    for page in &report.pages {
        let Some(&id) = pending.get(&page.url) else {
            continue;
        };
        let document = scraper::parse_document(&page.body);
        match player::parse_player_page(&document, id) {
            Ok(player) => players.push(player),
            Err(e) => summary.parse_failed(&page.url, &e),
        }
    }
    players
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::fetch::testing::StaticSource;
    use crate::model::{Record, Snapshot, StageKind};
    use crate::pipeline::testing::{orchestrator, BASE};
    use crate::pipeline::StageDescriptor;
    use crate::store::{Format, SnapshotStore};

    fn game(player1_id: Option<u32>, player2_id: Option<u32>) -> Match {
        Match {
            stage_id: 101,
            player1: "One".into(),
            player1_id,
            player2: "Two".into(),
            player2_id,
            goals_player1: 1,
            goals_player2: 0,
            overtime: false,
            stage: StageKind::RoundRobin,
            round_number: Some(1.0),
            playoff_game_number: None,
            schedule_row: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 4),
            tournament_name: "Cup".into(),
            tournament_id: 1,
            stage_sequence: Some(1),
        }
    }

    fn profile(name: &str, rank: u32) -> String {
        format!(
            r#"<h1 id="header">Player profile - {name}</h1>
               <table><tr><th>World ranking</th><td>{rank}. (ID 9{rank})</td></tr></table>"#
        )
    }

    fn seed<R: Record>(dir: &std::path::Path, records: Vec<R>, format: Format) {
        let snapshot: Snapshot<R> = records.into_iter().map(|r| (r.key(), r)).collect();
        SnapshotStore::new(dir).save(&snapshot, format).unwrap();
    }

    #[tokio::test]
    async fn test_new_players_merge_over_known_ones() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), vec![game(Some(1), Some(2))], Format::Parquet);
        seed(
            dir.path(),
            vec![Player {
                id: 1,
                name: "A".into(),
                world_rank: Some(1500),
                ranking_id: None,
                country: None,
                city: None,
                date_of_birth: None,
                sex: None,
            }],
            Format::Csv,
        );
        let source = StaticSource::new()
            .page(player::player_url(BASE, 1), profile("A", 1550))
            .page(player::player_url(BASE, 2), profile("B", 1400));
        let mut config = crate::pipeline::testing::config(dir.path());
        config.refresh = true;
        let orchestrator = crate::pipeline::Orchestrator::new(source, config);

        let summaries = orchestrator.run(&[StageDescriptor::PLAYERS]).await.unwrap();
        assert_eq!(summaries[0].merge.inserted, 1);
        assert_eq!(summaries[0].merge.updated, 1);

        let stored = orchestrator
            .store()
            .load::<Player>(Format::Csv)
            .unwrap()
            .unwrap();
        assert_eq!(stored[&1].world_rank, Some(1550));
        assert_eq!(stored[&2].world_rank, Some(1400));
        assert_eq!(stored[&2].name, "B");
    }

    #[tokio::test]
    async fn test_known_players_are_not_refetched() {
        let dir = TempDir::new().unwrap();
        seed(dir.path(), vec![game(Some(1), Some(2))], Format::Parquet);
        let source = StaticSource::new()
            .page(player::player_url(BASE, 1), profile("A", 1))
            .page(player::player_url(BASE, 2), profile("B", 2));
        let orchestrator = orchestrator(source, dir.path());

        orchestrator.run(&[StageDescriptor::PLAYERS]).await.unwrap();
        let summaries = orchestrator.run(&[StageDescriptor::PLAYERS]).await.unwrap();

        assert_eq!(summaries[0].requested, 0);
        assert_eq!(orchestrator.source().calls(&player::player_url(BASE, 1)), 1);
    }

    #[tokio::test]
    async fn test_missing_profiles_are_reported_unresolved() {
        let dir = TempDir::new().unwrap();
        seed(
            dir.path(),
            vec![game(Some(1), Some(2)), game(Some(1), None)],
            Format::Parquet,
        );
        let source = StaticSource::new().page(player::player_url(BASE, 1), profile("A", 1));
        let orchestrator = orchestrator(source, dir.path());

        let summaries = orchestrator.run(&[StageDescriptor::PLAYERS]).await.unwrap();
        assert_eq!(summaries[0].failed(), 1);
        assert_eq!(summaries[0].unresolved, 1);
    }

    #[tokio::test]
    async fn test_players_need_matches() {
        let dir = TempDir::new().unwrap();
        let orchestrator = orchestrator(StaticSource::new(), dir.path());
        let err = orchestrator
            .run(&[StageDescriptor::PLAYERS])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::ScorpionError::MissingUpstream {
                upstream: Entity::Matches,
                ..
            }
        ));
    }
}
