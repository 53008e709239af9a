use std::collections::{BTreeSet, HashMap};

use itertools::Itertools;
use tracing::{debug, instrument, warn};

use super::{StageContext, StageSummary};
use crate::error::Result;
use crate::fetch::{FetchReport, PageSource};
use crate::model::{Entity, Match, StageLink, Tournament, TournamentKind};
use crate::scraper::stage::{self, StageGame};
use crate::scraper::{self, tournament};

/// Scrape the games of individual tournaments that have no matches yet.
///
/// A tournament's matches are only written once every one of its stage
/// pages was fetched and parsed; otherwise the whole tournament waits for
/// the next run.
#[instrument(skip(ctx))]
pub(crate) async fn run<S: PageSource>(ctx: &StageContext<'_, S>) -> Result<StageSummary> {
    let mut summary = StageSummary::new(Entity::Matches);
    let base_url = ctx.config.base_url.as_str();

    let tournaments = ctx.upstream::<Tournament>(Entity::Matches)?;
    let previous = ctx.previous::<Match>()?;
    let scraped: BTreeSet<u32> = previous.values().map(|m| m.tournament_id).collect();

    let pending: HashMap<String, &Tournament> = tournaments
        .values()
        .filter(|t| t.kind == TournamentKind::Individual)
        .filter(|t| ctx.config.refresh || !scraped.contains(&t.id))
        .map(|t| (tournament::tournament_url(base_url, t.id), t))
        .collect();
    debug!(
        pending = pending.len(),
        scraped = scraped.len(),
        "selected tournaments"
    );

    let report = ctx.fetch(pending.keys().cloned().sorted(), &mut summary).await;
    let (schedules, team_events) = extract_schedules(&report, &pending, base_url, &mut summary);
    summary.held_back += pending.len() - schedules.len() - team_events;

    let stage_urls = schedules
        .iter()
        .flat_map(|(_, stages)| stages.iter().map(|s| s.url.clone()))
        .collect_vec();
    let report = ctx.fetch(stage_urls, &mut summary).await;
    let fresh = assemble_matches(&report, &schedules, &mut summary);

    summary.unresolved = fresh
        .iter()
        .map(|m| [m.player1_id, m.player2_id].iter().filter(|id| id.is_none()).count())
        .sum();
    if summary.unresolved > 0 {
        debug!(unresolved = summary.unresolved, "players without a profile link");
    }

    ctx.commit(previous, fresh, &mut summary)?;
    Ok(summary)
}

/// Stage links of each fetched tournament that is still individual, and
/// how many turned out to be team events.
fn extract_schedules<'t>(
    report: &FetchReport,
    pending: &HashMap<String, &'t Tournament>,
    base_url: &str,
    summary: &mut StageSummary,
) -> (Vec<(&'t Tournament, Vec<StageLink>)>, usize) {
    let mut schedules = vec![];
    let mut team_events = 0;
    for page in &report.pages {
        let Some(tournament) = pending.get(&page.url).copied() else {
            continue;
        };
        let document = scraper::parse_document(&page.body);
        match tournament::parse_tournament_page(&document, base_url) {
            Ok(detail) if detail.kind == TournamentKind::Team => {
                debug!(id = tournament.id, "skipping team tournament");
                team_events += 1;
            }
            Ok(detail) => schedules.push((tournament, detail.stages)),
            Err(e) => summary.parse_failed(&page.url, &e),
        }
    }
    (schedules, team_events)
}

fn assemble_matches(
    report: &FetchReport,
    schedules: &[(&Tournament, Vec<StageLink>)],
    summary: &mut StageSummary,
) -> Vec<Match> {
    let bodies: HashMap<&str, &str> = report
        .pages
        .iter()
        .map(|p| (p.url.as_str(), p.body.as_str()))
        .collect();

    let mut matches = vec![];
    for (tournament, stages) in schedules {
        let mut games = vec![];
        let mut complete = true;
        for link in stages {
            let Some(body) = bodies.get(link.url.as_str()) else {
                complete = false;
                continue;
            };
            let document = scraper::parse_document(body);
            let parsed = stage::parse_stage(&document);
            match parsed {
                Ok(stage_games) => games.extend(
                    stage_games
                        .map(|g| to_match(g, link, tournament))
                        .filter(|m| !m.is_playoff_draw()),
                ),
                Err(e) => {
                    summary.parse_failed(&link.url, &e);
                    complete = false;
                }
            }
        }
        if complete {
            debug!(id = tournament.id, games = games.len(), "tournament complete");
            matches.extend(games);
        } else {
            warn!(id = tournament.id, "holding back tournament with missing stages");
            summary.held_back += 1;
        }
    }
    matches
}

fn to_match(game: StageGame, link: &StageLink, tournament: &Tournament) -> Match {
    Match {
        stage_id: link.id,
        player1: game.player1,
        player1_id: game.player1_id,
        player2: game.player2,
        player2_id: game.player2_id,
        goals_player1: game.goals_player1,
        goals_player2: game.goals_player2,
        overtime: game.overtime,
        stage: game.stage,
        round_number: game.round_number,
        playoff_game_number: game.playoff_game_number,
        schedule_row: game.schedule_row,
        date: tournament.date,
        tournament_name: tournament.name.clone(),
        tournament_id: tournament.id,
        stage_sequence: link.sequence,
    }
}
