use ::scraper::{CaseSensitivity, ElementRef, Selector};
use itertools::{Either, Itertools};
use regex::Regex;

use crate::error::{Result, ScorpionError};
use crate::model::StageKind;
use crate::scraper::{element_text, id_after, Html};

const PLAYER_PATH: &str = "/user/id/";

/// Playoff rounds as a fraction of the final. Checked in order against
/// the lowercased subheader, so "semi-final" must come before "final".
const PLAYOFF_ROUNDS: [(&str, f64); 8] = [
    ("1/64 final", 1.0 / 64.0),
    ("1/32 final", 1.0 / 32.0),
    ("1/16 final", 1.0 / 16.0),
    ("1/8 final", 1.0 / 8.0),
    ("quarterfinal", 0.25),
    ("semi-final", 0.5),
    ("final", 1.0),
    ("match for the third place", 0.9),
];

/// One game read from a stage schedule, before tournament context is
/// attached.
#[derive(Debug, Clone, PartialEq)]
pub struct StageGame {
    pub player1: String,
    pub player1_id: Option<u32>,
    pub player2: String,
    pub player2_id: Option<u32>,
    pub goals_player1: u32,
    pub goals_player2: u32,
    pub overtime: bool,
    pub stage: StageKind,
    pub round_number: Option<f64>,
    pub playoff_game_number: Option<u32>,
    /// `N` of the `matchN` row id for round-robin games, the 1-based series
    /// position within the stage for playoff games.
    pub schedule_row: Option<u32>,
}

struct StageSelectors {
    series: Selector,
    series_players: Selector,
    results: Selector,
    tour_header: Selector,
    match_rows: Selector,
    name1: Selector,
    name2: Selector,
    link: Selector,
    tour_pattern: Regex,
}

impl StageSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            series: Selector::parse("tr.series-container")?,
            series_players: Selector::parse(r#"td[class^="ma_name"] a"#)?,
            results: Selector::parse(r#"td[class^="ma_result_"]"#)?,
            tour_header: Selector::parse("th")?,
            match_rows: Selector::parse(r#"tr[id^="match"]"#)?,
            name1: Selector::parse("td.ma_name1")?,
            name2: Selector::parse("td.ma_name2")?,
            link: Selector::parse("a")?,
            tour_pattern: Regex::new(r"(\d+)\s*Tour")?,
        })
    }
}

/// Games of a stage schedule page (the `?print` variant).
///
/// Playoff pages group series under round subheaders; every game of a
/// series becomes its own item. Round-robin pages have one table per tour.
/// The "saved matches" box repeats games from elsewhere and is ignored.
pub fn parse_stage(document: &Html) -> Result<impl Iterator<Item = StageGame> + '_> {
    let selectors = StageSelectors::new()?;
    let has_series = live(document, &selectors.series).next().is_some();

    if has_series {
        let blocks = Selector::parse("div.subheader, div.gr_match")?;
        let elements = live(document, &blocks).collect_vec();
        return Ok(Either::Left(playoff_games(elements, selectors)));
    }

    let tables = Selector::parse("table.grTable")?;
    let tables = live(document, &tables).collect_vec();
    if tables.is_empty() {
        return Err(ScorpionError::Layout {
            context: "stage schedule",
        });
    }
    Ok(Either::Right(round_robin_games(tables, selectors)))
}

/// Matches of `selector` outside the saved-matches box.
fn live<'a, 'b>(
    document: &'a Html,
    selector: &'b Selector,
) -> impl Iterator<Item = ElementRef<'a>> + 'b
where
    'a: 'b,
{
    document.select(selector).filter(|element| {
        !element.ancestors().filter_map(ElementRef::wrap).any(|a| {
            a.value()
                .has_class("saved-matches", CaseSensitivity::CaseSensitive)
        })
    })
}

fn playoff_games<'a>(
    elements: Vec<ElementRef<'a>>,
    selectors: StageSelectors,
) -> impl Iterator<Item = StageGame> + 'a {
    let mut round = None;
    let mut position = 0;
    elements.into_iter().flat_map(move |element| {
        if element
            .value()
            .has_class("subheader", CaseSensitivity::CaseSensitive)
        {
            round = playoff_round(&element_text(&element));
            return vec![];
        }
        let mut games = vec![];
        for series in element.select(&selectors.series) {
            position += 1;
            games.extend(series_games(&series, round, position, &selectors));
        }
        games
    })
}

fn series_games(
    series: &ElementRef,
    round: Option<f64>,
    position: u32,
    selectors: &StageSelectors,
) -> Vec<StageGame> {
    let players = series.select(&selectors.series_players).collect_vec();
    let [first, second, ..] = players.as_slice() else {
        return vec![];
    };
    let (player1, player1_id) = player_link(first);
    let (player2, player2_id) = player_link(second);

    let results = series.select(&selectors.results).collect_vec();
    // The last result cell is the series total.
    let games = results.split_last().map(|(_, games)| games).unwrap_or_default();
    games
        .iter()
        .enumerate()
        .filter_map(|(index, cell)| {
            let (goals_player1, goals_player2, overtime) = parse_score(&raw_text(cell))?;
            Some(StageGame {
                player1: player1.clone(),
                player1_id,
                player2: player2.clone(),
                player2_id,
                goals_player1,
                goals_player2,
                overtime,
                stage: StageKind::Playoff,
                round_number: round,
                playoff_game_number: u32::try_from(index + 1).ok(),
                schedule_row: Some(position),
            })
        })
        .collect()
}

fn round_robin_games<'a>(
    tables: Vec<ElementRef<'a>>,
    selectors: StageSelectors,
) -> impl Iterator<Item = StageGame> + 'a {
    tables.into_iter().flat_map(move |table| {
        let round = table
            .select(&selectors.tour_header)
            .map(|th| element_text(&th))
            .find(|text| text.contains("Tour"))
            .and_then(|text| {
                selectors
                    .tour_pattern
                    .captures(&text)
                    .and_then(|c| c[1].parse::<f64>().ok())
            });
        table
            .select(&selectors.match_rows)
            .filter_map(|row| round_robin_game(&row, round, &selectors))
            .collect_vec()
    })
}

fn round_robin_game(
    row: &ElementRef,
    round: Option<f64>,
    selectors: &StageSelectors,
) -> Option<StageGame> {
    let (player1, player1_id) = name_cell(row, &selectors.name1, &selectors.link);
    let (player2, player2_id) = name_cell(row, &selectors.name2, &selectors.link);
    let score = row.select(&selectors.results).next()?;
    let (goals_player1, goals_player2, overtime) = parse_score(&raw_text(&score))?;
    Some(StageGame {
        player1,
        player1_id,
        player2,
        player2_id,
        goals_player1,
        goals_player2,
        overtime,
        stage: StageKind::RoundRobin,
        round_number: round,
        playoff_game_number: None,
        schedule_row: row
            .value()
            .id()
            .and_then(|id| id.strip_prefix("match"))
            .and_then(|n| n.parse().ok()),
    })
}

/// Player name and profile id from a name cell, falling back to the bare
/// cell text for unregistered players.
fn name_cell(row: &ElementRef, cell: &Selector, link: &Selector) -> (String, Option<u32>) {
    let Some(cell) = row.select(cell).next() else {
        return (String::new(), None);
    };
    match cell.select(link).next() {
        Some(a) if !element_text(&a).is_empty() => player_link(&a),
        _ => (element_text(&cell), None),
    }
}

fn player_link(a: &ElementRef) -> (String, Option<u32>) {
    let id = a
        .value()
        .attr("href")
        .and_then(|href| id_after(href, PLAYER_PATH));
    (element_text(a), id)
}

fn raw_text(element: &ElementRef) -> String {
    element.text().collect()
}

/// Playoff round of a subheader such as "Quarterfinal" or "1/8 final".
pub fn playoff_round(subheader: &str) -> Option<f64> {
    let subheader = subheader.trim().to_lowercase();
    PLAYOFF_ROUNDS
        .iter()
        .find(|(name, _)| subheader.contains(name))
        .map(|(_, fraction)| *fraction)
}

/// Goals of both players and the overtime flag from a result cell like
/// `3:2 (OT)`. Walkovers and asterisks are stripped; anything else that is
/// not `n:m` is not a played game.
pub fn parse_score(raw: &str) -> Option<(u32, u32, bool)> {
    let overtime = raw.contains("(OT)");
    let cleaned = raw
        .replace("(OT)", "")
        .replace("(W.O)", "")
        .replace(['\u{a0}', '*', '\n'], "");
    let (goals1, goals2) = cleaned.split_once(':')?;
    Some((goals1.trim().parse().ok()?, goals2.trim().parse().ok()?, overtime))
}
