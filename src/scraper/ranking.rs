use std::ops::RangeInclusive;

use ::scraper::{ElementRef, Selector};
use chrono::{Datelike, NaiveDate};
use itertools::{Either, Itertools};
use regex::Regex;

use crate::error::{Result, ScorpionError};
use crate::model::{PlayerRankingPoint, RankingEntry};
use crate::scraper::{element_text, non_empty, Html};

/// Id of the December 2024 list. Ids advance by one per calendar month.
pub const REFERENCE_ID: u32 = 417;
const REFERENCE_YEAR: i32 = 2024;
const REFERENCE_MONTH: u32 = 12;

const RANKING_DATE_FORMAT: &str = "%d.%m.%Y";
const HEADER_ROWS: usize = 2;

/// URL of a monthly ranking list.
pub fn ranking_history_url(ranking_base_url: &str, ranking_id: u32) -> String {
    format!("{ranking_base_url}/history.aspx?id={ranking_id}")
}

/// URL of one player's ranking history.
pub fn player_ranking_url(ranking_base_url: &str, ithf_id: u32) -> String {
    format!("{ranking_base_url}/rankpl.aspx?pl={ithf_id}")
}

/// Id of the list published in the month of `date`.
pub fn ranking_id_for(date: NaiveDate) -> u32 {
    let months = (date.year() - REFERENCE_YEAR) as i64 * 12
        + (date.month() as i64 - REFERENCE_MONTH as i64);
    u32::try_from(REFERENCE_ID as i64 + months).unwrap_or(0)
}

/// Lists still to fetch: from the month after `latest` (or the reference
/// list when nothing is stored yet) through the month of `today`.
pub fn ranking_ids(latest: Option<NaiveDate>, today: NaiveDate) -> RangeInclusive<u32> {
    let start = latest.map_or(REFERENCE_ID, |date| ranking_id_for(date) + 1);
    start..=ranking_id_for(today)
}

/// Entries of monthly list `ranking_id`.
///
/// A page without the ranking table has no entries. A page that has the
/// table but no `as on` date is a layout change.
pub fn parse_ranking_history(
    document: &Html,
    ranking_id: u32,
) -> Result<impl Iterator<Item = RankingEntry> + '_> {
    let table_selector = Selector::parse(r#"table[border="1"]"#)?;
    let title_selector = Selector::parse("span#LabTitle")?;
    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("td")?;
    let link_selector = Selector::parse("a[href]")?;
    let flag_selector = Selector::parse("img[alt]")?;

    let Some(table) = document.select(&table_selector).next() else {
        return Ok(Either::Left(std::iter::empty()));
    };
    let title = document
        .select(&title_selector)
        .next()
        .ok_or(ScorpionError::Layout {
            context: "ranking list title",
        })?;
    let date = parse_list_date(&element_text(&title))?;
    let rows = table.select(&row_selector).skip(HEADER_ROWS).collect_vec();

    Ok(Either::Right(rows.into_iter().filter_map(move |row| {
        let cells = row.select(&cell_selector).collect_vec();
        let [rank, player, nation, points] = cells.as_slice() else {
            return None;
        };
        Some(RankingEntry {
            ranking_id,
            date,
            rank: element_text(rank).trim_end_matches('.').parse().ok()?,
            player_name: element_text(player),
            player_id: player
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| href.rsplit('=').next())
                .and_then(|id| id.parse().ok()),
            nation: nation
                .select(&flag_selector)
                .next()
                .and_then(|img| img.value().attr("alt"))
                .map(str::to_owned)
                .and_then(non_empty),
            points: parse_points(&element_text(points)),
        })
    })))
}

/// `World ranking as on 01.12.2024`
fn parse_list_date(title: &str) -> Result<NaiveDate> {
    let (_, date) = title.rsplit_once("as on").ok_or(ScorpionError::Layout {
        context: "ranking list date",
    })?;
    Ok(NaiveDate::parse_from_str(date.trim(), RANKING_DATE_FORMAT)?)
}

/// Points are printed with thousands separators, `1 234` or `1,234`.
fn parse_points(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .filter(|c| !matches!(c, '\u{a0}' | ',' | ' '))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// A player's month-by-month ranking from their history page.
///
/// The grid has one header row of month names and one row per year whose
/// second cell nests a table of `rank. points` cells. `-` marks a month
/// without a ranking.
pub fn parse_player_ranking(
    document: &Html,
) -> Result<impl Iterator<Item = PlayerRankingPoint> + '_> {
    let grid_selector = Selector::parse("span#LabRank")?;
    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("td")?;
    let nested_selector = Selector::parse("table")?;
    let cell_pattern = Regex::new(r"(\d+)\.(?:\s*(\d+))?")?;

    let grid = document
        .select(&grid_selector)
        .next()
        .ok_or(ScorpionError::Layout {
            context: "player ranking grid",
        })?;
    let mut rows = grid.select(&row_selector);
    let months = rows
        .next()
        .map(|header| {
            header
                .select(&cell_selector)
                .skip(1)
                .map(|td| element_text(&td).replace('.', ""))
                .filter(|month| !month.trim().is_empty())
                .collect_vec()
        })
        .unwrap_or_default();

    let years = rows.filter_map(|row| year_row(&row, &nested_selector)).collect_vec();

    Ok(years.into_iter().flat_map(move |(year, nested)| {
        months
            .iter()
            .zip(nested.select(&cell_selector))
            .map(|(month, cell)| {
                let (rank, points) = parse_grid_cell(&cell_pattern, &element_text(&cell));
                PlayerRankingPoint {
                    year,
                    month: month.clone(),
                    rank,
                    points,
                }
            })
            .collect_vec()
    }))
}

/// The year and the nested month table of one grid row.
fn year_row<'a>(row: &ElementRef<'a>, nested_selector: &Selector) -> Option<(i32, ElementRef<'a>)> {
    let cells = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| c.value().name() == "td")
        .collect_vec();
    let [year, months_cell, ..] = cells.as_slice() else {
        return None;
    };
    let year = element_text(year).parse().ok()?;
    let nested = months_cell.select(nested_selector).next()?;
    Some((year, nested))
}

fn parse_grid_cell(pattern: &Regex, text: &str) -> (Option<u32>, Option<u32>) {
    if text.is_empty() || text == "-" {
        return (None, None);
    }
    match pattern.captures(text) {
        Some(caps) if caps.get(0).is_some_and(|m| m.start() == 0) => (
            caps.get(1).and_then(|m| m.as_str().parse().ok()),
            caps.get(2).and_then(|m| m.as_str().parse().ok()),
        ),
        _ => (None, None),
    }
}
