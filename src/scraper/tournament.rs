use ::scraper::{ElementRef, Selector};
use chrono::NaiveDate;
use regex::Regex;
use tracing::warn;

use crate::error::{Result, ScorpionError};
use crate::model::{StageLink, Tournament, TournamentKind};
use crate::scraper::{absolute_url, element_text, info_rows, non_empty, select_text, Html};

const TOURNAMENT_DATE_FORMAT: &str = "%d.%m.%Y";
const LOCATION_KEYS: [&str; 4] = ["Location", "Venue", "City", "Country"];
const SCHEDULE_LINK_TEXT: &str = "Schedule and results";

/// URL of a tournament's detail page.
pub fn tournament_url(base_url: &str, tournament_id: u32) -> String {
    format!("{base_url}/eng/tournament/id/{tournament_id}/")
}

/// Everything read from a tournament detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct TournamentPage {
    pub name: Option<String>,
    pub kind: TournamentKind,
    pub date: Option<NaiveDate>,
    pub location: Option<String>,
    pub stages: Vec<StageLink>,
}

impl TournamentPage {
    /// Combine with the archive listing; the page header wins over the
    /// listing name.
    pub fn into_tournament(self, id: u32, listing_name: &str) -> Tournament {
        Tournament {
            id,
            name: self.name.unwrap_or_else(|| listing_name.trim().to_owned()),
            kind: self.kind,
            date: self.date,
            location: self.location,
        }
    }
}

pub fn parse_tournament_page(document: &Html, base_url: &str) -> Result<TournamentPage> {
    let header_selector = Selector::parse("h1#header")?;
    let root = document.root_element();
    let name = non_empty(select_text(&root, &header_selector));
    let info = info_rows(document)?;

    if name.is_none() && !info.contains_key("Tournament type") {
        return Err(ScorpionError::Layout {
            context: "tournament header",
        });
    }

    let kind = info
        .get("Tournament type")
        .map(|t| TournamentKind::from_text(t))
        .unwrap_or_default();
    let date = match info.get("Date of the tournament") {
        Some(text) => parse_tournament_date(text)?,
        None => None,
    };
    let location = LOCATION_KEYS
        .iter()
        .find_map(|key| info.get(*key).cloned().and_then(non_empty));
    let stages = parse_stage_links(document, base_url)?;

    Ok(TournamentPage {
        name,
        kind,
        date,
        location,
        stages,
    })
}

/// First `dd.mm.yyyy` in the text; multi-day tournaments list a range.
fn parse_tournament_date(text: &str) -> Result<Option<NaiveDate>> {
    let pattern = Regex::new(r"\d{1,2}\.\d{1,2}\.\d{4}")?;
    Ok(pattern
        .find(text)
        .and_then(|m| NaiveDate::parse_from_str(m.as_str(), TOURNAMENT_DATE_FORMAT).ok()))
}

fn parse_stage_links(document: &Html, base_url: &str) -> Result<Vec<StageLink>> {
    let row_selector = Selector::parse("table.stages-table tr")?;
    let sequence_selector = Selector::parse("td.stage-gr")?;
    let link_selector = Selector::parse("a[href]")?;

    let mut stages = vec![];
    for row in document.select(&row_selector) {
        let Some(sequence_cell) = row.select(&sequence_selector).next() else {
            continue;
        };
        let sequence = element_text(&sequence_cell).parse().ok();
        let Some(href) = schedule_href(&row, &link_selector) else {
            continue;
        };
        match stage_id(href) {
            Some(id) => stages.push(StageLink {
                id,
                sequence,
                url: stage_print_url(base_url, href),
            }),
            None => warn!(href, "schedule link without a stage id"),
        }
    }
    Ok(stages)
}

fn schedule_href<'a>(row: &ElementRef<'a>, link_selector: &Selector) -> Option<&'a str> {
    row.select(link_selector)
        .find(|a| element_text(a).contains(SCHEDULE_LINK_TEXT))
        .and_then(|a| a.value().attr("href"))
}

/// The stage id is the path segment before the last one, e.g.
/// `/eng/tournament/stage/id/9001/schedule/`.
fn stage_id(href: &str) -> Option<u32> {
    let path = href.split('?').next().unwrap_or_default();
    path.trim_end_matches('/').rsplit('/').nth(1)?.parse().ok()
}

/// Printable variant of the schedule page, which carries every game.
fn stage_print_url(base_url: &str, href: &str) -> String {
    let url = absolute_url(base_url, href);
    if url.contains('?') {
        url
    } else {
        format!("{url}?print")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::parse_document;

    const BASE: &str = "https://th.sportscorpion.com";

    const DETAIL: &str = r#"
        <html><body>
        <h1 id="header">Riga Open 2024</h1>
        <table class="iTable">
          <tr><th>Tournament type</th><td>Individual</td></tr>
          <tr><th>Date of the tournament</th><td>04.05.2024 - 05.05.2024</td></tr>
          <tr><th>City</th><td>Riga</td></tr>
        </table>
        <table class="stages-table">
          <tr><th>#</th><th>Stage</th><th></th></tr>
          <tr>
            <td class="stage-gr">1</td><td>Qualification</td>
            <td><a href="/eng/tournament/stage/id/9001/">Standings</a>
                <a href="/eng/tournament/stage/id/9001/schedule/">Schedule and results</a></td>
          </tr>
          <tr>
            <td class="stage-gr">2</td><td>Playoff</td>
            <td><a href="/eng/tournament/stage/id/9002/schedule/">Schedule and results</a></td>
          </tr>
          <tr><td class="stage-gr">3</td><td>Not drawn yet</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_parse_tournament_page() {
        let document = parse_document(DETAIL);
        let page = parse_tournament_page(&document, BASE).unwrap();

        assert_eq!(page.name.as_deref(), Some("Riga Open 2024"));
        assert_eq!(page.kind, TournamentKind::Individual);
        assert_eq!(page.date, NaiveDate::from_ymd_opt(2024, 5, 4));
        assert_eq!(page.location.as_deref(), Some("Riga"));
        assert_eq!(
            page.stages,
            vec![
                StageLink {
                    id: 9001,
                    sequence: Some(1),
                    url: format!("{BASE}/eng/tournament/stage/id/9001/schedule/?print"),
                },
                StageLink {
                    id: 9002,
                    sequence: Some(2),
                    url: format!("{BASE}/eng/tournament/stage/id/9002/schedule/?print"),
                },
            ]
        );
    }

    #[test]
    fn test_team_tournament_without_stages() {
        let document = parse_document(
            r#"<h1 id="header">Nations Cup</h1>
               <table><tr><th>Tournament type</th><td>Team</td></tr></table>"#,
        );
        let page = parse_tournament_page(&document, BASE).unwrap();
        assert_eq!(page.kind, TournamentKind::Team);
        assert!(page.stages.is_empty());
        assert_eq!(page.date, None);

        let tournament = page.into_tournament(12, "listing name");
        assert_eq!(tournament.name, "Nations Cup");
        assert_eq!(tournament.location, None);
    }

    #[test]
    fn test_listing_name_fallback() {
        let document =
            parse_document("<table><tr><th>Tournament type</th><td>Individual</td></tr></table>");
        let page = parse_tournament_page(&document, BASE).unwrap();
        assert_eq!(page.into_tournament(3, " Listed ").name, "Listed");
    }

    #[test]
    fn test_unrecognised_page_is_layout_error() {
        let document = parse_document("<html><body><p>Not found</p></body></html>");
        assert!(matches!(
            parse_tournament_page(&document, BASE),
            Err(ScorpionError::Layout { .. })
        ));
    }

    #[test]
    fn test_stage_id() {
        assert_eq!(stage_id("/eng/tournament/stage/id/9001/schedule/"), Some(9001));
        assert_eq!(stage_id("/eng/tournament/stage/id/9001/schedule"), Some(9001));
        assert_eq!(stage_id("/eng/tournament/stage/schedule/"), None);
    }
}
