use ::scraper::{ElementRef, Selector};
use itertools::Itertools;

use crate::error::{Result, ScorpionError};
use crate::model::TournamentListing;
use crate::scraper::{element_text, id_after, Html};

const TOURNAMENT_PATH: &str = "/eng/tournament/id/";

/// URL of one page of the tournament archive, newest first.
pub fn archive_url(base_url: &str, page: u32) -> String {
    format!("{base_url}/eng/tournament/archive/?page={page}")
}

/// Tournaments listed on an archive page.
///
/// Only rows whose first cell links to a tournament are listed; an empty
/// page past the last one yields nothing.
pub fn parse_archive(document: &Html) -> Result<impl Iterator<Item = TournamentListing> + '_> {
    let archive_table = Selector::parse("table.sTable")?;
    let any_table = Selector::parse("table")?;
    let table = document
        .select(&archive_table)
        .next()
        .or_else(|| document.select(&any_table).next())
        .ok_or(ScorpionError::Layout {
            context: "tournament archive table",
        })?;

    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("td")?;
    let link_selector = Selector::parse("a[href]")?;
    let rows = table.select(&row_selector).collect_vec();

    Ok(rows
        .into_iter()
        .filter_map(move |row| parse_listing(&row, &cell_selector, &link_selector)))
}

fn parse_listing(
    row: &ElementRef,
    cell_selector: &Selector,
    link_selector: &Selector,
) -> Option<TournamentListing> {
    let first_cell = row.select(cell_selector).next()?;
    let link = first_cell.select(link_selector).next()?;
    let href = link.value().attr("href")?;
    let id = id_after(href, TOURNAMENT_PATH)?;
    Some(TournamentListing {
        id,
        name: element_text(&link),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::parse_document;

    const ARCHIVE: &str = r#"
        <html><body>
        <table class="sTable">
          <thead><tr><th>Tournament</th><th>Date</th></tr></thead>
          <tbody>
            <tr><td><a href="/eng/tournament/id/5120/">Riga Open 2024</a></td><td>01.05.2024</td></tr>
            <tr><td><a href="/eng/tournament/id/5119/"> Tallinn
                Cup </a></td><td>28.04.2024</td></tr>
            <tr><td><a href="/eng/news/id/7/">Not a tournament</a></td></tr>
            <tr><td>No link</td></tr>
          </tbody>
        </table>
        </body></html>"#;

    #[test]
    fn test_parse_archive() {
        let document = parse_document(ARCHIVE);
        let listings = parse_archive(&document).unwrap().collect_vec();
        assert_eq!(
            listings,
            vec![
                TournamentListing {
                    id: 5120,
                    name: "Riga Open 2024".into()
                },
                TournamentListing {
                    id: 5119,
                    name: "Tallinn Cup".into()
                },
            ]
        );
    }

    #[test]
    fn test_parse_archive_is_deterministic() {
        let document = parse_document(ARCHIVE);
        let first = parse_archive(&document).unwrap().collect_vec();
        let second = parse_archive(&document).unwrap().collect_vec();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_table_is_layout_error() {
        let document = parse_document("<html><body><p>maintenance</p></body></html>");
        assert!(matches!(
            parse_archive(&document).err(),
            Some(ScorpionError::Layout { .. })
        ));
    }

    #[test]
    fn test_archive_url() {
        assert_eq!(
            archive_url("https://th.sportscorpion.com", 3),
            "https://th.sportscorpion.com/eng/tournament/archive/?page=3"
        );
    }
}
