use ::scraper::Selector;

use crate::error::{Result, ScorpionError};
use crate::model::Player;
use crate::scraper::{element_text, info_rows, non_empty, Html};

/// URL of a player's profile page.
pub fn player_url(base_url: &str, player_id: u32) -> String {
    format!("{base_url}/eng/user/id/{player_id}/")
}

/// Profile of player `player_id`.
///
/// Fields missing from the info table are left empty; a page without the
/// profile header is not a profile.
pub fn parse_player_page(document: &Html, player_id: u32) -> Result<Player> {
    let header_selector = Selector::parse("h1#header")?;
    let header = document
        .select(&header_selector)
        .next()
        .ok_or(ScorpionError::Layout {
            context: "player header",
        })?;
    // "Player profile - Anna Berzina"
    let header = element_text(&header);
    let name = header
        .rsplit(" - ")
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    let info = info_rows(document)?;
    let field = |key: &str| info.get(key).cloned().and_then(non_empty);
    let (world_rank, ranking_id) = info
        .get("World ranking")
        .map(|text| parse_world_ranking(text))
        .unwrap_or_default();

    Ok(Player {
        id: player_id,
        name,
        world_rank,
        ranking_id,
        country: field("Country"),
        city: field("City"),
        date_of_birth: field("Date of birth"),
        sex: field("Sex"),
    })
}

/// Position and ITHF id from a value like `152. (ID 655257)`.
fn parse_world_ranking(text: &str) -> (Option<u32>, Option<u32>) {
    let rank: String = text
        .trim()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    let ranking_id = text.split_once("ID ").and_then(|(_, rest)| {
        rest.chars()
            .take_while(char::is_ascii_digit)
            .collect::<String>()
            .parse()
            .ok()
    });
    (rank.parse().ok(), ranking_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::parse_document;

    const PROFILE: &str = r#"
        <html><body>
        <h1 id="header">Player profile - Anna Berzina</h1>
        <table class="iTable">
          <tr><th>World ranking</th><td>152. (ID 655257)</td></tr>
          <tr><th>Country</th><td>Latvia</td></tr>
          <tr><th>City</th><td>Riga</td></tr>
          <tr><th>Date of birth</th><td>12.03.1990</td></tr>
          <tr><th>Sex</th><td>Female</td></tr>
        </table>
        </body></html>"#;

    #[test]
    fn test_parse_player_page() {
        let document = parse_document(PROFILE);
        let player = parse_player_page(&document, 11).unwrap();
        assert_eq!(
            player,
            Player {
                id: 11,
                name: "Anna Berzina".into(),
                world_rank: Some(152),
                ranking_id: Some(655257),
                country: Some("Latvia".into()),
                city: Some("Riga".into()),
                date_of_birth: Some("12.03.1990".into()),
                sex: Some("Female".into()),
            }
        );
    }

    #[test]
    fn test_sparse_profile() {
        let document = parse_document(
            r#"<h1 id="header">Ben Ozols</h1>
               <table class="iTable"><tr><th>Country</th><td> </td></tr></table>"#,
        );
        let player = parse_player_page(&document, 12).unwrap();
        assert_eq!(player.name, "Ben Ozols");
        assert_eq!(player.country, None);
        assert_eq!(player.world_rank, None);
        assert_eq!(player.ranking_id, None);
    }

    #[test]
    fn test_missing_header_is_layout_error() {
        let document = parse_document("<html><body>User not found</body></html>");
        assert!(matches!(
            parse_player_page(&document, 1),
            Err(ScorpionError::Layout { .. })
        ));
    }

    #[test]
    fn test_parse_world_ranking() {
        assert_eq!(parse_world_ranking("152. (ID 655257)"), (Some(152), Some(655257)));
        assert_eq!(parse_world_ranking("(ID 7)"), (None, Some(7)));
        assert_eq!(parse_world_ranking("-"), (None, None));
    }
}
