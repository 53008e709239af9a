pub mod archive;
pub mod player;
pub mod ranking;
pub mod stage;
pub mod tournament;

use std::collections::BTreeMap;

pub use ::scraper::Html;
use ::scraper::{ElementRef, Selector};

use crate::error::Result;

/// Parse a fetched page body as an HTML document.
pub fn parse_document(body: &str) -> Html {
    Html::parse_document(body)
}

/// Extract trimmed text content from the first element matching `selector`
/// inside `element`. Returns an empty string if nothing matches.
pub(crate) fn select_text(element: &ElementRef, selector: &Selector) -> String {
    element
        .select(selector)
        .next()
        .map(|e| element_text(&e))
        .unwrap_or_default()
}

/// All text of `element`, whitespace collapsed to single spaces.
pub(crate) fn element_text(element: &ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn non_empty(text: String) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

/// Two-cell key/value rows (`<th>Country</th><td>Latvia</td>`) of the
/// profile and tournament info tables. The first occurrence of a key wins.
pub(crate) fn info_rows(document: &Html) -> Result<BTreeMap<String, String>> {
    let row_selector = Selector::parse("tr")?;
    let cell_selector = Selector::parse("th, td")?;
    let mut rows = BTreeMap::new();
    for row in document.select(&row_selector) {
        let cells: Vec<ElementRef> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|c| cell_selector.matches(c))
            .collect();
        if let [key, value] = cells.as_slice() {
            let key = element_text(key);
            if !key.is_empty() {
                rows.entry(key).or_insert_with(|| element_text(value));
            }
        }
    }
    Ok(rows)
}

/// Numeric id following `marker` in a link, e.g. `/eng/user/id/42/`.
pub(crate) fn id_after(href: &str, marker: &str) -> Option<u32> {
    let (_, rest) = href.split_once(marker)?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Turn a site-relative link into an absolute URL.
pub(crate) fn absolute_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{href}", base_url.trim_end_matches('/'))
    } else {
        format!("{}/{href}", base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_rows() {
        let document = parse_document(
            r#"<table class="iTable">
                <tr><th>Country</th><td> Latvia </td></tr>
                <tr><th>City</th><td>Riga</td></tr>
                <tr><th>Country</th><td>ignored</td></tr>
                <tr><td>lonely cell</td></tr>
            </table>"#,
        );
        let rows = info_rows(&document).unwrap();
        assert_eq!(rows.get("Country").map(String::as_str), Some("Latvia"));
        assert_eq!(rows.get("City").map(String::as_str), Some("Riga"));
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_id_after() {
        assert_eq!(id_after("/eng/user/id/1234/", "/user/id/"), Some(1234));
        assert_eq!(id_after("/eng/user/id/", "/user/id/"), None);
        assert_eq!(id_after("/eng/tournament/id/77", "/tournament/id/"), Some(77));
    }

    #[test]
    fn test_absolute_url() {
        let base = "https://th.sportscorpion.com";
        assert_eq!(
            absolute_url(base, "/eng/user/id/1/"),
            "https://th.sportscorpion.com/eng/user/id/1/"
        );
        assert_eq!(absolute_url(base, "https://other.test/x"), "https://other.test/x");
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let document = parse_document("<h1 id=\"header\">\n  Riga\n   Open  </h1>");
        let selector = Selector::parse("h1#header").unwrap();
        let root = document.root_element();
        assert_eq!(select_text(&root, &selector), "Riga Open");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty(" x ".to_string()), Some("x".to_string()));
    }
}
