//! Parsed dashboard page.
//!
//! A [`Document`] only ever holds the canonical serialization produced by the
//! HTML5 parser. Queries reparse on demand, which keeps the type `Send`,
//! `Clone`, and cheap to compare.

use std::collections::HashSet;

use scraper::{Html, Selector};

use crate::hash::{digest, Content, ContentDigest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    canonical: String,
}

/// A chart image referenced by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartImage {
    /// Filesystem-safe name the image is archived under.
    pub identifier: String,
    /// URL as written in the page (may be relative).
    pub source: String,
}

impl Document {
    /// Parses raw markup and keeps its canonical reserialization.
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        let html = Html::parse_document(markup);
        Self {
            canonical: html.html(),
        }
    }

    /// Parses a fetched body, replacing invalid UTF-8 sequences.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::parse(&String::from_utf8_lossy(bytes))
    }

    /// Wraps text that is already canonical, such as a stored snapshot, so
    /// its digest matches the bytes on disk.
    #[must_use]
    pub fn from_canonical(canonical: String) -> Self {
        Self { canonical }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.canonical
    }

    #[must_use]
    pub fn digest(&self) -> ContentDigest {
        digest(Content::Markup(self))
    }

    /// Text content of every element matching `selector`, in document order.
    ///
    /// An unparseable selector matches nothing.
    #[must_use]
    pub fn texts_of(&self, selector: &str) -> Vec<String> {
        let Ok(selector) = Selector::parse(selector) else {
            return Vec::new();
        };
        let html = Html::parse_document(&self.canonical);
        html.select(&selector)
            .map(|el| el.text().collect::<String>())
            .collect()
    }

    /// Text of every `<td>` cell in document order.
    #[must_use]
    pub fn cell_texts(&self) -> Vec<String> {
        self.texts_of("td")
    }

    /// Chart images whose `<img src>` or Tableau `<param value>` contains
    /// `marker`, de-duplicated by identifier in document order.
    #[must_use]
    pub fn chart_images(&self, marker: &str) -> Vec<ChartImage> {
        let html = Html::parse_document(&self.canonical);
        let mut seen = HashSet::new();
        let mut images = Vec::new();

        let sources = [("img[src]", "src"), ("param[value]", "value")];
        for (css, attr) in sources {
            let Ok(selector) = Selector::parse(css) else {
                continue;
            };
            for el in html.select(&selector) {
                let Some(source) = el.value().attr(attr) else {
                    continue;
                };
                if !source.contains(marker) {
                    continue;
                }
                let identifier = image_identifier(source, marker);
                if seen.insert(identifier.clone()) {
                    images.push(ChartImage {
                        identifier,
                        source: source.to_string(),
                    });
                }
            }
        }

        images
    }
}

/// Derives the archive identifier for an image URL.
///
/// The query string and fragment are dropped. The path from `marker` onward is
/// kept (or the whole path when the marker only occurs elsewhere), with `/`
/// and any other character unsafe in a file name replaced by `_`.
#[must_use]
pub fn image_identifier(source: &str, marker: &str) -> String {
    let without_query = source.split(['?', '#']).next().unwrap_or_default();

    let tail = match without_query.find(marker) {
        Some(idx) => &without_query[idx..],
        None => {
            let without_scheme = without_query
                .split_once("://")
                .map_or(without_query, |(_, rest)| rest);
            without_scheme
                .split_once('/')
                .map_or(without_scheme, |(_, path)| path)
        }
    };

    let sanitized: String = tail
        .trim_matches('/')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.is_empty() || sanitized.chars().all(|c| c == '.') {
        "image".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "UW-EauClaireCOVID-19DataTrackerDashboard";

    #[test]
    fn parse_is_stable_under_reserialization() {
        let once = Document::parse(
            "<h4>Updated 3:45 p.m. 9/14/20</h4><table><tr><td>1</td></tr></table>",
        );
        let twice = Document::parse(once.as_str());
        assert_eq!(once, twice);
        assert_eq!(once.digest(), twice.digest());
    }

    #[test]
    fn texts_of_collects_nested_text() {
        let doc = Document::parse("<h4>Updated <b>3:45 p.m.</b> 9/14/20</h4><h4>Other</h4>");
        assert_eq!(
            doc.texts_of("h4"),
            vec!["Updated 3:45 p.m. 9/14/20".to_string(), "Other".to_string()]
        );
    }

    #[test]
    fn texts_of_invalid_selector_is_empty() {
        let doc = Document::parse("<p>x</p>");
        assert!(doc.texts_of("<<").is_empty());
    }

    #[test]
    fn cell_texts_in_document_order() {
        let doc = Document::parse(
            "<table><tr><td>Positive</td><td>12</td></tr><tr><td>Tests</td><td>200</td></tr></table>",
        );
        assert_eq!(doc.cell_texts(), vec!["Positive", "12", "Tests", "200"]);
    }

    #[test]
    fn chart_images_from_img_and_tableau_param() {
        let doc = Document::parse(&format!(
            r#"<img src="/logo.png">
               <img src="https://public.tableau.com/static/images/UW/{MARKER}HSTiles/HealthServicesTiles/1.png?x=1">
               <object class="tableauViz">
                 <param name="static_image" value="https://public.tableau.com/static/images/UW/{MARKER}Trend/Trend/1.png">
                 <param name="tabs" value="no">
               </object>"#
        ));
        let images = doc.chart_images(MARKER);
        let ids: Vec<&str> = images.iter().map(|i| i.identifier.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "UW-EauClaireCOVID-19DataTrackerDashboardHSTiles_HealthServicesTiles_1.png",
                "UW-EauClaireCOVID-19DataTrackerDashboardTrend_Trend_1.png",
            ]
        );
    }

    #[test]
    fn chart_images_deduplicates_by_identifier() {
        let src = format!("https://x.test/{MARKER}/a.png");
        let doc = Document::parse(&format!(
            r#"<img src="{src}"><param name="static_image" value="{src}?v=2">"#
        ));
        assert_eq!(doc.chart_images(MARKER).len(), 1);
    }

    #[test]
    fn identifier_falls_back_to_path_when_marker_in_query() {
        let id = image_identifier(
            "https://public.tableau.com/views/tile.png?name=UW-EauClaireCOVID-19DataTrackerDashboard",
            MARKER,
        );
        assert_eq!(id, "views_tile.png");
    }

    #[test]
    fn identifier_replaces_unsafe_characters() {
        let id = image_identifier("https://x.test/img/MARK:a b\\c.png", "MARK");
        assert_eq!(id, "MARK_a_b_c.png");
    }

    #[test]
    fn identifier_never_empty() {
        assert_eq!(image_identifier("https://x.test/", "zzz"), "image");
    }
}
