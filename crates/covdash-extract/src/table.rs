//! Positional extraction from the dashboard's HTML table cells.
//!
//! Every redesign of the dashboard moved the numbers to different `<td>`
//! positions. Each redesign gets its own [`TableLayout`] constant; an existing
//! layout is never edited to fit a newer page.

use std::sync::LazyLock;

use covdash_core::{Document, NumericObservation};
use regex::Regex;

use crate::error::ExtractError;

static CELL_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d[\d,]*").expect("valid regex"));

/// A label cell that must mention `expected` before the layout's offsets are
/// trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderCheck {
    pub cell: usize,
    pub expected: &'static str,
}

/// Cell offsets (indices into the page's `<td>` cells in document order) for
/// one dashboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub name: &'static str,
    /// Cell holding today's positive results.
    pub positive_cell: usize,
    /// Cells summed into today's total tests.
    pub total_cells: &'static [usize],
    pub header_checks: &'static [HeaderCheck],
}

/// Layout in use from 2020-09-10: "today" row of positive cases, PCR tests and
/// antigen tests; total tests is PCR plus antigen.
pub const SEPT_10: TableLayout = TableLayout {
    name: "2020-09-10",
    positive_cell: 5,
    total_cells: &[6, 7],
    header_checks: &[],
};

/// Layout in use from 2020-09-14: six-cell rows with today's row first; the
/// column labels start at cell 13.
pub const EARLY_SEPT_14: TableLayout = TableLayout {
    name: "2020-09-14",
    positive_cell: 1,
    total_cells: &[4],
    header_checks: &[
        HeaderCheck {
            cell: 13,
            expected: "positive",
        },
        HeaderCheck {
            cell: 16,
            expected: "total",
        },
    ],
};

impl TableLayout {
    /// Reads today's counts out of `document`.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::HeaderMismatch`] if a label cell no longer says what
    ///   this layout expects.
    /// - [`ExtractError::MissingCell`] if the page has too few cells.
    /// - [`ExtractError::NonNumericCell`] if a count cell holds no number.
    pub fn extract(&self, document: &Document) -> Result<NumericObservation, ExtractError> {
        let cells = document.cell_texts();

        for check in self.header_checks {
            let found = self.cell(&cells, check.cell)?;
            if !found.to_lowercase().contains(check.expected) {
                return Err(ExtractError::HeaderMismatch {
                    layout: self.name,
                    index: check.cell,
                    expected: check.expected,
                    found: found.trim().to_string(),
                });
            }
        }

        let positive = self.number(&cells, self.positive_cell)?;
        let mut total = 0u64;
        for &index in self.total_cells {
            total = total.saturating_add(self.number(&cells, index)?);
        }

        Ok(NumericObservation::new(positive, total))
    }

    fn cell<'c>(&self, cells: &'c [String], index: usize) -> Result<&'c str, ExtractError> {
        cells
            .get(index)
            .map(String::as_str)
            .ok_or(ExtractError::MissingCell {
                layout: self.name,
                index,
                available: cells.len(),
            })
    }

    fn number(&self, cells: &[String], index: usize) -> Result<u64, ExtractError> {
        let text = self.cell(cells, index)?;
        CELL_NUMBER_RE
            .find(text)
            .and_then(|m| m.as_str().replace(',', "").parse::<u64>().ok())
            .ok_or_else(|| ExtractError::NonNumericCell {
                layout: self.name,
                index,
                text: text.trim().to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(cells: &[&str]) -> Document {
        let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
        Document::parse(&format!("<table><tr>{tds}</tr></table>"))
    }

    #[test]
    fn sept_10_sums_pcr_and_antigen() {
        let doc = table(&[
            "What", "This week", "Today", "", "Positive cases", "12", "150", "50",
        ]);
        let obs = SEPT_10.extract(&doc).unwrap();
        assert_eq!(obs.new_positive_tests, 12);
        assert_eq!(obs.new_total_tests, 200);
        assert!((obs.percent_positive - 6.0).abs() < 1e-9);
    }

    #[test]
    fn sept_10_strips_thousands_separators() {
        let doc = table(&["", "", "", "", "", "1,234 cases", "20,000", "0"]);
        let obs = SEPT_10.extract(&doc).unwrap();
        assert_eq!(obs.new_positive_tests, 1234);
        assert_eq!(obs.new_total_tests, 20_000);
    }

    #[test]
    fn sept_10_short_table_is_missing_cell() {
        let doc = table(&["", "", "", "", "", "12"]);
        let err = SEPT_10.extract(&doc).unwrap_err();
        assert!(
            matches!(err, ExtractError::MissingCell { index: 6, available: 6, .. }),
            "got: {err:?}"
        );
    }

    #[test]
    fn sept_10_text_cell_is_non_numeric() {
        let doc = table(&["", "", "", "", "", "pending", "1", "1"]);
        let err = SEPT_10.extract(&doc).unwrap_err();
        assert!(matches!(err, ExtractError::NonNumericCell { index: 5, .. }));
    }

    fn early_sept_14_cells(positive_label: &'static str) -> Vec<&'static str> {
        let mut cells = vec!["Today", "9", "180", "3", "192", "4.7%"];
        cells.extend(["Week", "40", "900", "8", "948", "4.2%"]);
        cells.push("");
        cells.extend([positive_label, "Negative", "Inconclusive", "Total", "% Positive"]);
        cells
    }

    #[test]
    fn early_sept_14_reads_today_row() {
        let doc = table(&early_sept_14_cells("Positive"));
        let obs = EARLY_SEPT_14.extract(&doc).unwrap();
        assert_eq!(obs.new_positive_tests, 9);
        assert_eq!(obs.new_total_tests, 192);
    }

    #[test]
    fn early_sept_14_detects_moved_columns() {
        let doc = table(&early_sept_14_cells("Negative"));
        let err = EARLY_SEPT_14.extract(&doc).unwrap_err();
        assert!(
            matches!(err, ExtractError::HeaderMismatch { index: 13, expected: "positive", .. }),
            "got: {err:?}"
        );
    }
}
