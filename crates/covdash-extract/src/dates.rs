//! Publication-timestamp recognizers.
//!
//! The dashboard has stamped its "last updated" heading in several formats
//! over time. Each format is one [`DateRecognizer`]; a [`DateExtractor`] tries
//! them in order. Recognizers are only ever appended, never removed, because
//! older archived pages still have to be re-parsed.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use covdash_core::Document;
use regex::{Captures, Regex};

use crate::error::DateError;

/// Headings the dashboard puts its update stamp in.
const STAMP_SELECTOR: &str = "h4";

/// `3:45 p.m. 9/14/20`
static CLOCK_SLASH_DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*([ap])\.?\s*m\.?\s+(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})\b")
        .expect("valid regex")
});

/// `3:45 p.m. Sept. 21`
static CLOCK_MONTH_DAY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d{1,2}):(\d{2})\s*([ap])\.?\s*m\.?\s+([a-z]+)\.?\s+(\d{1,2})\b")
        .expect("valid regex")
});

pub trait DateRecognizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Recovers the timestamp from `document`.
    ///
    /// # Errors
    ///
    /// [`DateError::FormatNotRecognized`] when nothing in the document has
    /// this recognizer's shape, [`DateError::InvalidDate`] when something
    /// does but names an impossible date.
    fn recognize(&self, document: &Document) -> Result<NaiveDateTime, DateError>;
}

/// Clock time followed by a numeric `M/D/YY` date. Two-digit years are
/// always read as 20xx.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSlashDate;

impl DateRecognizer for ClockSlashDate {
    fn name(&self) -> &'static str {
        "clock-slash-date"
    }

    fn recognize(&self, document: &Document) -> Result<NaiveDateTime, DateError> {
        scan(self.name(), document, &CLOCK_SLASH_DATE_RE, |caps| {
            let month = caps[4].parse::<u32>().ok()?;
            let day = caps[5].parse::<u32>().ok()?;
            let year = match caps[6].parse::<i32>().ok()? {
                yy if caps[6].len() == 2 => 2000 + yy,
                yyyy => yyyy,
            };
            NaiveDate::from_ymd_opt(year, month, day)
        })
    }
}

/// Clock time followed by an abbreviated month and a day, with no year. The
/// year comes from the recognizer's configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClockMonthDay {
    year: i32,
}

impl ClockMonthDay {
    #[must_use]
    pub fn new(year: i32) -> Self {
        Self { year }
    }
}

impl DateRecognizer for ClockMonthDay {
    fn name(&self) -> &'static str {
        "clock-month-day"
    }

    fn recognize(&self, document: &Document) -> Result<NaiveDateTime, DateError> {
        scan(self.name(), document, &CLOCK_MONTH_DAY_RE, |caps| {
            let month = month_from_abbr(&caps[4])?;
            let day = caps[5].parse::<u32>().ok()?;
            NaiveDate::from_ymd_opt(self.year, month, day)
        })
    }
}

/// Ordered chain of recognizers; the first success wins.
pub struct DateExtractor {
    recognizers: Vec<Box<dyn DateRecognizer>>,
}

impl DateExtractor {
    /// An extractor with no recognizers. Use [`DateExtractor::default`] for
    /// the dashboard's known formats.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            recognizers: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_recognizer(mut self, recognizer: impl DateRecognizer + 'static) -> Self {
        self.recognizers.push(Box::new(recognizer));
        self
    }

    /// Tries every recognizer in order.
    ///
    /// # Errors
    ///
    /// Returns [`DateError::NoDateFound`] if every recognizer fails.
    pub fn extract(&self, document: &Document) -> Result<NaiveDateTime, DateError> {
        for recognizer in &self.recognizers {
            match recognizer.recognize(document) {
                Ok(timestamp) => return Ok(timestamp),
                Err(err) => {
                    tracing::trace!(
                        recognizer = recognizer.name(),
                        error = %err,
                        "date recognizer failed"
                    );
                }
            }
        }
        Err(DateError::NoDateFound)
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::empty()
            .with_recognizer(ClockSlashDate)
            .with_recognizer(ClockMonthDay::new(2020))
    }
}

/// Runs `re` over every stamp heading and turns the first match that
/// `to_date` accepts into a timestamp.
fn scan<F>(
    recognizer: &'static str,
    document: &Document,
    re: &Regex,
    to_date: F,
) -> Result<NaiveDateTime, DateError>
where
    F: Fn(&Captures<'_>) -> Option<NaiveDate>,
{
    let mut invalid: Option<String> = None;

    for heading in document.texts_of(STAMP_SELECTOR) {
        let text = heading.replace('\u{a0}', " ");
        for caps in re.captures_iter(&text) {
            let time = clock_time(&caps);
            match (to_date(&caps), time) {
                (Some(date), Some((hour, minute))) => {
                    if let Some(ts) = date.and_hms_opt(hour, minute, 0) {
                        return Ok(ts);
                    }
                }
                _ => {
                    invalid.get_or_insert_with(|| caps[0].to_string());
                }
            }
        }
    }

    match invalid {
        Some(text) => Err(DateError::InvalidDate { recognizer, text }),
        None => Err(DateError::FormatNotRecognized { recognizer }),
    }
}

/// Hour and minute from capture groups 1-3 (`h`, `mm`, `a`/`p`).
fn clock_time(caps: &Captures<'_>) -> Option<(u32, u32)> {
    let hour = caps[1].parse::<u32>().ok()?;
    let minute = caps[2].parse::<u32>().ok()?;
    let pm = caps[3].eq_ignore_ascii_case("p");
    if hour == 0 || hour > 12 || minute > 59 {
        return None;
    }
    Some((hour % 12 + if pm { 12 } else { 0 }, minute))
}

fn month_from_abbr(word: &str) -> Option<u32> {
    let lower = word.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}
