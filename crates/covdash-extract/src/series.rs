//! Append-only CSV time series of daily counts.
//!
//! Columns: `date, daily_pos, daily_tests, daily_pcnt, cumul_pos, cumul_test`.
//! A day whose counts could not be extracted gets a row with empty daily
//! columns and the cumulative columns carried forward, so the cumulative
//! columns never decrease.

use std::cmp::Ordering;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use covdash_core::NumericObservation;
use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRow {
    pub date: NaiveDate,
    pub daily_pos: Option<u64>,
    pub daily_tests: Option<u64>,
    pub daily_pcnt: Option<f64>,
    pub cumul_pos: u64,
    pub cumul_test: u64,
}

impl SeriesRow {
    /// The row that follows `previous` for `date`. `None` as the observation
    /// yields a placeholder row.
    #[must_use]
    pub fn next(
        previous: Option<&SeriesRow>,
        date: NaiveDate,
        observation: Option<&NumericObservation>,
    ) -> Self {
        let (prior_pos, prior_test) = previous.map_or((0, 0), |r| (r.cumul_pos, r.cumul_test));

        match observation {
            Some(obs) => Self {
                date,
                daily_pos: Some(obs.new_positive_tests),
                daily_tests: Some(obs.new_total_tests),
                daily_pcnt: Some(percent_one_decimal(
                    obs.new_positive_tests,
                    obs.new_total_tests,
                )),
                cumul_pos: prior_pos.saturating_add(obs.new_positive_tests),
                cumul_test: prior_test.saturating_add(obs.new_total_tests),
            },
            None => Self {
                date,
                daily_pos: None,
                daily_tests: None,
                daily_pcnt: None,
                cumul_pos: prior_pos,
                cumul_test: prior_test,
            },
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.daily_pos.is_none()
    }
}

/// `part` as a percent of `whole` to one decimal, halves rounded to even.
/// Rounds the exact ratio, so 1 of 16 is 6.2 and 3 of 16 is 18.8.
#[allow(clippy::cast_precision_loss)] // tenths of a percent stay far below 2^52
fn percent_one_decimal(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let (scaled, whole) = (u128::from(part) * 1000, u128::from(whole));
    let (tenths, remainder) = (scaled / whole, scaled % whole);
    let tenths = match (remainder * 2).cmp(&whole) {
        Ordering::Greater => tenths + 1,
        Ordering::Equal => tenths + (tenths & 1),
        Ordering::Less => tenths,
    };
    tenths as f64 / 10.0
}

pub struct SeriesTable {
    path: PathBuf,
}

impl SeriesTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every row in file order. A missing file is an empty series.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Csv`] if the file cannot be read or a row is
    /// malformed.
    pub fn rows(&self) -> Result<Vec<SeriesRow>, SeriesError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize()
            .collect::<Result<Vec<SeriesRow>, _>>()
            .map_err(SeriesError::from)
    }

    /// # Errors
    ///
    /// Same as [`SeriesTable::rows`].
    pub fn last_row(&self) -> Result<Option<SeriesRow>, SeriesError> {
        Ok(self.rows()?.pop())
    }

    /// Appends the row for `date`, deriving percent and cumulative totals from
    /// the last row. Creates the file with its header if needed.
    ///
    /// # Errors
    ///
    /// - [`SeriesError::OutOfOrder`] if `date` is not after the last row's date.
    /// - [`SeriesError::Csv`] / [`SeriesError::Io`] on read or write failure.
    pub fn append(
        &self,
        date: NaiveDate,
        observation: Option<&NumericObservation>,
    ) -> Result<SeriesRow, SeriesError> {
        let last = self.last_row()?;
        if let Some(last) = &last {
            if date <= last.date {
                return Err(SeriesError::OutOfOrder {
                    date,
                    last: last.date,
                });
            }
        }

        let row = SeriesRow::next(last.as_ref(), date, observation);

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)?;
        let needs_header = file.metadata()?.len() == 0;
        if !needs_header && !ends_with_newline(&mut file)? {
            file.write_all(b"\n")?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(&row)?;
        writer.flush()?;

        if row.is_placeholder() {
            tracing::warn!(date = %row.date, "appended placeholder row");
        } else {
            tracing::info!(
                date = %row.date,
                daily_pos = row.daily_pos,
                daily_tests = row.daily_tests,
                cumul_pos = row.cumul_pos,
                cumul_test = row.cumul_test,
                "appended series row"
            );
        }
        Ok(row)
    }
}

fn ends_with_newline(file: &mut fs::File) -> std::io::Result<bool> {
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
