//! Batch extraction over the whole archive.
//!
//! The latest capture of each calendar day is read with the strategy
//! scheduled for that day and appended to the series. Days already in the
//! series are skipped. A capture that cannot be read or parsed is logged and
//! recorded as a placeholder row so the run continues.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::NaiveDate;
use covdash_archive::ArchiveStore;
use covdash_core::{AppConfig, CaptureName};
use covdash_extract::{LayoutSchedule, SeriesTable, TesseractCli, TextRecognizer};

use crate::extract::observe_capture;

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ReprocessSummary {
    pub appended: usize,
    pub placeholders: usize,
    pub skipped: usize,
}

/// The last capture of each calendar day, oldest day first.
pub(crate) fn latest_per_day(names: &[CaptureName]) -> Vec<CaptureName> {
    let mut by_day: BTreeMap<NaiveDate, CaptureName> = BTreeMap::new();
    for name in names {
        by_day
            .entry(name.timestamp.date())
            .and_modify(|kept| *kept = (*kept).max(*name))
            .or_insert(*name);
    }
    by_day.into_values().collect()
}

pub(crate) fn reprocess_archive<R>(
    store: &ArchiveStore,
    table: &SeriesTable,
    schedule: &LayoutSchedule,
    recognizer: &R,
    since: Option<NaiveDate>,
) -> anyhow::Result<ReprocessSummary>
where
    R: TextRecognizer + ?Sized,
{
    let last_date = table.last_row()?.map(|row| row.date);
    let mut summary = ReprocessSummary::default();

    for name in latest_per_day(&store.capture_names()?) {
        let date = name.timestamp.date();
        if since.is_some_and(|since| date < since) || last_date.is_some_and(|last| date <= last) {
            summary.skipped += 1;
            continue;
        }

        let observation = match store.read_capture(name) {
            Ok(capture) => match observe_capture(&capture, schedule, recognizer) {
                Ok(observation) => Some(observation),
                Err(e) => {
                    tracing::warn!(
                        capture = %name,
                        error = %e,
                        "extraction failed, appending placeholder"
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    capture = %name,
                    error = %e,
                    "capture unreadable, appending placeholder"
                );
                None
            }
        };

        table.append(date, observation.as_ref())?;
        if observation.is_some() {
            summary.appended += 1;
        } else {
            summary.placeholders += 1;
        }
    }

    Ok(summary)
}

pub(crate) fn run_reprocess(config: &AppConfig, since: Option<NaiveDate>) -> anyhow::Result<()> {
    let store = ArchiveStore::new(
        config.archive_dir.clone(),
        Duration::from_millis(config.lock_timeout_ms),
    );
    let table = SeriesTable::new(config.series_path.clone());
    let recognizer = TesseractCli::new(config.ocr_binary.clone(), config.ocr_language.clone());

    let summary = reprocess_archive(
        &store,
        &table,
        &LayoutSchedule::default(),
        &recognizer,
        since,
    )?;

    tracing::info!(
        appended = summary.appended,
        placeholders = summary.placeholders,
        skipped = summary.skipped,
        series = %table.path().display(),
        "reprocess complete"
    );
    println!(
        "appended {} rows ({} placeholders), skipped {} days",
        summary.appended + summary.placeholders,
        summary.placeholders,
        summary.skipped
    );
    Ok(())
}

#[cfg(test)]
#[path = "reprocess_test.rs"]
mod tests;
