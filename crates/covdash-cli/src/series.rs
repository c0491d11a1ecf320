use chrono::{Local, NaiveDate};
use covdash_core::{AppConfig, NumericObservation};
use covdash_extract::SeriesTable;

/// Append a manually read observation, dated today unless `date` is given.
///
/// # Errors
///
/// Returns an error if the series cannot be read or written, or if `date`
/// is not after the last row already in it.
pub(crate) fn run_append(
    config: &AppConfig,
    positive: u64,
    tests: u64,
    date: Option<NaiveDate>,
) -> anyhow::Result<()> {
    if positive > tests {
        anyhow::bail!("positive results ({positive}) cannot exceed tests ({tests})");
    }
    let date = date.unwrap_or_else(|| Local::now().date_naive());
    let table = SeriesTable::new(config.series_path.clone());

    let row = table.append(date, Some(&NumericObservation::new(positive, tests)))?;
    println!(
        "{}: {}/{} ({:.1}%), cumulative {}/{}",
        row.date,
        positive,
        tests,
        row.daily_pcnt.unwrap_or_default(),
        row.cumul_pos,
        row.cumul_test
    );
    Ok(())
}
