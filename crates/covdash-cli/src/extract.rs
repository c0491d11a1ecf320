use std::time::Duration;

use anyhow::Context;
use covdash_archive::ArchiveStore;
use covdash_core::{AppConfig, CaptureName, NumericObservation};
use covdash_extract::{observe, ExtractError, LayoutSchedule, TesseractCli, TextRecognizer};

/// Accepts a capture name with or without its `.html` extension.
pub(crate) fn parse_capture_name(raw: &str) -> Option<CaptureName> {
    let raw = raw.trim();
    CaptureName::parse(raw).or_else(|| CaptureName::parse(&format!("{raw}.html")))
}

/// Reads the daily counts of one capture using the strategy scheduled for
/// its date.
///
/// # Errors
///
/// Returns [`ExtractError::NoStrategy`] for dates before the first known
/// layout, or whatever the strategy itself fails with.
pub(crate) fn observe_capture<R>(
    capture: &covdash_core::Capture,
    schedule: &LayoutSchedule,
    recognizer: &R,
) -> Result<NumericObservation, ExtractError>
where
    R: TextRecognizer + ?Sized,
{
    let date = capture.timestamp().date();
    let strategy = schedule
        .strategy_for(date)
        .ok_or(ExtractError::NoStrategy(date))?;
    observe(capture, strategy, recognizer)
}

pub(crate) fn run_extract(config: &AppConfig, raw_name: &str) -> anyhow::Result<()> {
    let name = parse_capture_name(raw_name)
        .with_context(|| format!("'{raw_name}' is not a capture name"))?;
    let store = ArchiveStore::new(
        config.archive_dir.clone(),
        Duration::from_millis(config.lock_timeout_ms),
    );
    let capture = store.read_capture(name)?;

    let recognizer = TesseractCli::new(config.ocr_binary.clone(), config.ocr_language.clone());
    let observation = observe_capture(&capture, &LayoutSchedule::default(), &recognizer)
        .with_context(|| format!("extracting counts from {name}"))?;

    println!(
        "{name}: positive={} tests={} percent={:.1}",
        observation.new_positive_tests,
        observation.new_total_tests,
        observation.percent_positive
    );
    if let Some(reported) = observation.reported_percent {
        println!("{name}: dashboard reported {reported:.1}%");
    }
    Ok(())
}
