use std::time::Duration;

use covdash_archive::{ArchiveStore, CaptureOrchestrator, CaptureOutcome};
use covdash_core::AppConfig;
use covdash_scraper::DashboardClient;

/// Fetch the dashboard once and archive it when it changed (or always, with
/// `force`).
///
/// # Errors
///
/// Returns an error if the client cannot be built, the fetch or comparison
/// fails, or the capture cannot be written.
pub(crate) async fn run_capture(config: &AppConfig, force: bool) -> anyhow::Result<()> {
    let client = DashboardClient::new(
        &config.dashboard_url,
        config.request_timeout_secs,
        &config.user_agent,
    )?;
    let store = ArchiveStore::new(
        config.archive_dir.clone(),
        Duration::from_millis(config.lock_timeout_ms),
    );
    let orchestrator = CaptureOrchestrator::new(client, store, config.image_marker.clone());

    tracing::info!(url = %config.dashboard_url, force, "starting capture");
    match orchestrator.run(force).await? {
        CaptureOutcome::Archived {
            capture,
            path,
            verdict,
        } => {
            println!(
                "archived {} ({} images, {verdict:?}) at {}",
                capture.name,
                capture.images.len(),
                path.display()
            );
        }
        CaptureOutcome::Unchanged { latest } => {
            println!("no new data; latest capture is {}", latest.name);
        }
    }
    Ok(())
}
