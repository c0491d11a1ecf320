use std::path::PathBuf;

use chrono::{Local, NaiveDateTime, SubsecRound};
use covdash_core::{Capture, CaptureDraft, Content, Document};
use covdash_extract::DateExtractor;
use covdash_scraper::{collect_images, PageSource};

use crate::detect::{ChangeDetector, Verdict};
use crate::error::OrchestratorError;
use crate::store::ArchiveStore;

/// Source of the fallback timestamp when a page carries no recognizable date.
pub type Clock = fn() -> NaiveDateTime;

/// Local wall-clock time truncated to whole seconds.
#[must_use]
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local().trunc_subsecs(0)
}

/// Result of one capture cycle. "Nothing changed" is an expected outcome,
/// not an error.
#[derive(Debug)]
pub enum CaptureOutcome {
    Archived {
        capture: Capture,
        path: PathBuf,
        verdict: Verdict,
    },
    Unchanged { latest: Capture },
}

impl CaptureOutcome {
    #[must_use]
    pub fn capture(&self) -> &Capture {
        match self {
            Self::Archived { capture, .. } => capture,
            Self::Unchanged { latest } => latest,
        }
    }

    #[must_use]
    pub fn is_archived(&self) -> bool {
        matches!(self, Self::Archived { .. })
    }
}

/// One fetch, date, detect, write cycle against a [`PageSource`].
pub struct CaptureOrchestrator<S> {
    source: S,
    store: ArchiveStore,
    dates: DateExtractor,
    detector: ChangeDetector,
    marker: String,
    clock: Clock,
}

impl<S: PageSource> CaptureOrchestrator<S> {
    pub fn new(source: S, store: ArchiveStore, marker: impl Into<String>) -> Self {
        let marker = marker.into();
        Self {
            source,
            store,
            dates: DateExtractor::default(),
            detector: ChangeDetector::new(marker.clone()),
            marker,
            clock: local_now,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_date_extractor(mut self, dates: DateExtractor) -> Self {
        self.dates = dates;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &ArchiveStore {
        &self.store
    }

    /// Runs one capture cycle. With `force`, the page is archived even when
    /// nothing changed.
    ///
    /// # Errors
    ///
    /// - [`OrchestratorError::FetchFailed`] if the page cannot be fetched.
    /// - [`OrchestratorError::Detect`] if the comparison is inconclusive.
    /// - [`OrchestratorError::Images`] if a chart image cannot be downloaded
    ///   for archiving.
    /// - [`OrchestratorError::Store`] if the capture cannot be written.
    pub async fn run(&self, force: bool) -> Result<CaptureOutcome, OrchestratorError> {
        let fetched = self.source.fetch_page().await?;
        Content::from_media_type(fetched.media_type.as_deref(), &fetched.body)?;
        let document = Document::from_bytes(&fetched.body);

        let timestamp = match self.dates.extract(&document) {
            Ok(timestamp) => timestamp,
            Err(e) => {
                let now = (self.clock)();
                tracing::warn!(
                    error = %e,
                    fallback = %now,
                    "no publication date found, using current time"
                );
                now
            }
        };

        let detection = self
            .detector
            .detect(&self.source, &self.store, &document, timestamp)
            .await?;

        if !detection.verdict.is_new() && !force {
            if let Some(latest) = detection.latest {
                tracing::info!(latest = %latest.name, "no new data");
                return Ok(CaptureOutcome::Unchanged { latest });
            }
        }

        let images = match detection.images {
            Some(images) => images,
            None => collect_images(&self.source, &document, &self.marker).await?,
        };

        if force && !detection.verdict.is_new() {
            tracing::info!("archiving unchanged page on request");
        }

        let (capture, path) = self.store.write_capture(CaptureDraft {
            timestamp,
            document,
            images,
        })?;
        Ok(CaptureOutcome::Archived {
            capture,
            path,
            verdict: detection.verdict,
        })
    }
}
