//! Deciding whether a fresh fetch differs from the latest capture.
//!
//! The baseline is the last capture written under the fresh page's own
//! timestamp prefix, falling back to the capture that sorts last. Names come
//! from the page's date stamp or the fallback clock, so the one sorting last
//! is not always the one this page was last archived as.
//!
//! The document digest is compared first. Only when the document is
//! byte-identical are the chart images downloaded and compared against the
//! baseline's images, since the dashboard can swap a chart image without
//! touching its markup.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use covdash_core::{
    hash_images, Capture, CaptureName, ContentDigest, Document, ImageHashes, ImageSet,
};
use covdash_scraper::{collect_images, PageSource};

use crate::error::{DetectError, StoreError};
use crate::store::ArchiveStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing has been archived yet.
    FirstCapture,
    DocumentChanged,
    /// Document unchanged, but these images carry content not seen in the
    /// latest images folder.
    ImagesChanged { identifiers: Vec<String> },
    Unchanged,
}

impl Verdict {
    #[must_use]
    pub fn is_new(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Verdict plus what was loaded while reaching it.
#[derive(Debug)]
pub struct Detection {
    pub verdict: Verdict,
    /// The baseline capture the fetch was compared against.
    pub latest: Option<Capture>,
    /// Chart images downloaded for the comparison, reused when archiving.
    pub images: Option<ImageSet>,
}

pub struct ChangeDetector {
    marker: String,
}

impl ChangeDetector {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// Compares a freshly fetched `document`, about to be named after
    /// `timestamp`, against its baseline in `store`.
    ///
    /// # Errors
    ///
    /// - [`DetectError::ComparisonFailed`] if a comparison image cannot be
    ///   downloaded.
    /// - [`DetectError::UnsupportedContent`] if one has an unhashable type.
    /// - [`DetectError::Store`] if a baseline capture cannot be read.
    pub async fn detect<S: PageSource>(
        &self,
        source: &S,
        store: &ArchiveStore,
        document: &Document,
        timestamp: NaiveDateTime,
    ) -> Result<Detection, DetectError> {
        let own_stamp = store.latest_with_prefix(&CaptureName::prefix_for(timestamp))?;
        let latest = match store.read_latest_capture() {
            Ok(capture) => capture,
            Err(StoreError::Empty) => {
                tracing::debug!("archive is empty, first capture");
                return Ok(Detection {
                    verdict: Verdict::FirstCapture,
                    latest: None,
                    images: None,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let fresh_hash = document.digest();
        let baseline = match own_stamp {
            Some(capture) if capture.document_hash == fresh_hash => capture,
            _ if latest.document_hash == fresh_hash => latest,
            own_stamp => {
                let baseline = own_stamp.unwrap_or(latest);
                tracing::debug!(baseline = %baseline.name, "document changed");
                return Ok(Detection {
                    verdict: Verdict::DocumentChanged,
                    latest: Some(baseline),
                    images: None,
                });
            }
        };

        let images = collect_images(source, document, &self.marker).await?;
        let identifiers = changed_images(&hash_images(&images), &baseline.image_hashes);

        let verdict = if identifiers.is_empty() {
            Verdict::Unchanged
        } else {
            Verdict::ImagesChanged { identifiers }
        };
        tracing::debug!(baseline = %baseline.name, ?verdict, "document unchanged, images compared");

        Ok(Detection {
            verdict,
            latest: Some(baseline),
            images: Some(images),
        })
    }
}

/// Identifiers of `fresh` images whose digest appears nowhere in `prior`.
#[must_use]
pub fn changed_images(fresh: &ImageHashes, prior: &ImageHashes) -> Vec<String> {
    let known: BTreeSet<&ContentDigest> = prior.values().collect();
    fresh
        .iter()
        .filter(|(_, hash)| !known.contains(hash))
        .map(|(identifier, _)| identifier.clone())
        .collect()
}
