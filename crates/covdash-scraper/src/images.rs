//! Download of the chart images a page references.

use covdash_core::{Content, Document, ImageSet};

use crate::client::PageSource;
use crate::error::ImageFetchError;

/// Fetches every chart image in `document` whose source contains `marker`.
///
/// Images are fetched one at a time in document order. A body whose declared
/// media type cannot be hashed (e.g. a JSON error payload) is rejected rather
/// than archived.
///
/// # Errors
///
/// - [`ImageFetchError::Fetch`] if any image cannot be downloaded.
/// - [`ImageFetchError::Content`] if any image has an unhashable media type.
pub async fn collect_images<S: PageSource>(
    source: &S,
    document: &Document,
    marker: &str,
) -> Result<ImageSet, ImageFetchError> {
    let mut images = ImageSet::new();

    for chart in document.chart_images(marker) {
        let fetched = source
            .fetch_asset(&chart.source)
            .await
            .map_err(|e| ImageFetchError::Fetch {
                identifier: chart.identifier.clone(),
                source: e,
            })?;

        Content::from_media_type(fetched.media_type.as_deref(), &fetched.body).map_err(|e| {
            ImageFetchError::Content {
                identifier: chart.identifier.clone(),
                source: e,
            }
        })?;

        tracing::debug!(
            identifier = %chart.identifier,
            bytes = fetched.body.len(),
            "collected chart image"
        );
        images.insert(chart.identifier, fetched.body);
    }

    Ok(images)
}
