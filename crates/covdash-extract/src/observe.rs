use covdash_core::{Capture, NumericObservation};

use crate::error::ExtractError;
use crate::ocr::{extract_from_image, TextRecognizer};
use crate::schedule::Strategy;

/// Applies `strategy` to an archived capture.
///
/// # Errors
///
/// Returns [`ExtractError`] when the capture cannot be read with this
/// strategy, including [`ExtractError::MissingImage`] when the chart image the
/// strategy needs was not archived.
pub fn observe<R>(
    capture: &Capture,
    strategy: Strategy,
    recognizer: &R,
) -> Result<NumericObservation, ExtractError>
where
    R: TextRecognizer + ?Sized,
{
    match strategy {
        Strategy::Table(layout) => layout.extract(&capture.document),
        Strategy::ChartOcr {
            image_contains,
            crop,
        } => {
            let (identifier, bytes) = capture
                .images
                .iter()
                .find(|(id, _)| id.contains(image_contains))
                .ok_or_else(|| ExtractError::MissingImage(image_contains.to_string()))?;
            tracing::debug!(capture = %capture.name, %identifier, "running OCR on chart image");
            extract_from_image(bytes, crop, recognizer)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use covdash_core::{CaptureName, Document, ImageSet};
    use image::GrayImage;

    use super::*;
    use crate::ocr::DAILY_NUMBERS_BOX;
    use crate::table::SEPT_10;

    struct Unreachable;

    impl TextRecognizer for Unreachable {
        fn recognize(&self, _image: &GrayImage) -> Result<String, ExtractError> {
            panic!("recognizer must not run");
        }
    }

    fn capture(markup: &str, images: ImageSet) -> Capture {
        let ts = NaiveDate::from_ymd_opt(2020, 9, 11)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        Capture::from_parts(CaptureName::new(ts, 0), Document::parse(markup), images)
    }

    #[test]
    fn table_strategy_reads_document() {
        let cells: String = ["", "", "", "", "", "3", "40", "10"]
            .iter()
            .map(|c| format!("<td>{c}</td>"))
            .collect();
        let c = capture(&format!("<table><tr>{cells}</tr></table>"), ImageSet::new());
        let obs = observe(&c, Strategy::Table(&SEPT_10), &Unreachable).unwrap();
        assert_eq!(obs.new_positive_tests, 3);
        assert_eq!(obs.new_total_tests, 50);
    }

    #[test]
    fn chart_strategy_without_image_is_missing_image() {
        let mut images = ImageSet::new();
        images.insert("Trend_1.png".to_string(), vec![0]);
        let c = capture("<p></p>", images);
        let err = observe(
            &c,
            Strategy::ChartOcr {
                image_contains: "HealthServicesTiles",
                crop: DAILY_NUMBERS_BOX,
            },
            &Unreachable,
        )
        .unwrap_err();
        assert!(matches!(err, ExtractError::MissingImage(_)));
    }
}
