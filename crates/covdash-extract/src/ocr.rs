//! Reading daily counts out of the dashboard's chart image.
//!
//! From late September 2020 the dashboard rendered its daily numbers inside a
//! Tableau tile image instead of table cells. The tile is cropped to the
//! numbers, converted to greyscale, and handed to an OCR engine; the
//! recognized text looks like `12 200 6.0%`.

use std::process::Command;

use covdash_core::NumericObservation;
use image::{GrayImage, ImageFormat};

use crate::error::ExtractError;

/// Pixel rectangle, edges exclusive on the right and bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Region of the health-services tile holding the three daily numbers.
pub const DAILY_NUMBERS_BOX: CropBox = CropBox {
    left: 10,
    top: 127,
    right: 795,
    bottom: 245,
};

/// Source-reported percentages further than this from the recomputed value
/// are logged.
const PERCENT_TOLERANCE: f64 = 0.1;

pub trait TextRecognizer {
    /// Returns the text found in `image`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Ocr`] or [`ExtractError::Io`] when the engine
    /// cannot be run.
    fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError>;
}

/// Runs the `tesseract` command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: String,
    language: String,
}

impl TesseractCli {
    #[must_use]
    pub fn new(binary: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            language: language.into(),
        }
    }
}

impl TextRecognizer for TesseractCli {
    fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError> {
        let input = tempfile::Builder::new()
            .prefix("covdash-ocr-")
            .suffix(".png")
            .tempfile()?;
        image.save_with_format(input.path(), ImageFormat::Png)?;

        let output = Command::new(&self.binary)
            .arg(input.path())
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output()
            .map_err(|e| ExtractError::Ocr(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Decodes `bytes`, crops to `crop`, and converts to 8-bit greyscale.
///
/// # Errors
///
/// - [`ExtractError::Image`] if the bytes are not a decodable image.
/// - [`ExtractError::CropOutOfBounds`] if `crop` is empty or does not fit.
pub fn crop_greyscale(bytes: &[u8], crop: CropBox) -> Result<GrayImage, ExtractError> {
    let image = image::load_from_memory(bytes)?;
    let (width, height) = (image.width(), image.height());

    if crop.left >= crop.right
        || crop.top >= crop.bottom
        || crop.right > width
        || crop.bottom > height
    {
        return Err(ExtractError::CropOutOfBounds {
            left: crop.left,
            top: crop.top,
            right: crop.right,
            bottom: crop.bottom,
            width,
            height,
        });
    }

    Ok(image
        .crop_imm(
            crop.left,
            crop.top,
            crop.right - crop.left,
            crop.bottom - crop.top,
        )
        .to_luma8())
}

/// Full chart-image path: crop, greyscale, recognize, parse.
///
/// # Errors
///
/// Any [`ExtractError`] from cropping, recognition, or parsing.
pub fn extract_from_image<R>(
    bytes: &[u8],
    crop: CropBox,
    recognizer: &R,
) -> Result<NumericObservation, ExtractError>
where
    R: TextRecognizer + ?Sized,
{
    let region = crop_greyscale(bytes, crop)?;
    let text = recognizer.recognize(&region)?;
    let observation = parse_daily_numbers(&text)?;

    if observation.reported_percent_disagrees(PERCENT_TOLERANCE) {
        tracing::warn!(
            reported = observation.reported_percent,
            recomputed = observation.percent_positive,
            "chart percentage disagrees with recomputed value"
        );
    }
    Ok(observation)
}

/// Parses `positive total percent%` out of recognized text.
///
/// Only text before the first `%` is considered; thousands separators are
/// stripped and the first three whitespace-separated tokens are read as
/// positive count, total count, and percent.
///
/// # Errors
///
/// - [`ExtractError::NoPercentMarker`] if the text has no `%`.
/// - [`ExtractError::TooFewTokens`] if fewer than three tokens precede it.
/// - [`ExtractError::InvalidNumber`] if a token is not a number.
pub fn parse_daily_numbers(text: &str) -> Result<NumericObservation, ExtractError> {
    let Some(end) = text.find('%') else {
        return Err(ExtractError::NoPercentMarker {
            text: text.to_string(),
        });
    };
    let cleaned = text[..end].replace(',', "");
    let tokens: Vec<&str> = cleaned.split_whitespace().take(3).collect();

    let [positive, total, percent] = tokens[..] else {
        return Err(ExtractError::TooFewTokens {
            found: tokens.len(),
            text: text.to_string(),
        });
    };

    let positive = parse_token::<u64>(positive)?;
    let total = parse_token::<u64>(total)?;
    let percent = parse_token::<f64>(percent)?;

    Ok(NumericObservation::new(positive, total).with_reported_percent(percent))
}

fn parse_token<T: std::str::FromStr>(token: &str) -> Result<T, ExtractError> {
    token.parse::<T>().map_err(|_| ExtractError::InvalidNumber {
        token: token.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::io::Cursor;

    use image::{DynamicImage, RgbImage};

    use super::*;

    struct Canned {
        text: &'static str,
        seen: Cell<Option<(u32, u32)>>,
    }

    impl TextRecognizer for Canned {
        fn recognize(&self, image: &GrayImage) -> Result<String, ExtractError> {
            self.seen.set(Some(image.dimensions()));
            Ok(self.text.to_string())
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn parses_daily_numbers() {
        let obs = parse_daily_numbers("12 200 6.0%\n").unwrap();
        assert_eq!(obs.new_positive_tests, 12);
        assert_eq!(obs.new_total_tests, 200);
        assert_eq!(obs.reported_percent, Some(6.0));
        assert!((obs.percent_positive - 6.0).abs() < 1e-9);
    }

    #[test]
    fn strips_thousands_separators() {
        let obs = parse_daily_numbers("1,234  20,000\n6.2 %").unwrap();
        assert_eq!(obs.new_positive_tests, 1234);
        assert_eq!(obs.new_total_tests, 20_000);
    }

    #[test]
    fn missing_percent_is_extraction_failure() {
        let err = parse_daily_numbers("12 200 6.0\n").unwrap_err();
        assert!(matches!(err, ExtractError::NoPercentMarker { .. }));
    }

    #[test]
    fn too_few_tokens() {
        let err = parse_daily_numbers("12 6.0%").unwrap_err();
        assert!(matches!(err, ExtractError::TooFewTokens { found: 2, .. }));
    }

    #[test]
    fn garbled_token_is_invalid_number() {
        let err = parse_daily_numbers("l2 200 6.0%").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidNumber { ref token } if token == "l2"));
    }

    #[test]
    fn crop_uses_daily_numbers_box() {
        let recognizer = Canned {
            text: "12 200 6.0%",
            seen: Cell::new(None),
        };
        let obs = extract_from_image(&png(800, 260), DAILY_NUMBERS_BOX, &recognizer).unwrap();
        assert_eq!(recognizer.seen.get(), Some((785, 118)));
        assert_eq!(obs.new_total_tests, 200);
    }

    #[test]
    fn crop_larger_than_image_fails() {
        let err = crop_greyscale(&png(400, 200), DAILY_NUMBERS_BOX).unwrap_err();
        assert!(matches!(err, ExtractError::CropOutOfBounds { width: 400, .. }));
    }

    #[test]
    fn undecodable_bytes_fail() {
        let err = crop_greyscale(b"not an image", DAILY_NUMBERS_BOX).unwrap_err();
        assert!(matches!(err, ExtractError::Image(_)));
    }
}
