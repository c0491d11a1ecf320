use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DateError {
    #[error("{recognizer}: date format not recognized")]
    FormatNotRecognized { recognizer: &'static str },

    #[error("{recognizer}: matched \"{text}\" but it is not a valid date")]
    InvalidDate {
        recognizer: &'static str,
        text: String,
    },

    #[error("no date recognizer matched the document")]
    NoDateFound,
}

/// Extraction failures. Callers treat every variant as a soft, per-capture
/// failure.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no '%' marker in recognized text {text:?}")]
    NoPercentMarker { text: String },

    #[error("expected three numbers before '%', found {found} in {text:?}")]
    TooFewTokens { found: usize, text: String },

    #[error("cannot parse {token:?} as a number")]
    InvalidNumber { token: String },

    #[error("layout {layout}: cell {index} missing (document has {available} cells)")]
    MissingCell {
        layout: &'static str,
        index: usize,
        available: usize,
    },

    #[error("layout {layout}: cell {index} holds no number ({text:?})")]
    NonNumericCell {
        layout: &'static str,
        index: usize,
        text: String,
    },

    #[error("layout {layout}: cell {index} should mention {expected:?} but reads {found:?}")]
    HeaderMismatch {
        layout: &'static str,
        index: usize,
        expected: &'static str,
        found: String,
    },

    #[error("capture has no chart image matching {0:?}")]
    MissingImage(String),

    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("crop box {left},{top},{right},{bottom} does not fit a {width}x{height} image")]
    CropOutOfBounds {
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        width: u32,
        height: u32,
    },

    #[error("OCR engine failed: {0}")]
    Ocr(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no table layout or chart strategy known for {0}")]
    NoStrategy(NaiveDate),
}

#[derive(Debug, Error)]
pub enum SeriesError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("row for {date} does not follow the last row ({last})")]
    OutOfOrder { date: NaiveDate, last: NaiveDate },
}
