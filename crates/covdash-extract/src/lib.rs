//! Recovering information from captures: the publication timestamp used to
//! name them, and the daily counts appended to the time series.

pub mod dates;
pub mod error;
pub mod observe;
pub mod ocr;
pub mod schedule;
pub mod series;
pub mod table;

pub use dates::{ClockMonthDay, ClockSlashDate, DateExtractor, DateRecognizer};
pub use error::{DateError, ExtractError, SeriesError};
pub use observe::observe;
pub use ocr::{parse_daily_numbers, CropBox, TesseractCli, TextRecognizer, DAILY_NUMBERS_BOX};
pub use schedule::{LayoutSchedule, Strategy};
pub use series::{SeriesRow, SeriesTable};
pub use table::{HeaderCheck, TableLayout, EARLY_SEPT_14, SEPT_10};
