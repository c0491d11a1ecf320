use chrono::NaiveDate;

use crate::ocr::{CropBox, DAILY_NUMBERS_BOX};
use crate::table::{TableLayout, EARLY_SEPT_14, SEPT_10};

/// How to read the daily counts out of one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Table(&'static TableLayout),
    /// OCR on the first archived chart image whose identifier contains
    /// `image_contains`.
    ChartOcr {
        image_contains: &'static str,
        crop: CropBox,
    },
}

/// Which strategy applied from which date. Entries are append-only.
#[derive(Debug, Clone)]
pub struct LayoutSchedule {
    entries: Vec<(NaiveDate, Strategy)>,
}

impl LayoutSchedule {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Registers `strategy` as in effect from `since` until a later entry.
    #[must_use]
    pub fn starting(mut self, since: NaiveDate, strategy: Strategy) -> Self {
        let at = self.entries.partition_point(|(start, _)| *start <= since);
        self.entries.insert(at, (since, strategy));
        self
    }

    /// The strategy in effect on `date`, or `None` before the first entry.
    #[must_use]
    pub fn strategy_for(&self, date: NaiveDate) -> Option<Strategy> {
        self.entries
            .iter()
            .rev()
            .find(|(start, _)| *start <= date)
            .map(|(_, strategy)| *strategy)
    }
}

impl Default for LayoutSchedule {
    fn default() -> Self {
        let day = |m, d| NaiveDate::from_ymd_opt(2020, m, d).expect("valid calendar date");
        Self::new()
            .starting(day(9, 10), Strategy::Table(&SEPT_10))
            .starting(day(9, 14), Strategy::Table(&EARLY_SEPT_14))
            .starting(
                day(9, 25),
                Strategy::ChartOcr {
                    image_contains: "HealthServicesTiles",
                    crop: DAILY_NUMBERS_BOX,
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, m, d).unwrap()
    }

    #[test]
    fn nothing_before_first_layout() {
        assert_eq!(LayoutSchedule::default().strategy_for(day(9, 9)), None);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let schedule = LayoutSchedule::default();
        assert_eq!(schedule.strategy_for(day(9, 10)), Some(Strategy::Table(&SEPT_10)));
        assert_eq!(schedule.strategy_for(day(9, 13)), Some(Strategy::Table(&SEPT_10)));
        assert_eq!(
            schedule.strategy_for(day(9, 14)),
            Some(Strategy::Table(&EARLY_SEPT_14))
        );
        assert!(matches!(
            schedule.strategy_for(day(10, 3)),
            Some(Strategy::ChartOcr { .. })
        ));
    }

    #[test]
    fn entries_are_kept_sorted() {
        let schedule = LayoutSchedule::new()
            .starting(day(9, 14), Strategy::Table(&EARLY_SEPT_14))
            .starting(day(9, 10), Strategy::Table(&SEPT_10));
        assert_eq!(schedule.strategy_for(day(9, 11)), Some(Strategy::Table(&SEPT_10)));
        assert_eq!(
            schedule.strategy_for(day(9, 20)),
            Some(Strategy::Table(&EARLY_SEPT_14))
        );
    }
}
