use serde::{Deserialize, Serialize};

/// Counts extracted from one capture.
///
/// `percent_positive` is always recomputed from the counts; whatever the
/// source reported is kept separately in `reported_percent`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericObservation {
    pub new_positive_tests: u64,
    pub new_total_tests: u64,
    pub percent_positive: f64,
    pub reported_percent: Option<f64>,
}

impl NumericObservation {
    #[must_use]
    pub fn new(new_positive_tests: u64, new_total_tests: u64) -> Self {
        Self {
            new_positive_tests,
            new_total_tests,
            percent_positive: percent_of(new_positive_tests, new_total_tests),
            reported_percent: None,
        }
    }

    #[must_use]
    pub fn with_reported_percent(mut self, reported: f64) -> Self {
        self.reported_percent = Some(reported);
        self
    }

    /// `true` when the source-reported percent differs from the recomputed
    /// one by more than `tolerance` percentage points.
    #[must_use]
    pub fn reported_percent_disagrees(&self, tolerance: f64) -> bool {
        self.reported_percent
            .is_some_and(|reported| (reported - self.percent_positive).abs() > tolerance)
    }
}

/// `100 * part / whole`; a zero `whole` yields `0.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // daily counts are far below 2^52
pub fn percent_of(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    100.0 * part as f64 / whole as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_is_recomputed() {
        let obs = NumericObservation::new(12, 200);
        assert!((obs.percent_positive - 6.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_total_yields_zero_percent() {
        assert!(NumericObservation::new(0, 0).percent_positive.abs() < f64::EPSILON);
    }

    #[test]
    fn reported_percent_disagreement() {
        let obs = NumericObservation::new(12, 200).with_reported_percent(6.0);
        assert!(!obs.reported_percent_disagrees(0.1));
        let obs = NumericObservation::new(12, 200).with_reported_percent(7.5);
        assert!(obs.reported_percent_disagrees(0.1));
        assert!(!NumericObservation::new(12, 200).reported_percent_disagrees(0.1));
    }
}
