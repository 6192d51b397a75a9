//! The three statistical detectors.
//!
//! Each detector looks at one metric at a time and answers with a
//! [`Detection`]: a raw [`Signal`], nothing noteworthy, or a skip when the
//! data is too thin for the statistic. Skips are values, never errors.

use std::fmt;

use serde::Serialize;

use lens_core::Category;

use crate::insight::Signal;

pub mod anomaly;
pub mod benchmark;
pub mod trend;

pub use anomaly::AnomalyDetector;
pub use benchmark::BenchmarkComparator;
pub use trend::TrendAnalyzer;

/// Per-metric values handed to every detector.
#[derive(Debug, Clone, Copy)]
pub struct MetricInput<'a> {
    pub metric: &'a str,
    pub current: f64,
    /// The partner's own values, oldest first, current event excluded.
    pub history: &'a [f64],
    /// History records that lack this metric. Their events are absent from
    /// `history`, so its index axis has gaps whenever this is non-zero.
    pub history_gaps: usize,
    /// Peer values across partners, current event excluded.
    pub peers: &'a [f64],
}

/// Outcome of running one detector on one metric.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Signal(Signal),
    /// Enough data, nothing noteworthy.
    Quiet,
    Skipped(SkipReason),
}

/// Why a detector could not evaluate a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientData { required: usize, available: usize },
    NonFiniteValue,
    /// Some history records lack the metric.
    MissingHistoryValue { missing: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientData {
                required,
                available,
            } => write!(f, "insufficient data: {available} of {required} points"),
            SkipReason::NonFiniteValue => write!(f, "current value is not finite"),
            SkipReason::MissingHistoryValue { missing } => {
                write!(f, "metric missing from {missing} history record(s)")
            }
        }
    }
}

/// A statistical test over one metric.
pub trait Detector: Send + Sync {
    /// Category of every signal this detector emits.
    fn category(&self) -> Category;

    fn detect(&self, input: &MetricInput<'_>) -> Detection;
}

/// Lift a raw confidence to the floor, never beyond [0, 1].
pub(crate) fn floored_confidence(raw: f64, floor: f64) -> f64 {
    raw.max(floor).clamp(0.0, 1.0)
}

/// Skip when the partner's series has holes for this metric.
pub(crate) fn require_complete_history(input: &MetricInput<'_>) -> Result<(), Detection> {
    if input.history_gaps > 0 {
        Err(Detection::Skipped(SkipReason::MissingHistoryValue {
            missing: input.history_gaps,
        }))
    } else {
        Ok(())
    }
}

/// Skip unless at least `required` points are available.
pub(crate) fn require(required: usize, available: usize) -> Result<(), Detection> {
    if available < required {
        Err(Detection::Skipped(SkipReason::InsufficientData {
            required,
            available,
        }))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_clamped_into_floor_and_one() {
        assert_eq!(floored_confidence(0.2, 0.5), 0.5);
        assert_eq!(floored_confidence(0.7, 0.5), 0.7);
        assert_eq!(floored_confidence(17.75, 0.5), 1.0);
    }

    #[test]
    fn confidence_never_exceeds_one_whatever_the_floor() {
        assert_eq!(floored_confidence(0.2, 1.5), 1.0);
        assert_eq!(floored_confidence(f64::INFINITY, 0.5), 1.0);
        assert_eq!(floored_confidence(-0.3, 0.0), 0.0);
    }

    #[test]
    fn gaps_in_history_skip() {
        let input = MetricInput {
            metric: "a",
            current: 40.0,
            history: &[10.0, 20.0, 30.0],
            history_gaps: 1,
            peers: &[],
        };
        assert_eq!(
            require_complete_history(&input),
            Err(Detection::Skipped(SkipReason::MissingHistoryValue { missing: 1 }))
        );
        let complete = MetricInput {
            history_gaps: 0,
            ..input
        };
        assert!(require_complete_history(&complete).is_ok());
    }

    #[test]
    fn require_reports_counts() {
        assert!(require(3, 3).is_ok());
        assert_eq!(
            require(3, 2),
            Err(Detection::Skipped(SkipReason::InsufficientData {
                required: 3,
                available: 2
            }))
        );
    }

    #[test]
    fn skip_reason_display() {
        let reason = SkipReason::InsufficientData {
            required: 10,
            available: 4,
        };
        assert_eq!(reason.to_string(), "insufficient data: 4 of 10 points");
        assert_eq!(
            SkipReason::MissingHistoryValue { missing: 2 }.to_string(),
            "metric missing from 2 history record(s)"
        );
    }
}
