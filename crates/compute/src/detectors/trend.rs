//! Linear trend analysis over a partner's event sequence.
//!
//! The regression runs against the sequence index rather than the event date:
//! partners hold events at irregular intervals and a per-event rate is what the
//! report talks about.

use lens_core::{Category, Direction, Priority};
use lens_rules::insight_config::TrendThresholds;

use super::{
    floored_confidence, require, require_complete_history, Detection, Detector, MetricInput,
};
use crate::insight::{Evidence, Signal};
use crate::stats::{self, RATE_EPSILON};

/// Classifies the direction and strength of change across history + current.
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    thresholds: TrendThresholds,
    confidence_floor: f64,
}

impl TrendAnalyzer {
    pub fn new(thresholds: TrendThresholds, confidence_floor: f64) -> Self {
        Self {
            thresholds,
            confidence_floor,
        }
    }

    fn classify(&self, abs_rate: f64, r_squared: f64) -> Option<Priority> {
        let t = &self.thresholds;
        let meets = |rate: f64, fit: f64| {
            abs_rate + RATE_EPSILON >= rate && r_squared + RATE_EPSILON >= fit
        };
        if meets(t.strong_rate, t.strong_r_squared) {
            Some(Priority::High)
        } else if meets(t.moderate_rate, t.moderate_r_squared) {
            Some(Priority::Medium)
        } else {
            None
        }
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(TrendThresholds::default(), 0.5)
    }
}

/// Level the per-event rate is measured against: the fitted value at the
/// first event, or the series mean when that is zero.
///
/// Measuring against the starting level makes the rate direction-dependent:
/// 10 -> 18 in steps of 2 is 20% per event, the mirrored 18 -> 10 only 11%.
fn baseline_level(fit: &stats::LinearFit, points: &[f64]) -> Option<f64> {
    let level = if fit.intercept.abs() > RATE_EPSILON {
        fit.intercept.abs()
    } else {
        stats::mean(points)?.abs()
    };
    (level > RATE_EPSILON).then_some(level)
}

impl Detector for TrendAnalyzer {
    fn category(&self) -> Category {
        Category::Trend
    }

    fn detect(&self, input: &MetricInput<'_>) -> Detection {
        if let Err(skip) = require_complete_history(input) {
            return skip;
        }
        let mut points = Vec::with_capacity(input.history.len() + 1);
        points.extend_from_slice(input.history);
        points.push(input.current);

        if let Err(skip) = require(self.thresholds.min_points, points.len()) {
            return skip;
        }
        if stats::is_constant(&points) {
            return Detection::Quiet;
        }
        let Some(fit) = stats::linear_regression(&points) else {
            return Detection::Quiet;
        };
        let Some(level) = baseline_level(&fit, &points) else {
            return Detection::Quiet;
        };

        let rate = fit.slope / level;
        let Some(priority) = self.classify(rate.abs(), fit.r_squared) else {
            return Detection::Quiet;
        };

        Detection::Signal(Signal {
            metric: input.metric.to_string(),
            direction: Direction::of(fit.slope),
            priority,
            confidence: floored_confidence(fit.r_squared, self.confidence_floor),
            evidence: Evidence::Trend {
                current: input.current,
                slope: fit.slope,
                intercept: fit.intercept,
                r_squared: fit.r_squared,
                normalized_rate: rate,
                points: points.len(),
            },
        })
    }
}
