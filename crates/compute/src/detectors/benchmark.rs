//! Percentile ranking against the cross-partner peer pool.

use lens_core::{Category, Direction, Priority};
use lens_rules::insight_config::BenchmarkThresholds;

use super::{floored_confidence, require, Detection, Detector, MetricInput};
use crate::insight::{Evidence, Signal};
use crate::stats;

/// Ranks the current value among peer values (inclusive percentile rank).
#[derive(Debug, Clone)]
pub struct BenchmarkComparator {
    thresholds: BenchmarkThresholds,
    confidence_floor: f64,
}

impl BenchmarkComparator {
    pub fn new(thresholds: BenchmarkThresholds, confidence_floor: f64) -> Self {
        Self {
            thresholds,
            confidence_floor,
        }
    }

    fn classify(&self, percentile: f64) -> Option<Priority> {
        let t = &self.thresholds;
        if percentile >= t.high_upper || percentile <= t.high_lower {
            Some(Priority::High)
        } else if percentile >= t.medium_upper || percentile <= t.medium_lower {
            Some(Priority::Medium)
        } else {
            None
        }
    }
}

impl Default for BenchmarkComparator {
    fn default() -> Self {
        Self::new(BenchmarkThresholds::default(), 0.5)
    }
}

impl Detector for BenchmarkComparator {
    fn category(&self) -> Category {
        Category::Benchmark
    }

    fn detect(&self, input: &MetricInput<'_>) -> Detection {
        if let Err(skip) = require(self.thresholds.min_pool, input.peers.len()) {
            return skip;
        }
        let Some(percentile) = stats::percentile_rank(input.peers, input.current) else {
            return Detection::Quiet;
        };
        let Some(priority) = self.classify(percentile) else {
            return Detection::Quiet;
        };
        let raw = (percentile - 50.0).abs() / 50.0;

        Detection::Signal(Signal {
            metric: input.metric.to_string(),
            direction: if percentile >= 50.0 {
                Direction::Up
            } else {
                Direction::Down
            },
            priority,
            confidence: floored_confidence(raw, self.confidence_floor),
            evidence: Evidence::Benchmark {
                current: input.current,
                percentile,
                pool_size: input.peers.len(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::SkipReason;

    fn pool() -> Vec<f64> {
        (1..=20).map(f64::from).collect()
    }

    fn run(current: f64, peers: &[f64]) -> Detection {
        BenchmarkComparator::default().detect(&MetricInput {
            metric: "ticketRevenue",
            current,
            history: &[],
            history_gaps: 0,
            peers,
        })
    }

    fn signal(detection: Detection) -> Signal {
        match detection {
            Detection::Signal(s) => s,
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn top_decile_is_high() {
        let s = signal(run(19.0, &pool()));
        assert_eq!(s.priority, Priority::High);
        assert_eq!(s.direction, Direction::Up);
        assert!((s.confidence - 0.9).abs() < 1e-9);
        assert!(matches!(
            s.evidence,
            Evidence::Benchmark { percentile, pool_size: 20, .. } if (percentile - 95.0).abs() < 1e-9
        ));
    }

    #[test]
    fn bottom_quartile_is_medium_and_floored() {
        // 5 of 20 at or below -> 25th percentile, raw confidence 0.5.
        let s = signal(run(5.0, &pool()));
        assert_eq!(s.priority, Priority::Medium);
        assert_eq!(s.direction, Direction::Down);
        assert!((s.confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn middle_of_pack_is_quiet() {
        assert_eq!(run(10.0, &pool()), Detection::Quiet);
    }

    #[test]
    fn below_everyone_is_high() {
        let s = signal(run(0.0, &pool()));
        assert_eq!(s.priority, Priority::High);
        assert_eq!(s.direction, Direction::Down);
        assert_eq!(s.confidence, 1.0);
    }

    #[test]
    fn small_pool_skipped() {
        assert_eq!(
            run(5.0, &[1.0, 2.0, 3.0]),
            Detection::Skipped(SkipReason::InsufficientData {
                required: 10,
                available: 3
            })
        );
    }
}
