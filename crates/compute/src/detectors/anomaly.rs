//! Z-score anomaly detection against a partner's own history.

use lens_core::{Category, Direction, Priority};
use lens_rules::insight_config::AnomalyThresholds;

use super::{
    floored_confidence, require, require_complete_history, Detection, Detector, MetricInput,
};
use crate::insight::{Evidence, Signal};
use crate::stats;

/// Flags a current value that deviates from the partner's historical
/// distribution of the same metric.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    thresholds: AnomalyThresholds,
    confidence_floor: f64,
}

impl AnomalyDetector {
    pub fn new(thresholds: AnomalyThresholds, confidence_floor: f64) -> Self {
        Self {
            thresholds,
            confidence_floor,
        }
    }

    /// Priority band for an absolute z-score, `None` below the medium band.
    fn classify(&self, abs_z: f64) -> Option<Priority> {
        let t = &self.thresholds;
        if abs_z >= t.critical_z {
            Some(Priority::Critical)
        } else if abs_z >= t.high_z {
            Some(Priority::High)
        } else if abs_z >= t.medium_z {
            Some(Priority::Medium)
        } else {
            None
        }
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new(AnomalyThresholds::default(), 0.5)
    }
}

impl Detector for AnomalyDetector {
    fn category(&self) -> Category {
        Category::Anomaly
    }

    fn detect(&self, input: &MetricInput<'_>) -> Detection {
        let history = input.history;
        if let Err(skip) = require_complete_history(input) {
            return skip;
        }
        if let Err(skip) = require(self.thresholds.min_history, history.len()) {
            return skip;
        }
        let (Some(mean), Some(std_dev)) = (stats::mean(history), stats::sample_std_dev(history))
        else {
            return Detection::Quiet;
        };

        // Zero spread: any departure from the constant is maximally unusual.
        if stats::is_constant(history) {
            if input.current == history[0] {
                return Detection::Quiet;
            }
            return Detection::Signal(Signal {
                metric: input.metric.to_string(),
                direction: Direction::of(input.current - mean),
                priority: Priority::Critical,
                confidence: 1.0,
                evidence: Evidence::Anomaly {
                    current: input.current,
                    mean,
                    std_dev: 0.0,
                    z_score: None,
                    sample_size: history.len(),
                },
            });
        }

        let z = (input.current - mean) / std_dev;
        let Some(priority) = self.classify(z.abs()) else {
            return Detection::Quiet;
        };
        let raw = z.abs() / self.thresholds.confidence_divisor;

        Detection::Signal(Signal {
            metric: input.metric.to_string(),
            direction: Direction::of(z),
            priority,
            confidence: floored_confidence(raw, self.confidence_floor),
            evidence: Evidence::Anomaly {
                current: input.current,
                mean,
                std_dev,
                z_score: Some(z),
                sample_size: history.len(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detectors::SkipReason;

    fn run(current: f64, history: &[f64]) -> Detection {
        AnomalyDetector::default().detect(&MetricInput {
            metric: "attendance",
            current,
            history,
            history_gaps: 0,
            peers: &[],
        })
    }

    fn signal(detection: Detection) -> Signal {
        match detection {
            Detection::Signal(s) => s,
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn spike_is_critical_and_clamped() {
        let s = signal(run(500.0, &[100.0, 110.0, 105.0, 95.0, 102.0]));
        assert_eq!(s.priority, Priority::Critical);
        assert_eq!(s.direction, Direction::Up);
        assert_eq!(s.confidence, 1.0);
        match s.evidence {
            Evidence::Anomaly { mean, z_score, .. } => {
                assert!((mean - 102.4).abs() < 1e-9);
                assert!(z_score.unwrap() > 70.0);
            }
            other => panic!("unexpected evidence {:?}", other),
        }
    }

    #[test]
    fn bands_follow_z_score() {
        // mean 10, sample sd 3
        let history = [7.0, 10.0, 13.0];
        assert_eq!(signal(run(10.0 + 3.0 * 3.0, &history)).priority, Priority::Critical);
        assert_eq!(signal(run(10.0 + 2.5 * 3.0, &history)).priority, Priority::High);
        let medium = signal(run(10.0 - 1.5 * 3.0, &history));
        assert_eq!(medium.priority, Priority::Medium);
        assert_eq!(medium.direction, Direction::Down);
        assert_eq!(run(10.0 + 1.0 * 3.0, &history), Detection::Quiet);
    }

    #[test]
    fn confidence_floor_applies() {
        // |z| = 1.5 -> raw confidence 0.375, lifted to the floor.
        let s = signal(run(10.0 + 1.5 * 3.0, &[7.0, 10.0, 13.0]));
        assert_eq!(s.confidence, 0.5);
        // |z| = 2.5 -> 0.625
        let s = signal(run(10.0 + 2.5 * 3.0, &[7.0, 10.0, 13.0]));
        assert!((s.confidence - 0.625).abs() < 1e-9);
    }

    #[test]
    fn flat_history_with_departure_is_maximal() {
        let s = signal(run(12.0, &[10.0, 10.0, 10.0, 10.0]));
        assert_eq!(s.priority, Priority::Critical);
        assert_eq!(s.confidence, 1.0);
        assert!(matches!(s.evidence, Evidence::Anomaly { z_score: None, .. }));

        let down = signal(run(8.0, &[10.0, 10.0, 10.0]));
        assert_eq!(down.direction, Direction::Down);
    }

    #[test]
    fn flat_history_matching_value_is_quiet() {
        assert_eq!(run(0.1, &[0.1, 0.1, 0.1]), Detection::Quiet);
    }

    #[test]
    fn history_with_gaps_is_skipped() {
        let detection = AnomalyDetector::default().detect(&MetricInput {
            metric: "attendance",
            current: 40.0,
            history: &[10.0, 11.0, 12.0],
            history_gaps: 1,
            peers: &[],
        });
        assert_eq!(
            detection,
            Detection::Skipped(SkipReason::MissingHistoryValue { missing: 1 })
        );
    }

    #[test]
    fn floor_above_one_still_caps_confidence() {
        let detector = AnomalyDetector::new(AnomalyThresholds::default(), 1.5);
        let detection = detector.detect(&MetricInput {
            metric: "attendance",
            current: 20.5,
            history: &[7.0, 10.0, 13.0],
            history_gaps: 0,
            peers: &[],
        });
        match detection {
            Detection::Signal(s) => assert_eq!(s.confidence, 1.0),
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn short_history_is_skipped() {
        assert_eq!(
            run(50.0, &[1.0, 2.0]),
            Detection::Skipped(SkipReason::InsufficientData {
                required: 3,
                available: 2
            })
        );
    }
}
