//! Insights generation engine.
//!
//! Turns one event's pre-aggregated metrics into a ranked list of findings:
//! - Anomalies against the partner's own history (z-score)
//! - Trends across the partner's event sequence (linear regression)
//! - Benchmarks against peer events (percentile rank)
//!
//! Signals are worded by the [`synthesizer`], then deduplicated, ranked and
//! bounded by the [`prioritizer`]. [`InsightEngine`] ties the stages together.

pub mod detectors;
pub mod engine;
pub mod error;
pub mod insight;
pub mod metrics;
pub mod prioritizer;
pub mod stats;
pub mod synthesizer;

pub use detectors::{Detection, Detector, SkipReason};
pub use engine::{BatchOutcome, InsightEngine, InsightRequest};
pub use error::EngineError;
pub use insight::{
    CategoryCounts, Evidence, Insight, InsightFilter, InsightReport, InsightSummary,
    PriorityCounts, RunStats, Signal, SkippedMetric,
};
pub use metrics::EngineMetrics;
pub use prioritizer::{InsightPrioritizer, Prioritized};
pub use synthesizer::InsightSynthesizer;
