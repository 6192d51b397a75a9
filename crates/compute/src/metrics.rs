use std::time::Duration;

use serde::Serialize;

use crate::insight::InsightReport;

/// Aggregate counters across engine runs, for batch callers and logs.
///
/// Timings live here and never in an [`InsightReport`], which must stay
/// byte-identical across repeated runs.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EngineMetrics {
    /// Successful invocations.
    pub runs: u64,
    /// Invocations rejected with an engine error.
    pub failed_runs: u64,
    pub insights_emitted: u64,
    pub metrics_skipped: u64,
    pub duplicates_removed: u64,
    pub truncated: u64,
    /// Average latency per invocation in microseconds.
    pub avg_latency_us: f64,
    pub max_latency_us: f64,

    #[serde(skip)]
    total_latency_us: f64,
}

impl EngineMetrics {
    /// Record a successful run.
    pub fn record_run(&mut self, report: &InsightReport, elapsed: Duration) {
        self.runs += 1;
        self.insights_emitted += report.insights.len() as u64;
        self.metrics_skipped += report.stats.skipped.len() as u64;
        self.duplicates_removed += report.stats.duplicates_removed as u64;
        self.truncated += report.stats.truncated as u64;
        self.record_latency(elapsed);
    }

    /// Record a rejected run.
    pub fn record_failure(&mut self, elapsed: Duration) {
        self.failed_runs += 1;
        self.record_latency(elapsed);
    }

    fn record_latency(&mut self, elapsed: Duration) {
        let us = elapsed.as_micros() as f64;
        self.total_latency_us += us;
        self.max_latency_us = self.max_latency_us.max(us);
        let count = self.runs + self.failed_runs;
        if count > 0 {
            self.avg_latency_us = self.total_latency_us / count as f64;
        }
    }

    pub fn total_runs(&self) -> u64 {
        self.runs + self.failed_runs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::{InsightSummary, RunStats};

    fn empty_report() -> InsightReport {
        InsightReport {
            record_id: "evt".into(),
            partner_id: "p".into(),
            insights: Vec::new(),
            summary: InsightSummary::from_insights(&[]),
            stats: RunStats {
                duplicates_removed: 2,
                truncated: 1,
                ..RunStats::default()
            },
        }
    }

    #[test]
    fn averages_latency_over_all_runs() {
        let mut m = EngineMetrics::default();
        m.record_run(&empty_report(), Duration::from_micros(100));
        m.record_run(&empty_report(), Duration::from_micros(300));
        m.record_failure(Duration::from_micros(200));

        assert_eq!(m.runs, 2);
        assert_eq!(m.failed_runs, 1);
        assert_eq!(m.total_runs(), 3);
        assert_eq!(m.duplicates_removed, 4);
        assert_eq!(m.truncated, 2);
        assert!((m.avg_latency_us - 200.0).abs() < 1e-9);
        assert_eq!(m.max_latency_us, 300.0);
    }

    #[test]
    fn internal_totals_not_serialized() {
        let json = serde_json::to_value(EngineMetrics::default()).unwrap();
        assert!(json.get("total_latency_us").is_none());
        assert!(json.get("avg_latency_us").is_some());
    }
}
