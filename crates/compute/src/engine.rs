//! The insight engine façade: validate context, run the detectors over every
//! metric of the current record, synthesize, prioritize.
//!
//! An invocation is a pure function of its request and the engine's
//! configuration. Independent requests can run on any number of threads.

use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use lens_core::{BenchmarkPool, MetricRecord, MetricSeries};
use lens_rules::CompiledInsightConfig;

use crate::detectors::{
    AnomalyDetector, BenchmarkComparator, Detection, Detector, MetricInput, SkipReason,
    TrendAnalyzer,
};
use crate::error::EngineError;
use crate::insight::{InsightReport, InsightSummary, RunStats, Signal, SkippedMetric};
use crate::metrics::EngineMetrics;
use crate::prioritizer::InsightPrioritizer;
use crate::synthesizer::InsightSynthesizer;

/// Everything the engine needs for one current event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRequest {
    pub current: MetricRecord,
    #[serde(default)]
    pub history: MetricSeries,
    #[serde(default)]
    pub benchmark: BenchmarkPool,
}

impl InsightRequest {
    pub fn new(current: MetricRecord, history: MetricSeries, benchmark: BenchmarkPool) -> Self {
        Self {
            current,
            history,
            benchmark,
        }
    }

    /// Build a request from unbounded record lists, applying the configured
    /// lookback windows relative to the current event.
    pub fn bounded(
        current: MetricRecord,
        history: Vec<MetricRecord>,
        peers: Vec<MetricRecord>,
        config: &CompiledInsightConfig,
    ) -> Self {
        let history = MetricSeries::bounded(history, &current, &config.history_window);
        let benchmark = BenchmarkPool::bounded(peers, &current, &config.benchmark_window);
        Self::new(current, history, benchmark)
    }
}

/// Results of [`InsightEngine::analyze_batch`], in request order.
#[derive(Debug)]
pub struct BatchOutcome {
    pub results: Vec<Result<InsightReport, EngineError>>,
    pub metrics: EngineMetrics,
}

/// Values of one metric prepared for the detectors.
struct PreparedMetric<'a> {
    key: &'a str,
    /// `None` when the current value is not finite.
    current: Option<f64>,
    history: Vec<f64>,
    history_gaps: usize,
    peers: Vec<f64>,
}

pub struct InsightEngine {
    config: CompiledInsightConfig,
    anomaly: AnomalyDetector,
    trend: TrendAnalyzer,
    benchmark: BenchmarkComparator,
    synthesizer: InsightSynthesizer,
    prioritizer: InsightPrioritizer,
}

impl InsightEngine {
    /// Engine with default thresholds and built-in wording.
    pub fn new() -> Self {
        Self::with_config(CompiledInsightConfig::default())
    }

    pub fn with_config(config: CompiledInsightConfig) -> Self {
        let floor = config.confidence_floor;
        Self {
            anomaly: AnomalyDetector::new(config.anomaly.clone(), floor),
            trend: TrendAnalyzer::new(config.trend.clone(), floor),
            benchmark: BenchmarkComparator::new(config.benchmark.clone(), floor),
            synthesizer: InsightSynthesizer::new(),
            prioritizer: InsightPrioritizer::new(floor, config.max_insights),
            config,
        }
    }

    pub fn with_synthesizer(mut self, synthesizer: InsightSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn config(&self) -> &CompiledInsightConfig {
        &self.config
    }

    /// Detectors in production order.
    fn detectors(&self) -> [&dyn Detector; 3] {
        [&self.anomaly as &dyn Detector, &self.trend, &self.benchmark]
    }

    /// Analyze one current event.
    ///
    /// # Errors
    ///
    /// Context problems reject the whole invocation; see [`EngineError`].
    /// Thin data for individual metrics is reported in `stats.skipped` instead.
    pub fn analyze(&self, request: &InsightRequest) -> Result<InsightReport, EngineError> {
        let start = Instant::now();
        let current = &request.current;
        check_context(request)?;

        let prepared: Vec<PreparedMetric<'_>> = current
            .metrics
            .keys()
            .map(|key| PreparedMetric {
                key: key.as_str(),
                current: current.metric(key),
                history: request.history.values(key),
                history_gaps: request.history.missing(key),
                peers: request.benchmark.values(key),
            })
            .collect();

        let mut stats = RunStats {
            metrics_examined: prepared.len(),
            ..RunStats::default()
        };
        let mut signals: Vec<Signal> = Vec::new();

        for detector in self.detectors() {
            let category = detector.category();
            for metric in &prepared {
                let detection = match metric.current {
                    Some(value) => detector.detect(&MetricInput {
                        metric: metric.key,
                        current: value,
                        history: &metric.history,
                        history_gaps: metric.history_gaps,
                        peers: &metric.peers,
                    }),
                    None => Detection::Skipped(SkipReason::NonFiniteValue),
                };
                match detection {
                    Detection::Signal(signal) => signals.push(signal),
                    Detection::Quiet => {}
                    Detection::Skipped(reason) => {
                        debug!(
                            record_id = %current.id,
                            metric = metric.key,
                            detector = %category,
                            reason = %reason,
                            "metric skipped"
                        );
                        stats.skipped.push(SkippedMetric {
                            metric: metric.key.to_string(),
                            category,
                            reason,
                        });
                    }
                }
            }
        }
        stats.signals_emitted = signals.len();

        let candidates = signals
            .into_iter()
            .map(|signal| self.synthesizer.synthesize(&current.id, signal))
            .collect();
        let prioritized = self.prioritizer.prioritize(candidates);
        stats.below_floor = prioritized.below_floor;
        stats.duplicates_removed = prioritized.duplicates_removed;
        stats.truncated = prioritized.truncated;

        let insights = prioritized.insights;
        info!(
            record_id = %current.id,
            partner_id = %current.partner_id,
            metrics = stats.metrics_examined,
            signals = stats.signals_emitted,
            insights = insights.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "insight analysis complete"
        );

        Ok(InsightReport {
            record_id: current.id.clone(),
            partner_id: current.partner_id.clone(),
            summary: InsightSummary::from_insights(&insights),
            insights,
            stats,
        })
    }

    /// Analyze independent requests in parallel. Output order matches input order.
    pub fn analyze_batch(&self, requests: &[InsightRequest]) -> BatchOutcome {
        let timed: Vec<_> = requests
            .par_iter()
            .map(|request| {
                let start = Instant::now();
                let result = self.analyze(request);
                (result, start.elapsed())
            })
            .collect();

        let mut metrics = EngineMetrics::default();
        let results = timed
            .into_iter()
            .map(|(result, elapsed)| {
                match &result {
                    Ok(report) => metrics.record_run(report, elapsed),
                    Err(e) => {
                        warn!(error = %e, "insight request rejected");
                        metrics.record_failure(elapsed);
                    }
                }
                result
            })
            .collect();

        info!(
            runs = metrics.runs,
            failed = metrics.failed_runs,
            insights = metrics.insights_emitted,
            avg_latency_us = metrics.avg_latency_us,
            "batch analysis complete"
        );
        BatchOutcome { results, metrics }
    }
}

impl Default for InsightEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Reject requests whose identity context cannot be trusted.
fn check_context(request: &InsightRequest) -> Result<(), EngineError> {
    let current = &request.current;
    if let Some(field) = current.missing_identity() {
        return Err(EngineError::MissingContext { field });
    }
    if current.metrics.is_empty() {
        return Err(EngineError::EmptyRecord {
            record_id: current.id.clone(),
        });
    }

    let data_quality = |reason: String| EngineError::DataQuality {
        record_id: current.id.clone(),
        reason,
    };

    for record in request.history.records() {
        if let Some(field) = record.missing_identity() {
            return Err(data_quality(format!("history record without {field}")));
        }
        if record.partner_id != current.partner_id {
            return Err(data_quality(format!(
                "history record {} belongs to partner {}",
                record.id, record.partner_id
            )));
        }
        if record.id == current.id {
            return Err(data_quality("history contains the current event".to_string()));
        }
    }
    for record in request.benchmark.records() {
        if let Some(field) = record.missing_identity() {
            return Err(data_quality(format!("benchmark record without {field}")));
        }
        if record.id == current.id {
            return Err(data_quality("benchmark pool contains the current event".to_string()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use lens_core::{Category, Priority};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn record(id: &str, partner: &str, day: u32, attendance: f64) -> MetricRecord {
        MetricRecord::new(id, partner, date(day)).with_metric("attendance", attendance)
    }

    fn history(values: &[f64]) -> MetricSeries {
        MetricSeries::from(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| record(&format!("h{i}"), "p1", i as u32 + 1, *v))
                .collect::<Vec<_>>(),
        )
    }

    #[test]
    fn missing_partner_is_rejected() {
        let request = InsightRequest::new(
            record("now", "", 20, 500.0),
            MetricSeries::default(),
            BenchmarkPool::default(),
        );
        assert_eq!(
            InsightEngine::new().analyze(&request),
            Err(EngineError::MissingContext {
                field: "partner_id"
            })
        );
    }

    #[test]
    fn record_without_metrics_is_rejected() {
        let request = InsightRequest::new(
            MetricRecord::new("now", "p1", date(20)),
            MetricSeries::default(),
            BenchmarkPool::default(),
        );
        assert!(matches!(
            InsightEngine::new().analyze(&request),
            Err(EngineError::EmptyRecord { .. })
        ));
    }

    #[test]
    fn foreign_history_is_data_quality_error() {
        let mut series = vec![record("h0", "p1", 1, 10.0)];
        series.push(record("h1", "p2", 2, 11.0));
        let request = InsightRequest::new(
            record("now", "p1", 20, 12.0),
            MetricSeries::from(series),
            BenchmarkPool::default(),
        );
        assert!(matches!(
            InsightEngine::new().analyze(&request),
            Err(EngineError::DataQuality { .. })
        ));
    }

    #[test]
    fn nameless_peer_is_data_quality_error() {
        let request = InsightRequest::new(
            record("now", "p1", 20, 12.0),
            MetricSeries::default(),
            BenchmarkPool::from(vec![record("", "p9", 3, 1.0)]),
        );
        assert!(matches!(
            InsightEngine::new().analyze(&request),
            Err(EngineError::DataQuality { .. })
        ));
    }

    #[test]
    fn thin_data_is_ok_and_empty() {
        let request = InsightRequest::new(
            record("now", "p1", 20, 12.0),
            history(&[10.0]),
            BenchmarkPool::default(),
        );
        let report = InsightEngine::new().analyze(&request).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.summary.total(), 0);
        let skipped: Vec<Category> = report.stats.skipped.iter().map(|s| s.category).collect();
        assert_eq!(skipped, vec![Category::Anomaly, Category::Trend, Category::Benchmark]);
    }

    #[test]
    fn non_finite_current_value_skipped() {
        let current = record("now", "p1", 20, 500.0).with_metric("socialReach", f64::NAN);
        let request =
            InsightRequest::new(current, history(&[100.0, 110.0, 105.0, 95.0, 102.0]), BenchmarkPool::default());
        let report = InsightEngine::new().analyze(&request).unwrap();
        assert!(report.insights.iter().all(|i| i.metric == "attendance"));
        assert!(report
            .stats
            .skipped
            .iter()
            .any(|s| s.metric == "socialReach" && s.reason == SkipReason::NonFiniteValue));
    }

    #[test]
    fn spike_produces_critical_anomaly() {
        let request = InsightRequest::new(
            record("now", "p1", 20, 500.0),
            history(&[100.0, 110.0, 105.0, 95.0, 102.0]),
            BenchmarkPool::default(),
        );
        let report = InsightEngine::new().analyze(&request).unwrap();
        let anomaly = report
            .insights
            .iter()
            .find(|i| i.category == Category::Anomaly)
            .unwrap();
        assert_eq!(anomaly.priority, Priority::Critical);
        assert_eq!(anomaly.confidence, 1.0);
        assert_eq!(report.stats.metrics_examined, 1);
    }

    #[test]
    fn bounded_request_applies_windows() {
        let config = CompiledInsightConfig::default();
        let current = record("now", "p1", 20, 1.0);
        let request = InsightRequest::bounded(
            current.clone(),
            vec![record("h0", "p1", 1, 1.0), current.clone()],
            vec![record("peer", "p2", 2, 1.0), current],
            &config,
        );
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.benchmark.len(), 1);
    }

    #[test]
    fn batch_preserves_order_and_counts_failures() {
        let ok = InsightRequest::new(
            record("a", "p1", 20, 500.0),
            history(&[100.0, 110.0, 105.0, 95.0, 102.0]),
            BenchmarkPool::default(),
        );
        let bad = InsightRequest::new(
            record("", "p1", 20, 1.0),
            MetricSeries::default(),
            BenchmarkPool::default(),
        );
        let outcome = InsightEngine::new().analyze_batch(&[ok.clone(), bad, ok]);
        assert_eq!(outcome.results.len(), 3);
        assert!(outcome.results[0].is_ok());
        assert!(outcome.results[1].is_err());
        assert_eq!(outcome.results[0], outcome.results[2]);
        assert_eq!(outcome.metrics.runs, 2);
        assert_eq!(outcome.metrics.failed_runs, 1);
    }
}
