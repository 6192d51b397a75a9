//! Insight types: raw detector signals, rendered insights, the run report and
//! its derived summary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use lens_core::{Category, Direction, PartnerId, Priority, RecordId};

use crate::detectors::SkipReason;

/// Namespace for deterministic insight IDs.
const INSIGHT_NAMESPACE: Uuid = Uuid::from_u128(0x6c65_6e73_2d69_6e73_6967_6874_732d_7631);

/// Numeric inputs that produced a finding, one variant per detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Evidence {
    Anomaly {
        current: f64,
        mean: f64,
        std_dev: f64,
        /// `None` when the history has zero spread.
        z_score: Option<f64>,
        sample_size: usize,
    },
    Trend {
        current: f64,
        slope: f64,
        intercept: f64,
        r_squared: f64,
        /// Slope relative to the fitted starting level, as a fraction per event.
        normalized_rate: f64,
        points: usize,
    },
    Benchmark {
        current: f64,
        percentile: f64,
        pool_size: usize,
    },
}

impl Evidence {
    pub fn category(&self) -> Category {
        match self {
            Evidence::Anomaly { .. } => Category::Anomaly,
            Evidence::Trend { .. } => Category::Trend,
            Evidence::Benchmark { .. } => Category::Benchmark,
        }
    }

    pub fn current(&self) -> f64 {
        match self {
            Evidence::Anomaly { current, .. }
            | Evidence::Trend { current, .. }
            | Evidence::Benchmark { current, .. } => *current,
        }
    }
}

/// A detector's raw, unrendered finding.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub metric: String,
    pub direction: Direction,
    pub priority: Priority,
    pub confidence: f64,
    pub evidence: Evidence,
}

impl Signal {
    pub fn category(&self) -> Category {
        self.evidence.category()
    }
}

/// One rendered, scored finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: Uuid,
    pub category: Category,
    pub priority: Priority,
    pub confidence: f64,
    pub metric: String,
    pub direction: Direction,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub evidence: Evidence,
}

impl Insight {
    /// Stable ID for the (record, category, metric) triple.
    pub fn derive_id(record_id: &str, category: Category, metric: &str) -> Uuid {
        let name = format!("{record_id}/{category}/{metric}");
        Uuid::new_v5(&INSIGHT_NAMESPACE, name.as_bytes())
    }
}

// ── Summary ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    pub anomaly: usize,
    pub trend: usize,
    pub benchmark: usize,
}

/// Counts derived from a list of insights.
///
/// Only constructible from the list it describes, so it cannot disagree
/// with the detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InsightSummary {
    total: usize,
    by_priority: PriorityCounts,
    by_category: CategoryCounts,
}

impl InsightSummary {
    pub fn from_insights(insights: &[Insight]) -> Self {
        let mut by_priority = PriorityCounts::default();
        let mut by_category = CategoryCounts::default();
        for insight in insights {
            match insight.priority {
                Priority::Critical => by_priority.critical += 1,
                Priority::High => by_priority.high += 1,
                Priority::Medium => by_priority.medium += 1,
                Priority::Low => by_priority.low += 1,
            }
            match insight.category {
                Category::Anomaly => by_category.anomaly += 1,
                Category::Trend => by_category.trend += 1,
                Category::Benchmark => by_category.benchmark += 1,
            }
        }
        Self {
            total: insights.len(),
            by_priority,
            by_category,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn by_priority(&self) -> PriorityCounts {
        self.by_priority
    }

    pub fn by_category(&self) -> CategoryCounts {
        self.by_category
    }
}

// ── Run report ──────────────────────────────────────────────────────

/// A metric a detector could not evaluate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedMetric {
    pub metric: String,
    pub category: Category,
    pub reason: SkipReason,
}

/// Deterministic bookkeeping for one invocation. Carries no timings.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunStats {
    pub metrics_examined: usize,
    pub signals_emitted: usize,
    pub duplicates_removed: usize,
    pub below_floor: usize,
    pub truncated: usize,
    pub skipped: Vec<SkippedMetric>,
}

/// Engine output for one current record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightReport {
    pub record_id: RecordId,
    pub partner_id: PartnerId,
    pub insights: Vec<Insight>,
    pub summary: InsightSummary,
    pub stats: RunStats,
}

impl InsightReport {
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    /// Caller-side view of the report: insights outside the filter are
    /// removed and the summary is recomputed from what remains.
    pub fn filtered(&self, filter: &InsightFilter) -> InsightReport {
        let insights: Vec<Insight> = self
            .insights
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        InsightReport {
            record_id: self.record_id.clone(),
            partner_id: self.partner_id.clone(),
            summary: InsightSummary::from_insights(&insights),
            insights,
            stats: self.stats.clone(),
        }
    }
}

/// Query-style post-filter applied to the engine's output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightFilter {
    pub min_priority: Option<Priority>,
    /// Empty means every category.
    pub categories: Vec<Category>,
}

impl InsightFilter {
    pub fn matches(&self, insight: &Insight) -> bool {
        let priority_ok = self.min_priority.map_or(true, |min| insight.priority >= min);
        let category_ok = self.categories.is_empty() || self.categories.contains(&insight.category);
        priority_ok && category_ok
    }
}
