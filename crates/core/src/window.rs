//! Bounded input collections for the insight engine.
//!
//! Both collections are capped so the cost of one analysis never grows with
//! the overall data volume: a partner's history keeps at most 50 records from
//! the last 12 months, the peer benchmark pool at most 500 from the last 6.

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::record::MetricRecord;

pub const HISTORY_MONTHS: u32 = 12;
pub const HISTORY_MAX_RECORDS: usize = 50;
pub const BENCHMARK_MONTHS: u32 = 6;
pub const BENCHMARK_MAX_RECORDS: usize = 500;

/// Lookback window: how far back to look and how many records to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Window {
    pub months: u32,
    pub max_records: usize,
}

impl Window {
    /// Default window for a partner's own history.
    pub fn history() -> Self {
        Self {
            months: HISTORY_MONTHS,
            max_records: HISTORY_MAX_RECORDS,
        }
    }

    /// Default window for the cross-partner benchmark pool.
    pub fn benchmark() -> Self {
        Self {
            months: BENCHMARK_MONTHS,
            max_records: BENCHMARK_MAX_RECORDS,
        }
    }

    /// Earliest date (inclusive) covered by this window when anchored at `anchor`.
    pub fn start(&self, anchor: NaiveDate) -> NaiveDate {
        anchor
            .checked_sub_months(Months::new(self.months))
            .unwrap_or(NaiveDate::MIN)
    }

    /// Whether `record` is a different event that falls inside the window
    /// ending at the current event's date.
    fn admits(&self, record: &MetricRecord, current: &MetricRecord) -> bool {
        record.id != current.id
            && record.event_date <= current.event_date
            && record.event_date >= self.start(current.event_date)
    }
}

// ── MetricSeries ──────────────────────────────────────────────

/// A partner's historical records, oldest first, capped in length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MetricRecord>", into = "Vec<MetricRecord>")]
pub struct MetricSeries {
    records: Vec<MetricRecord>,
}

impl MetricSeries {
    /// Build a series from raw records relative to the current event:
    /// drops the current event and anything outside the window, then keeps
    /// the most recent `window.max_records`.
    pub fn bounded(
        records: impl IntoIterator<Item = MetricRecord>,
        current: &MetricRecord,
        window: &Window,
    ) -> Self {
        let admitted: Vec<MetricRecord> = records
            .into_iter()
            .filter(|r| window.admits(r, current))
            .collect();
        Self::capped(admitted, window.max_records)
    }

    /// Sort records chronologically and keep the most recent `max_records`,
    /// never more than [`HISTORY_MAX_RECORDS`].
    pub fn capped(mut records: Vec<MetricRecord>, max_records: usize) -> Self {
        let max_records = max_records.min(HISTORY_MAX_RECORDS);
        records.sort_by(|a, b| a.event_date.cmp(&b.event_date).then_with(|| a.id.cmp(&b.id)));
        if records.len() > max_records {
            let excess = records.len() - max_records;
            records.drain(..excess);
        }
        Self { records }
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Values of `key` in chronological order, skipping records that lack it.
    /// Pair with [`MetricSeries::missing`] to tell whether the order has gaps.
    pub fn values(&self, key: &str) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.metric(key)).collect()
    }

    /// Number of records without a finite value for `key`.
    pub fn missing(&self, key: &str) -> usize {
        self.records.iter().filter(|r| r.metric(key).is_none()).count()
    }
}

impl From<Vec<MetricRecord>> for MetricSeries {
    fn from(records: Vec<MetricRecord>) -> Self {
        Self::capped(records, HISTORY_MAX_RECORDS)
    }
}

impl From<MetricSeries> for Vec<MetricRecord> {
    fn from(series: MetricSeries) -> Self {
        series.records
    }
}

// ── BenchmarkPool ─────────────────────────────────────────────

/// Cross-partner peer records used for percentile ranking.
///
/// Stored most recent first; order carries no meaning for the statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<MetricRecord>", into = "Vec<MetricRecord>")]
pub struct BenchmarkPool {
    records: Vec<MetricRecord>,
}

impl BenchmarkPool {
    /// Build a pool from raw peer records relative to the current event.
    pub fn bounded(
        records: impl IntoIterator<Item = MetricRecord>,
        current: &MetricRecord,
        window: &Window,
    ) -> Self {
        let admitted: Vec<MetricRecord> = records
            .into_iter()
            .filter(|r| window.admits(r, current))
            .collect();
        Self::capped(admitted, window.max_records)
    }

    /// Keep the most recent `max_records` peers, never more than
    /// [`BENCHMARK_MAX_RECORDS`].
    pub fn capped(mut records: Vec<MetricRecord>, max_records: usize) -> Self {
        let max_records = max_records.min(BENCHMARK_MAX_RECORDS);
        records.sort_by(|a, b| b.event_date.cmp(&a.event_date).then_with(|| a.id.cmp(&b.id)));
        records.truncate(max_records);
        Self { records }
    }

    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All finite values of `key` across the pool.
    pub fn values(&self, key: &str) -> Vec<f64> {
        self.records.iter().filter_map(|r| r.metric(key)).collect()
    }
}

impl From<Vec<MetricRecord>> for BenchmarkPool {
    fn from(records: Vec<MetricRecord>) -> Self {
        Self::capped(records, BENCHMARK_MAX_RECORDS)
    }
}

impl From<BenchmarkPool> for Vec<MetricRecord> {
    fn from(pool: BenchmarkPool) -> Self {
        pool.records
    }
}
