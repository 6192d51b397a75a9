use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::LensError;

/// Identifier of a single event's aggregate record.
pub type RecordId = String;

/// Identifier of the partner an event belongs to.
pub type PartnerId = String;

/// Well-known metric keys produced by the aggregation layer.
///
/// The Engine analyses any key present on the current record; these are the
/// ones the dashboard renders with dedicated labels.
pub mod metric_keys {
    pub const ATTENDANCE: &str = "attendance";
    pub const ENGAGEMENT_RATE: &str = "engagementRate";
    pub const MERCHANDISE_RATE: &str = "merchandiseRate";
    pub const TICKET_REVENUE: &str = "ticketRevenue";
    pub const MERCHANDISE_REVENUE: &str = "merchandiseRevenue";
    pub const SOCIAL_REACH: &str = "socialReach";
    pub const RETURNING_VISITOR_RATE: &str = "returningVisitorRate";
    pub const FEMALE_SHARE: &str = "femaleShare";
    pub const MALE_SHARE: &str = "maleShare";
}

/// One event's pre-aggregated metrics.
///
/// Identity fields default to empty strings when absent from the input so the
/// Engine can reject the invocation with a precise reason instead of failing
/// deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(default)]
    pub id: RecordId,
    #[serde(default)]
    pub partner_id: PartnerId,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
}

impl MetricRecord {
    pub fn new(
        id: impl Into<RecordId>,
        partner_id: impl Into<PartnerId>,
        event_date: NaiveDate,
    ) -> Self {
        Self {
            id: id.into(),
            partner_id: partner_id.into(),
            event_date,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric insertion.
    pub fn with_metric(mut self, key: impl Into<String>, value: f64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Parse a single record from JSON.
    pub fn from_json(json: &str) -> Result<Self, LensError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Value of a metric, treating non-finite values as absent.
    pub fn metric(&self, key: &str) -> Option<f64> {
        self.metrics.get(key).copied().filter(|v| v.is_finite())
    }

    /// Name of the first mandatory identity field that is blank, if any.
    pub fn missing_identity(&self) -> Option<&'static str> {
        if self.id.trim().is_empty() {
            Some("id")
        } else if self.partner_id.trim().is_empty() {
            Some("partner_id")
        } else {
            None
        }
    }
}

/// Turn a camelCase metric key into a lower-case label ("engagementRate" -> "engagement rate").
pub fn humanize_metric_key(key: &str) -> String {
    let mut label = String::with_capacity(key.len() + 4);
    for (i, c) in key.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                label.push(' ');
            }
            label.extend(c.to_lowercase());
        } else if c == '_' || c == '-' {
            label.push(' ');
        } else {
            label.push(c);
        }
    }
    label
}
