//! Minijinja rendering for insight titles, messages and recommendations.
//!
//! Templates are arbitrary strings (built-in or from a TemplateSet rule), so
//! they are rendered with `render_str` against a shared environment that
//! carries the custom filters.

use std::fmt;

use serde::Serialize;

use lens_core::humanize_metric_key;

use crate::error::EngineError;
use crate::insight::{Evidence, Signal};

/// Named slots available to every template.
///
/// Fields that do not apply to the signal's category render as `none`.
#[derive(Debug, Clone, Serialize)]
pub struct Slots {
    pub metric: String,
    pub metric_label: String,
    pub current: f64,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
    pub z_score: Option<f64>,
    pub slope: Option<f64>,
    /// Absolute per-event rate of change in percent.
    pub rate_pct: Option<f64>,
    pub r_squared: Option<f64>,
    pub percentile: Option<f64>,
    pub pool_size: Option<usize>,
    pub direction: &'static str,
    pub priority: &'static str,
    pub confidence: f64,
}

impl Slots {
    pub fn from_signal(signal: &Signal) -> Self {
        let mut slots = Slots {
            metric: signal.metric.clone(),
            metric_label: humanize_metric_key(&signal.metric),
            current: signal.evidence.current(),
            mean: None,
            std_dev: None,
            z_score: None,
            slope: None,
            rate_pct: None,
            r_squared: None,
            percentile: None,
            pool_size: None,
            direction: signal.direction.as_str(),
            priority: signal.priority.as_str(),
            confidence: signal.confidence,
        };
        match &signal.evidence {
            Evidence::Anomaly {
                mean,
                std_dev,
                z_score,
                ..
            } => {
                slots.mean = Some(*mean);
                slots.std_dev = Some(*std_dev);
                slots.z_score = z_score.map(f64::abs);
            }
            Evidence::Trend {
                slope,
                r_squared,
                normalized_rate,
                ..
            } => {
                slots.slope = Some(*slope);
                slots.rate_pct = Some(normalized_rate.abs() * 100.0);
                slots.r_squared = Some(*r_squared);
            }
            Evidence::Benchmark {
                percentile,
                pool_size,
                ..
            } => {
                slots.percentile = Some(*percentile);
                slots.pool_size = Some(*pool_size);
            }
        }
        slots
    }
}

/// Renders template strings with the insight filters registered.
pub struct TemplateRenderer {
    env: minijinja::Environment<'static>,
}

impl TemplateRenderer {
    pub fn new() -> Self {
        let mut env = minijinja::Environment::new();
        env.add_filter("round", round_filter);
        env.add_filter("pct", pct_filter);
        Self { env }
    }

    /// Render a template string against the slots.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Template`] on syntax errors or failed filters
    /// (for example `round` applied to a slot that is `none`).
    pub fn render(&self, template: &str, slots: &Slots) -> Result<String, EngineError> {
        self.env
            .render_str(template, slots)
            .map(|s| s.trim().to_string())
            .map_err(|e| EngineError::Template(e.to_string()))
    }

    /// Check that a template string parses, without evaluating it.
    pub fn validate(&self, template: &str) -> Result<(), EngineError> {
        let env = minijinja::Environment::new();
        env.template_from_str(template)
            .map_err(|e| EngineError::Template(e.to_string()))?;
        Ok(())
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

/// Round a float to N decimal places (default 0).
fn round_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}", value, prec = n as usize)
}

/// Format a fraction as a percentage: 0.873 -> "87%".
fn pct_filter(value: f64, decimals: Option<u32>) -> String {
    let n = decimals.unwrap_or(0);
    format!("{:.prec$}%", value * 100.0, prec = n as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lens_core::{Direction, Priority};

    fn anomaly_slots(z_score: Option<f64>) -> Slots {
        Slots::from_signal(&Signal {
            metric: "engagementRate".into(),
            direction: Direction::Down,
            priority: Priority::High,
            confidence: 0.6312,
            evidence: Evidence::Anomaly {
                current: 0.1234,
                mean: 0.3,
                std_dev: 0.07,
                z_score,
                sample_size: 8,
            },
        })
    }

    #[test]
    fn slots_follow_evidence() {
        let slots = anomaly_slots(Some(-2.52));
        assert_eq!(slots.metric_label, "engagement rate");
        assert_eq!(slots.z_score, Some(2.52));
        assert_eq!(slots.direction, "down");
        assert!(slots.percentile.is_none());
    }

    #[test]
    fn render_with_filters() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render(
                "{{ metric_label }} at {{ current | round(2) }}, {{ confidence | pct }} sure",
                &anomaly_slots(Some(-2.52)),
            )
            .unwrap();
        assert_eq!(out, "engagement rate at 0.12, 63% sure");
    }

    #[test]
    fn round_on_missing_slot_fails() {
        let renderer = TemplateRenderer::new();
        let result = renderer.render("{{ z_score | round(1) }}", &anomaly_slots(None));
        assert!(matches!(result, Err(EngineError::Template(_))));
    }

    #[test]
    fn validate_checks_syntax_only() {
        let renderer = TemplateRenderer::new();
        assert!(renderer.validate("{{ anything_at_all }}").is_ok());
        assert!(renderer.validate("{{ unclosed").is_err());
    }

    #[test]
    fn builtin_capitalize_available() {
        let renderer = TemplateRenderer::new();
        let out = renderer
            .render("{{ metric_label | capitalize }}", &anomaly_slots(Some(2.0)))
            .unwrap();
        assert_eq!(out, "Engagement rate");
    }
}
