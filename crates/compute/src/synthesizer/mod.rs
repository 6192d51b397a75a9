//! Insight Synthesizer: turns raw detector signals into worded insights.
//!
//! Wording is chosen by (category, direction, priority). TemplateSet
//! overrides win over the built-in table; the built-in table falls back to a
//! generic template for combinations it does not name.

use tracing::warn;

use lens_core::{humanize_metric_key, Category, Direction, Priority};
use lens_rules::TemplateOverride;

use crate::error::EngineError;
use crate::insight::{Insight, Signal};

pub mod templating;

pub use templating::{Slots, TemplateRenderer};

/// Unrendered title / message / recommendation triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemplateText<'a> {
    pub title: &'a str,
    pub message: &'a str,
    pub recommendation: Option<&'a str>,
}

impl<'a> TemplateText<'a> {
    const fn new(title: &'a str, message: &'a str, recommendation: Option<&'a str>) -> Self {
        Self {
            title,
            message,
            recommendation,
        }
    }

    fn parts(&self) -> impl Iterator<Item = &'a str> {
        [self.title, self.message]
            .into_iter()
            .chain(self.recommendation)
    }
}

impl<'a> From<&'a TemplateOverride> for TemplateText<'a> {
    fn from(o: &'a TemplateOverride) -> Self {
        Self::new(&o.title, &o.message, o.recommendation.as_deref())
    }
}

/// Used whenever nothing more specific applies or renders.
pub const GENERIC_TEMPLATE: TemplateText<'static> = TemplateText::new(
    "{{ metric_label | capitalize }}: {{ priority }} {{ direction }} signal",
    "{{ metric_label | capitalize }} is {{ current | round(2) }}; flagged {{ priority }} with {{ confidence | pct }} confidence.",
    None,
);

/// Built-in wording for every combination the detectors emit.
pub fn builtin_template(
    category: Category,
    direction: Direction,
    priority: Priority,
) -> TemplateText<'static> {
    use Category::*;
    use Direction::*;
    use Priority::*;

    match (category, direction, priority) {
        (Anomaly, Up, Critical) => TemplateText::new(
            "{{ metric_label | capitalize }} far above normal",
            "{{ metric_label | capitalize }} reached {{ current | round(2) }} against a historical average of {{ mean | round(2) }}.",
            Some("Identify what drove this result so it can be repeated."),
        ),
        (Anomaly, Up, High) => TemplateText::new(
            "Unusually high {{ metric_label }}",
            "{{ metric_label | capitalize }} was {{ current | round(2) }}, {{ z_score | round(1) }} standard deviations above the average of {{ mean | round(2) }}.",
            Some("Review what was different about this event."),
        ),
        (Anomaly, Up, Medium | Low) => TemplateText::new(
            "{{ metric_label | capitalize }} above normal",
            "{{ metric_label | capitalize }} was {{ current | round(2) }} compared with an average of {{ mean | round(2) }}.",
            None,
        ),
        (Anomaly, Down, Critical) => TemplateText::new(
            "{{ metric_label | capitalize }} far below normal",
            "{{ metric_label | capitalize }} fell to {{ current | round(2) }} against a historical average of {{ mean | round(2) }}.",
            Some("Investigate the cause before the next event."),
        ),
        (Anomaly, Down, High) => TemplateText::new(
            "Unusually low {{ metric_label }}",
            "{{ metric_label | capitalize }} was {{ current | round(2) }}, {{ z_score | round(1) }} standard deviations below the average of {{ mean | round(2) }}.",
            Some("Check whether this was a one-off or the start of a decline."),
        ),
        (Anomaly, Down, Medium | Low) => TemplateText::new(
            "{{ metric_label | capitalize }} below normal",
            "{{ metric_label | capitalize }} was {{ current | round(2) }} compared with an average of {{ mean | round(2) }}.",
            None,
        ),
        (Trend, Up, Critical | High) => TemplateText::new(
            "Strong upward trend in {{ metric_label }}",
            "{{ metric_label | capitalize }} has grown by about {{ rate_pct | round(1) }}% per event (fit {{ r_squared | round(2) }}).",
            Some("Keep doing what is working and plan capacity for continued growth."),
        ),
        (Trend, Up, Medium) => TemplateText::new(
            "{{ metric_label | capitalize }} trending up",
            "{{ metric_label | capitalize }} has grown by about {{ rate_pct | round(1) }}% per event.",
            None,
        ),
        (Trend, Down, Critical | High) => TemplateText::new(
            "Strong downward trend in {{ metric_label }}",
            "{{ metric_label | capitalize }} has declined by about {{ rate_pct | round(1) }}% per event (fit {{ r_squared | round(2) }}).",
            Some("Review recent changes that may explain the decline."),
        ),
        (Trend, Down, Medium) => TemplateText::new(
            "{{ metric_label | capitalize }} trending down",
            "{{ metric_label | capitalize }} has declined by about {{ rate_pct | round(1) }}% per event.",
            None,
        ),
        (Benchmark, Up, Critical | High) => TemplateText::new(
            "Top performer in {{ metric_label }}",
            "{{ metric_label | capitalize }} of {{ current | round(2) }} ranks at percentile {{ percentile | round(0) }} among {{ pool_size }} peer events.",
            Some("Share what worked with partners planning similar events."),
        ),
        (Benchmark, Up, Medium) => TemplateText::new(
            "Above peers in {{ metric_label }}",
            "{{ metric_label | capitalize }} of {{ current | round(2) }} ranks at percentile {{ percentile | round(0) }} among {{ pool_size }} peer events.",
            None,
        ),
        (Benchmark, Down, Critical | High) => TemplateText::new(
            "Behind peers in {{ metric_label }}",
            "{{ metric_label | capitalize }} of {{ current | round(2) }} ranks at percentile {{ percentile | round(0) }} among {{ pool_size }} peer events.",
            Some("Compare with top-performing events to find improvements."),
        ),
        (Benchmark, Down, Medium) => TemplateText::new(
            "Below peers in {{ metric_label }}",
            "{{ metric_label | capitalize }} of {{ current | round(2) }} ranks at percentile {{ percentile | round(0) }} among {{ pool_size }} peer events.",
            None,
        ),
        _ => GENERIC_TEMPLATE,
    }
}

/// Rendered text of one insight.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RenderedText {
    title: String,
    message: String,
    recommendation: Option<String>,
}

/// Pure mapping from [`Signal`] to [`Insight`].
#[derive(Debug, Default)]
pub struct InsightSynthesizer {
    renderer: TemplateRenderer,
    overrides: Vec<TemplateOverride>,
}

impl InsightSynthesizer {
    /// Synthesizer using only the built-in wording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add TemplateSet overrides. Every template string is syntax-checked here
    /// so a broken override is rejected up front.
    pub fn with_overrides(mut self, overrides: Vec<TemplateOverride>) -> Result<Self, EngineError> {
        for (i, o) in overrides.iter().enumerate() {
            for part in TemplateText::from(o).parts() {
                self.renderer.validate(part).map_err(|e| {
                    EngineError::Template(format!(
                        "override #{} ({}/{}): {}",
                        i, o.category, o.direction, e
                    ))
                })?;
            }
        }
        self.overrides = overrides;
        Ok(self)
    }

    pub fn overrides(&self) -> &[TemplateOverride] {
        &self.overrides
    }

    /// The override for this key, exact priority first.
    fn find_override(
        &self,
        category: Category,
        direction: Direction,
        priority: Priority,
    ) -> Option<&TemplateOverride> {
        let exact = self.overrides.iter().find(|o| {
            o.priority == Some(priority) && o.matches(category, direction, priority)
        });
        exact.or_else(|| {
            self.overrides
                .iter()
                .find(|o| o.priority.is_none() && o.matches(category, direction, priority))
        })
    }

    /// Render a signal into an insight for `record_id`.
    pub fn synthesize(&self, record_id: &str, signal: Signal) -> Insight {
        let category = signal.category();
        let slots = Slots::from_signal(&signal);
        let text = self.render(category, &signal, &slots);

        Insight {
            id: Insight::derive_id(record_id, category, &signal.metric),
            category,
            priority: signal.priority,
            confidence: signal.confidence,
            metric: signal.metric,
            direction: signal.direction,
            title: text.title,
            message: text.message,
            recommendation: text.recommendation,
            evidence: signal.evidence,
        }
    }

    fn render(&self, category: Category, signal: &Signal, slots: &Slots) -> RenderedText {
        let mut candidates = Vec::with_capacity(3);
        if let Some(o) = self.find_override(category, signal.direction, signal.priority) {
            candidates.push(TemplateText::from(o));
        }
        candidates.push(builtin_template(category, signal.direction, signal.priority));
        candidates.push(GENERIC_TEMPLATE);

        for candidate in candidates {
            match self.render_text(&candidate, slots) {
                Ok(text) => return text,
                Err(e) => warn!(
                    metric = %signal.metric,
                    category = %category,
                    error = %e,
                    "template render failed, falling back"
                ),
            }
        }

        let label = humanize_metric_key(&signal.metric);
        RenderedText {
            title: format!("{} {} ({})", label, category, signal.priority),
            message: format!("{} is {}", label, slots.current),
            recommendation: None,
        }
    }

    fn render_text(&self, text: &TemplateText<'_>, slots: &Slots) -> Result<RenderedText, EngineError> {
        Ok(RenderedText {
            title: self.renderer.render(text.title, slots)?,
            message: self.renderer.render(text.message, slots)?,
            recommendation: text
                .recommendation
                .map(|r| self.renderer.render(r, slots))
                .transpose()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insight::Evidence;

    fn anomaly(direction: Direction, priority: Priority, z_score: Option<f64>) -> Signal {
        Signal {
            metric: "attendance".into(),
            direction,
            priority,
            confidence: 1.0,
            evidence: Evidence::Anomaly {
                current: 500.0,
                mean: 102.4,
                std_dev: 5.59,
                z_score,
                sample_size: 5,
            },
        }
    }

    fn benchmark(priority: Priority) -> Signal {
        Signal {
            metric: "ticketRevenue".into(),
            direction: Direction::Up,
            priority,
            confidence: 0.9,
            evidence: Evidence::Benchmark {
                current: 19.0,
                percentile: 95.0,
                pool_size: 20,
            },
        }
    }

    fn override_for(priority: Option<Priority>, title: &str) -> TemplateOverride {
        TemplateOverride {
            category: Category::Benchmark,
            direction: Direction::Up,
            priority,
            title: title.into(),
            message: "{{ percentile | round(0) }}".into(),
            recommendation: None,
        }
    }

    #[test]
    fn builtin_anomaly_wording() {
        let insight = InsightSynthesizer::new().synthesize(
            "evt-1",
            anomaly(Direction::Up, Priority::Critical, Some(71.2)),
        );
        assert_eq!(insight.title, "Attendance far above normal");
        assert_eq!(
            insight.message,
            "Attendance reached 500.00 against a historical average of 102.40."
        );
        assert!(insight.recommendation.is_some());
        assert_eq!(insight.category, Category::Anomaly);
        assert_eq!(insight.id, Insight::derive_id("evt-1", Category::Anomaly, "attendance"));
    }

    #[test]
    fn critical_anomaly_renders_without_z_score() {
        let insight = InsightSynthesizer::new()
            .synthesize("evt-1", anomaly(Direction::Down, Priority::Critical, None));
        assert_eq!(insight.title, "Attendance far below normal");
    }

    #[test]
    fn every_builtin_combination_renders() {
        let synth = InsightSynthesizer::new();
        for direction in [Direction::Up, Direction::Down] {
            for priority in Priority::DESCENDING {
                let signals = [
                    anomaly(direction, priority, Some(2.5)),
                    Signal {
                        metric: "engagementRate".into(),
                        direction,
                        priority,
                        confidence: 0.9,
                        evidence: Evidence::Trend {
                            current: 0.18,
                            slope: 0.02,
                            intercept: 0.1,
                            r_squared: 0.99,
                            normalized_rate: 0.2,
                            points: 5,
                        },
                    },
                    Signal {
                        direction,
                        ..benchmark(priority)
                    },
                ];
                for signal in signals {
                    let insight = synth.synthesize("evt", signal);
                    assert!(!insight.title.is_empty());
                    assert!(!insight.message.contains("{{"));
                }
            }
        }
    }

    #[test]
    fn unknown_combination_uses_generic() {
        let text = builtin_template(Category::Benchmark, Direction::Up, Priority::Low);
        assert_eq!(text, GENERIC_TEMPLATE);
        let insight = InsightSynthesizer::new().synthesize("evt", benchmark(Priority::Low));
        assert_eq!(insight.title, "Ticket revenue: low up signal");
    }

    #[test]
    fn exact_priority_override_wins() {
        let synth = InsightSynthesizer::new()
            .with_overrides(vec![
                override_for(None, "any priority"),
                override_for(Some(Priority::High), "exact"),
            ])
            .unwrap();
        assert_eq!(synth.synthesize("evt", benchmark(Priority::High)).title, "exact");
        let medium = synth.synthesize("evt", benchmark(Priority::Medium));
        assert_eq!(medium.title, "any priority");
        assert_eq!(medium.message, "95");
    }

    #[test]
    fn broken_override_rejected_at_build() {
        let result = InsightSynthesizer::new().with_overrides(vec![override_for(None, "{{ oops")]);
        assert!(matches!(result, Err(EngineError::Template(_))));
    }

    #[test]
    fn failing_override_falls_back_to_builtin() {
        let mut o = override_for(None, "ok");
        o.message = "{{ mean | round(1) }}".into();
        let synth = InsightSynthesizer::new().with_overrides(vec![o]).unwrap();
        let insight = synth.synthesize("evt", benchmark(Priority::High));
        assert_eq!(insight.title, "Top performer in ticket revenue");
    }
}
