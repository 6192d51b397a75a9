//! TemplateSet rule kind: replaces the built-in insight wording for
//! specific (category, direction, priority) combinations.
//!
//! Templates are minijinja strings; the renderer in `lens-compute` exposes
//! named slots such as `metric_label`, `current`, `z_score` and `percentile`.

use serde::{Deserialize, Serialize};

use lens_core::{Category, Direction, Priority};

use crate::schema::CommonMetadata;

/// Top-level TemplateSet rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TemplateSetRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    pub spec: TemplateSetSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TemplateSetSpec {
    pub templates: Vec<TemplateOverride>,
}

/// One override. Without `priority` it applies to every priority of the
/// (category, direction) pair; an exact-priority override takes precedence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TemplateOverride {
    pub category: Category,
    pub direction: Direction,
    #[serde(default)]
    pub priority: Option<Priority>,
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub recommendation: Option<String>,
}

impl TemplateOverride {
    /// Whether this override applies to the given key.
    pub fn matches(&self, category: Category, direction: Direction, priority: Priority) -> bool {
        self.category == category
            && self.direction == direction
            && self.priority.map_or(true, |p| p == priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_template_set_yaml() {
        let yaml = include_str!("../../../data/rules/insights/templates-default.yml");
        let rule: TemplateSetRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.kind, "TemplateSet");
        assert!(!rule.spec.templates.is_empty());
    }

    #[test]
    fn priority_agnostic_override_matches_all() {
        let o = TemplateOverride {
            category: Category::Benchmark,
            direction: Direction::Up,
            priority: None,
            title: "t".into(),
            message: "m".into(),
            recommendation: None,
        };
        assert!(o.matches(Category::Benchmark, Direction::Up, Priority::High));
        assert!(o.matches(Category::Benchmark, Direction::Up, Priority::Medium));
        assert!(!o.matches(Category::Benchmark, Direction::Down, Priority::High));
        assert!(!o.matches(Category::Trend, Direction::Up, Priority::High));
    }

    #[test]
    fn exact_priority_override() {
        let yaml = r#"
category: anomaly
direction: down
priority: critical
title: "{{ metric_label }} collapsed"
message: "Only {{ current }} this time."
"#;
        let o: TemplateOverride = serde_yaml::from_str(yaml).unwrap();
        assert!(o.matches(Category::Anomaly, Direction::Down, Priority::Critical));
        assert!(!o.matches(Category::Anomaly, Direction::Down, Priority::High));
        assert!(o.recommendation.is_none());
    }
}
