//! Rule validation with structured errors and suggestions.
//!
//! Checks InsightConfig thresholds for internal consistency and TemplateSet
//! overrides for empty text and unknown template slots. Returns a
//! [`ValidationResult`] with errors (reject the rule) and warnings (advisory).

use serde::{Deserialize, Serialize};

use lens_core::window::{BENCHMARK_MAX_RECORDS, HISTORY_MAX_RECORDS};
use lens_core::Window;

use crate::insight_config::InsightConfigSpec;
use crate::template_set::TemplateSetSpec;

// ── Valid domain values ─────────────────────────────────────────────

/// Named slots the insight renderer exposes to templates.
pub const TEMPLATE_SLOTS: &[&str] = &[
    "metric",
    "metric_label",
    "current",
    "mean",
    "std_dev",
    "z_score",
    "slope",
    "rate_pct",
    "r_squared",
    "percentile",
    "pool_size",
    "direction",
    "priority",
    "confidence",
];

/// Names that may appear inside `{{ ... }}` without being slots
/// (minijinja literals and tests).
const TEMPLATE_KEYWORDS: &[&str] = &["true", "false", "none", "not", "loop"];

// ── Result types ────────────────────────────────────────────────────

/// Overall validation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

/// A blocking validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationError {
    /// Dotted location, e.g. `"spec.anomaly.high_z"`.
    pub path: String,
    pub message: String,
    /// Optional "Did you mean …?" suggestion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// A non-blocking advisory warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: None,
        });
    }

    fn error_with_suggestion(
        &mut self,
        path: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) {
        self.valid = false;
        self.errors.push(ValidationError {
            path: path.into(),
            message: message.into(),
            suggestion: Some(suggestion.into()),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationWarning {
            path: path.into(),
            message: message.into(),
        });
    }

    /// All errors joined into one line, `path: message` each.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| match &e.suggestion {
                Some(s) => format!("{}: {} ({})", e.path, e.message, s),
                None => format!("{}: {}", e.path, e.message),
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

// ── Public API ──────────────────────────────────────────────────────

/// Validate an InsightConfig spec.
pub fn validate_insight_config(spec: &InsightConfigSpec) -> ValidationResult {
    let mut result = ValidationResult::new();
    validate_global(spec, &mut result);
    validate_anomaly(spec, &mut result);
    validate_trend(spec, &mut result);
    validate_benchmark(spec, &mut result);
    validate_window(&spec.history_window, HISTORY_MAX_RECORDS, "spec.history_window", &mut result);
    validate_window(&spec.benchmark_window, BENCHMARK_MAX_RECORDS, "spec.benchmark_window", &mut result);
    result
}

/// Validate a TemplateSet spec.
pub fn validate_template_set(spec: &TemplateSetSpec) -> ValidationResult {
    let mut result = ValidationResult::new();

    if spec.templates.is_empty() {
        result.warn("spec.templates", "TemplateSet has no templates");
    }

    let mut seen = std::collections::HashSet::new();
    for (i, t) in spec.templates.iter().enumerate() {
        let path = format!("spec.templates[{i}]");
        if !seen.insert((t.category, t.direction, t.priority)) {
            result.warn(
                &path,
                format!(
                    "duplicate override for ({}, {}, {}); the first one wins",
                    t.category,
                    t.direction,
                    t.priority.map(|p| p.to_string()).unwrap_or_else(|| "*".to_string())
                ),
            );
        }
        if t.title.trim().is_empty() {
            result.error(format!("{path}.title"), "title must not be empty");
        }
        if t.message.trim().is_empty() {
            result.error(format!("{path}.message"), "message must not be empty");
        }
        validate_slots(&t.title, &format!("{path}.title"), &mut result);
        validate_slots(&t.message, &format!("{path}.message"), &mut result);
        if let Some(rec) = &t.recommendation {
            validate_slots(rec, &format!("{path}.recommendation"), &mut result);
        }
    }

    result
}

// ── InsightConfig sections ──────────────────────────────────────────

fn validate_global(spec: &InsightConfigSpec, result: &mut ValidationResult) {
    if !(0.0..=1.0).contains(&spec.confidence_floor) {
        result.error(
            "spec.confidence_floor",
            format!("confidence_floor must be within [0, 1], got {}", spec.confidence_floor),
        );
    } else if spec.confidence_floor > 0.8 {
        result.warn(
            "spec.confidence_floor",
            "confidence_floor above 0.8 raises every medium finding to the same confidence",
        );
    }

    if spec.max_insights == 0 {
        result.error("spec.max_insights", "max_insights must be at least 1");
    } else if spec.max_insights > 50 {
        result.warn("spec.max_insights", "more than 50 insights per event is unlikely to be read");
    }
}

fn validate_anomaly(spec: &InsightConfigSpec, result: &mut ValidationResult) {
    let a = &spec.anomaly;
    if a.min_history < 2 {
        result.error(
            "spec.anomaly.min_history",
            "at least 2 historical points are needed for a sample standard deviation",
        );
    } else if a.min_history < 3 {
        result.warn("spec.anomaly.min_history", "fewer than 3 points gives unstable baselines");
    }
    if !(a.medium_z > 0.0 && a.medium_z < a.high_z && a.high_z < a.critical_z) {
        result.error(
            "spec.anomaly",
            format!(
                "z thresholds must satisfy 0 < medium_z < high_z < critical_z, got {} / {} / {}",
                a.medium_z, a.high_z, a.critical_z
            ),
        );
    }
    if a.confidence_divisor <= 0.0 {
        result.error("spec.anomaly.confidence_divisor", "confidence_divisor must be positive");
    }
}

fn validate_trend(spec: &InsightConfigSpec, result: &mut ValidationResult) {
    let t = &spec.trend;
    if t.min_points < 3 {
        result.error(
            "spec.trend.min_points",
            "a regression fit needs at least 3 points to be distinguishable from a line through two",
        );
    } else if t.min_points < 4 {
        result.warn("spec.trend.min_points", "fewer than 4 points makes R² unreliable");
    }
    if !(t.moderate_rate > 0.0 && t.moderate_rate <= t.strong_rate) {
        result.error(
            "spec.trend",
            format!(
                "rates must satisfy 0 < moderate_rate <= strong_rate, got {} / {}",
                t.moderate_rate, t.strong_rate
            ),
        );
    }
    for (name, value) in [
        ("strong_r_squared", t.strong_r_squared),
        ("moderate_r_squared", t.moderate_r_squared),
    ] {
        if !(0.0..=1.0).contains(&value) {
            result.error(
                format!("spec.trend.{name}"),
                format!("{name} must be within [0, 1], got {value}"),
            );
        }
    }
    if t.moderate_r_squared > t.strong_r_squared {
        result.error(
            "spec.trend.moderate_r_squared",
            "moderate_r_squared must not exceed strong_r_squared",
        );
    }
}

fn validate_benchmark(spec: &InsightConfigSpec, result: &mut ValidationResult) {
    let b = &spec.benchmark;
    if b.min_pool == 0 {
        result.error("spec.benchmark.min_pool", "min_pool must be at least 1");
    } else if b.min_pool < 10 {
        result.warn("spec.benchmark.min_pool", "percentiles over fewer than 10 peers are coarse");
    }
    let nested = 0.0 <= b.high_lower
        && b.high_lower <= b.medium_lower
        && b.medium_lower < 50.0
        && 50.0 < b.medium_upper
        && b.medium_upper <= b.high_upper
        && b.high_upper <= 100.0;
    if !nested {
        result.error(
            "spec.benchmark",
            format!(
                "percentile bands must satisfy 0 <= high_lower <= medium_lower < 50 < medium_upper <= high_upper <= 100, got {} / {} / {} / {}",
                b.high_lower, b.medium_lower, b.medium_upper, b.high_upper
            ),
        );
    }
}

fn validate_window(window: &Window, cap: usize, path: &str, result: &mut ValidationResult) {
    if window.months == 0 {
        result.error(format!("{path}.months"), "months must be at least 1");
    }
    if window.max_records == 0 {
        result.error(format!("{path}.max_records"), "max_records must be at least 1");
    } else if window.max_records > cap {
        result.error(
            format!("{path}.max_records"),
            format!("max_records may not exceed {cap}, got {}", window.max_records),
        );
    }
}

// ── Template slots ──────────────────────────────────────────────────

/// Check every `{{ name ... }}` expression refers to a known slot.
fn validate_slots(template: &str, path: &str, result: &mut ValidationResult) {
    for name in referenced_slots(template) {
        if TEMPLATE_SLOTS.contains(&name) || TEMPLATE_KEYWORDS.contains(&name) {
            continue;
        }
        match fuzzy_match(name, TEMPLATE_SLOTS) {
            Some(s) => result.error_with_suggestion(
                path,
                format!("Unknown template slot '{name}'"),
                format!("Did you mean '{s}'?"),
            ),
            None => result.error(path, format!("Unknown template slot '{name}'")),
        }
    }
}

/// Leading identifier of every `{{ ... }}` expression, in order.
fn referenced_slots(template: &str) -> Vec<&str> {
    let mut slots = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        let after = rest[open + 2..].trim_start_matches(['-', ' ']);
        let len = after
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(after.len());
        if len > 0 {
            slots.push(&after[..len]);
        }
        rest = &after[len..];
    }
    slots
}

// ── Fuzzy matching ──────────────────────────────────────────────────

/// Find the closest match using Levenshtein distance. Returns None if best
/// distance exceeds half the longer string (too dissimilar).
fn fuzzy_match<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    let input_lower = input.to_lowercase();
    let mut best: Option<(&str, usize)> = None;

    for &candidate in candidates {
        let dist = levenshtein(&input_lower, &candidate.to_lowercase());
        match best {
            None => best = Some((candidate, dist)),
            Some((_, best_dist)) if dist < best_dist => best = Some((candidate, dist)),
            _ => {}
        }
    }

    best.and_then(|(name, dist)| {
        let max_len = input.len().max(name.len());
        if dist <= max_len / 2 {
            Some(name)
        } else {
            None
        }
    })
}

/// Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let n = b.len();

    let mut prev = (0..=n).collect::<Vec<_>>();
    let mut curr = vec![0; n + 1];

    for i in 1..=a.len() {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template_set::TemplateOverride;
    use lens_core::{Category, Direction, Priority};

    fn template(title: &str, message: &str) -> TemplateOverride {
        TemplateOverride {
            category: Category::Anomaly,
            direction: Direction::Up,
            priority: Some(Priority::High),
            title: title.to_string(),
            message: message.to_string(),
            recommendation: None,
        }
    }

    #[test]
    fn defaults_are_valid() {
        let result = validate_insight_config(&InsightConfigSpec::default());
        assert!(result.valid, "{}", result.error_summary());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn unordered_z_thresholds_rejected() {
        let mut spec = InsightConfigSpec::default();
        spec.anomaly.high_z = 3.5;
        let result = validate_insight_config(&spec);
        assert!(!result.valid);
        assert_eq!(result.errors[0].path, "spec.anomaly");
    }

    #[test]
    fn overlapping_percentile_bands_rejected() {
        let mut spec = InsightConfigSpec::default();
        spec.benchmark.medium_upper = 95.0;
        assert!(!validate_insight_config(&spec).valid);

        let mut spec = InsightConfigSpec::default();
        spec.benchmark.medium_lower = 60.0;
        assert!(!validate_insight_config(&spec).valid);
    }

    #[test]
    fn window_cap_enforced() {
        let mut spec = InsightConfigSpec::default();
        spec.history_window.max_records = 51;
        let result = validate_insight_config(&spec);
        assert!(!result.valid);
        assert_eq!(result.errors[0].path, "spec.history_window.max_records");

        let mut spec = InsightConfigSpec::default();
        spec.benchmark_window.max_records = 500;
        assert!(validate_insight_config(&spec).valid);
    }

    #[test]
    fn small_counts_warn_or_fail() {
        let mut spec = InsightConfigSpec::default();
        spec.benchmark.min_pool = 5;
        spec.trend.min_points = 3;
        let result = validate_insight_config(&spec);
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 2);

        spec.trend.min_points = 2;
        assert!(!validate_insight_config(&spec).valid);
    }

    #[test]
    fn r_squared_out_of_range() {
        let mut spec = InsightConfigSpec::default();
        spec.trend.strong_r_squared = 1.2;
        let result = validate_insight_config(&spec);
        assert!(!result.valid);
        assert!(result.error_summary().contains("strong_r_squared"));
    }

    #[test]
    fn referenced_slots_parsing() {
        let slots = referenced_slots("{{ metric_label }} at {{current|round(1)}} vs {{- mean }}");
        assert_eq!(slots, vec!["metric_label", "current", "mean"]);
        assert!(referenced_slots("no slots here").is_empty());
    }

    #[test]
    fn unknown_slot_gets_suggestion() {
        let spec = TemplateSetSpec {
            templates: vec![template("{{ metric_lable }} spiked", "{{ current }}")],
        };
        let result = validate_template_set(&spec);
        assert!(!result.valid);
        assert_eq!(result.errors[0].path, "spec.templates[0].title");
        assert_eq!(result.errors[0].suggestion.as_deref(), Some("Did you mean 'metric_label'?"));
    }

    #[test]
    fn empty_message_and_duplicates() {
        let spec = TemplateSetSpec {
            templates: vec![template("a", "   "), template("b", "c")],
        };
        let result = validate_template_set(&spec);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn levenshtein_basic() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }
}
