//! InsightConfig rule kind: detector thresholds, confidence floor,
//! result bound and lookback windows for the insight engine.
//!
//! Every field carries a serde default, so a document only needs to name the
//! values it changes.

use serde::{Deserialize, Serialize};

use lens_core::config::EngineOverrides;
use lens_core::Window;

use crate::loader::RuleError;
use crate::schema::CommonMetadata;
use crate::validation::validate_insight_config;

// ── YAML-level types ────────────────────────────────────────────────

/// Top-level InsightConfig rule document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InsightConfigRule {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    #[serde(default)]
    pub spec: InsightConfigSpec,
}

/// Specification section of an InsightConfig rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct InsightConfigSpec {
    /// Findings are never surfaced with a confidence below this value.
    #[serde(default = "default_confidence_floor")]
    pub confidence_floor: f64,
    /// Maximum number of insights returned per invocation.
    #[serde(default = "default_max_insights")]
    pub max_insights: usize,
    #[serde(default)]
    pub anomaly: AnomalyThresholds,
    #[serde(default)]
    pub trend: TrendThresholds,
    #[serde(default)]
    pub benchmark: BenchmarkThresholds,
    /// Lookback applied to a partner's own history.
    #[serde(default = "Window::history")]
    pub history_window: Window,
    /// Lookback applied to the cross-partner peer pool.
    #[serde(default = "Window::benchmark")]
    pub benchmark_window: Window,
}

fn default_confidence_floor() -> f64 {
    0.5
}

fn default_max_insights() -> usize {
    10
}

impl Default for InsightConfigSpec {
    fn default() -> Self {
        Self {
            confidence_floor: default_confidence_floor(),
            max_insights: default_max_insights(),
            anomaly: AnomalyThresholds::default(),
            trend: TrendThresholds::default(),
            benchmark: BenchmarkThresholds::default(),
            history_window: Window::history(),
            benchmark_window: Window::benchmark(),
        }
    }
}

/// Z-score bands for the anomaly detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AnomalyThresholds {
    /// Minimum historical points before a z-score is computed.
    pub min_history: usize,
    /// |z| at or above this → critical.
    pub critical_z: f64,
    /// |z| at or above this → high.
    pub high_z: f64,
    /// |z| at or above this → medium; below emits nothing.
    pub medium_z: f64,
    /// confidence = min(1, |z| / divisor).
    pub confidence_divisor: f64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            min_history: 3,
            critical_z: 3.0,
            high_z: 2.0,
            medium_z: 1.5,
            confidence_divisor: 4.0,
        }
    }
}

/// Rate-of-change and fit-quality bands for the trend analyzer.
///
/// Rates are fractions per period (0.20 = 20% per event).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TrendThresholds {
    /// Minimum points (history + current) for a regression.
    pub min_points: usize,
    pub strong_rate: f64,
    pub strong_r_squared: f64,
    pub moderate_rate: f64,
    pub moderate_r_squared: f64,
}

impl Default for TrendThresholds {
    fn default() -> Self {
        Self {
            min_points: 4,
            strong_rate: 0.20,
            strong_r_squared: 0.5,
            moderate_rate: 0.10,
            moderate_r_squared: 0.3,
        }
    }
}

/// Percentile bands for the benchmark comparator (0–100 scale).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct BenchmarkThresholds {
    /// Minimum peer values for a percentile to be meaningful.
    pub min_pool: usize,
    /// Percentile at or above this → high (top decile).
    pub high_upper: f64,
    /// Percentile at or below this → high (bottom decile).
    pub high_lower: f64,
    pub medium_upper: f64,
    pub medium_lower: f64,
}

impl Default for BenchmarkThresholds {
    fn default() -> Self {
        Self {
            min_pool: 10,
            high_upper: 90.0,
            high_lower: 10.0,
            medium_upper: 75.0,
            medium_lower: 25.0,
        }
    }
}

// ── Compiled type ───────────────────────────────────────────────────

/// Validated config handed to the engine.
///
/// Only constructed through validation, so every value the detectors read
/// satisfies `validate_insight_config` (floor within [0, 1], ordered bands).
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInsightConfig(InsightConfigSpec);

impl CompiledInsightConfig {
    /// Validate an inline spec.
    pub fn new(spec: InsightConfigSpec) -> Result<Self, RuleError> {
        Self::checked(spec, "inline config")
    }

    fn checked(spec: InsightConfigSpec, source: &str) -> Result<Self, RuleError> {
        let result = validate_insight_config(&spec);
        for warning in &result.warnings {
            tracing::warn!(source, path = %warning.path, "{}", warning.message);
        }
        if !result.valid {
            return Err(RuleError::Validation(format!(
                "{}: {}",
                source,
                result.error_summary()
            )));
        }
        Ok(Self(spec))
    }

    pub fn spec(&self) -> &InsightConfigSpec {
        &self.0
    }

    pub fn into_spec(self) -> InsightConfigSpec {
        self.0
    }

    /// Apply environment overrides and validate the result again.
    pub fn with_overrides(self, overrides: &EngineOverrides) -> Result<Self, RuleError> {
        if overrides.is_empty() {
            return Ok(self);
        }
        Self::checked(self.0.with_overrides(overrides), "environment overrides")
    }
}

impl Default for CompiledInsightConfig {
    fn default() -> Self {
        Self(InsightConfigSpec::default())
    }
}

impl std::ops::Deref for CompiledInsightConfig {
    type Target = InsightConfigSpec;

    fn deref(&self) -> &InsightConfigSpec {
        &self.0
    }
}

impl TryFrom<InsightConfigSpec> for CompiledInsightConfig {
    type Error = RuleError;

    fn try_from(spec: InsightConfigSpec) -> Result<Self, RuleError> {
        Self::new(spec)
    }
}

impl InsightConfigRule {
    /// Validate and compile. Warnings are logged, errors reject the rule.
    pub fn compile(&self) -> Result<CompiledInsightConfig, RuleError> {
        CompiledInsightConfig::checked(
            self.spec.clone(),
            &format!("rule '{}'", self.metadata.id),
        )
    }
}

impl InsightConfigSpec {
    /// Apply environment overrides on top of the YAML values.
    pub fn with_overrides(mut self, overrides: &EngineOverrides) -> Self {
        if let Some(floor) = overrides.confidence_floor {
            self.confidence_floor = floor;
        }
        if let Some(max) = overrides.max_insights {
            self.max_insights = max;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_insight_config_yaml() {
        let yaml = include_str!("../../../data/rules/insights/insight-default.yml");
        let rule: InsightConfigRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.kind, "InsightConfig");
        assert_eq!(rule.spec, InsightConfigSpec::default());
    }

    #[test]
    fn partial_spec_uses_defaults() {
        let yaml = r#"
apiVersion: v1
kind: InsightConfig
metadata:
  id: insight-tight
  name: Tight anomaly bands
spec:
  max_insights: 5
  anomaly:
    critical_z: 4.0
"#;
        let rule: InsightConfigRule = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(rule.spec.max_insights, 5);
        assert_eq!(rule.spec.confidence_floor, 0.5);
        assert_eq!(rule.spec.anomaly.critical_z, 4.0);
        assert_eq!(rule.spec.anomaly.high_z, 2.0);
        assert_eq!(rule.spec.trend, TrendThresholds::default());
        assert_eq!(rule.spec.history_window, Window::history());
    }

    #[test]
    fn unknown_field_rejected() {
        let yaml = r#"
apiVersion: v1
kind: InsightConfig
metadata:
  id: typo
  name: Typo
spec:
  max_insight: 5
"#;
        assert!(serde_yaml::from_str::<InsightConfigRule>(yaml).is_err());
    }

    #[test]
    fn compile_rejects_invalid_floor() {
        let yaml = r#"
apiVersion: v1
kind: InsightConfig
metadata:
  id: bad-floor
  name: Bad floor
spec:
  confidence_floor: 1.5
"#;
        let rule: InsightConfigRule = serde_yaml::from_str(yaml).unwrap();
        let err = rule.compile().unwrap_err();
        assert!(err.to_string().contains("confidence_floor"));
    }

    #[test]
    fn overrides_apply() {
        let overrides = EngineOverrides {
            confidence_floor: Some(0.7),
            max_insights: None,
        };
        let spec = InsightConfigSpec::default().with_overrides(&overrides);
        assert_eq!(spec.confidence_floor, 0.7);
        assert_eq!(spec.max_insights, 10);
    }

    #[test]
    fn default_compiled_config_is_valid() {
        let compiled = CompiledInsightConfig::new(InsightConfigSpec::default()).unwrap();
        assert_eq!(compiled, CompiledInsightConfig::default());
        assert_eq!(compiled.max_insights, 10);
    }

    #[test]
    fn inline_config_cannot_skip_validation() {
        let spec = InsightConfigSpec {
            confidence_floor: 1.5,
            ..InsightConfigSpec::default()
        };
        let err = CompiledInsightConfig::new(spec.clone()).unwrap_err();
        assert!(err.to_string().contains("confidence_floor"));
        assert!(CompiledInsightConfig::try_from(spec).is_err());
    }

    #[test]
    fn overrides_are_revalidated() {
        let bad = EngineOverrides {
            confidence_floor: Some(2.0),
            max_insights: None,
        };
        let err = CompiledInsightConfig::default().with_overrides(&bad).unwrap_err();
        assert!(err.to_string().contains("environment overrides"));

        let good = EngineOverrides {
            confidence_floor: None,
            max_insights: Some(3),
        };
        let compiled = CompiledInsightConfig::default().with_overrides(&good).unwrap();
        assert_eq!(compiled.max_insights, 3);
    }

    #[test]
    fn round_trip() {
        let yaml = include_str!("../../../data/rules/insights/insight-default.yml");
        let rule: InsightConfigRule = serde_yaml::from_str(yaml).unwrap();
        let serialized = serde_yaml::to_string(&rule).unwrap();
        let rule2: InsightConfigRule = serde_yaml::from_str(&serialized).unwrap();
        assert_eq!(rule, rule2);
    }
}
