use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::LensError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

/// Parse an optional profiled value. A present but malformed value is an error.
fn profiled_env_parse<T: std::str::FromStr>(
    profile: &str,
    key: &str,
) -> Result<Option<T>, LensError>
where
    T::Err: std::fmt::Display,
{
    match profiled_env_opt(profile, key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e: T::Err| LensError::Config {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub rules: RulesConfig,
    pub overrides: EngineOverrides,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `LENS_PROFILE`. When set (e.g. `STAGING`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Result<Self, LensError> {
        let profile = env_or("LENS_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Result<Self, LensError> {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Ok(Self {
            profile: p.to_string(),
            rules: RulesConfig::from_env_profiled(p),
            overrides: EngineOverrides::from_env_profiled(p)?,
        })
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!(
            "  rules:      dir={}, insight_config={}",
            self.rules.rules_dir.display(),
            self.rules.insight_config
        );
        tracing::info!(
            "  overrides:  confidence_floor={}, max_insights={}",
            self.overrides
                .confidence_floor
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(rules)".to_string()),
            self.overrides
                .max_insights
                .map(|v| v.to_string())
                .unwrap_or_else(|| "(rules)".to_string()),
        );
    }
}

// ── Rules ─────────────────────────────────────────────────────

pub const DEFAULT_RULES_DIR: &str = "data/rules/insights";
pub const DEFAULT_INSIGHT_CONFIG_ID: &str = "insight-default";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Directory scanned for InsightConfig / TemplateSet YAML documents.
    pub rules_dir: PathBuf,
    /// `metadata.id` of the InsightConfig the engine runs with.
    pub insight_config: String,
}

impl RulesConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            rules_dir: PathBuf::from(profiled_env_or(p, "LENS_RULES_DIR", DEFAULT_RULES_DIR)),
            insight_config: profiled_env_or(p, "LENS_INSIGHT_CONFIG", DEFAULT_INSIGHT_CONFIG_ID),
        }
    }
}

// ── Engine overrides ──────────────────────────────────────────

/// Optional knobs that win over whatever the YAML InsightConfig says.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineOverrides {
    pub confidence_floor: Option<f64>,
    pub max_insights: Option<usize>,
}

impl EngineOverrides {
    fn from_env_profiled(p: &str) -> Result<Self, LensError> {
        Ok(Self {
            confidence_floor: profiled_env_parse(p, "LENS_CONFIDENCE_FLOOR")?,
            max_insights: profiled_env_parse(p, "LENS_MAX_INSIGHTS")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.confidence_floor.is_none() && self.max_insights.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own profile prefix so parallel tests don't collide.

    #[test]
    fn defaults_without_env() {
        let config = Config::for_profile("LENSTESTDEFAULTS").unwrap();
        assert_eq!(config.profile_label(), "LENSTESTDEFAULTS");
        assert_eq!(config.rules.insight_config, DEFAULT_INSIGHT_CONFIG_ID);
    }

    #[test]
    fn profiled_override_wins() {
        env::set_var("LENSTESTA_LENS_MAX_INSIGHTS", "4");
        env::set_var("LENSTESTA_LENS_CONFIDENCE_FLOOR", "0.65");
        env::set_var("LENSTESTA_LENS_INSIGHT_CONFIG", "insight-strict");
        let config = Config::for_profile("lenstesta").unwrap();
        assert_eq!(config.overrides.max_insights, Some(4));
        assert_eq!(config.overrides.confidence_floor, Some(0.65));
        assert_eq!(config.rules.insight_config, "insight-strict");
        assert!(!config.overrides.is_empty());
        env::remove_var("LENSTESTA_LENS_MAX_INSIGHTS");
        env::remove_var("LENSTESTA_LENS_CONFIDENCE_FLOOR");
        env::remove_var("LENSTESTA_LENS_INSIGHT_CONFIG");
    }

    #[test]
    fn malformed_override_is_error() {
        env::set_var("LENSTESTB_LENS_MAX_INSIGHTS", "ten");
        let err = Config::for_profile("LENSTESTB").unwrap_err();
        match err {
            LensError::Config { key, value, .. } => {
                assert_eq!(key, "LENS_MAX_INSIGHTS");
                assert_eq!(value, "ten");
            }
            other => panic!("expected Config error, got {:?}", other),
        }
        env::remove_var("LENSTESTB_LENS_MAX_INSIGHTS");
    }
}
