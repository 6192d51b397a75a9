//! YAML rule documents that configure the insight engine.
//!
//! This crate provides:
//! - `InsightConfig` rules: detector thresholds, confidence floor, result bound, windows
//! - `TemplateSet` rules: per-(category, direction, priority) message overrides
//! - Two-pass envelope parsing dispatched on `kind`
//! - A directory loader with `extends` inheritance
//! - Structured validation with errors and advisory warnings

pub mod insight_config;
pub mod loader;
pub mod schema;
pub mod template_set;
pub mod validation;

pub use insight_config::{CompiledInsightConfig, InsightConfigRule, InsightConfigSpec};
pub use loader::{LoadResult, LoadStatus, RuleError, RuleLoader};
pub use schema::{CommonMetadata, RuleDocument, RuleEnvelope, RuleKind};
pub use template_set::{TemplateOverride, TemplateSetRule, TemplateSetSpec};
