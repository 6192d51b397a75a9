//! Multi-kind rule document container and accessors.

use super::{CommonMetadata, RuleKind};
use crate::insight_config::InsightConfigRule;
use crate::template_set::TemplateSetRule;

/// A fully deserialized rule of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDocument {
    /// Detector thresholds, confidence floor, result bound, windows.
    InsightConfig(InsightConfigRule),
    /// Insight message template overrides.
    TemplateSet(TemplateSetRule),
}

impl RuleDocument {
    /// Get the rule's metadata regardless of kind.
    pub fn metadata(&self) -> &CommonMetadata {
        match self {
            RuleDocument::InsightConfig(rule) => &rule.metadata,
            RuleDocument::TemplateSet(rule) => &rule.metadata,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RuleDocument::InsightConfig(_) => RuleKind::InsightConfig,
            RuleDocument::TemplateSet(_) => RuleKind::TemplateSet,
        }
    }

    pub fn as_insight_config(&self) -> Option<&InsightConfigRule> {
        match self {
            RuleDocument::InsightConfig(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_template_set(&self) -> Option<&TemplateSetRule> {
        match self {
            RuleDocument::TemplateSet(rule) => Some(rule),
            _ => None,
        }
    }
}
