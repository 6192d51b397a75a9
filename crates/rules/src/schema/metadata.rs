//! Metadata block shared across all rule kinds.

use serde::{Deserialize, Serialize};

/// Shared metadata for `InsightConfig` and `TemplateSet` documents.
///
/// `extends` names a parent rule by ID; the loader deep-merges the parent
/// into this rule with the child's values winning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CommonMetadata {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub extends: Option<String>,
}

fn default_true() -> bool {
    true
}
