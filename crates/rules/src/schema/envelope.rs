//! Rule envelope for lightweight first-pass deserialization.

use serde::{Deserialize, Serialize};

use super::{CommonMetadata, RuleDocument, RuleKind, API_VERSION};
use crate::loader::RuleError;

/// Reads only the header fields of a rule document.
///
/// Used during two-pass loading: first extract `kind` to pick the concrete
/// type, then deserialize the full document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEnvelope {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: CommonMetadata,
    /// Remaining fields captured as raw YAML for second-pass deserialization.
    #[serde(flatten)]
    pub rest: serde_yaml::Value,
}

impl RuleEnvelope {
    /// Parse the `kind` field into a typed [`RuleKind`].
    pub fn rule_kind(&self) -> Result<RuleKind, RuleError> {
        self.kind.parse().map_err(RuleError::UnknownKind)
    }

    /// Second pass: deserialize the whole document into its concrete type.
    pub fn parse_full(&self) -> Result<RuleDocument, RuleError> {
        if self.api_version != API_VERSION {
            return Err(RuleError::Validation(format!(
                "rule '{}': unsupported apiVersion '{}' (expected '{}')",
                self.metadata.id, self.api_version, API_VERSION
            )));
        }
        let value = serde_yaml::to_value(self)?;
        match self.rule_kind()? {
            RuleKind::InsightConfig => Ok(RuleDocument::InsightConfig(serde_yaml::from_value(value)?)),
            RuleKind::TemplateSet => Ok(RuleDocument::TemplateSet(serde_yaml::from_value(value)?)),
        }
    }
}
