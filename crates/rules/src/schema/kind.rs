//! Rule kind enum for two-pass deserialization dispatch.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported rule kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleKind {
    InsightConfig,
    TemplateSet,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::InsightConfig => write!(f, "InsightConfig"),
            RuleKind::TemplateSet => write!(f, "TemplateSet"),
        }
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "InsightConfig" => Ok(RuleKind::InsightConfig),
            "TemplateSet" => Ok(RuleKind::TemplateSet),
            other => Err(format!("unknown rule kind: '{}'", other)),
        }
    }
}
