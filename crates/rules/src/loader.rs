//! Filesystem rule loader with `extends` inheritance.
//!
//! Scans a directory for YAML rule documents, resolves `metadata.extends`
//! chains by deep-merging parent into child, and keeps the parsed documents
//! keyed by rule ID. Loading happens once per process; the engine itself never
//! touches the filesystem.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::insight_config::CompiledInsightConfig;
use crate::schema::{RuleDocument, RuleEnvelope, RuleKind};
use crate::template_set::TemplateOverride;
use crate::validation::validate_template_set;

// ── Deep-merge for `extends` inheritance ────────────────────────────

/// Maximum inheritance chain depth to prevent infinite loops.
const MAX_EXTENDS_DEPTH: usize = 5;

/// Deep-merge two YAML `Value` maps: child fields win, arrays replace entirely.
pub fn deep_merge(parent: &serde_yaml::Value, child: &serde_yaml::Value) -> serde_yaml::Value {
    match (parent, child) {
        (serde_yaml::Value::Mapping(pm), serde_yaml::Value::Mapping(cm)) => {
            let mut merged = pm.clone();
            for (key, child_val) in cm {
                if let Some(parent_val) = pm.get(key) {
                    merged.insert(key.clone(), deep_merge(parent_val, child_val));
                } else {
                    merged.insert(key.clone(), child_val.clone());
                }
            }
            serde_yaml::Value::Mapping(merged)
        }
        (_, child) => child.clone(),
    }
}

/// Resolve the `extends` chain of a single rule against the raw documents.
///
/// Already-resolved rules are memoised in `resolved`.
pub fn resolve_extends(
    id: &str,
    raw_values: &HashMap<String, serde_yaml::Value>,
    resolved: &mut HashMap<String, serde_yaml::Value>,
) -> std::result::Result<serde_yaml::Value, String> {
    let mut in_progress = HashSet::new();
    resolve_single(id, raw_values, resolved, &mut in_progress, 0)
}

fn resolve_single(
    id: &str,
    raw_values: &HashMap<String, serde_yaml::Value>,
    resolved: &mut HashMap<String, serde_yaml::Value>,
    in_progress: &mut HashSet<String>,
    depth: usize,
) -> std::result::Result<serde_yaml::Value, String> {
    if let Some(val) = resolved.get(id) {
        return Ok(val.clone());
    }

    if in_progress.contains(id) {
        return Err(format!("circular extends chain detected for rule '{}'", id));
    }

    if depth > MAX_EXTENDS_DEPTH {
        return Err(format!(
            "extends chain exceeds maximum depth ({}) for rule '{}'",
            MAX_EXTENDS_DEPTH, id
        ));
    }

    let raw = raw_values
        .get(id)
        .ok_or_else(|| format!("rule '{}' not found for extends resolution", id))?
        .clone();

    let result = match parent_id(&raw) {
        Some(parent_id) => {
            in_progress.insert(id.to_string());
            let parent_val = resolve_single(&parent_id, raw_values, resolved, in_progress, depth + 1)?;
            in_progress.remove(id);
            deep_merge(&parent_val, &raw)
        }
        None => raw,
    };

    resolved.insert(id.to_string(), result.clone());
    Ok(result)
}

fn metadata_field<'a>(value: &'a serde_yaml::Value, field: &str) -> Option<&'a str> {
    value
        .get("metadata")
        .and_then(|meta| meta.get(field))
        .and_then(|v| v.as_str())
}

fn parent_id(value: &serde_yaml::Value) -> Option<String> {
    metadata_field(value, "extends").map(str::to_string)
}

// ── Error type ──────────────────────────────────────────────────────

/// Errors that can occur during rule loading and compilation.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{0}")]
    UnknownKind(String),

    #[error("Extends error: {0}")]
    Extends(String),

    #[error("Rule not found: {0}")]
    NotFound(String),
}

/// Result alias for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

// ── Load result types ───────────────────────────────────────────────

/// Outcome of loading a single rule file.
#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub status: LoadStatus,
}

/// Status of a single file load attempt.
#[derive(Debug)]
pub enum LoadStatus {
    Loaded { rule_id: String, kind: RuleKind },
    /// Dotfile, non-YAML file, etc.
    Skipped { reason: String },
    Failed { error: String },
}

impl LoadStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, LoadStatus::Failed { .. })
    }
}

// ── Rule loader ─────────────────────────────────────────────────────

/// Filesystem-backed rule loader.
///
/// Rules are kept in a `BTreeMap` so iteration (and therefore the order in
/// which template overrides are applied) is stable across runs.
pub struct RuleLoader {
    rules_dir: PathBuf,
    rules: BTreeMap<String, RuleDocument>,
}

impl RuleLoader {
    pub fn new(rules_dir: impl Into<PathBuf>) -> Self {
        Self {
            rules_dir: rules_dir.into(),
            rules: BTreeMap::new(),
        }
    }

    pub fn rules_dir(&self) -> &Path {
        &self.rules_dir
    }

    /// Scan the rules directory and load all YAML files.
    ///
    /// Dotfiles and non-YAML files are skipped. Parse, extends and validation
    /// errors are reported per file and do not abort the scan.
    pub fn load_all(&mut self) -> Result<Vec<LoadResult>> {
        let mut paths = fs::read_dir(&self.rules_dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        let mut results = Vec::new();
        let mut raw: HashMap<String, serde_yaml::Value> = HashMap::new();
        let mut origins: Vec<(String, PathBuf)> = Vec::new();

        // Pass 1: read every candidate file into a raw YAML value.
        for path in paths {
            if path.is_dir() {
                continue;
            }
            if let Some(reason) = skip_reason(&path) {
                results.push(LoadResult {
                    path,
                    status: LoadStatus::Skipped { reason },
                });
                continue;
            }

            match read_raw(&path) {
                Ok((id, value)) => {
                    if let Some((_, first)) = origins.iter().find(|(existing, _)| *existing == id) {
                        let error = format!("duplicate rule id '{}' (first defined in {})", id, first.display());
                        warn!(path = %path.display(), "{}", error);
                        results.push(LoadResult {
                            path,
                            status: LoadStatus::Failed { error },
                        });
                        continue;
                    }
                    raw.insert(id.clone(), value);
                    origins.push((id, path));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read rule file");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        // Pass 2: resolve extends chains and parse into typed documents.
        let mut resolved = HashMap::new();
        for (id, path) in origins {
            let outcome = resolve_extends(&id, &raw, &mut resolved)
                .map_err(RuleError::Extends)
                .and_then(build_document);

            match outcome {
                Ok(doc) => {
                    let kind = doc.kind();
                    info!(rule_id = %id, kind = %kind, path = %path.display(), "loaded rule");
                    self.rules.insert(id.clone(), doc);
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Loaded { rule_id: id, kind },
                    });
                }
                Err(e) => {
                    warn!(rule_id = %id, path = %path.display(), error = %e, "failed to load rule");
                    results.push(LoadResult {
                        path,
                        status: LoadStatus::Failed {
                            error: e.to_string(),
                        },
                    });
                }
            }
        }

        Ok(results)
    }

    /// Parse and validate a single YAML file. `extends` is not resolved.
    pub fn load_file(&self, path: &Path) -> Result<RuleDocument> {
        let (_, value) = read_raw(path)?;
        build_document(value)
    }

    pub fn get(&self, id: &str) -> Option<&RuleDocument> {
        self.rules.get(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Compile the enabled InsightConfig with the given ID.
    pub fn insight_config(&self, id: &str) -> Result<CompiledInsightConfig> {
        let rule = self
            .rules
            .get(id)
            .and_then(RuleDocument::as_insight_config)
            .ok_or_else(|| RuleError::NotFound(format!("InsightConfig '{}'", id)))?;
        if !rule.metadata.enabled {
            return Err(RuleError::Validation(format!("InsightConfig '{}' is disabled", id)));
        }
        rule.compile()
    }

    /// Template overrides from every enabled TemplateSet, in rule-ID order.
    pub fn template_overrides(&self) -> Vec<TemplateOverride> {
        self.rules
            .values()
            .filter_map(RuleDocument::as_template_set)
            .filter(|set| set.metadata.enabled)
            .flat_map(|set| set.spec.templates.iter().cloned())
            .collect()
    }
}

fn skip_reason(path: &Path) -> Option<String> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if name.starts_with('.') {
        return Some("dotfile".to_string());
    }
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false);
    if !is_yaml {
        return Some("not a YAML file".to_string());
    }
    None
}

/// Read a file into a raw YAML value and extract its `metadata.id`.
fn read_raw(path: &Path) -> Result<(String, serde_yaml::Value)> {
    let contents = fs::read_to_string(path)?;
    let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
    let id = metadata_field(&value, "id")
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RuleError::Validation("rule metadata.id must not be empty".to_string()))?
        .to_string();
    Ok((id, value))
}

/// Two-pass parse of a (resolved) YAML value followed by kind-specific validation.
fn build_document(value: serde_yaml::Value) -> Result<RuleDocument> {
    let envelope: RuleEnvelope = serde_yaml::from_value(value)?;
    let doc = envelope.parse_full()?;
    match &doc {
        RuleDocument::InsightConfig(rule) => {
            rule.compile()?;
        }
        RuleDocument::TemplateSet(rule) => {
            let result = validate_template_set(&rule.spec);
            if !result.valid {
                return Err(RuleError::Validation(format!(
                    "rule '{}': {}",
                    rule.metadata.id,
                    result.error_summary()
                )));
            }
        }
    }
    Ok(doc)
}
