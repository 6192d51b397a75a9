//! YAML schema types shared by every rule kind.
//!
//! - `RuleEnvelope`: lightweight first-pass header (apiVersion, kind, metadata)
//! - `RuleDocument`: enum dispatching to kind-specific types
//! - `CommonMetadata`: id, name, tags, enabled flag and `extends` parent

mod document;
mod envelope;
mod kind;
mod metadata;

pub use document::*;
pub use envelope::*;
pub use kind::*;
pub use metadata::*;

/// The only schema version currently understood.
pub const API_VERSION: &str = "v1";
