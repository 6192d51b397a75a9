use thiserror::Error;

/// Context-level failures that abort an engine invocation.
///
/// A run that simply finds nothing is `Ok` with an empty report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Missing context: current record has no {field}")]
    MissingContext { field: &'static str },

    #[error("Record {record_id} carries no metrics")]
    EmptyRecord { record_id: String },

    #[error("Data quality error for {record_id}: {reason}")]
    DataQuality { record_id: String, reason: String },

    #[error("Template error: {0}")]
    Template(String),
}
