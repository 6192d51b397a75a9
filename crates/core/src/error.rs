use thiserror::Error;

#[derive(Error, Debug)]
pub enum LensError {
    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Config error: {key}={value:?}: {reason}")]
    Config {
        key: String,
        value: String,
        reason: String,
    },
}

impl From<serde_json::Error> for LensError {
    fn from(e: serde_json::Error) -> Self {
        LensError::Serialize(e.to_string())
    }
}
