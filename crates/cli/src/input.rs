//! Request files: `{ "current": .., "history": [..], "peers": [..] }`.
//!
//! History and peers are raw record lists; the configured windows bound them
//! before they reach the engine.

use std::fs;
use std::io::{self, Read};

use anyhow::{Context, Result};
use serde::Deserialize;

use lens_compute::InsightRequest;
use lens_core::MetricRecord;
use lens_rules::CompiledInsightConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct RawRequest {
    pub current: MetricRecord,
    #[serde(default)]
    pub history: Vec<MetricRecord>,
    #[serde(default)]
    pub peers: Vec<MetricRecord>,
}

impl RawRequest {
    pub fn into_request(self, config: &CompiledInsightConfig) -> InsightRequest {
        InsightRequest::bounded(self.current, self.history, self.peers, config)
    }
}

/// Read a file, or stdin for `-`.
pub fn read_source(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read request from stdin")?;
        return Ok(buf);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
}

pub fn parse_request(json: &str) -> Result<RawRequest> {
    serde_json::from_str(json).context("invalid request JSON")
}

pub fn parse_batch(json: &str) -> Result<Vec<RawRequest>> {
    serde_json::from_str(json).context("invalid batch JSON: expected an array of requests")
}
