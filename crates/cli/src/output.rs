use std::fmt::Write as _;

use anyhow::Result;
use serde::Serialize;

use lens_compute::InsightReport;

use crate::cli::OutputFormat;

/// One element of batch output: a report or the reason the request was rejected.
#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<InsightReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn render_report(report: &InsightReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Text => Ok(report_text(report)),
    }
}

pub fn render_batch(entries: &[BatchEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
        OutputFormat::Text => {
            let mut out = String::new();
            for entry in entries {
                match (&entry.report, &entry.error) {
                    (Some(report), _) => out.push_str(&report_text(report)),
                    (None, Some(error)) => {
                        let _ = writeln!(out, "#{}: rejected: {}", entry.index, error);
                    }
                    (None, None) => {}
                }
                out.push('\n');
            }
            Ok(out)
        }
    }
}

fn report_text(report: &InsightReport) -> String {
    let counts = report.summary.by_priority();
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (partner {}): {} insight(s) [critical {}, high {}, medium {}, low {}]",
        report.record_id,
        report.partner_id,
        report.summary.total(),
        counts.critical,
        counts.high,
        counts.medium,
        counts.low
    );
    for (n, insight) in report.insights.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {}. [{} {:.0}%] {} / {}: {}",
            n + 1,
            insight.priority.as_str().to_uppercase(),
            insight.confidence * 100.0,
            insight.category,
            insight.metric,
            insight.title
        );
        let _ = writeln!(out, "     {}", insight.message);
        if let Some(rec) = &insight.recommendation {
            let _ = writeln!(out, "     -> {}", rec);
        }
    }
    if !report.stats.skipped.is_empty() {
        let _ = writeln!(out, "  ({} metric check(s) skipped)", report.stats.skipped.len());
    }
    out
}
