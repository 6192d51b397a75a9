mod cli;
mod input;
mod output;

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use lens_compute::{InsightEngine, InsightFilter, InsightSynthesizer};
use lens_core::config::{load_dotenv, Config};
use lens_rules::{CompiledInsightConfig, LoadStatus, RuleLoader};

use crate::cli::{AnalyzeArgs, BatchArgs, CliArgs, Command, FilterArgs, RulesCommand};
use crate::output::BatchEntry;

fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.log_json);

    load_dotenv();
    let mut config = Config::from_env().context("failed to read environment configuration")?;
    if let Some(dir) = &args.rules_dir {
        config.rules.rules_dir = dir.clone();
    }
    if let Some(id) = &args.config_id {
        config.rules.insight_config = id.clone();
    }
    config.log_summary();

    match args.command {
        Command::Analyze(a) => analyze(&config, a),
        Command::Batch(b) => batch(&config, b),
        Command::Rules(RulesCommand::Validate) => validate_rules(&config.rules.rules_dir),
    }
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Load rules, apply environment overrides and build the engine.
///
/// A missing rules directory falls back to built-in defaults; a present one
/// must contain the requested InsightConfig.
fn build_engine(config: &Config) -> Result<InsightEngine> {
    let dir = &config.rules.rules_dir;
    let (insight_config, overrides) = if dir.is_dir() {
        let mut loader = RuleLoader::new(dir);
        let results = loader
            .load_all()
            .with_context(|| format!("failed to scan rules directory {}", dir.display()))?;
        for r in &results {
            if let LoadStatus::Failed { error } = &r.status {
                warn!(path = %r.path.display(), error = %error, "ignoring invalid rule file");
            }
        }
        let insight_config = loader
            .insight_config(&config.rules.insight_config)
            .with_context(|| {
                format!(
                    "cannot use InsightConfig '{}' from {}",
                    config.rules.insight_config,
                    dir.display()
                )
            })?;
        (insight_config, loader.template_overrides())
    } else {
        warn!(dir = %dir.display(), "rules directory not found, using built-in defaults");
        (CompiledInsightConfig::default(), Vec::new())
    };

    let insight_config = insight_config
        .with_overrides(&config.overrides)
        .context("environment overrides rejected")?;

    let synthesizer = InsightSynthesizer::new()
        .with_overrides(overrides)
        .context("invalid TemplateSet override")?;
    info!(
        confidence_floor = insight_config.confidence_floor,
        max_insights = insight_config.max_insights,
        templates = synthesizer.overrides().len(),
        "engine ready"
    );
    Ok(InsightEngine::with_config(insight_config).with_synthesizer(synthesizer))
}

fn to_filter(args: &FilterArgs) -> InsightFilter {
    InsightFilter {
        min_priority: args.min_priority,
        categories: args.categories.clone(),
    }
}

fn analyze(config: &Config, args: AnalyzeArgs) -> Result<()> {
    let engine = build_engine(config)?;
    let raw = input::parse_request(&input::read_source(&args.input)?)?;
    let request = raw.into_request(engine.config());

    let report = engine
        .analyze(&request)
        .with_context(|| format!("analysis of {} rejected", request.current.id))?;
    let report = report.filtered(&to_filter(&args.filter));
    println!("{}", output::render_report(&report, args.format)?);
    Ok(())
}

fn batch(config: &Config, args: BatchArgs) -> Result<()> {
    let engine = build_engine(config)?;
    let requests: Vec<_> = input::parse_batch(&input::read_source(&args.input)?)?
        .into_iter()
        .map(|raw| raw.into_request(engine.config()))
        .collect();

    let outcome = engine.analyze_batch(&requests);
    let filter = to_filter(&args.filter);
    let entries: Vec<BatchEntry> = outcome
        .results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(report) => BatchEntry {
                index,
                report: Some(report.filtered(&filter)),
                error: None,
            },
            Err(e) => BatchEntry {
                index,
                report: None,
                error: Some(e.to_string()),
            },
        })
        .collect();

    info!(
        runs = outcome.metrics.runs,
        failed = outcome.metrics.failed_runs,
        insights = outcome.metrics.insights_emitted,
        avg_latency_us = outcome.metrics.avg_latency_us,
        max_latency_us = outcome.metrics.max_latency_us,
        "batch finished"
    );
    println!("{}", output::render_batch(&entries, args.format)?);
    Ok(())
}

fn validate_rules(dir: &Path) -> Result<()> {
    let mut loader = RuleLoader::new(dir);
    let results = loader
        .load_all()
        .with_context(|| format!("failed to scan rules directory {}", dir.display()))?;

    let mut failed = 0;
    for r in &results {
        match &r.status {
            LoadStatus::Loaded { rule_id, kind } => {
                println!("OK    {} ({} {})", r.path.display(), kind, rule_id)
            }
            LoadStatus::Skipped { reason } => println!("SKIP  {} ({})", r.path.display(), reason),
            LoadStatus::Failed { error } => {
                failed += 1;
                println!("FAIL  {}: {}", r.path.display(), error);
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} rule file(s) invalid", failed, results.len());
    }
    println!("{} rule(s) valid", loader.len());
    Ok(())
}
