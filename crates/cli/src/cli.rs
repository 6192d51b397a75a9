use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use lens_core::{Category, Priority};

/// Ranked, explainable insights from pre-aggregated event metrics.
///
/// Reads JSON requests (current record, partner history, peer records),
/// runs the anomaly, trend and benchmark detectors and prints the
/// prioritized insights.
#[derive(Parser, Debug)]
#[command(name = "lens", version, about = "Generate ranked insights from event metrics")]
pub struct CliArgs {
    /// Rules directory (overrides LENS_RULES_DIR)
    #[arg(long, global = true)]
    pub rules_dir: Option<PathBuf>,

    /// InsightConfig rule id to run with (overrides LENS_INSIGHT_CONFIG)
    #[arg(long, global = true)]
    pub config_id: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a single request
    Analyze(AnalyzeArgs),
    /// Analyze a JSON array of requests in parallel
    Batch(BatchArgs),
    /// Rule file maintenance
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Request file, or `-` for stdin
    #[arg(long, short, default_value = "-")]
    pub input: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// File holding a JSON array of requests, or `-` for stdin
    #[arg(long, short)]
    pub input: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

/// Caller-side filtering of the engine output.
#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// Only show insights at or above this priority
    #[arg(long)]
    pub min_priority: Option<Priority>,

    /// Only show these categories (repeatable)
    #[arg(long = "category")]
    pub categories: Vec<Category>,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Load and validate every rule file in the rules directory
    Validate,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Text,
}
