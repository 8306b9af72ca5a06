//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for run results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Full formatted output with per-step detail
    Full,
    /// Status line and summary only
    Brief,
    /// JSON output
    Json,
}

/// CLI arguments for webpilot
#[derive(Parser, Debug)]
#[command(name = "webpilot")]
#[command(author, version, about = "Goal-driven browser automation - plan, act, evaluate, adapt")]
#[command(long_about = r#"
Webpilot drives a browser session toward a natural-language goal.

Each run is a loop:
1. Plan: the goal is broken into strategic steps
2. Act: steps run as browser tasks, with retries for transient failures
3. Evaluate: page state before and after each step is compared
4. Adapt: failed or drifting steps trigger a bounded replan

Configuration files are loaded from (in priority order):
1. --config <path>     Explicit config file
2. ./webpilot.toml     Project-level config (or .webpilot.toml)
3. ~/.config/webpilot/config.toml   Global config

Examples:
  webpilot "Find wireless headphones under $100" --url https://shop.example.com
  webpilot --scenario checkout.toml --output json
  webpilot "Log in and export the report" --var user=admin --var pass=hunter2:secret
"#)]
pub struct Cli {
    /// The goal to pursue (optional when --scenario provides an objective)
    pub goal: Option<String>,

    /// URL the browser session starts at
    #[arg(short, long, value_name = "URL", default_value = "https://example.com")]
    pub url: String,

    /// Scripted scenario file for the built-in deterministic stack
    #[arg(short, long, value_name = "PATH")]
    pub scenario: Option<PathBuf>,

    /// Run without event log, repositories, or compensation
    #[arg(long)]
    pub dry_run: bool,

    /// Workflow variables as name=value (append :secret to redact the value)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub variables: Vec<String>,

    /// Disable replanning on failure or drift
    #[arg(long)]
    pub no_replan: bool,

    /// Stop as soon as the completion floor is reached
    #[arg(long)]
    pub early_exit: bool,

    /// Export the run's event log to a file (.csv or .json by extension)
    #[arg(long, value_name = "PATH")]
    pub export_events: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "full")]
    pub output: OutputFormat,

    /// Plain progress lines instead of spinners
    #[arg(long)]
    pub plain: bool,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,
}
