//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Tradein: inspect and run site-configurable trade-in flows
#[derive(Parser, Debug)]
#[command(name = "tradein")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log line format
    #[arg(long, default_value = "pretty", global = true, env = "TRADEIN_LOG_FORMAT")]
    pub log_format: LogFormatArg,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the steps a site runs on a surface
    Steps(StepsArgs),

    /// Validate a step configuration file
    Check(CheckArgs),

    /// Parse a displayed trade-in value
    Parse(ParseArgs),

    /// Check that a value carries the site's currency mark or code
    VerifyCurrency(VerifyCurrencyArgs),

    /// Run a trade-in flow against a live page (needs the `browser` feature)
    Run(RunArgs),
}

/// Arguments for the steps command
#[derive(Parser, Debug)]
pub struct StepsArgs {
    /// Site code (case-insensitive)
    #[arg(short, long)]
    pub site: String,

    /// Surface: BC (product configurator) or CART
    #[arg(long, default_value = "BC")]
    pub surface: String,

    /// Step configuration file (JSON or YAML); built-in config when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the check command
#[derive(Parser, Debug)]
pub struct CheckArgs {
    /// Step configuration file (JSON or YAML); built-in config when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// Arguments for the parse command
#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Displayed value, e.g. "-£1,234.00"
    #[arg(allow_hyphen_values = true)]
    pub text: String,

    /// Currency mark or code the value starts with
    #[arg(short, long)]
    pub currency: String,
}

/// Arguments for the verify-currency command
#[derive(Parser, Debug)]
pub struct VerifyCurrencyArgs {
    /// Displayed value
    #[arg(allow_hyphen_values = true)]
    pub text: String,

    /// Site code
    #[arg(short, long)]
    pub site: String,

    /// Currency mark, e.g. "£"
    #[arg(long)]
    pub mark: Option<String>,

    /// Currency code, e.g. "GBP"
    #[arg(long)]
    pub code: Option<String>,

    /// Sites exempt from the check (repeatable)
    #[arg(long = "exclude")]
    pub excluded: Vec<String>,
}

/// Arguments for the run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Page that shows the trade-in dialog
    #[arg(long)]
    pub url: String,

    /// Site configuration file (site code, currency)
    #[arg(long)]
    pub site_config: PathBuf,

    /// Trade-in fixture file keyed by site code
    #[arg(long)]
    pub fixtures: PathBuf,

    /// Device name used to pick the phone/watch/tablet payload
    #[arg(long)]
    pub device: String,

    /// Surface: BC (product configurator) or CART
    #[arg(long, default_value = "BC")]
    pub surface: String,

    /// Step configuration file; built-in config when omitted
    #[arg(long)]
    pub steps: Option<PathBuf>,

    /// Flow options file (timeouts, settle delays, retries)
    #[arg(long)]
    pub options: Option<PathBuf>,

    /// Browser launch settings file
    #[arg(long)]
    pub browser_config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers/CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Cart line SKU, needed to read the discount on the cart
    #[arg(long)]
    pub sku: Option<String>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Auto-detect
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Log format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormatArg {
    /// Human-readable
    #[default]
    Pretty,
    /// Single line per event
    Compact,
    /// JSON object per event
    Json,
}

impl From<LogFormatArg> for tradein::LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => Self::Pretty,
            LogFormatArg::Compact => Self::Compact,
            LogFormatArg::Json => Self::Json,
        }
    }
}
