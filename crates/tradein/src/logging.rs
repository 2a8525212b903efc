//! Structured logging setup.
//!
//! The engine itself only emits `tracing` events and spans; binaries call
//! [`init_tracing`] once to install a subscriber.

use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::result::{TradeInError, TradeInResult};

/// Filter used when neither `RUST_LOG` nor an explicit filter is given
pub const DEFAULT_FILTER: &str = "info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output
    #[default]
    Pretty,
    /// Compact single-line output
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = TradeInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TradeInError::config(format!(
                "unknown log format '{other}' (expected pretty, compact or json)"
            ))),
        }
    }
}

fn build_filter(filter: Option<&str>) -> TradeInResult<EnvFilter> {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        return Ok(from_env);
    }
    let directive = filter.unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directive)
        .map_err(|e| TradeInError::config(format!("invalid log filter '{directive}': {e}")))
}

/// Install the global subscriber.
///
/// Logs go to stderr. `RUST_LOG` wins over `filter`. Fails if a subscriber
/// is already installed.
pub fn init_tracing(format: LogFormat, filter: Option<&str>) -> TradeInResult<()> {
    let env_filter = build_filter(filter)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    let installed = match format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| TradeInError::config(format!("could not install logger: {e}")))
}
