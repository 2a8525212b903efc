//! Tradein CLI library
//!
//! Command-line front end for the `tradein` engine: inspect step
//! configuration, parse and check discount strings, and (with the `browser`
//! feature) run a flow against a live page.

#![warn(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

mod commands;
mod error;
pub mod handlers;
mod output;

pub use commands::{
    CheckArgs, Cli, ColorArg, Commands, LogFormatArg, ParseArgs, RunArgs, StepsArgs,
    VerifyCurrencyArgs,
};
pub use error::{CliError, CliResult};
pub use output::Reporter;
