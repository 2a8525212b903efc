//! Tradein CLI
//!
//! ## Usage
//!
//! ```bash
//! tradein steps --site UK --surface BC        # Resolved step list
//! tradein check --config steps.yaml           # Validate a step config
//! tradein parse -- "-£1,234.00" --currency £  # Parse a displayed value
//! tradein verify-currency "CHF 80" --site CH --code CHF
//! tradein run --url … --site-config uk.json --fixtures data.json --device "Galaxy S24"
//! ```

use clap::Parser;
use std::process::ExitCode;
use tradein::{init_tracing, CurrencyVerdict};
use tradein_cli::{handlers, Cli, CliError, CliResult, Commands, Reporter, RunArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    if let Err(e) = init_tracing(cli.log_format.into(), Some(filter)) {
        eprintln!("Warning: {e}");
    }
    let reporter = Reporter::from_args(cli.color, cli.quiet);

    match run(cli.command, &reporter) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            reporter.failure(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands, reporter: &Reporter) -> CliResult<()> {
    match command {
        Commands::Steps(args) => {
            let steps = handlers::steps(&args)?;
            if args.json {
                reporter.result(&serde_json::to_string(&steps)?)?;
            } else {
                reporter.header(&format!("{} {}", args.site.to_uppercase(), args.surface));
                for (i, step) in steps.iter().enumerate() {
                    reporter.result(&format!("{}. {step}", i + 1))?;
                }
            }
            Ok(())
        }
        Commands::Check(args) => {
            let sites = handlers::check(&args)?;
            reporter.success(&format!(
                "step configuration valid ({} site overrides)",
                sites.len()
            ));
            Ok(())
        }
        Commands::Parse(args) => {
            let parsed = handlers::parse(&args)?;
            reporter.result(&serde_json::to_string_pretty(&parsed)?)?;
            Ok(())
        }
        Commands::VerifyCurrency(args) => match handlers::verify_currency(&args).0 {
            CurrencyVerdict::Passed(summary) => {
                reporter.success(&summary);
                Ok(())
            }
            CurrencyVerdict::Failed(summary) => Err(CliError::check_failed(format!(
                "'{}' for site {}: {summary}",
                args.text, args.site
            ))),
            CurrencyVerdict::Skipped(reason) => {
                reporter.warning(&format!("currency check skipped: {reason:?}"));
                Ok(())
            }
        },
        Commands::Run(args) => run_flow(&args, reporter),
    }
}

#[cfg(feature = "browser")]
fn run_flow(args: &RunArgs, reporter: &Reporter) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let report = runtime.block_on(handlers::run(args))?;
    reporter.result(&serde_json::to_string_pretty(&report)?)?;
    if report.soft_failures.is_empty() {
        reporter.success(&format!("trade-in applied: {}", report.value.original_text));
        Ok(())
    } else {
        Err(CliError::check_failed(report.soft_failures.join("; ")))
    }
}

#[cfg(not(feature = "browser"))]
fn run_flow(_args: &RunArgs, _reporter: &Reporter) -> CliResult<()> {
    Err(CliError::FeatureDisabled {
        command: "run".into(),
        feature: "browser".into(),
    })
}
