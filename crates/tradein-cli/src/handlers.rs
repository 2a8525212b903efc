//! Command handlers
//!
//! Each handler returns its result so `main` decides how to print it and the
//! logic stays testable without a terminal.

use std::path::Path;

use tradein::{
    parse_trade_in_value, verify_currency_mark_or_code, CurrencyCheck, CurrencyVerdict,
    ParsedTradeInValue, SoftAssertions, StepConfig, StepKind, Surface,
};

use crate::commands::{CheckArgs, ParseArgs, StepsArgs, VerifyCurrencyArgs};
use crate::error::{CliError, CliResult};

/// Load a step configuration file, or the built-in one
pub fn load_step_config(path: Option<&Path>) -> CliResult<StepConfig> {
    let config = match path {
        Some(path) => StepConfig::from_path(path)?,
        None => StepConfig::builtin()?,
    };
    Ok(config)
}

fn parse_surface(surface: &str) -> CliResult<Surface> {
    surface
        .parse()
        .map_err(|e: tradein::TradeInError| CliError::invalid_argument(e.to_string()))
}

/// Resolve the steps for `args.site` on `args.surface`
pub fn steps(args: &StepsArgs) -> CliResult<Vec<StepKind>> {
    let surface = parse_surface(&args.surface)?;
    let config = load_step_config(args.config.as_deref())?;
    Ok(config.resolve_steps(&args.site, surface)?)
}

/// Validate a step configuration; returns the sites it overrides
pub fn check(args: &CheckArgs) -> CliResult<Vec<String>> {
    let config = load_step_config(args.config.as_deref())?;
    config.validate()?;
    Ok(config.sites().map(str::to_string).collect())
}

/// Parse a displayed value
pub fn parse(args: &ParseArgs) -> CliResult<ParsedTradeInValue> {
    Ok(parse_trade_in_value(&args.text, &args.currency)?)
}

/// Run the currency soft check; a failed or skipped check is reported in
/// the verdict, not as an error
pub fn verify_currency(args: &VerifyCurrencyArgs) -> (CurrencyVerdict, SoftAssertions) {
    let mut soft = SoftAssertions::new();
    let check = CurrencyCheck {
        actual_text: Some(&args.text),
        currency_mark: args.mark.as_deref(),
        currency_code: args.code.as_deref(),
        current_site: Some(&args.site),
        excluded_sites: &args.excluded,
    };
    let verdict = verify_currency_mark_or_code(&mut soft, check);
    (verdict, soft)
}

#[cfg(feature = "browser")]
pub use browser::{run, RunReport};

#[cfg(feature = "browser")]
mod browser {
    use super::{load_step_config, parse_surface};
    use crate::commands::RunArgs;
    use crate::error::{CliError, CliResult};

    use serde::Serialize;
    use std::sync::Arc;
    use tradein::{
        BrowserConfig, CdpDriver, CurrencyVerdict, FixtureSet, FlowOptions, ParsedTradeInValue,
        SiteConfig, SoftAssertions, StepKind, TradeInFlow,
    };
    use tracing::info;

    /// Outcome of a live run
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct RunReport {
        /// Site code
        pub site: String,
        /// Surface code
        pub surface: String,
        /// Steps that ran
        pub steps: Vec<StepKind>,
        /// Parsed discount
        pub value: ParsedTradeInValue,
        /// Currency check summary
        pub currency: String,
        /// Soft check failures
        pub soft_failures: Vec<String>,
    }

    /// Launch a browser, run the flow, read and check the discount
    pub async fn run(args: &RunArgs) -> CliResult<RunReport> {
        let surface = parse_surface(&args.surface)?;
        let steps = Arc::new(load_step_config(args.steps.as_deref())?);
        let site = SiteConfig::from_path(&args.site_config)?;
        let options = match &args.options {
            Some(path) => FlowOptions::from_path(path)?,
            None => FlowOptions::default(),
        };
        let fixtures = FixtureSet::from_path(&args.fixtures)?.for_site(&site.site_code);
        let data = fixtures.for_device(&args.device)?.clone();

        let mut browser = match &args.browser_config {
            Some(path) => tradein::config::load::<BrowserConfig>(path)?,
            None => BrowserConfig::default(),
        };
        if args.headed {
            browser = browser.with_headless(false);
        }
        if args.no_sandbox {
            browser = browser.with_no_sandbox();
        }

        let driver = Arc::new(CdpDriver::launch(&browser).await?);
        let outcome = async {
            driver.goto(&args.url).await?;
            let flow = TradeInFlow::new(driver.clone(), site.clone(), surface, steps)
                .with_options(options);
            let ran = flow.resolve_steps()?;
            flow.process(&data).await?;
            let value = flow.get_and_parse_trade_in_value(args.sku.as_deref()).await?;
            let mut soft = SoftAssertions::new();
            let verdict = flow.verify_currency_mark_or_code(&mut soft, &value.original_text);
            Ok::<_, CliError>((ran, value, verdict, soft))
        }
        .await;
        if let Err(err) = driver.close().await {
            tracing::warn!(%err, "browser did not close cleanly");
        }
        let (ran, value, verdict, soft) = outcome?;

        let currency = match verdict {
            CurrencyVerdict::Passed(s) => format!("passed ({s})"),
            CurrencyVerdict::Failed(s) => format!("failed ({s})"),
            CurrencyVerdict::Skipped(reason) => format!("skipped ({reason:?})"),
        };
        info!(site = %site.site_code, amount = value.amount, "run finished");
        Ok(RunReport {
            site: site.site_code,
            surface: surface.to_string(),
            steps: ran,
            value,
            currency,
            soft_failures: soft.failures().iter().map(|f| f.message.clone()).collect(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn steps_args(site: &str, surface: &str, config: Option<PathBuf>) -> StepsArgs {
        StepsArgs {
            site: site.into(),
            surface: surface.into(),
            config,
            json: false,
        }
    }

    mod steps_tests {
        use super::*;

        #[test]
        fn test_builtin_uk_configurator() {
            let resolved = steps(&steps_args("uk", "bc", None)).unwrap();
            assert_eq!(
                resolved,
                vec![
                    StepKind::SkipGuide,
                    StepKind::SelectDevice,
                    StepKind::Condition,
                    StepKind::Imei,
                    StepKind::Apply,
                ]
            );
        }

        #[test]
        fn test_unlisted_site_falls_back_to_default() {
            let resolved = steps(&steps_args("ZZ", "CART", None)).unwrap();
            assert_eq!(resolved.first(), Some(&StepKind::SelectDevice));
            assert_eq!(resolved.last(), Some(&StepKind::Apply));
        }

        #[test]
        fn test_bad_surface_is_invalid_argument() {
            let err = steps(&steps_args("UK", "checkout", None)).unwrap_err();
            assert!(matches!(err, CliError::InvalidArgument { .. }));
        }

        #[test]
        fn test_yaml_config_file() {
            let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
            writeln!(
                file,
                "default:\n  BC: [selectDevice, apply]\nuk:\n  BC: [condition]"
            )
            .unwrap();
            let resolved = steps(&steps_args("UK", "BC", Some(file.path().into()))).unwrap();
            assert_eq!(resolved, vec![StepKind::Condition]);
        }
    }

    mod check_tests {
        use super::*;

        #[test]
        fn test_builtin_is_valid() {
            let sites = check(&CheckArgs { config: None }).unwrap();
            assert!(sites.contains(&"UK".to_string()));
        }

        #[test]
        fn test_unknown_step_is_reported() {
            let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
            write!(file, r#"{{"default": {{"BC": ["selectDevice", "abcd"]}}}}"#).unwrap();
            let err = check(&CheckArgs {
                config: Some(file.path().into()),
            })
            .unwrap_err();
            assert!(err.to_string().contains("abcd"), "{err}");
        }
    }

    mod value_tests {
        use super::*;

        #[test]
        fn test_parse_negative_value() {
            let parsed = parse(&ParseArgs {
                text: "-£1,234.00".into(),
                currency: "£".into(),
            })
            .unwrap();
            assert_eq!(parsed.amount_string, "1234.00");
            assert_eq!(parsed.amount_string_no_decimal, "123400");
            assert!(parsed.amount < 0.0);
        }

        #[test]
        fn test_verify_currency_falls_back_to_code() {
            let (verdict, soft) = verify_currency(&VerifyCurrencyArgs {
                text: "CHF 120.00".into(),
                site: "CH".into(),
                mark: Some("Fr.".into()),
                code: Some("CHF".into()),
                excluded: vec![],
            });
            assert!(matches!(verdict, CurrencyVerdict::Passed(_)));
            assert!(soft.all_passed());
        }

        #[test]
        fn test_verify_currency_excluded_site() {
            let (verdict, _) = verify_currency(&VerifyCurrencyArgs {
                text: "120.000".into(),
                site: "vn".into(),
                mark: None,
                code: Some("VND".into()),
                excluded: vec!["VN".into()],
            });
            assert!(matches!(
                verdict,
                CurrencyVerdict::Skipped(tradein::SkipReason::ExcludedSite)
            ));
        }
    }
}
