//! Trade-in discount value parsing and currency checks.
//!
//! Parsing is strict: the caller cannot continue without a valid amount, so a
//! malformed value is an error. The currency and content checks are advisory
//! and record into [`SoftAssertions`] instead.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::result::{TradeInError, TradeInResult};
use crate::site::SiteConfig;
use crate::soft::SoftAssertions;

/// A parsed discount string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTradeInValue {
    /// Expected currency mark or code
    pub currency: String,
    /// Signed amount
    pub amount: f64,
    /// Unsigned decimal digits, separators stripped (e.g. "1234.00")
    pub amount_string: String,
    /// `amount_string` without the decimal point (e.g. "123400")
    pub amount_string_no_decimal: String,
    /// Trimmed source text
    pub original_text: String,
}

/// Parse `-?<currency><digits>[.dd]` into a [`ParsedTradeInValue`].
///
/// The currency is matched literally at the start, after an optional minus.
/// Thousands separators are commas.
pub fn parse_trade_in_value(text: &str, currency: &str) -> TradeInResult<ParsedTradeInValue> {
    let clean = text.trim();
    if clean.is_empty() {
        return Err(TradeInError::EmptyValue {
            text: text.to_string(),
        });
    }
    let currency = currency.trim();
    if currency.is_empty() {
        return Err(TradeInError::config(
            "site has neither a currency mark nor a currency code",
        ));
    }

    let pattern = format!(
        r"^(-)?{}([0-9][0-9,]*(?:\.[0-9]{{2}})?)$",
        regex::escape(currency)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| TradeInError::config(format!("bad currency pattern: {e}")))?;
    let caps = re.captures(clean).ok_or_else(|| TradeInError::ValueFormat {
        text: clean.to_string(),
        currency: currency.to_string(),
    })?;

    let negative = caps.get(1).is_some();
    let digits = caps.get(2).map_or("", |m| m.as_str());
    let amount_string = digits.replace(',', "");
    let magnitude: f64 = amount_string
        .parse()
        .map_err(|_| TradeInError::NonFiniteAmount {
            text: clean.to_string(),
        })?;
    if !magnitude.is_finite() {
        return Err(TradeInError::NonFiniteAmount {
            text: clean.to_string(),
        });
    }

    Ok(ParsedTradeInValue {
        currency: currency.to_string(),
        amount: if negative { -magnitude } else { magnitude },
        amount_string_no_decimal: amount_string.replace('.', ""),
        amount_string,
        original_text: clean.to_string(),
    })
}

/// Inputs to [`verify_currency_mark_or_code`]
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrencyCheck<'a> {
    /// Text to inspect
    pub actual_text: Option<&'a str>,
    /// Expected mark (e.g. "£")
    pub currency_mark: Option<&'a str>,
    /// Expected code (e.g. "GBP"), matched case-insensitively
    pub currency_code: Option<&'a str>,
    /// Site under test
    pub current_site: Option<&'a str>,
    /// Sites that render amounts without any currency indicator
    pub excluded_sites: &'a [String],
}

impl<'a> CurrencyCheck<'a> {
    /// Check `text` against a site's configured currency
    #[must_use]
    pub fn for_site(site: &'a SiteConfig, text: &'a str) -> Self {
        Self {
            actual_text: Some(text),
            currency_mark: site.currency_mark.as_deref(),
            currency_code: site.currency_code.as_deref(),
            current_site: Some(&site.site_code),
            excluded_sites: &site.currency_check_excluded,
        }
    }
}

/// Why a currency check did not run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Site is on the exclusion list
    ExcludedSite,
    /// No text or no site to check
    MissingInput,
    /// Site has neither a mark nor a code
    NoCurrencyConfigured,
}

/// Outcome of a currency check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CurrencyVerdict {
    /// Mark or code found; carries the attempt summary
    Passed(String),
    /// Neither found; a soft failure was recorded
    Failed(String),
    /// Check did not run
    Skipped(SkipReason),
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Soft-check that a text carries the expected currency mark or code.
///
/// The mark is tried first; the code only when the mark is absent or did not
/// match. Mismatches record a soft failure and never abort.
pub fn verify_currency_mark_or_code(
    soft: &mut SoftAssertions,
    check: CurrencyCheck<'_>,
) -> CurrencyVerdict {
    let site = present(check.current_site);
    if let Some(site) = site {
        if check
            .excluded_sites
            .iter()
            .any(|s| s.trim().eq_ignore_ascii_case(site))
        {
            info!(site, "currency check skipped for excluded site");
            return CurrencyVerdict::Skipped(SkipReason::ExcludedSite);
        }
    }
    let (Some(actual), Some(site)) = (present(check.actual_text), site) else {
        error!("currency check needs both the text and the site");
        return CurrencyVerdict::Skipped(SkipReason::MissingInput);
    };
    let mark = present(check.currency_mark);
    let code = present(check.currency_code);
    if mark.is_none() && code.is_none() {
        error!(site, "currency check needs a currency mark or code");
        return CurrencyVerdict::Skipped(SkipReason::NoCurrencyConfigured);
    }

    let mut valid = false;
    let mut attempts = Vec::new();
    if let Some(mark) = mark {
        valid = actual.contains(mark);
        attempts.push(format!("mark:'{mark}'{}", if valid { "OK" } else { "FAIL" }));
    }
    if let (Some(code), false) = (code, valid) {
        valid = actual.to_uppercase().contains(&code.to_uppercase());
        attempts.push(format!("code:'{code}'{}", if valid { "OK" } else { "FAIL" }));
    }
    let summary = attempts.join(", ");

    let message =
        format!("Trade-in currency - Site: {site}, Actual: '{actual}', Expected: {summary}");
    if soft.assert_true(valid, &message) {
        info!(site, actual, %summary, "currency check passed");
        CurrencyVerdict::Passed(summary)
    } else {
        CurrencyVerdict::Failed(summary)
    }
}

/// Soft-check that a value is present and not blank
pub fn verify_not_null(soft: &mut SoftAssertions, actual: Option<&str>) -> bool {
    match actual {
        None => soft.assert_true(false, "Value is null"),
        Some(value) => soft.assert_true(!value.trim().is_empty(), "Value is empty"),
    }
}

/// Soft-check that a value contains at least one digit
pub fn verify_numeric_value(soft: &mut SoftAssertions, actual: Option<&str>) -> bool {
    match actual {
        None => true,
        Some(value) => soft.assert_true(
            value.chars().any(|c| c.is_ascii_digit()),
            &format!("No numeric content in value: '{value}'"),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_simple_amount() {
            let v = parse_trade_in_value("£123.45", "£").unwrap();
            assert!((v.amount - 123.45).abs() < f64::EPSILON);
            assert_eq!(v.amount_string, "123.45");
            assert_eq!(v.amount_string_no_decimal, "12345");
            assert_eq!(v.currency, "£");
            assert_eq!(v.original_text, "£123.45");
        }

        #[test]
        fn test_negative_with_separators() {
            let v = parse_trade_in_value("-£1,234.00", "£").unwrap();
            assert!((v.amount + 1234.0).abs() < f64::EPSILON);
            assert_eq!(v.amount_string, "1234.00");
            assert_eq!(v.amount_string_no_decimal, "123400");
        }

        #[test]
        fn test_surrounding_whitespace_trimmed() {
            let v = parse_trade_in_value("  $300 \n", "$").unwrap();
            assert_eq!(v.original_text, "$300");
            assert_eq!(v.amount_string, "300");
        }

        #[test]
        fn test_currency_code_prefix() {
            let v = parse_trade_in_value("CHF1,050", "CHF").unwrap();
            assert!((v.amount - 1050.0).abs() < f64::EPSILON);
        }

        #[test]
        fn test_regex_metacharacters_escaped() {
            assert!(parse_trade_in_value("$5", "$").is_ok());
            assert!(parse_trade_in_value("x5", ".").is_err());
        }

        #[test]
        fn test_blank_is_error_with_text() {
            let err = parse_trade_in_value("", "£").unwrap_err();
            assert!(matches!(err, TradeInError::EmptyValue { .. }));
            assert!(err.to_string().contains("\"\""));
            let err = parse_trade_in_value("   ", "£").unwrap_err();
            assert!(err.to_string().contains("\"   \""));
        }

        #[test]
        fn test_garbage_is_error_with_text() {
            let err = parse_trade_in_value("abc", "£").unwrap_err();
            assert!(matches!(err, TradeInError::ValueFormat { .. }));
            assert!(err.to_string().contains("abc"));
        }

        #[test]
        fn test_wrong_currency_or_bad_fraction() {
            assert!(parse_trade_in_value("€10.00", "£").is_err());
            assert!(parse_trade_in_value("£10.5", "£").is_err());
            assert!(parse_trade_in_value("£,,", "£").is_err());
        }

        #[test]
        fn test_overflow_is_not_finite() {
            let text = format!("£{}", "9".repeat(400));
            let err = parse_trade_in_value(&text, "£").unwrap_err();
            assert!(matches!(err, TradeInError::NonFiniteAmount { .. }));
        }
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_formatted_amounts_round_trip(
                whole in 0u64..10_000_000,
                cents in 0u64..100,
                negative in any::<bool>(),
            ) {
                let grouped = whole
                    .to_string()
                    .as_bytes()
                    .rchunks(3)
                    .rev()
                    .map(|c| std::str::from_utf8(c).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join(",");
                let sign = if negative { "-" } else { "" };
                let text = format!("{sign}£{grouped}.{cents:02}");

                let v = parse_trade_in_value(&text, "£").unwrap();
                let expected = whole as f64 + cents as f64 / 100.0;
                prop_assert!((v.amount.abs() - expected).abs() < 1e-6);
                prop_assert_eq!(v.amount < 0.0, negative && expected > 0.0);
                prop_assert!(!v.amount_string.contains(','));
                prop_assert!(!v.amount_string_no_decimal.contains('.'));
                prop_assert!(v.amount.is_finite());
            }

            #[test]
            fn prop_never_panics(text in ".*", currency in ".{0,4}") {
                let _ = parse_trade_in_value(&text, &currency);
            }
        }
    }

    mod currency_tests {
        use super::*;

        fn uk() -> SiteConfig {
            SiteConfig::new("UK")
                .with_currency_mark("£")
                .with_currency_code("GBP")
        }

        #[test]
        fn test_mark_found() {
            let mut soft = SoftAssertions::new();
            let site = uk();
            let verdict = verify_currency_mark_or_code(&mut soft, CurrencyCheck::for_site(&site, "£120.00"));
            assert_eq!(verdict, CurrencyVerdict::Passed("mark:'£'OK".into()));
            assert!(soft.all_passed());
        }

        #[test]
        fn test_code_fallback_case_insensitive() {
            let mut soft = SoftAssertions::new();
            let site = uk();
            let verdict = verify_currency_mark_or_code(&mut soft, CurrencyCheck::for_site(&site, "gbp 120"));
            assert_eq!(
                verdict,
                CurrencyVerdict::Passed("mark:'£'FAIL, code:'GBP'OK".into())
            );
        }

        #[test]
        fn test_mismatch_is_soft_failure() {
            let mut soft = SoftAssertions::new();
            let site = uk();
            let verdict = verify_currency_mark_or_code(&mut soft, CurrencyCheck::for_site(&site, "€120"));
            assert_eq!(
                verdict,
                CurrencyVerdict::Failed("mark:'£'FAIL, code:'GBP'FAIL".into())
            );
            assert_eq!(soft.failure_count(), 1);
            assert!(soft.failures()[0].message.contains("€120"));
        }

        #[test]
        fn test_excluded_site_skipped() {
            let mut soft = SoftAssertions::new();
            let mut site = SiteConfig::new("VN").with_currency_code("VND");
            site.currency_check_excluded = vec!["vn".into()];
            let verdict = verify_currency_mark_or_code(&mut soft, CurrencyCheck::for_site(&site, "120.000"));
            assert_eq!(verdict, CurrencyVerdict::Skipped(SkipReason::ExcludedSite));
            assert_eq!(soft.assertion_count(), 0);
        }

        #[test]
        fn test_missing_inputs_skipped() {
            let mut soft = SoftAssertions::new();
            let site = uk();
            let verdict = verify_currency_mark_or_code(&mut soft, CurrencyCheck::for_site(&site, "  "));
            assert_eq!(verdict, CurrencyVerdict::Skipped(SkipReason::MissingInput));

            let bare = SiteConfig::new("XX");
            let verdict = verify_currency_mark_or_code(&mut soft, CurrencyCheck::for_site(&bare, "£1"));
            assert_eq!(verdict, CurrencyVerdict::Skipped(SkipReason::NoCurrencyConfigured));
            assert_eq!(soft.assertion_count(), 0);
        }
    }

    mod content_tests {
        use super::*;

        #[test]
        fn test_not_null() {
            let mut soft = SoftAssertions::new();
            assert!(verify_not_null(&mut soft, Some("£1")));
            assert!(!verify_not_null(&mut soft, Some(" ")));
            assert!(!verify_not_null(&mut soft, None));
            assert_eq!(soft.failure_count(), 2);
        }

        #[test]
        fn test_numeric() {
            let mut soft = SoftAssertions::new();
            assert!(verify_numeric_value(&mut soft, Some("£1")));
            assert!(!verify_numeric_value(&mut soft, Some("free")));
            assert!(verify_numeric_value(&mut soft, None));
            assert_eq!(soft.failure_count(), 1);
        }
    }
}
