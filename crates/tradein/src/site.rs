//! Site/locale configuration injected into the flow.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::config;
use crate::result::TradeInResult;

/// Site code used when none is configured
pub const DEFAULT_SITE_CODE: &str = "DEFAULT";

/// What the engine needs to know about the storefront under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    /// Site code, upper-cased on construction
    #[serde(default = "default_site_code")]
    pub site_code: String,
    /// Currency mark shown before amounts (e.g. "£")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_mark: Option<String>,
    /// ISO currency code (e.g. "GBP")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    /// Sites that render amounts without any currency indicator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub currency_check_excluded: Vec<String>,
}

fn default_site_code() -> String {
    DEFAULT_SITE_CODE.to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_CODE)
    }
}

impl SiteConfig {
    /// Create a config for a site
    #[must_use]
    pub fn new(site_code: impl AsRef<str>) -> Self {
        let code = site_code.as_ref().trim();
        Self {
            site_code: if code.is_empty() {
                default_site_code()
            } else {
                code.to_ascii_uppercase()
            },
            currency_mark: None,
            currency_code: None,
            currency_check_excluded: Vec::new(),
        }
    }

    /// Set the currency mark
    #[must_use]
    pub fn with_currency_mark(mut self, mark: impl Into<String>) -> Self {
        self.currency_mark = Some(mark.into());
        self
    }

    /// Set the currency code
    #[must_use]
    pub fn with_currency_code(mut self, code: impl Into<String>) -> Self {
        self.currency_code = Some(code.into());
        self
    }

    /// Load from a JSON or YAML file
    pub fn from_path(path: impl AsRef<Path>) -> TradeInResult<Self> {
        let loaded: Self = config::load(path)?;
        Ok(loaded.normalized())
    }

    /// Re-apply site code normalisation after deserialising
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            site_code: Self::new(&self.site_code).site_code,
            ..self
        }
    }

    /// Currency a discount string is expected to start with: the mark, else the code
    #[must_use]
    pub fn expected_currency(&self) -> Option<&str> {
        [&self.currency_mark, &self.currency_code]
            .into_iter()
            .filter_map(|c| c.as_deref().map(str::trim))
            .find(|c| !c.is_empty())
    }
}
