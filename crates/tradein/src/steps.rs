//! Step configuration and resolution.
//!
//! A step configuration maps upper-cased site codes to optional `BC` and
//! `CART` step lists, plus a mandatory `default` entry. Resolution is a pure
//! lookup with a per-surface fallback to `default`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::{self, ConfigFormat};
use crate::result::{TradeInError, TradeInResult};

const BUILTIN_STEP_CONFIG: &str = include_str!("../config/step_config.json");

const DEFAULT_KEY: &str = "default";

/// Host page the trade-in flow is launched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Surface {
    /// Product configurator page
    #[serde(rename = "BC")]
    Configurator,
    /// Shopping cart page
    #[serde(rename = "CART")]
    Cart,
}

impl Surface {
    /// All surfaces
    pub const ALL: [Self; 2] = [Self::Configurator, Self::Cart];

    /// Key used in step configuration files
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Configurator => "BC",
            Self::Cart => "CART",
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Surface {
    type Err = TradeInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BC" | "CONFIGURATOR" => Ok(Self::Configurator),
            "CART" => Ok(Self::Cart),
            _ => Err(TradeInError::UnknownSurface {
                name: s.to_string(),
            }),
        }
    }
}

/// A named unit of trade-in interaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepKind {
    /// Placeholder that never fails
    SkipGuide,
    /// Category then cascading device options
    SelectDevice,
    /// Condition questionnaire, then terms
    Condition,
    /// IMEI entry, then terms
    Imei,
    /// Named slot for the final button race
    Apply,
}

impl StepKind {
    /// All step kinds
    pub const ALL: [Self; 5] = [
        Self::SkipGuide,
        Self::SelectDevice,
        Self::Condition,
        Self::Imei,
        Self::Apply,
    ];

    /// Name as written in step configuration
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SkipGuide => "skipGuide",
            Self::SelectDevice => "selectDevice",
            Self::Condition => "condition",
            Self::Imei => "imei",
            Self::Apply => "apply",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepKind {
    type Err = TradeInError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| TradeInError::UnknownStep {
                name: s.to_string(),
            })
    }
}

/// Step lists for one site
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSteps {
    /// Configurator steps
    #[serde(rename = "BC", default, skip_serializing_if = "Option::is_none")]
    pub configurator: Option<Vec<String>>,
    /// Cart steps
    #[serde(rename = "CART", default, skip_serializing_if = "Option::is_none")]
    pub cart: Option<Vec<String>>,
}

impl SiteSteps {
    /// Steps for a surface, if configured
    #[must_use]
    pub fn for_surface(&self, surface: Surface) -> Option<&[String]> {
        match surface {
            Surface::Configurator => self.configurator.as_deref(),
            Surface::Cart => self.cart.as_deref(),
        }
    }
}

/// Per-site step configuration with a mandatory default
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, SiteSteps>",
    into = "BTreeMap<String, SiteSteps>"
)]
pub struct StepConfig {
    sites: BTreeMap<String, SiteSteps>,
    default: SiteSteps,
}

impl TryFrom<BTreeMap<String, SiteSteps>> for StepConfig {
    type Error = TradeInError;

    fn try_from(raw: BTreeMap<String, SiteSteps>) -> Result<Self, Self::Error> {
        let mut sites = BTreeMap::new();
        let mut default = None;
        for (key, steps) in raw {
            if key.eq_ignore_ascii_case(DEFAULT_KEY) {
                default = Some(steps);
                continue;
            }
            let code = key.trim().to_ascii_uppercase();
            if sites.insert(code.clone(), steps).is_some() {
                return Err(TradeInError::config(format!(
                    "site {code} is configured more than once"
                )));
            }
        }
        let default = default.ok_or_else(|| {
            TradeInError::config("step configuration has no 'default' entry")
        })?;
        Ok(Self { sites, default })
    }
}

impl From<StepConfig> for BTreeMap<String, SiteSteps> {
    fn from(config: StepConfig) -> Self {
        let mut map = config.sites;
        map.insert(DEFAULT_KEY.to_string(), config.default);
        map
    }
}

impl StepConfig {
    /// Create from explicit parts
    #[must_use]
    pub fn new(default: SiteSteps) -> Self {
        Self {
            sites: BTreeMap::new(),
            default,
        }
    }

    /// Add or replace a site override
    #[must_use]
    pub fn with_site(mut self, site: &str, steps: SiteSteps) -> Self {
        self.sites.insert(site.trim().to_ascii_uppercase(), steps);
        self
    }

    /// The configuration shipped with the library
    pub fn builtin() -> TradeInResult<Self> {
        Self::from_json(BUILTIN_STEP_CONFIG)
    }

    /// Parse JSON
    pub fn from_json(text: &str) -> TradeInResult<Self> {
        Self::parse(text, ConfigFormat::Json)
    }

    /// Parse YAML
    pub fn from_yaml(text: &str) -> TradeInResult<Self> {
        Self::parse(text, ConfigFormat::Yaml)
    }

    /// Load from a `.json` / `.yaml` / `.yml` file
    pub fn from_path(path: impl AsRef<Path>) -> TradeInResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text, ConfigFormat::from_path(path))
    }

    fn parse(text: &str, format: ConfigFormat) -> TradeInResult<Self> {
        config::parse(text, format).map_err(|err| match err {
            TradeInError::Json(_) | TradeInError::Yaml(_) => {
                TradeInError::config(format!("malformed step configuration: {err}"))
            }
            other => other,
        })
    }

    /// Site codes with an explicit entry
    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// Explicit entry for a site, if any
    #[must_use]
    pub fn site(&self, site: &str) -> Option<&SiteSteps> {
        self.sites.get(&site.trim().to_ascii_uppercase())
    }

    /// The fallback entry
    #[must_use]
    pub fn default_steps(&self) -> &SiteSteps {
        &self.default
    }

    /// Ordered step names for a site and surface.
    ///
    /// Falls back to `default` for that surface only when the site has no
    /// list of its own.
    pub fn resolve_step_names(&self, site: &str, surface: Surface) -> TradeInResult<Vec<String>> {
        let code = site.trim().to_ascii_uppercase();
        let steps = self
            .sites
            .get(&code)
            .and_then(|s| s.for_surface(surface))
            .or_else(|| self.default.for_surface(surface))
            .ok_or_else(|| {
                TradeInError::config(format!(
                    "no {surface} steps configured for site {code} and no default"
                ))
            })?;
        if steps.is_empty() {
            return Err(TradeInError::config(format!(
                "empty {surface} step list for site {code}"
            )));
        }
        Ok(steps.to_vec())
    }

    /// Like [`Self::resolve_step_names`], with every name mapped to a handler
    /// before anything runs.
    pub fn resolve_steps(&self, site: &str, surface: Surface) -> TradeInResult<Vec<StepKind>> {
        self.resolve_step_names(site, surface)?
            .iter()
            .map(|name| name.parse())
            .collect()
    }

    /// Check every list in the configuration: non-empty, known step names.
    pub fn validate(&self) -> TradeInResult<()> {
        let entries = self
            .sites
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .chain(std::iter::once((DEFAULT_KEY, &self.default)));
        for (site, steps) in entries {
            for surface in Surface::ALL {
                let Some(list) = steps.for_surface(surface) else {
                    continue;
                };
                if list.is_empty() {
                    return Err(TradeInError::config(format!(
                        "empty {surface} step list for site {site}"
                    )));
                }
                for name in list {
                    name.parse::<StepKind>().map_err(|err| {
                        TradeInError::config(format!("site {site} {surface}: {err}"))
                    })?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "default": { "BC": ["selectDevice", "apply"], "CART": ["selectDevice", "condition", "apply"] },
        "uk": { "BC": ["skipGuide", "selectDevice", "condition", "imei", "apply"] },
        "DE": { "BC": [] },
        "XX": { "CART": ["selectDevice", "teleport"] }
    }"#;

    fn sample() -> StepConfig {
        StepConfig::from_json(SAMPLE).unwrap()
    }

    mod surface_tests {
        use super::*;

        #[test]
        fn test_parse_surface_aliases() {
            assert_eq!("bc".parse::<Surface>().unwrap(), Surface::Configurator);
            assert_eq!("Configurator".parse::<Surface>().unwrap(), Surface::Configurator);
            assert_eq!("cart".parse::<Surface>().unwrap(), Surface::Cart);
            assert!(matches!(
                "checkout".parse::<Surface>(),
                Err(TradeInError::UnknownSurface { .. })
            ));
        }

        #[test]
        fn test_surface_serializes_as_code() {
            assert_eq!(serde_json::to_string(&Surface::Cart).unwrap(), "\"CART\"");
            assert_eq!(Surface::Configurator.to_string(), "BC");
        }
    }

    mod step_kind_tests {
        use super::*;

        #[test]
        fn test_names_round_trip() {
            for kind in StepKind::ALL {
                assert_eq!(kind.name().parse::<StepKind>().unwrap(), kind);
            }
        }

        #[test]
        fn test_unknown_step_is_error() {
            let err = "abcd".parse::<StepKind>().unwrap_err();
            assert!(matches!(err, TradeInError::UnknownStep { ref name } if name == "abcd"));
        }

        #[test]
        fn test_step_names_are_case_sensitive() {
            assert!("SelectDevice".parse::<StepKind>().is_err());
        }
    }

    mod resolve_tests {
        use super::*;

        #[test]
        fn test_unknown_site_uses_default() {
            let config = sample();
            assert_eq!(
                config.resolve_step_names("ZZ", Surface::Cart).unwrap(),
                vec!["selectDevice", "condition", "apply"]
            );
        }

        #[test]
        fn test_site_code_is_case_normalized() {
            let config = sample();
            let lower = config.resolve_step_names("uk", Surface::Configurator).unwrap();
            let upper = config.resolve_step_names("UK", Surface::Configurator).unwrap();
            assert_eq!(lower, upper);
            assert_eq!(lower[0], "skipGuide");
        }

        #[test]
        fn test_missing_surface_falls_back_for_that_surface_only() {
            let config = sample();
            assert_eq!(config.resolve_step_names("UK", Surface::Cart).unwrap().len(), 3);
            assert_eq!(
                config.resolve_step_names("UK", Surface::Configurator).unwrap().len(),
                5
            );
        }

        #[test]
        fn test_empty_list_is_config_error() {
            let err = sample()
                .resolve_step_names("DE", Surface::Configurator)
                .unwrap_err();
            assert!(matches!(err, TradeInError::Config { .. }));
        }

        #[test]
        fn test_unknown_step_fails_before_running() {
            let err = sample().resolve_steps("XX", Surface::Cart).unwrap_err();
            assert!(matches!(err, TradeInError::UnknownStep { .. }));
        }

        #[test]
        fn test_missing_default_surface_is_config_error() {
            let config = StepConfig::new(SiteSteps {
                configurator: Some(vec!["apply".into()]),
                cart: None,
            });
            let err = config.resolve_step_names("UK", Surface::Cart).unwrap_err();
            assert!(err.to_string().contains("no CART steps"));
        }
    }

    mod load_tests {
        use super::*;
        use std::io::Write;

        #[test]
        fn test_missing_default_rejected() {
            let err = StepConfig::from_json(r#"{"UK": {"BC": ["apply"]}}"#).unwrap_err();
            assert!(matches!(err, TradeInError::Config { .. }));
            assert!(err.to_string().contains("default"));
        }

        #[test]
        fn test_non_array_steps_rejected() {
            let err =
                StepConfig::from_json(r#"{"default": {"BC": "selectDevice"}}"#).unwrap_err();
            assert!(matches!(err, TradeInError::Config { .. }));
        }

        #[test]
        fn test_duplicate_site_after_normalization_rejected() {
            let err = StepConfig::from_json(
                r#"{"default": {}, "uk": {"BC": ["apply"]}, "UK": {"BC": ["apply"]}}"#,
            )
            .unwrap_err();
            assert!(err.to_string().contains("more than once"));
        }

        #[test]
        fn test_yaml_file() {
            let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
            writeln!(
                file,
                "default:\n  BC: [selectDevice, apply]\nfr:\n  CART: [imei, apply]"
            )
            .unwrap();
            let config = StepConfig::from_path(file.path()).unwrap();
            assert_eq!(config.sites().collect::<Vec<_>>(), vec!["FR"]);
            assert_eq!(
                config.resolve_steps("fr", Surface::Cart).unwrap(),
                vec![StepKind::Imei, StepKind::Apply]
            );
        }

        #[test]
        fn test_builtin_is_valid() {
            let config = StepConfig::builtin().unwrap();
            config.validate().unwrap();
            for surface in Surface::ALL {
                assert!(!config.resolve_steps("ANY", surface).unwrap().is_empty());
            }
        }

        #[test]
        fn test_validate_reports_bad_site() {
            let err = sample().validate().unwrap_err();
            let msg = err.to_string();
            assert!(msg.contains("DE") || msg.contains("XX"));
        }

        #[test]
        fn test_serialize_keeps_default_key() {
            let json = serde_json::to_value(sample()).unwrap();
            assert!(json.get("default").is_some());
            assert!(json.get("UK").is_some());
        }
    }
}
