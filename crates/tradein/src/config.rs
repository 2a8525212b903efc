//! Configuration file loading.
//!
//! Step configuration, site configuration, flow options and trade-in fixtures
//! all load from JSON or YAML, picked by file extension.

use serde::de::DeserializeOwned;
use std::path::Path;

use crate::result::TradeInResult;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON (`.json`, and anything unrecognised)
    Json,
    /// YAML (`.yaml` / `.yml`)
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a path's extension
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }
}

/// Parse configuration text in the given format
pub fn parse<T: DeserializeOwned>(text: &str, format: ConfigFormat) -> TradeInResult<T> {
    Ok(match format {
        ConfigFormat::Json => serde_json::from_str(text)?,
        ConfigFormat::Yaml => serde_yaml_ng::from_str(text)?,
    })
}

/// Read and parse a configuration file
pub fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> TradeInResult<T> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    parse(&text, ConfigFormat::from_path(path))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Write;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.yaml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a")), ConfigFormat::Json);
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(file, "a: 1\nb: 2").unwrap();
        let map: BTreeMap<String, u32> = load(file.path()).unwrap();
        assert_eq!(map["b"], 2);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load::<BTreeMap<String, u32>>("/definitely/not/here.json").unwrap_err();
        assert_eq!(err.category(), crate::result::ErrorCategory::Io);
    }
}
