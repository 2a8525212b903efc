//! Result and error types for the trade-in engine.

use thiserror::Error;

/// Result type for trade-in operations
pub type TradeInResult<T> = Result<T, TradeInError>;

/// Broad class of a failure, used to decide whether it is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Fixture or configuration bug; never retried
    Configuration,
    /// Element not yet visible/enabled/clickable
    TransientUi,
    /// Malformed discount text or currency mismatch
    Validation,
    /// File system or serialization failure
    Io,
}

/// Errors that can occur while driving a trade-in flow
#[derive(Debug, Error)]
pub enum TradeInError {
    /// Configuration is missing or malformed
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Step name has no handler
    #[error("Unknown trade-in step '{name}'")]
    UnknownStep {
        /// Step name as written in the configuration
        name: String,
    },

    /// Surface identifier is not recognised
    #[error("Unknown surface '{name}' (expected BC or CART)")]
    UnknownSurface {
        /// Surface name as supplied
        name: String,
    },

    /// Underlying page driver failed
    #[error("Driver error: {message}")]
    Driver {
        /// Error message
        message: String,
    },

    /// Element did not reach the requested state in time
    #[error("Timed out after {ms}ms waiting for {what}")]
    ElementTimeout {
        /// What was being waited for
        what: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Readiness race found no candidate at all
    #[error("No button found for {label}")]
    NoButtonFound {
        /// Button family label
        label: String,
    },

    /// Readiness race had candidates but none became ready
    #[error("No clickable button found for {label}")]
    NoClickableButton {
        /// Button family label
        label: String,
    },

    /// Bounded retry gave up
    #[error("Gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made
        attempts: u32,
        /// Last failure
        #[source]
        source: Box<TradeInError>,
    },

    /// Cascading option could not be selected
    #[error("Failed to select option '{value}': {source}")]
    OptionSelection {
        /// Option value
        value: String,
        /// Underlying failure
        #[source]
        source: Box<TradeInError>,
    },

    /// Device category could not be selected
    #[error("Failed to select category '{value}': {source}")]
    CategorySelection {
        /// Category value
        value: String,
        /// Underlying failure
        #[source]
        source: Box<TradeInError>,
    },

    /// IMEI field was visible but could not be filled or submitted
    #[error("Failed to enter IMEI: {source}")]
    ImeiEntry {
        /// Underlying failure
        #[source]
        source: Box<TradeInError>,
    },

    /// A step (or the button race after it) failed
    #[error("Step '{step}' failed for site {site}: {source}")]
    StepFailed {
        /// Step name
        step: String,
        /// Site code
        site: String,
        /// Underlying failure
        #[source]
        source: Box<TradeInError>,
    },

    /// Discount text is blank
    #[error("Trade-in value text is empty: {text:?}")]
    EmptyValue {
        /// Raw text
        text: String,
    },

    /// Discount text does not match the currency-prefixed pattern
    #[error("Trade-in value {text:?} does not match currency {currency:?}")]
    ValueFormat {
        /// Raw text
        text: String,
        /// Expected currency mark or code
        currency: String,
    },

    /// Parsed amount is not a finite number
    #[error("Trade-in value {text:?} is not a finite number")]
    NonFiniteAmount {
        /// Raw text
        text: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TradeInError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        Self::Driver {
            message: message.into(),
        }
    }

    /// Classify the error. Wrappers report the class of what they wrap.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } | Self::UnknownStep { .. } | Self::UnknownSurface { .. } => {
                ErrorCategory::Configuration
            }
            Self::Driver { .. }
            | Self::ElementTimeout { .. }
            | Self::NoButtonFound { .. }
            | Self::NoClickableButton { .. } => ErrorCategory::TransientUi,
            Self::RetriesExhausted { source, .. }
            | Self::OptionSelection { source, .. }
            | Self::CategorySelection { source, .. }
            | Self::ImeiEntry { source }
            | Self::StepFailed { source, .. } => source.category(),
            Self::EmptyValue { .. } | Self::ValueFormat { .. } | Self::NonFiniteAmount { .. } => {
                ErrorCategory::Validation
            }
            Self::Io(_) | Self::Json(_) | Self::Yaml(_) => ErrorCategory::Io,
        }
    }

    /// Whether a bounded retry could plausibly succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::TransientUi
    }

    /// Innermost error after peeling off context wrappers
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::RetriesExhausted { source, .. }
            | Self::OptionSelection { source, .. }
            | Self::CategorySelection { source, .. }
            | Self::ImeiEntry { source }
            | Self::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_config_is_not_retryable() {
        let err = TradeInError::config("no default");
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("no default"));
    }

    #[test]
    fn test_wrapped_category_follows_source() {
        let err = TradeInError::StepFailed {
            step: "apply".into(),
            site: "UK".into(),
            source: Box::new(TradeInError::NoClickableButton {
                label: "continue".into(),
            }),
        };
        assert_eq!(err.category(), ErrorCategory::TransientUi);
        assert!(matches!(err.root(), TradeInError::NoClickableButton { .. }));
        let msg = err.to_string();
        assert!(msg.contains("apply"));
        assert!(msg.contains("UK"));
        assert!(msg.contains("No clickable button found"));
    }

    #[test]
    fn test_validation_errors_show_text() {
        let err = TradeInError::ValueFormat {
            text: "abc".into(),
            currency: "£".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
        assert!(err.to_string().contains("abc"));
    }
}
