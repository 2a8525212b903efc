//! Soft assertions.
//!
//! Collect advisory check failures (currency formatting, non-empty values)
//! without aborting the flow. The caller decides when to [`SoftAssertions::verify`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single recorded failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// Message describing the failure
    pub message: String,
    /// Index of this assertion in the sequence
    pub index: usize,
}

/// Soft assertions collector
///
/// ```
/// use tradein::soft::SoftAssertions;
///
/// let mut soft = SoftAssertions::new();
/// soft.assert_true(false, "currency mark shown");
/// soft.assert_true(true, "value present");
/// assert_eq!(soft.failure_count(), 1);
/// assert!(soft.verify().is_err());
/// ```
#[derive(Debug, Default)]
pub struct SoftAssertions {
    failures: Vec<AssertionFailure>,
    assertion_count: usize,
}

impl SoftAssertions {
    /// Create a new soft assertions collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Assert a condition is true; returns the condition
    pub fn assert_true(&mut self, condition: bool, message: &str) -> bool {
        self.assertion_count += 1;
        if !condition {
            self.record_failure(message.to_string());
        }
        condition
    }

    /// Record a custom failure
    pub fn fail(&mut self, message: impl Into<String>) {
        self.assertion_count += 1;
        self.record_failure(message.into());
    }

    fn record_failure(&mut self, message: String) {
        tracing::warn!(%message, "soft assertion failed");
        let index = self.assertion_count - 1;
        self.failures.push(AssertionFailure { message, index });
    }

    /// Get all failures
    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    /// Get the number of failures
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Get the total number of assertions checked
    #[must_use]
    pub const fn assertion_count(&self) -> usize {
        self.assertion_count
    }

    /// Check if all assertions passed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Verify all assertions passed, returning error if any failed
    pub fn verify(&self) -> Result<(), SoftAssertionError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(SoftAssertionError {
                failures: self.failures.iter().map(|f| f.message.clone()).collect(),
            })
        }
    }

    /// Get a summary of the assertions
    #[must_use]
    pub fn summary(&self) -> AssertionSummary {
        AssertionSummary {
            total: self.assertion_count,
            passed: self.assertion_count - self.failures.len(),
            failed: self.failures.len(),
        }
    }
}

/// Summary of assertion results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionSummary {
    /// Total assertions checked
    pub total: usize,
    /// Assertions that passed
    pub passed: usize,
    /// Assertions that failed
    pub failed: usize,
}

/// Error type for soft assertion failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftAssertionError {
    /// All failure messages
    pub failures: Vec<String>,
}

impl fmt::Display for SoftAssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} soft assertion(s) failed:", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            writeln!(f, "  {}. {failure}", i + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for SoftAssertionError {}
