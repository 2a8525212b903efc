//! Bounded waits on element state.
//!
//! Every wait polls through the injected [`Clock`] and gives up at its
//! timeout. Nothing here blocks indefinitely.

use std::time::Duration;

use tracing::debug;

use crate::clock::Clock;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::{TradeInError, TradeInResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for element waits (5 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 5_000;

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Outcome of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of state checks made
    pub checks: u32,
    /// Description of what was waited for
    pub waited_for: String,
}

/// Element state a wait can target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementState {
    /// Rendered on the page
    Visible,
    /// Not disabled
    Enabled,
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Visible => write!(f, "visible"),
            Self::Enabled => write!(f, "enabled"),
        }
    }
}

// =============================================================================
// WAITS
// =============================================================================

/// Wait until the `index`-th match of `locator` reaches `state`.
///
/// Driver errors while polling count as "not yet"; the wait only fails with
/// [`TradeInError::ElementTimeout`].
pub async fn wait_for_state(
    driver: &dyn PageDriver,
    clock: &dyn Clock,
    locator: &Locator,
    index: usize,
    state: ElementState,
    options: WaitOptions,
) -> TradeInResult<WaitResult> {
    let waited_for = format!("{} [{index}] to be {state}", locator.describe());
    let start = clock.now();
    let timeout = options.timeout();
    let mut checks = 0u32;

    loop {
        checks += 1;
        let ready = match state {
            ElementState::Visible => driver.is_visible(locator, index).await,
            ElementState::Enabled => driver.is_enabled(locator, index).await,
        };
        match ready {
            Ok(true) => {
                return Ok(WaitResult {
                    elapsed: clock.now().saturating_sub(start),
                    checks,
                    waited_for,
                })
            }
            Ok(false) => {}
            Err(err) => debug!(target: "tradein::wait", %err, "state check failed"),
        }

        let elapsed = clock.now().saturating_sub(start);
        if elapsed >= timeout {
            return Err(TradeInError::ElementTimeout {
                what: waited_for,
                ms: options.timeout_ms,
            });
        }
        clock
            .sleep(options.poll_interval().min(timeout - elapsed))
            .await;
    }
}

/// Wait until the `index`-th match is visible
pub async fn wait_for_visible(
    driver: &dyn PageDriver,
    clock: &dyn Clock,
    locator: &Locator,
    index: usize,
    options: WaitOptions,
) -> TradeInResult<WaitResult> {
    wait_for_state(driver, clock, locator, index, ElementState::Visible, options).await
}

/// Wait until the `index`-th match is enabled
pub async fn wait_for_enabled(
    driver: &dyn PageDriver,
    clock: &dyn Clock,
    locator: &Locator,
    index: usize,
    options: WaitOptions,
) -> TradeInResult<WaitResult> {
    wait_for_state(driver, clock, locator, index, ElementState::Enabled, options).await
}

/// Like [`wait_for_visible`] on the first match, but a timeout is `false`.
pub async fn probe_visible(
    driver: &dyn PageDriver,
    clock: &dyn Clock,
    locator: &Locator,
    options: WaitOptions,
) -> bool {
    wait_for_visible(driver, clock, locator, 0, options)
        .await
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::mock::{MockElement, MockPage};

    #[test]
    fn test_wait_options_builder() {
        let opts = WaitOptions::new().with_timeout(10_000).with_poll_interval(250);
        assert_eq!(opts.timeout(), Duration::from_secs(10));
        assert_eq!(opts.poll_interval(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_visible_immediately() {
        let page = MockPage::new();
        page.add(MockElement::new("box", [".box"])).await;
        let clock = FakeClock::new();
        let result = wait_for_visible(&page, &clock, &Locator::new(".box"), 0, WaitOptions::new())
            .await
            .unwrap();
        assert_eq!(result.checks, 1);
        assert_eq!(clock.now_ms(), 0);
    }

    #[tokio::test]
    async fn test_visible_after_polls() {
        let page = MockPage::new();
        page.add(MockElement::new("box", [".box"]).visible_after(3)).await;
        let clock = FakeClock::new();
        let result = wait_for_visible(&page, &clock, &Locator::new(".box"), 0, WaitOptions::new())
            .await
            .unwrap();
        assert_eq!(result.checks, 4);
        assert_eq!(clock.now_ms(), 300);
    }

    #[tokio::test]
    async fn test_timeout_on_missing_element() {
        let page = MockPage::new();
        let clock = FakeClock::new();
        let opts = WaitOptions::new().with_timeout(1_000);
        let err = wait_for_enabled(&page, &clock, &Locator::new(".nope"), 0, opts)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeInError::ElementTimeout { ms: 1_000, .. }));
        assert_eq!(clock.now_ms(), 1_000);
    }

    #[tokio::test]
    async fn test_probe_visible_swallows_timeout() {
        let page = MockPage::new();
        page.add(MockElement::new("hidden", [".h"]).hidden()).await;
        let clock = FakeClock::new();
        let opts = WaitOptions::new().with_timeout(500);
        assert!(!probe_visible(&page, &clock, &Locator::new(".h"), opts).await);
    }
}
