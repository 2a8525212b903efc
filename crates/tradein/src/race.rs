//! Readiness race over a family of candidate buttons.
//!
//! Locales render different subsets of "continue"/"apply" buttons under one
//! shared selector. Every candidate is awaited concurrently for "visible and
//! enabled"; the first to get there is clicked. A candidate timing out only
//! drops it from the race.

use std::time::Duration;

use futures::future::select_ok;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::result::{TradeInError, TradeInResult};
use crate::wait::{wait_for_enabled, wait_for_visible, WaitOptions};

/// Per-candidate readiness timeouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RaceConfig {
    /// How long a candidate may take to become visible
    pub visible_timeout: Duration,
    /// How long a candidate may take to become enabled
    pub enabled_timeout: Duration,
    /// Poll interval for both checks
    pub poll_interval: Duration,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            visible_timeout: Duration::from_secs(10),
            enabled_timeout: Duration::from_secs(15),
            poll_interval: Duration::from_millis(100),
        }
    }
}

impl RaceConfig {
    fn wait(&self, timeout: Duration) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout.as_millis() as u64)
            .with_poll_interval(self.poll_interval.as_millis() as u64)
    }
}

/// First-ready-wins button clicker
#[derive(Debug)]
pub struct ReadinessRace<'a> {
    driver: &'a dyn PageDriver,
    clock: &'a dyn Clock,
    config: RaceConfig,
}

impl<'a> ReadinessRace<'a> {
    /// Create a race
    #[must_use]
    pub fn new(driver: &'a dyn PageDriver, clock: &'a dyn Clock, config: RaceConfig) -> Self {
        Self {
            driver,
            clock,
            config,
        }
    }

    /// Click whichever match of `candidates` becomes ready first.
    ///
    /// Returns the index of the clicked candidate. Fails with
    /// [`TradeInError::NoButtonFound`] when nothing matches at all and with
    /// [`TradeInError::NoClickableButton`] when every candidate timed out.
    pub async fn click_first_ready(
        &self,
        candidates: &Locator,
        label: &str,
    ) -> TradeInResult<usize> {
        let total = self.driver.count(candidates).await?;
        if total == 0 {
            return Err(TradeInError::NoButtonFound {
                label: label.to_string(),
            });
        }
        debug!(label, total, "racing candidates");

        let visible = self.config.wait(self.config.visible_timeout);
        let enabled = self.config.wait(self.config.enabled_timeout);
        let (driver, clock) = (self.driver, self.clock);
        let racers = (0..total).map(|index| {
            Box::pin(async move {
                futures::try_join!(
                    wait_for_visible(driver, clock, candidates, index, visible),
                    wait_for_enabled(driver, clock, candidates, index, enabled),
                )?;
                Ok::<_, TradeInError>(index)
            })
        });

        let winner = match select_ok(racers).await {
            Ok((index, _)) => index,
            Err(last) => {
                debug!(label, %last, "no candidate became ready");
                return Err(TradeInError::NoClickableButton {
                    label: label.to_string(),
                });
            }
        };

        self.driver.click(candidates, winner).await?;
        info!(label, index = winner, "clicked ready candidate");
        Ok(winner)
    }
}
