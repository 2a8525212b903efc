//! Convergence poller for variable-cardinality prompts.
//!
//! Condition questionnaires and consent checklists render 1 to N rows,
//! asynchronously, depending on the site. The poller re-observes the page on
//! every iteration: count the visible rows that are still unmet, act on the
//! first one, settle, repeat. It stops when nothing is unmet, when the deadline
//! passes, or when an action keeps failing. It never returns an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::driver::PageDriver;
use crate::locator::Locator;
use crate::retry::RetryPolicy;

/// Poll timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Give up after this long
    pub deadline: Duration,
    /// Pause after each successful action
    pub settle: Duration,
    /// Attempts per action
    pub retry: RetryPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            deadline: Duration::from_secs(30),
            settle: Duration::from_millis(300),
            retry: RetryPolicy::default(),
        }
    }
}

/// What to do with the first unmet row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollAction {
    /// Click the row itself
    ClickRow,
    /// Click the first match of this locator inside the row
    ClickWithin(Locator),
}

/// Outcome of a poll
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    /// Successful actions
    pub actions: u32,
    /// No unmet rows remained at the end
    pub converged: bool,
    /// An action exhausted its retries
    pub stopped_early: bool,
}

impl ConvergenceReport {
    /// Whether at least one action succeeded
    #[must_use]
    pub const fn acted(&self) -> bool {
        self.actions > 0
    }
}

/// Re-scan/re-act loop over a row locator
#[derive(Debug)]
pub struct ConvergencePoller<'a> {
    driver: &'a dyn PageDriver,
    clock: &'a dyn Clock,
    config: PollConfig,
}

impl<'a> ConvergencePoller<'a> {
    /// Create a poller
    #[must_use]
    pub fn new(driver: &'a dyn PageDriver, clock: &'a dyn Clock, config: PollConfig) -> Self {
        Self {
            driver,
            clock,
            config,
        }
    }

    /// Act on unmet rows until none remain or the deadline passes.
    ///
    /// `pending` must match only rows that still need action (typically a
    /// row locator with a `has_not` filter); hidden rows are ignored.
    pub async fn poll_until_converged(
        &self,
        pending: &Locator,
        action: &PollAction,
    ) -> ConvergenceReport {
        let pending = pending.clone().visible_only();
        let target = match action {
            PollAction::ClickRow => pending.clone(),
            PollAction::ClickWithin(inner) => inner.clone().within(&pending, 0),
        };
        let start = self.clock.now();
        let mut report = ConvergenceReport::default();

        loop {
            let unmet = match self.driver.count(&pending).await {
                Ok(n) => n,
                Err(err) => {
                    warn!(%err, rows = %pending.describe(), "could not scan rows");
                    report.stopped_early = true;
                    break;
                }
            };
            if unmet == 0 {
                report.converged = true;
                break;
            }
            if self.clock.now().saturating_sub(start) >= self.config.deadline {
                warn!(unmet, actions = report.actions, "deadline passed before convergence");
                break;
            }

            debug!(unmet, target = %target.describe(), "acting on first unmet row");
            let driver = self.driver;
            let target = &target;
            let outcome = self
                .config
                .retry
                .run(self.clock, move |_| async move {
                    driver.scroll_into_view(target, 0).await?;
                    driver.click(target, 0).await
                })
                .await;

            match outcome {
                Ok(()) => {
                    report.actions += 1;
                    self.clock.sleep(self.config.settle).await;
                }
                Err(err) => {
                    warn!(%err, actions = report.actions, "giving up on unmet row");
                    report.stopped_early = true;
                    break;
                }
            }
        }
        report
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::locator::Selector;
    use crate::mock::{ClickEffect, MockElement, MockPage};

    fn unmet_rows() -> Locator {
        Locator::new(".question").has_not(Selector::css("input:checked"))
    }

    fn answer() -> PollAction {
        PollAction::ClickWithin(Locator::new(".yes"))
    }

    async fn add_question(page: &MockPage, n: u32, answer: MockElement) {
        let row = format!("q{n}");
        page.add(MockElement::new(&row, [".question"])).await;
        page.add(MockElement::new(format!("q{n}-input"), ["input"]).child_of(&row))
            .await;
        page.add(answer.child_of(&row)).await;
    }

    #[tokio::test]
    async fn test_three_rows_converge() {
        let page = MockPage::new();
        for n in 1..=3 {
            let yes = MockElement::new(format!("q{n}-yes"), [".yes"])
                .on_click(ClickEffect::Check(format!("q{n}-input")));
            add_question(&page, n, yes).await;
        }
        let clock = FakeClock::new();
        let poller = ConvergencePoller::new(&page, &clock, PollConfig::default());

        let report = poller.poll_until_converged(&unmet_rows(), &answer()).await;

        assert!(report.acted());
        assert!(report.converged);
        assert_eq!(report.actions, 3);
        assert_eq!(page.count(&unmet_rows()).await.unwrap(), 0);
        assert_eq!(page.clicks().await, vec!["q1-yes", "q2-yes", "q3-yes"]);
        assert_eq!(clock.sleeps(), vec![300, 300, 300]);
    }

    #[tokio::test]
    async fn test_always_failing_action_stops_after_three_attempts() {
        let page = MockPage::new();
        add_question(
            &page,
            1,
            MockElement::new("q1-yes", [".yes"]).always_fail_click(),
        )
        .await;
        let clock = FakeClock::new();
        let poller = ConvergencePoller::new(&page, &clock, PollConfig::default());

        let report = poller.poll_until_converged(&unmet_rows(), &answer()).await;

        assert!(!report.acted());
        assert!(!report.converged);
        assert!(report.stopped_early);
        let failed = page
            .history()
            .await
            .iter()
            .filter(|h| h.starts_with("click-failed:"))
            .count();
        assert_eq!(failed, 3);
    }

    #[tokio::test]
    async fn test_nothing_to_do_is_converged_without_action() {
        let page = MockPage::new();
        let clock = FakeClock::new();
        let poller = ConvergencePoller::new(&page, &clock, PollConfig::default());
        let report = poller.poll_until_converged(&unmet_rows(), &answer()).await;
        assert!(report.converged);
        assert!(!report.acted());
    }

    #[tokio::test]
    async fn test_hidden_rows_are_ignored() {
        let page = MockPage::new();
        page.add(MockElement::new("ghost", [".question"]).hidden()).await;
        let clock = FakeClock::new();
        let poller = ConvergencePoller::new(&page, &clock, PollConfig::default());
        let report = poller.poll_until_converged(&unmet_rows(), &answer()).await;
        assert!(report.converged);
        assert!(page.history().await.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_bounds_a_row_that_never_converges() {
        // Clicking succeeds but never checks anything.
        let page = MockPage::new();
        add_question(&page, 1, MockElement::new("q1-yes", [".yes"])).await;
        let clock = FakeClock::new();
        let config = PollConfig {
            deadline: Duration::from_secs(3),
            ..PollConfig::default()
        };
        let poller = ConvergencePoller::new(&page, &clock, config);

        let report = poller.poll_until_converged(&unmet_rows(), &answer()).await;

        assert!(report.acted());
        assert!(!report.converged);
        assert!(!report.stopped_early);
        assert_eq!(report.actions, 10);
    }

    #[tokio::test]
    async fn test_click_row_action() {
        let page = MockPage::new();
        page.add(
            MockElement::new("tnc", [".tnc"]).on_click(ClickEffect::Hide("tnc".into())),
        )
        .await;
        let clock = FakeClock::new();
        let poller = ConvergencePoller::new(&page, &clock, PollConfig::default());
        let report = poller
            .poll_until_converged(&Locator::new(".tnc"), &PollAction::ClickRow)
            .await;
        assert_eq!(report.actions, 1);
        assert!(report.converged);
    }
}
