//! Trade-in step interpreter.
//!
//! [`TradeInFlow`] resolves the step list for its site and surface, then runs
//! each step in order. After every step that is not exempt, the continue/apply
//! button family is raced to advance the screen. Any failure aborts the
//! remaining steps and is reported with the step and site attached.
//!
//! All surface differences come from the injected [`SelectorStrategy`]; all
//! timing comes from [`FlowOptions`] and the injected [`Clock`].

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::clock::{Clock, TokioClock};
use crate::config;
use crate::data::TradeInData;
use crate::discount::{self, CurrencyCheck, CurrencyVerdict, ParsedTradeInValue};
use crate::driver::PageDriver;
use crate::poller::{ConvergencePoller, ConvergenceReport, PollAction, PollConfig};
use crate::race::{RaceConfig, ReadinessRace};
use crate::result::{TradeInError, TradeInResult};
use crate::retry::RetryPolicy;
use crate::selectors::{self, SelectorStrategy};
use crate::site::SiteConfig;
use crate::soft::SoftAssertions;
use crate::steps::{StepConfig, StepKind, Surface};
use crate::wait::{probe_visible, wait_for_visible, WaitOptions};

/// Label used for the continue/apply button family in logs and errors
pub const CONTINUE_LABEL: &str = "Continue and Apply";

// =============================================================================
// OPTIONS
// =============================================================================

/// Timing and retry knobs for a flow. Every field has a default, so partial
/// option files are valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowOptions {
    /// Bounded wait for category, dropdown box and option
    pub element_timeout_ms: u64,
    /// Pause before each option selection
    pub option_settle_ms: u64,
    /// Pause after each step
    pub step_settle_ms: u64,
    /// Condition questionnaire deadline
    pub condition_deadline_ms: u64,
    /// Pause after each condition answer
    pub condition_settle_ms: u64,
    /// Terms checkbox deadline
    pub terms_deadline_ms: u64,
    /// Pause after each terms click
    pub terms_settle_ms: u64,
    /// Attempts per poller action
    pub action_attempts: u32,
    /// Linear backoff unit between poller attempts
    pub action_backoff_ms: u64,
    /// Continue button visibility timeout
    pub button_visible_timeout_ms: u64,
    /// Continue button enabled timeout
    pub button_enabled_timeout_ms: u64,
    /// Poll interval for every bounded wait
    pub poll_interval_ms: u64,
    /// How long to look for the IMEI field before skipping it
    pub imei_probe_timeout_ms: u64,
    /// Pause before probing each discount locator
    pub discount_probe_settle_ms: u64,
    /// Visibility timeout per discount locator
    pub discount_visible_timeout_ms: u64,
    /// Steps not followed by a button race
    pub advance_exempt: Vec<StepKind>,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            element_timeout_ms: 5_000,
            option_settle_ms: 1_000,
            step_settle_ms: 2_000,
            condition_deadline_ms: 30_000,
            condition_settle_ms: 300,
            terms_deadline_ms: 30_000,
            terms_settle_ms: 100,
            action_attempts: 3,
            action_backoff_ms: 200,
            button_visible_timeout_ms: 10_000,
            button_enabled_timeout_ms: 15_000,
            poll_interval_ms: 100,
            imei_probe_timeout_ms: 5_000,
            discount_probe_settle_ms: 3_000,
            discount_visible_timeout_ms: 10_000,
            advance_exempt: Vec::new(),
        }
    }
}

impl FlowOptions {
    /// Load from a JSON or YAML file
    pub fn from_path(path: impl AsRef<Path>) -> TradeInResult<Self> {
        config::load(path)
    }

    fn wait(&self, timeout_ms: u64) -> WaitOptions {
        WaitOptions::new()
            .with_timeout(timeout_ms)
            .with_poll_interval(self.poll_interval_ms)
    }

    /// Wait used for category, dropdown box and option lookups
    #[must_use]
    pub fn element_wait(&self) -> WaitOptions {
        self.wait(self.element_timeout_ms)
    }

    /// Retry policy for poller actions
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.action_attempts, self.action_backoff_ms)
    }

    /// Poll timing for the condition questionnaire
    #[must_use]
    pub fn condition_poll(&self) -> PollConfig {
        PollConfig {
            deadline: Duration::from_millis(self.condition_deadline_ms),
            settle: Duration::from_millis(self.condition_settle_ms),
            retry: self.retry_policy(),
        }
    }

    /// Poll timing for terms checkboxes
    #[must_use]
    pub fn terms_poll(&self) -> PollConfig {
        PollConfig {
            deadline: Duration::from_millis(self.terms_deadline_ms),
            settle: Duration::from_millis(self.terms_settle_ms),
            retry: self.retry_policy(),
        }
    }

    /// Readiness race timing
    #[must_use]
    pub fn race_config(&self) -> RaceConfig {
        RaceConfig {
            visible_timeout: Duration::from_millis(self.button_visible_timeout_ms),
            enabled_timeout: Duration::from_millis(self.button_enabled_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

// =============================================================================
// DROPDOWN STATE
// =============================================================================

/// State of a dropdown box, read from its `class` and `aria-expanded`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownState {
    /// Already carries a selection; nothing to do
    Selected,
    /// Expanded; the option can be clicked directly
    Open,
    /// Needs a click to expand
    Closed,
}

impl DropdownState {
    /// Derive the state. `is-selected` wins; the box counts as open only when
    /// it has `is-opened` and does not report `aria-expanded="false"`.
    #[must_use]
    pub fn from_attributes(class: Option<&str>, aria_expanded: Option<&str>) -> Self {
        let has = |token: &str| {
            class.is_some_and(|c| c.split_whitespace().any(|t| t == token))
        };
        if has("is-selected") {
            Self::Selected
        } else if has("is-opened") && aria_expanded.map(str::trim) != Some("false") {
            Self::Open
        } else {
            Self::Closed
        }
    }
}

// =============================================================================
// FLOW
// =============================================================================

/// Trade-in workflow for one site on one surface
#[derive(Debug, Clone)]
pub struct TradeInFlow {
    driver: Arc<dyn PageDriver>,
    clock: Arc<dyn Clock>,
    selectors: Arc<dyn SelectorStrategy>,
    site: SiteConfig,
    steps: Arc<StepConfig>,
    options: FlowOptions,
}

impl TradeInFlow {
    /// Create a flow with real time, the surface's selectors and default options
    #[must_use]
    pub fn new(
        driver: Arc<dyn PageDriver>,
        site: SiteConfig,
        surface: Surface,
        steps: Arc<StepConfig>,
    ) -> Self {
        Self {
            driver,
            clock: Arc::new(TokioClock::new()),
            selectors: selectors::for_surface(surface),
            site,
            steps,
            options: FlowOptions::default(),
        }
    }

    /// Use a different clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use a different selector strategy (its surface decides the step list)
    #[must_use]
    pub fn with_selectors(mut self, selectors: Arc<dyn SelectorStrategy>) -> Self {
        self.selectors = selectors;
        self
    }

    /// Use different options
    #[must_use]
    pub fn with_options(mut self, options: FlowOptions) -> Self {
        self.options = options;
        self
    }

    /// Surface this flow runs on
    #[must_use]
    pub fn surface(&self) -> Surface {
        self.selectors.surface()
    }

    /// Site this flow runs for
    #[must_use]
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Options in effect
    #[must_use]
    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Steps this flow would run, all mapped to handlers
    pub fn resolve_steps(&self) -> TradeInResult<Vec<StepKind>> {
        self.steps.resolve_steps(&self.site.site_code, self.surface())
    }

    /// Run the resolved steps for `data`.
    ///
    /// Configuration problems (missing or unknown steps) fail before any step
    /// runs. A step failure, or a failed button race after it, aborts the
    /// rest and comes back as [`TradeInError::StepFailed`].
    pub async fn process(&self, data: &TradeInData) -> TradeInResult<()> {
        let span = info_span!(
            "trade_in",
            site = %self.site.site_code,
            surface = %self.surface()
        );
        async {
            let steps = self.resolve_steps()?;
            info!(?steps, "starting trade-in");
            for step in steps {
                self.run_and_advance(step, data)
                    .instrument(info_span!("step", step = %step))
                    .await
                    .map_err(|err| TradeInError::StepFailed {
                        step: step.to_string(),
                        site: self.site.site_code.clone(),
                        source: Box::new(err),
                    })?;
            }
            info!("all trade-in steps completed");
            Ok::<(), TradeInError>(())
        }
        .instrument(span)
        .await
    }

    async fn run_and_advance(&self, step: StepKind, data: &TradeInData) -> TradeInResult<()> {
        self.run_step(step, data).await?;
        if self.options.advance_exempt.contains(&step) {
            debug!("step exempt from advancing");
        } else {
            self.click_continue().await?;
        }
        self.clock()
            .sleep(Duration::from_millis(self.options.step_settle_ms))
            .await;
        info!("step completed");
        Ok(())
    }

    async fn run_step(&self, step: StepKind, data: &TradeInData) -> TradeInResult<()> {
        match step {
            StepKind::SkipGuide => {
                debug!("no guide to skip");
                Ok(())
            }
            StepKind::SelectDevice => self.select_device(data).await,
            StepKind::Condition => {
                if self.select_best_conditions().await.acted() {
                    self.accept_terms().await;
                }
                Ok(())
            }
            StepKind::Imei => {
                self.enter_imei(data).await?;
                self.accept_terms().await;
                Ok(())
            }
            StepKind::Apply => Ok(()),
        }
    }

    /// Category first, then every non-blank device field in cascade order
    pub async fn select_device(&self, data: &TradeInData) -> TradeInResult<()> {
        if let Some(category) = data.category_value() {
            self.select_category(category).await?;
        }
        for (field, value) in data.cascade() {
            debug!(%field, value, "selecting device option");
            self.select_option(value).await?;
        }
        Ok(())
    }

    /// Wait for the category tile and click it
    pub async fn select_category(&self, value: &str) -> TradeInResult<()> {
        let tile = self.selectors.category(value);
        let result = async {
            wait_for_visible(self.driver(), self.clock(), &tile, 0, self.options.element_wait())
                .await?;
            self.driver().click(&tile, 0).await
        }
        .await;
        result.map_err(|err| {
            warn!(value, %err, "category selection failed");
            TradeInError::CategorySelection {
                value: value.to_string(),
                source: Box::new(err),
            }
        })
    }

    /// Open the dropdown offering `value` (unless already open or selected)
    /// and click the option
    pub async fn select_option(&self, value: &str) -> TradeInResult<()> {
        self.try_select_option(value).await.map_err(|err| {
            warn!(value, %err, "option selection failed");
            TradeInError::OptionSelection {
                value: value.to_string(),
                source: Box::new(err),
            }
        })
    }

    async fn try_select_option(&self, value: &str) -> TradeInResult<()> {
        let (driver, clock) = (self.driver(), self.clock());
        let wait = self.options.element_wait();
        clock
            .sleep(Duration::from_millis(self.options.option_settle_ms))
            .await;

        let dropdown = self.selectors.option_box(value);
        wait_for_visible(driver, clock, &dropdown, 0, wait).await?;
        let class = driver.attribute(&dropdown, 0, "class").await?;
        let expanded = driver.attribute(&dropdown, 0, "aria-expanded").await?;
        match DropdownState::from_attributes(class.as_deref(), expanded.as_deref()) {
            DropdownState::Selected => {
                debug!(value, "option already selected");
                return Ok(());
            }
            DropdownState::Open => debug!(value, "dropdown already open"),
            DropdownState::Closed => driver.click(&dropdown, 0).await?,
        }

        let option = self.selectors.option(value);
        wait_for_visible(driver, clock, &option, 0, wait).await?;
        driver.click(&option, 0).await?;
        info!(value, "option selected");
        Ok(())
    }

    /// Answer every visible unanswered condition question with its first option
    pub async fn select_best_conditions(&self) -> ConvergenceReport {
        let poller =
            ConvergencePoller::new(self.driver(), self.clock(), self.options.condition_poll());
        let report = poller
            .poll_until_converged(
                &self.selectors.unanswered_rows(),
                &PollAction::ClickWithin(self.selectors.condition_answer()),
            )
            .await;
        info!(answers = report.actions, converged = report.converged, "conditions done");
        report
    }

    /// Tick every visible unticked terms checkbox
    pub async fn accept_terms(&self) -> ConvergenceReport {
        let poller =
            ConvergencePoller::new(self.driver(), self.clock(), self.options.terms_poll());
        let report = poller
            .poll_until_converged(&self.selectors.terms_checkbox(), &PollAction::ClickRow)
            .await;
        debug!(ticked = report.actions, "terms done");
        report
    }

    /// Fill and submit the IMEI when one is supplied and the field shows up.
    ///
    /// Returns whether it was entered. A field that never appears is not an
    /// error; a fill or submit failure after it appeared is.
    pub async fn enter_imei(&self, data: &TradeInData) -> TradeInResult<bool> {
        let Some(imei) = data.imei_value() else {
            debug!("no IMEI supplied");
            return Ok(false);
        };
        let input = self.selectors.imei_input();
        let wait = self.options.wait(self.options.imei_probe_timeout_ms);
        if !probe_visible(self.driver(), self.clock(), &input, wait).await {
            info!("IMEI field not shown, skipping");
            return Ok(false);
        }
        let result = async {
            self.driver().fill(&input, 0, imei).await?;
            self.driver().press(&input, 0, "Enter").await
        }
        .await;
        result.map_err(|err| TradeInError::ImeiEntry {
            source: Box::new(err),
        })?;
        Ok(true)
    }

    /// Race the continue/apply buttons and click the first ready one
    pub async fn click_continue(&self) -> TradeInResult<usize> {
        ReadinessRace::new(self.driver(), self.clock(), self.options.race_config())
            .click_first_ready(&self.selectors.continue_button(), CONTINUE_LABEL)
            .await
    }

    /// Displayed trade-in credit, or an empty string when none is shown.
    ///
    /// The cart needs the SKU of the cart line the trade-in is attached to.
    pub async fn trade_in_discount_text(&self, sku: Option<&str>) -> TradeInResult<String> {
        let wait = self.options.wait(self.options.discount_visible_timeout_ms);
        for locator in self.selectors.discount_value(sku)? {
            self.clock()
                .sleep(Duration::from_millis(self.options.discount_probe_settle_ms))
                .await;
            if !probe_visible(self.driver(), self.clock(), &locator, wait).await {
                debug!(locator = %locator.describe(), "discount locator not visible");
                continue;
            }
            match self.driver().text_content(&locator, 0).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    info!(locator = %locator.describe(), "trade-in value found");
                    return Ok(text.trim().to_string());
                }
                Ok(_) => debug!(locator = %locator.describe(), "discount element has no text"),
                Err(err) => debug!(locator = %locator.describe(), %err, "discount locator failed"),
            }
        }
        info!(site = %self.site.site_code, "no trade-in discount value found");
        Ok(String::new())
    }

    /// Read the displayed credit and parse it against the site's currency
    pub async fn get_and_parse_trade_in_value(
        &self,
        sku: Option<&str>,
    ) -> TradeInResult<ParsedTradeInValue> {
        let text = self.trade_in_discount_text(sku).await?;
        discount::parse_trade_in_value(&text, self.site.expected_currency().unwrap_or_default())
    }

    /// Soft-check `text` against the site's currency mark/code
    pub fn verify_currency_mark_or_code(
        &self,
        soft: &mut SoftAssertions,
        text: &str,
    ) -> CurrencyVerdict {
        discount::verify_currency_mark_or_code(soft, CurrencyCheck::for_site(&self.site, text))
    }
}
