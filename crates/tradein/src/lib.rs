//! Tradein: data-driven trade-in workflow engine for storefront UI tests
//!
//! Drives the "trade in your old device" dialog of a storefront through an
//! abstract page driver. Which steps run, and in what order, is configuration
//! keyed by site and surface (product configurator `BC` or shopping cart
//! `CART`). The engine copes with the parts of the UI that vary by locale:
//!
//! - condition questionnaires with any number of rows (convergence poller)
//! - several candidate continue/apply buttons (readiness race)
//! - several live markup generations (selector alternatives)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────────┐   ┌────────────┐
//! │ StepConfig   │──►│ TradeInFlow  │──►│ SelectorStrategy │──►│ PageDriver │
//! │ (site, BC/   │   │ (steps, race,│   │ (BC / CART DOM)  │   │ (CDP/mock) │
//! │  CART)       │   │  poller)     │   └──────────────────┘   └────────────┘
//! └──────────────┘   └──────┬───────┘
//!                           ▼
//!                  discount parsing + soft currency checks
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Chromium driver over CDP (feature `browser`) and browser launch settings
#[allow(clippy::module_name_repetitions)]
pub mod cdp;

/// Injected clock (real and virtual time)
pub mod clock;

/// JSON/YAML configuration file loading
pub mod config;

/// Trade-in intake data and device fixtures
#[allow(clippy::missing_errors_doc)]
pub mod data;

/// Discount value parsing and currency soft checks
#[allow(clippy::missing_errors_doc, clippy::cast_precision_loss)]
pub mod discount;

/// Page driver trait
pub mod driver;

/// Step interpreter
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn
)]
pub mod flow;

/// Element locators
#[allow(clippy::must_use_candidate, clippy::missing_const_for_fn)]
pub mod locator;

/// Tracing subscriber setup
#[allow(clippy::missing_errors_doc)]
pub mod logging;

/// Scripted in-memory page for tests
#[allow(
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::struct_excessive_bools
)]
pub mod mock;

/// Convergence poller
pub mod poller;

/// Readiness race
pub mod race;

/// Error types
pub mod result;

/// Retry policy
pub mod retry;

/// Per-surface selector strategies
pub mod selectors;

/// Site configuration
#[allow(clippy::missing_errors_doc)]
pub mod site;

/// Soft assertions
pub mod soft;

/// Step configuration and resolution
#[allow(clippy::missing_errors_doc)]
pub mod steps;

/// Bounded element waits
#[allow(clippy::missing_errors_doc)]
pub mod wait;

#[cfg(feature = "browser")]
pub use cdp::CdpDriver;
pub use cdp::BrowserConfig;
pub use clock::{Clock, FakeClock, TokioClock};
pub use data::{DeviceField, DeviceFixtures, DeviceKind, FixtureSet, TradeInData, TradeInDevice};
pub use discount::{
    parse_trade_in_value, verify_currency_mark_or_code, verify_not_null, verify_numeric_value,
    CurrencyCheck, CurrencyVerdict, ParsedTradeInValue, SkipReason,
};
pub use driver::PageDriver;
pub use flow::{DropdownState, FlowOptions, TradeInFlow};
pub use locator::{Locator, Selector};
pub use logging::{init_tracing, LogFormat};
pub use poller::{ConvergencePoller, ConvergenceReport, PollAction, PollConfig};
pub use race::{RaceConfig, ReadinessRace};
pub use result::{ErrorCategory, TradeInError, TradeInResult};
pub use retry::RetryPolicy;
pub use selectors::{CartSelectors, ConfiguratorSelectors, SelectorStrategy};
pub use site::SiteConfig;
pub use soft::{AssertionFailure, AssertionSummary, SoftAssertionError, SoftAssertions};
pub use steps::{SiteSteps, StepConfig, StepKind, Surface};
pub use wait::{ElementState, WaitOptions, WaitResult};
