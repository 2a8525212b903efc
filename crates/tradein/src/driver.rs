//! Page driver seam.
//!
//! The engine never talks to a browser directly. Everything it does to a page
//! goes through [`PageDriver`], addressed by a [`Locator`] plus the index of
//! the match. Implementations:
//!
//! - `CdpDriver` - Chromium over CDP (feature `browser`)
//! - `MockPage` - in-memory scripted page for tests

use async_trait::async_trait;

use crate::locator::Locator;
use crate::result::TradeInResult;

/// Abstract page driver.
///
/// Query methods report a missing element as `0`/`false`/`None`. Action
/// methods report it as a driver error.
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Number of elements currently matching the locator
    async fn count(&self, locator: &Locator) -> TradeInResult<usize>;

    /// Whether the `index`-th match is rendered
    async fn is_visible(&self, locator: &Locator, index: usize) -> TradeInResult<bool>;

    /// Whether the `index`-th match is enabled
    async fn is_enabled(&self, locator: &Locator, index: usize) -> TradeInResult<bool>;

    /// Attribute value of the `index`-th match
    async fn attribute(
        &self,
        locator: &Locator,
        index: usize,
        name: &str,
    ) -> TradeInResult<Option<String>>;

    /// Text content of the `index`-th match
    async fn text_content(&self, locator: &Locator, index: usize)
        -> TradeInResult<Option<String>>;

    /// Click the `index`-th match
    async fn click(&self, locator: &Locator, index: usize) -> TradeInResult<()>;

    /// Scroll the `index`-th match into view
    async fn scroll_into_view(&self, locator: &Locator, index: usize) -> TradeInResult<()>;

    /// Replace the value of the `index`-th match
    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> TradeInResult<()>;

    /// Press a key (e.g. "Enter") with the `index`-th match focused
    async fn press(&self, locator: &Locator, index: usize, key: &str) -> TradeInResult<()>;
}
