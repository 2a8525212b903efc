//! In-memory scripted page for exercising the engine without a browser.
//!
//! Elements carry a set of *tags*: the exact selector fragments they answer
//! to. A locator matches an element when one of its alternatives is one of
//! the element's tags. A trailing `:checked` on a fragment additionally
//! requires the element to be checked.
//!
//! ```
//! use tradein::mock::{ClickEffect, MockElement, MockPage};
//!
//! # tokio_test_block(async {
//! let page = MockPage::new();
//! page.add(MockElement::new("row", [".row"])).await;
//! page.add(
//!     MockElement::new("yes", [".answer"])
//!         .child_of("row")
//!         .on_click(ClickEffect::Check("yes-input".into())),
//! )
//! .await;
//! page.add(MockElement::new("yes-input", ["input"]).child_of("row")).await;
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f);
//! # }
//! ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::driver::PageDriver;
use crate::locator::{Locator, Selector};
use crate::result::{TradeInError, TradeInResult};

/// Side effect applied when an element is clicked successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickEffect {
    /// Mark the named element checked
    Check(String),
    /// Make the named element visible
    Show(String),
    /// Hide the named element
    Hide(String),
    /// Enable the named element
    Enable(String),
    /// Detach the named element from the page
    Remove(String),
    /// Set an attribute on the named element
    SetAttribute {
        /// Element name
        target: String,
        /// Attribute name
        name: String,
        /// Attribute value
        value: String,
    },
}

/// A scripted element
#[derive(Debug, Clone)]
pub struct MockElement {
    name: String,
    tags: Vec<String>,
    text: String,
    value: String,
    attributes: BTreeMap<String, String>,
    parent: Option<String>,
    visible: bool,
    enabled: bool,
    checked: bool,
    pending_visible_checks: u32,
    pending_enabled_checks: u32,
    failing_clicks: u32,
    always_fail_click: bool,
    effects: Vec<ClickEffect>,
}

impl MockElement {
    /// Create a visible, enabled element answering to `tags`
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            tags: tags.into_iter().map(Into::into).collect(),
            text: String::new(),
            value: String::new(),
            attributes: BTreeMap::new(),
            parent: None,
            visible: true,
            enabled: true,
            checked: false,
            pending_visible_checks: 0,
            pending_enabled_checks: 0,
            failing_clicks: 0,
            always_fail_click: false,
            effects: Vec::new(),
        }
    }

    /// Set text content
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Nest under the named element
    #[must_use]
    pub fn child_of(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Start hidden
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Start checked
    #[must_use]
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Start disabled; only a click effect can enable it
    #[must_use]
    pub fn never_enabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Report not visible for the first `checks` visibility checks
    #[must_use]
    pub fn visible_after(mut self, checks: u32) -> Self {
        self.pending_visible_checks = checks;
        self
    }

    /// Report disabled for the first `checks` enabled checks
    #[must_use]
    pub fn enabled_after(mut self, checks: u32) -> Self {
        self.pending_enabled_checks = checks;
        self
    }

    /// Fail the first `count` clicks
    #[must_use]
    pub fn fail_clicks(mut self, count: u32) -> Self {
        self.failing_clicks = count;
        self
    }

    /// Fail every click
    #[must_use]
    pub fn always_fail_click(mut self) -> Self {
        self.always_fail_click = true;
        self
    }

    /// Apply `effect` after every successful click
    #[must_use]
    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.effects.push(effect);
        self
    }

    fn answers_to(&self, fragment: &str) -> bool {
        match fragment.strip_suffix(":checked") {
            Some(base) => self.checked && self.tags.iter().any(|t| t == base),
            None => self.tags.iter().any(|t| t == fragment),
        }
    }
}

#[derive(Debug, Default)]
struct Dom {
    elements: Vec<MockElement>,
    history: Vec<String>,
}

impl Dom {
    fn position(&self, name: &str) -> Option<usize> {
        self.elements.iter().position(|e| e.name == name)
    }

    fn is_descendant(&self, idx: usize, ancestor: usize) -> bool {
        let mut current = self.elements[idx].parent.as_deref();
        while let Some(name) = current {
            match self.position(name) {
                Some(p) if p == ancestor => return true,
                Some(p) => current = self.elements[p].parent.as_deref(),
                None => return false,
            }
        }
        false
    }

    fn matches(&self, idx: usize, selector: &Selector) -> bool {
        let el = &self.elements[idx];
        selector.alternatives().iter().any(|f| el.answers_to(f))
            && selector
                .text_filter()
                .map_or(true, |t| el.text.to_lowercase().contains(&t.to_lowercase()))
    }

    fn resolve(&self, locator: &Locator) -> Vec<usize> {
        let root = match locator.scope() {
            Some((parent, index)) => match self.resolve(parent).get(index) {
                Some(&r) => Some(r),
                None => return Vec::new(),
            },
            None => None,
        };
        (0..self.elements.len())
            .filter(|&i| root.map_or(true, |r| self.is_descendant(i, r)))
            .filter(|&i| self.matches(i, locator.selector()))
            .filter(|&i| {
                locator.exclusion().map_or(true, |inner| {
                    !(0..self.elements.len())
                        .any(|j| self.is_descendant(j, i) && self.matches(j, inner))
                })
            })
            .filter(|&i| !locator.is_visible_only() || self.elements[i].visible)
            .collect()
    }

    fn target(&self, locator: &Locator, index: usize) -> TradeInResult<usize> {
        self.resolve(locator).get(index).copied().ok_or_else(|| {
            TradeInError::driver(format!("no element {} [{index}]", locator.describe()))
        })
    }

    fn actionable(&self, locator: &Locator, index: usize) -> TradeInResult<usize> {
        let idx = self.target(locator, index)?;
        if self.elements[idx].visible {
            Ok(idx)
        } else {
            Err(TradeInError::driver(format!(
                "element '{}' is not visible",
                self.elements[idx].name
            )))
        }
    }

    fn apply(&mut self, effect: &ClickEffect) {
        let target = match effect {
            ClickEffect::Check(t)
            | ClickEffect::Show(t)
            | ClickEffect::Hide(t)
            | ClickEffect::Enable(t)
            | ClickEffect::Remove(t)
            | ClickEffect::SetAttribute { target: t, .. } => t,
        };
        let Some(idx) = self.position(target) else {
            return;
        };
        if matches!(effect, ClickEffect::Remove(_)) {
            self.elements.remove(idx);
            return;
        }
        let el = &mut self.elements[idx];
        match effect {
            ClickEffect::Check(_) => el.checked = true,
            ClickEffect::Show(_) => el.visible = true,
            ClickEffect::Hide(_) => el.visible = false,
            ClickEffect::Enable(_) => {
                el.enabled = true;
                el.pending_enabled_checks = 0;
            }
            ClickEffect::SetAttribute { name, value, .. } => {
                el.attributes.insert(name.clone(), value.clone());
            }
            ClickEffect::Remove(_) => {}
        }
    }
}

/// Scripted page implementing [`PageDriver`]
#[derive(Debug, Default)]
pub struct MockPage {
    dom: Mutex<Dom>,
}

impl MockPage {
    /// Create an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element (document order is insertion order)
    pub async fn add(&self, element: MockElement) {
        self.dom.lock().await.elements.push(element);
    }

    /// Every successful action, e.g. `click:brand-box`, `fill:imei:123`
    pub async fn history(&self) -> Vec<String> {
        self.dom.lock().await.history.clone()
    }

    /// Whether `entry` appears in the history
    pub async fn was_called(&self, entry: &str) -> bool {
        self.dom.lock().await.history.iter().any(|h| h == entry)
    }

    /// Names of successfully clicked elements, in order
    pub async fn clicks(&self) -> Vec<String> {
        self.dom
            .lock()
            .await
            .history
            .iter()
            .filter_map(|h| h.strip_prefix("click:").map(str::to_string))
            .collect()
    }

    /// Checked state of the named element
    pub async fn is_checked(&self, name: &str) -> bool {
        let dom = self.dom.lock().await;
        dom.position(name).is_some_and(|i| dom.elements[i].checked)
    }

    /// Current value of the named input
    pub async fn value_of(&self, name: &str) -> Option<String> {
        let dom = self.dom.lock().await;
        dom.position(name).map(|i| dom.elements[i].value.clone())
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn count(&self, locator: &Locator) -> TradeInResult<usize> {
        Ok(self.dom.lock().await.resolve(locator).len())
    }

    async fn is_visible(&self, locator: &Locator, index: usize) -> TradeInResult<bool> {
        let mut dom = self.dom.lock().await;
        let Some(&idx) = dom.resolve(locator).get(index) else {
            return Ok(false);
        };
        let el = &mut dom.elements[idx];
        if !el.visible {
            return Ok(false);
        }
        if el.pending_visible_checks > 0 {
            el.pending_visible_checks -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn is_enabled(&self, locator: &Locator, index: usize) -> TradeInResult<bool> {
        let mut dom = self.dom.lock().await;
        let Some(&idx) = dom.resolve(locator).get(index) else {
            return Ok(false);
        };
        let el = &mut dom.elements[idx];
        if !el.enabled {
            return Ok(false);
        }
        if el.pending_enabled_checks > 0 {
            el.pending_enabled_checks -= 1;
            return Ok(false);
        }
        Ok(true)
    }

    async fn attribute(
        &self,
        locator: &Locator,
        index: usize,
        name: &str,
    ) -> TradeInResult<Option<String>> {
        let dom = self.dom.lock().await;
        Ok(dom
            .resolve(locator)
            .get(index)
            .and_then(|&i| dom.elements[i].attributes.get(name).cloned()))
    }

    async fn text_content(
        &self,
        locator: &Locator,
        index: usize,
    ) -> TradeInResult<Option<String>> {
        let dom = self.dom.lock().await;
        Ok(dom
            .resolve(locator)
            .get(index)
            .map(|&i| dom.elements[i].text.clone()))
    }

    async fn click(&self, locator: &Locator, index: usize) -> TradeInResult<()> {
        let mut dom = self.dom.lock().await;
        let idx = dom.actionable(locator, index)?;
        let el = &mut dom.elements[idx];
        let name = el.name.clone();
        if el.always_fail_click || el.failing_clicks > 0 {
            el.failing_clicks = el.failing_clicks.saturating_sub(1);
            dom.history.push(format!("click-failed:{name}"));
            return Err(TradeInError::driver(format!(
                "click on '{name}' was intercepted"
            )));
        }
        let effects = el.effects.clone();
        dom.history.push(format!("click:{name}"));
        for effect in &effects {
            dom.apply(effect);
        }
        Ok(())
    }

    async fn scroll_into_view(&self, locator: &Locator, index: usize) -> TradeInResult<()> {
        let mut dom = self.dom.lock().await;
        let idx = dom.target(locator, index)?;
        let entry = format!("scroll:{}", dom.elements[idx].name);
        dom.history.push(entry);
        Ok(())
    }

    async fn fill(&self, locator: &Locator, index: usize, text: &str) -> TradeInResult<()> {
        let mut dom = self.dom.lock().await;
        let idx = dom.actionable(locator, index)?;
        if !dom.elements[idx].enabled {
            return Err(TradeInError::driver(format!(
                "element '{}' is disabled",
                dom.elements[idx].name
            )));
        }
        dom.elements[idx].value = text.to_string();
        let entry = format!("fill:{}:{text}", dom.elements[idx].name);
        dom.history.push(entry);
        Ok(())
    }

    async fn press(&self, locator: &Locator, index: usize, key: &str) -> TradeInResult<()> {
        let mut dom = self.dom.lock().await;
        let idx = dom.actionable(locator, index)?;
        let entry = format!("press:{}:{key}", dom.elements[idx].name);
        dom.history.push(entry);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn rows_page() -> MockPage {
        let page = MockPage::new();
        page.add(MockElement::new("row-1", [".row"])).await;
        page.add(MockElement::new("in-1", ["input"]).child_of("row-1").checked())
            .await;
        page.add(MockElement::new("row-2", [".row"])).await;
        page.add(MockElement::new("in-2", ["input"]).child_of("row-2")).await;
        page.add(MockElement::new("row-3", [".row"]).hidden()).await;
        page
    }

    mod matching_tests {
        use super::*;

        #[tokio::test]
        async fn test_any_of_matches_either_tag() {
            let page = MockPage::new();
            page.add(MockElement::new("a", [".old"])).await;
            page.add(MockElement::new("b", [".new"])).await;
            let locator = Locator::any_of([".old", ".new"]);
            assert_eq!(page.count(&locator).await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_has_not_checked_descendant() {
            let page = rows_page().await;
            let unmet = Locator::new(".row").has_not(Selector::css("input:checked"));
            assert_eq!(page.count(&unmet).await.unwrap(), 2);
            assert_eq!(page.count(&unmet.visible_only()).await.unwrap(), 1);
        }

        #[tokio::test]
        async fn test_scope_limits_to_descendants() {
            let page = rows_page().await;
            let inputs = Locator::new("input").within(&Locator::new(".row"), 1);
            assert_eq!(page.count(&inputs).await.unwrap(), 1);
            page.fill(&inputs, 0, "x").await.unwrap();
            assert_eq!(page.value_of("in-2").await.as_deref(), Some("x"));
        }

        #[tokio::test]
        async fn test_text_filter_case_insensitive() {
            let page = MockPage::new();
            page.add(MockElement::new("s24", ["span"]).text("Galaxy S24 Ultra"))
                .await;
            let locator = Locator::new("span").with_text("galaxy s24");
            assert_eq!(page.count(&locator).await.unwrap(), 1);
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_applies_effects() {
            let page = MockPage::new();
            page.add(
                MockElement::new("box", [".box"])
                    .on_click(ClickEffect::Show("menu".into()))
                    .on_click(ClickEffect::SetAttribute {
                        target: "box".into(),
                        name: "class".into(),
                        value: "box is-opened".into(),
                    }),
            )
            .await;
            page.add(MockElement::new("menu", [".menu"]).hidden()).await;

            page.click(&Locator::new(".box"), 0).await.unwrap();
            assert!(page.is_visible(&Locator::new(".menu"), 0).await.unwrap());
            let class = page
                .attribute(&Locator::new(".box"), 0, "class")
                .await
                .unwrap();
            assert_eq!(class.as_deref(), Some("box is-opened"));
            assert_eq!(page.clicks().await, vec!["box"]);
        }

        #[tokio::test]
        async fn test_failing_clicks_recover() {
            let page = MockPage::new();
            page.add(MockElement::new("flaky", [".f"]).fail_clicks(1)).await;
            let locator = Locator::new(".f");
            assert!(page.click(&locator, 0).await.is_err());
            assert!(page.click(&locator, 0).await.is_ok());
            assert_eq!(page.history().await, vec!["click-failed:flaky", "click:flaky"]);
        }

        #[tokio::test]
        async fn test_hidden_element_not_clickable() {
            let page = MockPage::new();
            page.add(MockElement::new("h", [".h"]).hidden()).await;
            assert!(page.click(&Locator::new(".h"), 0).await.is_err());
        }

        #[tokio::test]
        async fn test_missing_element_queries_are_falsy() {
            let page = MockPage::new();
            let locator = Locator::new(".missing");
            assert!(!page.is_visible(&locator, 0).await.unwrap());
            assert!(!page.is_enabled(&locator, 0).await.unwrap());
            assert!(page.text_content(&locator, 0).await.unwrap().is_none());
            assert!(page.press(&locator, 0, "Enter").await.is_err());
        }
    }
}
