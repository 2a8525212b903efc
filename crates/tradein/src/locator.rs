//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a description of a set of elements, not a handle. Every
//! query re-resolves it against the live page, which is what lets the
//! convergence poller and readiness race observe fresh DOM state each time.
//!
//! Locators compose three ways:
//!
//! - **Alternatives**: [`Selector::AnyOf`] ORs several markup generations
//! - **Exclusion**: [`Locator::has_not`] drops elements containing a match
//! - **Scoping**: [`Locator::within`] searches inside the n-th match of a parent

use serde_json::Value;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// Alternative CSS selectors, any of which may match
    AnyOf(Vec<String>),
    /// CSS selector whose matches must contain the given text (case-insensitive)
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a selector from alternative markup variants
    #[must_use]
    pub fn any_of<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(alternatives.into_iter().map(Into::into).collect())
    }

    /// Individual CSS fragments this selector is made of
    #[must_use]
    pub fn alternatives(&self) -> Vec<&str> {
        match self {
            Self::Css(s) | Self::CssWithText { css: s, .. } => vec![s.as_str()],
            Self::AnyOf(list) => list.iter().map(String::as_str).collect(),
        }
    }

    /// Text filter, if any
    #[must_use]
    pub fn text_filter(&self) -> Option<&str> {
        match self {
            Self::CssWithText { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Render as a single CSS selector list
    #[must_use]
    pub fn to_css(&self) -> String {
        self.alternatives().join(", ")
    }
}

/// Escape a value for interpolation into a double-quoted CSS attribute value.
#[must_use]
pub fn escape_css_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\A "),
            '\r' => {}
            other => out.push(other),
        }
    }
    out
}

/// Build `[attr="value" i]`, the case-insensitive attribute-equality fragment.
#[must_use]
pub fn attr_equals_ci(attr: &str, value: &str) -> String {
    format!("[{attr}=\"{}\" i]", escape_css_value(value))
}

/// Render a string as a JavaScript string literal
pub(crate) fn js_string(s: &str) -> String {
    Value::String(s.to_owned()).to_string()
}

/// Element locator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    selector: Selector,
    has_not: Option<Selector>,
    scope: Option<(Box<Locator>, usize)>,
    visible_only: bool,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a Selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            selector,
            has_not: None,
            scope: None,
            visible_only: false,
        }
    }

    /// Create a locator matching any of several markup variants
    #[must_use]
    pub fn any_of<I, S>(alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_selector(Selector::any_of(alternatives))
    }

    /// Filter to elements containing the given text
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        let css = self.selector.to_css();
        Self {
            selector: Selector::CssWithText {
                css,
                text: text.into(),
            },
            ..self
        }
    }

    /// Drop elements that contain a match of `inner`
    #[must_use]
    pub fn has_not(mut self, inner: Selector) -> Self {
        self.has_not = Some(inner);
        self
    }

    /// Search only inside the `index`-th match of `parent`
    #[must_use]
    pub fn within(mut self, parent: &Locator, index: usize) -> Self {
        self.scope = Some((Box::new(parent.clone()), index));
        self
    }

    /// Keep only elements that are currently rendered
    #[must_use]
    pub fn visible_only(mut self) -> Self {
        self.visible_only = true;
        self
    }

    /// Get the selector
    #[must_use]
    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    /// Get the exclusion filter
    #[must_use]
    pub fn exclusion(&self) -> Option<&Selector> {
        self.has_not.as_ref()
    }

    /// Get the parent scope
    #[must_use]
    pub fn scope(&self) -> Option<(&Locator, usize)> {
        self.scope.as_ref().map(|(p, i)| (p.as_ref(), *i))
    }

    /// Whether hidden elements are filtered out
    #[must_use]
    pub fn is_visible_only(&self) -> bool {
        self.visible_only
    }

    /// Short human-readable description for logs and errors
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = self.selector.to_css();
        if let Some(text) = self.selector.text_filter() {
            out.push_str(&format!(" ~ {text:?}"));
        }
        if let Some((parent, index)) = self.scope() {
            out = format!("{} [{index}] >> {out}", parent.describe());
        }
        out
    }

    /// JavaScript expression evaluating to the array of matched elements,
    /// in document order.
    #[must_use]
    pub fn to_elements_js(&self) -> String {
        let roots = match self.scope() {
            Some((parent, index)) => format!(
                "(() => {{ const p = {}; return p[{index}] ? [p[{index}]] : []; }})()",
                parent.to_elements_js()
            ),
            None => "[document]".to_string(),
        };
        let mut js = format!(
            "(() => {{ const found = []; for (const root of {roots}) {{ for (const el of root.querySelectorAll({css})) {{ if (!found.includes(el)) found.push(el); }} }} let els = found;",
            css = js_string(&self.selector.to_css()),
        );
        if let Some(text) = self.selector.text_filter() {
            js.push_str(&format!(
                " els = els.filter(el => (el.textContent || '').toLowerCase().includes({}));",
                js_string(&text.to_lowercase())
            ));
        }
        if let Some(inner) = &self.has_not {
            js.push_str(&format!(
                " els = els.filter(el => !el.querySelector({}));",
                js_string(&inner.to_css())
            ));
        }
        if self.visible_only {
            js.push_str(&format!(" els = els.filter({VISIBLE_JS});"));
        }
        js.push_str(" return els; })()");
        js
    }
}

/// JS predicate used for visibility checks, shared with the CDP driver.
pub(crate) const VISIBLE_JS: &str = "el => { const s = getComputedStyle(el); const r = el.getBoundingClientRect(); return s.visibility !== 'hidden' && s.display !== 'none' && r.width > 0 && r.height > 0; }";

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_any_of_joins_alternatives() {
            let selector = Selector::any_of([".a", ".b"]);
            assert_eq!(selector.to_css(), ".a, .b");
            assert_eq!(selector.alternatives(), vec![".a", ".b"]);
        }

        #[test]
        fn test_text_filter() {
            let locator = Locator::new("mat-option span").with_text("Galaxy");
            assert_eq!(locator.selector().text_filter(), Some("Galaxy"));
            assert_eq!(locator.selector().to_css(), "mat-option span");
        }
    }

    mod escape_tests {
        use super::*;

        #[test]
        fn test_plain_value_unchanged() {
            assert_eq!(escape_css_value("Galaxy S24"), "Galaxy S24");
        }

        #[test]
        fn test_quotes_and_backslashes_escaped() {
            assert_eq!(escape_css_value(r#"12" \ screen"#), r#"12\" \\ screen"#);
        }

        #[test]
        fn test_attr_equals_is_case_insensitive() {
            assert_eq!(attr_equals_ci("value", "phone"), r#"[value="phone" i]"#);
        }
    }

    mod js_tests {
        use super::*;

        #[test]
        fn test_plain_locator_queries_document() {
            let js = Locator::new("button.next").to_elements_js();
            assert!(js.contains("[document]"));
            assert!(js.contains(r#"querySelectorAll("button.next")"#));
            assert!(!js.contains("getComputedStyle"));
        }

        #[test]
        fn test_filters_rendered() {
            let js = Locator::new(".row")
                .has_not(Selector::css("input:checked"))
                .visible_only()
                .to_elements_js();
            assert!(js.contains(r#"!el.querySelector("input:checked")"#));
            assert!(js.contains("getComputedStyle"));
        }

        #[test]
        fn test_text_is_lowercased_and_quoted() {
            let js = Locator::new("span").with_text("Say \"Hi\"").to_elements_js();
            assert!(js.contains(r#"includes("say \"hi\"")"#));
        }

        #[test]
        fn test_scope_nests_parent_query() {
            let parent = Locator::new(".row");
            let js = Locator::new(".answer").within(&parent, 2).to_elements_js();
            assert!(js.contains(r#"querySelectorAll(".row")"#));
            assert!(js.contains("p[2]"));
        }

        #[test]
        fn test_describe_includes_scope() {
            let parent = Locator::new(".row");
            let locator = Locator::new(".answer").within(&parent, 0);
            assert_eq!(locator.describe(), ".row [0] >> .answer");
        }
    }
}
