//! Per-surface selector strategies.
//!
//! All DOM knowledge lives here. Each logical field maps to one or more CSS
//! fragments ORed together, because several storefront template generations
//! are live at once. Values interpolated into attribute selectors are escaped
//! and matched case-insensitively.

use std::fmt::Debug;
use std::sync::Arc;

use crate::locator::{attr_equals_ci, escape_css_value, Locator, Selector};
use crate::result::{TradeInError, TradeInResult};
use crate::steps::Surface;

/// Locators for every field the trade-in flow touches on one surface
pub trait SelectorStrategy: Send + Sync + Debug {
    /// Surface this strategy describes
    fn surface(&self) -> Surface;

    /// Device category tile for `value` (e.g. "phone")
    fn category(&self, value: &str) -> Locator;

    /// Dropdown box that offers `value`
    fn option_box(&self, value: &str) -> Locator;

    /// Leaf option for `value` inside an open dropdown
    fn option(&self, value: &str) -> Locator;

    /// Continue/apply button family raced after each step
    fn continue_button(&self) -> Locator;

    /// IMEI input
    fn imei_input(&self) -> Locator;

    /// Condition question row
    fn condition_row(&self) -> Locator;

    /// Answer control inside a condition row; the first match is the best answer
    fn condition_answer(&self) -> Locator;

    /// Marker present inside a row once it is answered
    fn answered_marker(&self) -> Selector {
        Selector::css("input:checked")
    }

    /// Terms checkbox that still needs ticking
    fn terms_checkbox(&self) -> Locator;

    /// Discount value candidates, in probe order
    fn discount_value(&self, sku: Option<&str>) -> TradeInResult<Vec<Locator>>;

    /// Condition rows not yet answered
    fn unanswered_rows(&self) -> Locator {
        self.condition_row().has_not(self.answered_marker())
    }
}

/// Pick the strategy for a surface
#[must_use]
pub fn for_surface(surface: Surface) -> Arc<dyn SelectorStrategy> {
    match surface {
        Surface::Configurator => Arc::new(ConfiguratorSelectors),
        Surface::Cart => Arc::new(CartSelectors),
    }
}

// =============================================================================
// CONFIGURATOR (BC)
// =============================================================================

/// Product configurator markup, every template generation
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfiguratorSelectors;

impl SelectorStrategy for ConfiguratorSelectors {
    fn surface(&self) -> Surface {
        Surface::Configurator
    }

    fn category(&self, value: &str) -> Locator {
        let input = format!("input{}", attr_equals_ci("value", value));
        Locator::any_of([
            format!(".trade-in-popup-v3__tradeIn-category-list:has({input})"),
            format!(".trade-in-popup__category-device-list:has({input})"),
        ])
    }

    fn option_box(&self, value: &str) -> Locator {
        let by_value = attr_equals_ci("value", value);
        let by_name = attr_equals_ci("data-name", value);
        Locator::any_of([
            format!(".trade-in-select ul#deviceType:has(a{by_value})"),
            format!(".trade-in-select:has(a{by_value})"),
            format!(".trade-in-select:has(a{by_name})"),
        ])
    }

    fn option(&self, value: &str) -> Locator {
        let by_value = attr_equals_ci("value", value);
        Locator::any_of([
            format!(".trade-in-select ul#deviceType a{by_value}"),
            format!(".trade-in-select a{by_value}"),
            format!(".trade-in-select a{}", attr_equals_ci("data-name", value)),
            format!(".trade-in-radio__input.js-category{}", attr_equals_ci("id", value)),
        ])
    }

    fn continue_button(&self) -> Locator {
        Locator::any_of([
            r#".trade-in-popup-v3__btn-wrap button[an-la*="next" i]"#,
            r#"[an-la*="apply trade in"]"#,
        ])
    }

    fn imei_input(&self) -> Locator {
        Locator::any_of([
            "input#common-trade-imei",
            r#"[name="tradeIn.IMEI_FORM"] input"#,
            ".trade-in-summary__imei-input input",
            r#".trade-in-popup__imei-form input[id="trade-imei"]"#,
            ".bc-exchange-popup__imei-form .text-field-v2__input#text-field-3",
        ])
    }

    fn condition_row(&self) -> Locator {
        Locator::any_of([
            ".trade-in-popup-v3__summary-accept-list",
            ".trade-in-popup-v3__condition-list-item",
            ".trade-in-popup__summary-accept-list",
            ".trade-in-popup__condition-list-item",
            ".question-wrapper",
            ".condition-radio",
            ".assessment-question-container",
            ".trade-in-question-button-container",
            ".bc-trade-in-popup__condition-list-item",
        ])
    }

    fn condition_answer(&self) -> Locator {
        Locator::any_of([
            ".mat-mdc-radio-touch-target",
            ".radio-v2__label",
            ".condition-radio__button.condition-radio__yes",
            ".mdc-checkbox__native-control",
            ".checkbox-v2__label-box-wrap",
            ".trade-in-popup-v3__condition-list-item-check",
            ".trade-in-popup__condition-list-item-check",
            ".trade-in-popup__condition-list-item-check-label",
            ".opt-button",
            r#"[name="question"] label"#,
            ".trade-in-question-button",
        ])
    }

    fn terms_checkbox(&self) -> Locator {
        Locator::new(".trade-in-popup-v3__terms input[required]:not(:checked) + label svg")
    }

    fn discount_value(&self, _sku: Option<&str>) -> TradeInResult<Vec<Locator>> {
        Ok([
            ".s-trade-total .s-trade-price",
            r#".hubble-product__offers[id="trade-in"] .s-cta-price"#,
            ".s-tradein-summary .s-apply-discount",
            ".wearable-option__tradein-list--price",
            r#"strong[class*="tradein-list"]"#,
        ]
        .into_iter()
        .map(Locator::new)
        .collect())
    }
}

// =============================================================================
// CART
// =============================================================================

/// Shopping cart markup (Angular Material)
#[derive(Debug, Clone, Copy, Default)]
pub struct CartSelectors;

impl SelectorStrategy for CartSelectors {
    fn surface(&self) -> Surface {
        Surface::Cart
    }

    fn category(&self, value: &str) -> Locator {
        Locator::new(attr_equals_ci(
            "data-an-la",
            &format!("trade-in:select device:{value}"),
        ))
    }

    // The cart renders one unfilled dropdown at a time, so the box does not
    // depend on the value.
    fn option_box(&self, _value: &str) -> Locator {
        Locator::any_of([
            r#"mat-form-field:has(mat-select[aria-expanded="false"][data-an-la*="null"])"#,
            r#"mat-form-field:has(input#modelSelection[aria-expanded="false"][data-an-la*="null"])"#,
        ])
    }

    fn option(&self, value: &str) -> Locator {
        Locator::new("mat-option span.tradein-text").with_text(value)
    }

    fn continue_button(&self) -> Locator {
        Locator::new(r#".button.primary.pill-btn.pill-btn--black[data-an-la^="trade-in:"]"#)
    }

    fn imei_input(&self) -> Locator {
        Locator::new(r#"input[formcontrolname="imeiFormControl"]"#)
    }

    fn condition_row(&self) -> Locator {
        Locator::new(".condition-radio")
    }

    fn condition_answer(&self) -> Locator {
        Locator::new(".condition-radio__button.condition-radio__yes")
    }

    fn terms_checkbox(&self) -> Locator {
        Locator::new(r#"[formcontrolname="tnc"] .mdc-checkbox:has(input:not(:checked))"#)
    }

    fn discount_value(&self, sku: Option<&str>) -> TradeInResult<Vec<Locator>> {
        let sku = sku.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
            TradeInError::config("cart trade-in discount lookup needs the cart line SKU")
        })?;
        Ok(vec![Locator::new(format!(
            r#".cart-item[data-modelcode="{}"] [data-modelcode="TRADE-IN"]:not(.service-item__trade-up) .trade-in__item-discount"#,
            escape_css_value(sku)
        ))])
    }
}
