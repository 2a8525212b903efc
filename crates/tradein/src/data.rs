//! Trade-in intake data and per-site device fixtures.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::config;
use crate::result::{TradeInError, TradeInResult};

/// Cascading device fields, in the order they are applied after the category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceField {
    /// Postal code (some markets price by region)
    ZipCode,
    /// Manufacturer
    Brand,
    /// Model
    Model,
    /// Series
    Series,
    /// Sub-series
    Subseries,
    /// Device
    Device,
    /// Storage capacity
    Storage,
    /// Colour
    Color,
    /// Where the device was bought
    PurchaseFrom,
}

impl DeviceField {
    /// Application order; later options depend on earlier selections
    pub const CASCADE: [Self; 9] = [
        Self::ZipCode,
        Self::Brand,
        Self::Model,
        Self::Series,
        Self::Subseries,
        Self::Device,
        Self::Storage,
        Self::Color,
        Self::PurchaseFrom,
    ];

    /// Field name as it appears in fixture files
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ZipCode => "zipCode",
            Self::Brand => "brand",
            Self::Model => "model",
            Self::Series => "series",
            Self::Subseries => "subseries",
            Self::Device => "device",
            Self::Storage => "storage",
            Self::Color => "color",
            Self::PurchaseFrom => "purchaseFrom",
        }
    }
}

impl fmt::Display for DeviceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Trade-in intake payload. Read-only to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeInData {
    /// Device category (phone, tablet, watch...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Postal code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    /// Manufacturer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    /// Model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    /// Sub-series
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subseries: Option<String>,
    /// Device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    /// Storage capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<String>,
    /// Colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Where the device was bought
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purchase_from: Option<String>,
    /// Device identifier
    #[serde(rename = "IMEI", default, skip_serializing_if = "Option::is_none")]
    pub imei: Option<String>,
}

fn non_blank(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl TradeInData {
    /// Create empty data
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the category
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set a cascading device field
    #[must_use]
    pub fn with(mut self, field: DeviceField, value: impl Into<String>) -> Self {
        *self.slot(field) = Some(value.into());
        self
    }

    /// Set the IMEI
    #[must_use]
    pub fn with_imei(mut self, imei: impl Into<String>) -> Self {
        self.imei = Some(imei.into());
        self
    }

    fn slot(&mut self, field: DeviceField) -> &mut Option<String> {
        match field {
            DeviceField::ZipCode => &mut self.zip_code,
            DeviceField::Brand => &mut self.brand,
            DeviceField::Model => &mut self.model,
            DeviceField::Series => &mut self.series,
            DeviceField::Subseries => &mut self.subseries,
            DeviceField::Device => &mut self.device,
            DeviceField::Storage => &mut self.storage,
            DeviceField::Color => &mut self.color,
            DeviceField::PurchaseFrom => &mut self.purchase_from,
        }
    }

    /// Trimmed value of a device field, if present and non-blank
    #[must_use]
    pub fn field(&self, field: DeviceField) -> Option<&str> {
        let value = match field {
            DeviceField::ZipCode => &self.zip_code,
            DeviceField::Brand => &self.brand,
            DeviceField::Model => &self.model,
            DeviceField::Series => &self.series,
            DeviceField::Subseries => &self.subseries,
            DeviceField::Device => &self.device,
            DeviceField::Storage => &self.storage,
            DeviceField::Color => &self.color,
            DeviceField::PurchaseFrom => &self.purchase_from,
        };
        non_blank(value.as_ref())
    }

    /// Trimmed category, if present and non-blank
    #[must_use]
    pub fn category_value(&self) -> Option<&str> {
        non_blank(self.category.as_ref())
    }

    /// Trimmed IMEI, if present and non-blank
    #[must_use]
    pub fn imei_value(&self) -> Option<&str> {
        non_blank(self.imei.as_ref())
    }

    /// Non-blank device fields in cascade order
    #[must_use]
    pub fn cascade(&self) -> Vec<(DeviceField, &str)> {
        DeviceField::CASCADE
            .into_iter()
            .filter_map(|f| self.field(f).map(|v| (f, v)))
            .collect()
    }
}

/// Kind of device being bought, which decides the trade-in payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Phone (the fallback)
    Phone,
    /// Smart watch
    Watch,
    /// Tablet
    Tablet,
    /// Any other fixture type; never picked by [`DeviceKind::classify`]
    #[serde(other)]
    Other,
}

impl DeviceKind {
    /// Classify a product name: "watch" wins, then "tab", else phone
    #[must_use]
    pub fn classify(device_name: &str) -> Self {
        let name = device_name.to_lowercase();
        if name.contains("watch") {
            Self::Watch
        } else if name.contains("tab") {
            Self::Tablet
        } else {
            Self::Phone
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Phone => "phone",
            Self::Watch => "watch",
            Self::Tablet => "tablet",
            Self::Other => "other",
        })
    }
}

/// One entry of a site's fixture list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInDevice {
    /// Device type the payload is for
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    /// Payload
    #[serde(flatten)]
    pub data: TradeInData,
}

/// Trade-in payloads for one site, by device kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFixtures {
    /// Used for anything that is not a watch or tablet
    pub phone: Option<TradeInData>,
    /// Used for watches
    pub watch: Option<TradeInData>,
    /// Used for tablets
    pub tablet: Option<TradeInData>,
}

impl DeviceFixtures {
    /// First payload of each kind from a fixture list
    #[must_use]
    pub fn from_devices(devices: &[TradeInDevice]) -> Self {
        let first = |kind| {
            devices
                .iter()
                .find(|d| d.kind == kind)
                .map(|d| d.data.clone())
        };
        Self {
            phone: first(DeviceKind::Phone),
            watch: first(DeviceKind::Watch),
            tablet: first(DeviceKind::Tablet),
        }
    }

    /// Payload to trade in when buying `device_name`
    pub fn for_device(&self, device_name: &str) -> TradeInResult<&TradeInData> {
        let kind = DeviceKind::classify(device_name);
        let data = match kind {
            DeviceKind::Watch => self.watch.as_ref(),
            DeviceKind::Tablet => self.tablet.as_ref(),
            DeviceKind::Phone | DeviceKind::Other => self.phone.as_ref(),
        };
        data.ok_or_else(|| TradeInError::config(format!("No {kind} data available")))
    }
}

/// Fixture file: `{"tradeInData": {"UK": [{"type": "phone", ...}]}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureSet {
    /// Device lists keyed by site code
    #[serde(rename = "tradeInData", default)]
    pub sites: BTreeMap<String, Vec<TradeInDevice>>,
}

impl FixtureSet {
    /// Load from a JSON or YAML file
    pub fn from_path(path: impl AsRef<Path>) -> TradeInResult<Self> {
        config::load(path)
    }

    /// Fixtures for a site (case-insensitive); empty when the site has none
    #[must_use]
    pub fn for_site(&self, site: &str) -> DeviceFixtures {
        self.sites
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(site.trim()))
            .map(|(_, devices)| DeviceFixtures::from_devices(devices))
            .unwrap_or_default()
    }
}
