//! # Pricing Settings
//!
//! Two layers of configuration feed a quote:
//!
//! ```text
//! PricingSettings   global defaults from the settings store
//! └── QuoteForm     per-quote overlay entered on the quote screen
//! ```
//!
//! Settings records written by older versions of the app use different key
//! names for the same value. [`PricingSettings`] resolves every field once, at
//! deserialization time, through the alias tables below: the first key that is
//! present and non-null wins. Serialization always writes the canonical key
//! (the first entry of each table).
//!
//! ## Example
//!
//! ```rust
//! use quote_core::settings::PricingSettings;
//!
//! let settings: PricingSettings = serde_json::from_str(
//!     r#"{ "uurtarief_modellering": "45,00", "btw": 21 }"#,
//! ).unwrap();
//! assert_eq!(settings.design_rate, 45.0);
//! assert_eq!(settings.vat_percent, 21.0);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::calculations::delivery::DeliveryType;
use crate::errors::{PricingError, PricingResult};
use crate::money::{clamp_percent, non_negative};
use crate::numeric::{lenient_bool, number_or, Numeric};

pub const DEFAULT_MARKUP_PERCENT: f64 = 20.0;
pub const DEFAULT_MARGIN_PERCENT: f64 = 25.0;
pub const DEFAULT_ELECTRICITY_PRICE: f64 = 0.22;
pub const DEFAULT_DESIGN_RATE: f64 = 40.0;
pub const DEFAULT_POST_COST: f64 = 5.0;
pub const DEFAULT_VAT_PERCENT: f64 = 21.0;

/// Settings keys, canonical name first
pub const MARKUP_KEYS: &[&str] = &["material_markup_percent", "materiaal_opslag", "materialMarkup"];
pub const MARGIN_KEYS: &[&str] = &["profit_margin_percent", "winstmarge", "globaleWinstmarge"];
pub const ELECTRICITY_KEYS: &[&str] = &["electricity_price", "elektriciteitsprijs", "stroomprijs"];
pub const POST_COST_KEYS: &[&str] = &["post_cost", "postkost", "verzendkost_post"];
pub const DESIGN_RATE_KEYS: &[&str] = &[
    "design_rate",
    "modelleer_uurtarief",
    "uurtarief_modellering",
    "ontwerp_uurtarief",
    "uurtarief",
];
pub const DELIVERY_KEYS: &[&str] = &["default_delivery_type", "standaard_levering", "deliveryType"];
pub const DISCOUNT_KEYS: &[&str] = &["default_discount_percent", "standaard_korting", "korting"];
pub const VAT_KEYS: &[&str] = &["vat_percent", "btw_percentage", "btw"];
pub const FILAMENT_PRICE_KEYS: &[&str] = &["filament_prices", "filamentprijzen"];

/// Global pricing defaults, resolved from a settings record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct PricingSettings {
    /// Material markup in percent
    pub material_markup_percent: f64,

    /// Default profit margin in percent
    pub profit_margin_percent: f64,

    /// Electricity price in €/kWh
    pub electricity_price: f64,

    /// Post delivery cost as stored; validated when a quote is priced
    pub post_cost: Option<Numeric>,

    /// Base hourly design rate
    pub design_rate: f64,

    pub default_delivery_type: Option<String>,
    pub default_discount_percent: f64,
    pub vat_percent: f64,

    /// Material catalog prices per kg, laid over the built-in filament table
    pub filament_prices: BTreeMap<String, f64>,
}

impl Default for PricingSettings {
    fn default() -> Self {
        PricingSettings {
            material_markup_percent: DEFAULT_MARKUP_PERCENT,
            profit_margin_percent: DEFAULT_MARGIN_PERCENT,
            electricity_price: DEFAULT_ELECTRICITY_PRICE,
            post_cost: None,
            design_rate: DEFAULT_DESIGN_RATE,
            default_delivery_type: None,
            default_discount_percent: 0.0,
            vat_percent: DEFAULT_VAT_PERCENT,
            filament_prices: BTreeMap::new(),
        }
    }
}

fn first_present<'a>(raw: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(*key))
        .find(|value| !value.is_null())
}

fn numeric_field(raw: &Map<String, Value>, keys: &[&str]) -> Option<Numeric> {
    first_present(raw, keys).and_then(|value| serde_json::from_value(value.clone()).ok())
}

fn number_field(raw: &Map<String, Value>, keys: &[&str], default: f64) -> f64 {
    number_or(numeric_field(raw, keys).as_ref(), default)
}

impl From<Map<String, Value>> for PricingSettings {
    fn from(raw: Map<String, Value>) -> Self {
        let filament_prices = first_present(&raw, FILAMENT_PRICE_KEYS)
            .and_then(Value::as_object)
            .map(|prices| {
                prices
                    .iter()
                    .filter_map(|(name, price)| {
                        let price: Numeric = serde_json::from_value(price.clone()).ok()?;
                        Some((name.clone(), price.value()?))
                    })
                    .collect()
            })
            .unwrap_or_default();

        PricingSettings {
            material_markup_percent: number_field(&raw, MARKUP_KEYS, DEFAULT_MARKUP_PERCENT),
            profit_margin_percent: number_field(&raw, MARGIN_KEYS, DEFAULT_MARGIN_PERCENT),
            electricity_price: number_field(&raw, ELECTRICITY_KEYS, DEFAULT_ELECTRICITY_PRICE),
            post_cost: first_present(&raw, POST_COST_KEYS).map(|value| match value {
                Value::Number(n) => Numeric::Number(n.as_f64().unwrap_or(f64::NAN)),
                Value::String(s) => Numeric::Text(s.clone()),
                other => Numeric::Text(other.to_string()),
            }),
            design_rate: number_field(&raw, DESIGN_RATE_KEYS, DEFAULT_DESIGN_RATE),
            default_delivery_type: first_present(&raw, DELIVERY_KEYS)
                .and_then(Value::as_str)
                .map(str::to_string),
            default_discount_percent: number_field(&raw, DISCOUNT_KEYS, 0.0),
            vat_percent: number_field(&raw, VAT_KEYS, DEFAULT_VAT_PERCENT),
            filament_prices,
        }
    }
}

impl PricingSettings {
    /// The post cost as a usable amount.
    ///
    /// Absent means [`DEFAULT_POST_COST`]. Present but non-numeric or negative
    /// is an `InvalidSettings` error, which aborts the quote.
    pub fn validated_post_cost(&self) -> PricingResult<f64> {
        let Some(raw) = &self.post_cost else {
            return Ok(DEFAULT_POST_COST);
        };
        match raw.value() {
            Some(cost) if cost >= 0.0 => Ok(cost),
            Some(cost) => Err(PricingError::invalid_settings(
                "post_cost",
                format!("post cost must not be negative (got {})", cost),
            )),
            None => Err(PricingError::invalid_settings(
                "post_cost",
                format!("post cost must be a number (got {:?})", raw),
            )),
        }
    }
}

/// Per-quote overlay from the quote screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteForm {
    /// Global margin in percent for this quote
    #[serde(rename = "globaleWinstmarge")]
    pub global_margin: Option<Numeric>,

    /// Price every print item without margin
    #[serde(rename = "gebruikGeenMarge", default, deserialize_with = "lenient_bool")]
    pub no_margin: bool,

    /// Use each print item's own margin
    #[serde(rename = "gebruikIndividueleMarges", default, deserialize_with = "lenient_bool")]
    pub per_item_margins: bool,

    #[serde(rename = "elektriciteitsprijs")]
    pub electricity_price: Option<Numeric>,

    /// Use `electricity_price` instead of the settings value
    #[serde(rename = "overrideElektriciteitsprijs", default, deserialize_with = "lenient_bool")]
    pub override_electricity_price: bool,

    #[serde(rename = "vasteStartkost")]
    pub fixed_start_cost: Option<Numeric>,

    #[serde(rename = "vervoerskost")]
    pub transport_cost: Option<Numeric>,

    #[serde(rename = "extraAllowances")]
    pub extra_allowances: Option<Numeric>,

    #[serde(rename = "deliveryType")]
    pub delivery_type: Option<String>,

    /// Material markup in percent
    #[serde(rename = "materialMarkup")]
    pub material_markup: Option<Numeric>,

    /// Discount in percent
    #[serde(rename = "korting")]
    pub discount: Option<Numeric>,

    /// VAT in percent
    #[serde(rename = "btw")]
    pub vat: Option<Numeric>,
}

/// Rates for one quote after laying the form over the settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedRates {
    pub electricity_price: f64,
    pub material_markup_percent: f64,
    pub global_margin_percent: f64,
    pub design_rate: f64,
    pub discount_percent: f64,
    pub vat_percent: f64,
    /// extraAllowances + vasteStartkost + vervoerskost
    pub form_extras: f64,
}

impl ResolvedRates {
    pub fn resolve(settings: &PricingSettings, form: &QuoteForm) -> Self {
        let electricity_price = if form.override_electricity_price {
            number_or(form.electricity_price.as_ref(), settings.electricity_price)
        } else {
            settings.electricity_price
        };

        let form_extras = [
            &form.extra_allowances,
            &form.fixed_start_cost,
            &form.transport_cost,
        ]
        .iter()
        .map(|value| non_negative(number_or(value.as_ref(), 0.0)))
        .sum();

        ResolvedRates {
            electricity_price: non_negative(electricity_price),
            material_markup_percent: non_negative(number_or(
                form.material_markup.as_ref(),
                settings.material_markup_percent,
            )),
            global_margin_percent: non_negative(number_or(
                form.global_margin.as_ref(),
                settings.profit_margin_percent,
            )),
            design_rate: non_negative(settings.design_rate),
            discount_percent: clamp_percent(number_or(
                form.discount.as_ref(),
                settings.default_discount_percent,
            )),
            vat_percent: clamp_percent(number_or(form.vat.as_ref(), settings.vat_percent)),
            form_extras,
        }
    }
}

impl QuoteForm {
    /// Delivery type code from the form, else the settings default.
    pub fn delivery_code<'a>(&'a self, settings: &'a PricingSettings) -> Option<&'a str> {
        self.delivery_type
            .as_deref()
            .or(settings.default_delivery_type.as_deref())
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Parsed delivery type; `Ok(Pickup)` when none is set.
    pub fn delivery(&self, settings: &PricingSettings) -> PricingResult<DeliveryType> {
        match self.delivery_code(settings) {
            Some(code) => code.parse(),
            None => Ok(DeliveryType::Pickup),
        }
    }
}
