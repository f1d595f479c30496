//! # Price Rules
//!
//! A price rule overrides the material price per kg and/or the margin for a
//! print item, scoped by client, material, minimum batch weight and a validity
//! window.
//!
//! ## Selection
//!
//! A rule is a candidate when it is active today and every scope it sets
//! matches the item. Among candidates the most specific rule wins, compared on
//! these keys in order (all descending):
//!
//! 1. has a client
//! 2. has a material
//! 3. minimum quantity
//! 4. id (newest rule)
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use quote_core::calculations::price_rules::{find_best_rule, PriceRule, RuleContext};
//!
//! let rules = vec![
//!     PriceRule { id: 1, material_id: Some(7), price_per_unit: Some(20.0.into()), ..Default::default() },
//!     PriceRule { id: 2, material_id: Some(7), client_id: Some(3), price_per_unit: Some(18.0.into()), ..Default::default() },
//! ];
//! let context = RuleContext { client_id: Some(3), material_id: Some(7), weight_kg: 1.0 };
//! let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
//!
//! assert_eq!(find_best_rule(&rules, &context, today).map(|r| r.id), Some(2));
//! ```

use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::money::non_negative;
use crate::numeric::{lenient_active, lenient_id, number, Numeric};

/// A conditional price/margin override from the rule catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRule {
    #[serde(default, deserialize_with = "lenient_id_or_zero")]
    pub id: i64,

    /// Only applies to this material when set
    #[serde(default, deserialize_with = "lenient_id")]
    pub material_id: Option<i64>,

    /// Only applies to this client when set
    #[serde(default, deserialize_with = "lenient_id")]
    pub client_id: Option<i64>,

    /// Minimum batch weight in kg (0 or absent = no minimum)
    #[serde(default)]
    pub min_qty: Option<Numeric>,

    /// Price per kg replacing the material price
    #[serde(default)]
    pub price_per_unit: Option<Numeric>,

    /// Margin in percent replacing the quote margin
    #[serde(default)]
    pub margin_override: Option<Numeric>,

    #[serde(default = "default_active", deserialize_with = "lenient_active")]
    pub active: bool,

    /// First valid day, ISO date, inclusive
    #[serde(default)]
    pub valid_from: Option<String>,

    /// Last valid day, ISO date, inclusive
    #[serde(default)]
    pub valid_to: Option<String>,
}

fn default_active() -> bool {
    true
}

fn lenient_id_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(lenient_id(deserializer)?.unwrap_or(0))
}

impl Default for PriceRule {
    fn default() -> Self {
        PriceRule {
            id: 0,
            material_id: None,
            client_id: None,
            min_qty: None,
            price_per_unit: None,
            margin_override: None,
            active: true,
            valid_from: None,
            valid_to: None,
        }
    }
}

/// What a rule is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleContext {
    pub client_id: Option<i64>,
    pub material_id: Option<i64>,
    /// Total batch weight in kg
    pub weight_kg: f64,
}

/// Parse a rule date bound. Accepts `YYYY-MM-DD` with an optional time part.
fn parse_bound(text: &str) -> Option<NaiveDate> {
    let date_part = text.trim().get(..10).unwrap_or(text.trim());
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl PriceRule {
    pub fn has_client(&self) -> bool {
        self.client_id.is_some()
    }

    pub fn has_material(&self) -> bool {
        self.material_id.is_some()
    }

    /// Minimum batch weight in kg; 0 when unset
    pub fn min_qty_kg(&self) -> f64 {
        non_negative(number(self.min_qty.as_ref()).unwrap_or(0.0))
    }

    /// Positive override price per kg, if any
    pub fn price_override(&self) -> Option<f64> {
        number(self.price_per_unit.as_ref()).filter(|price| *price > 0.0)
    }

    /// Non-negative override margin percent, if any
    pub fn margin_override_percent(&self) -> Option<f64> {
        number(self.margin_override.as_ref()).filter(|margin| *margin >= 0.0)
    }

    /// Active flag set and `today` inside the validity window.
    ///
    /// A bound that is not a valid date makes the rule inactive.
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        if !self.active {
            return false;
        }
        for (bound, is_start) in [(&self.valid_from, true), (&self.valid_to, false)] {
            let Some(text) = bound.as_deref().filter(|t| !t.trim().is_empty()) else {
                continue;
            };
            let Some(date) = parse_bound(text) else {
                warn!(rule_id = self.id, bound = text, "Ignoring price rule with unparseable date");
                return false;
            };
            if (is_start && today < date) || (!is_start && today > date) {
                return false;
            }
        }
        true
    }

    /// Active and every scope set on the rule matches the context
    pub fn matches(&self, context: &RuleContext, today: NaiveDate) -> bool {
        if !self.is_active_on(today) {
            return false;
        }
        if let Some(material_id) = self.material_id {
            if context.material_id != Some(material_id) {
                return false;
            }
        }
        if let Some(client_id) = self.client_id {
            if context.client_id != Some(client_id) {
                return false;
            }
        }
        let min_qty = self.min_qty_kg();
        min_qty <= 0.0 || context.weight_kg >= min_qty
    }

    /// Specificity ordering: `Greater` means more specific.
    pub fn specificity_cmp(&self, other: &PriceRule) -> Ordering {
        self.has_client()
            .cmp(&other.has_client())
            .then_with(|| self.has_material().cmp(&other.has_material()))
            .then_with(|| self.min_qty_kg().total_cmp(&other.min_qty_kg()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// All candidate rules, most specific first.
pub fn rank_rules<'a>(rules: &'a [PriceRule], context: &RuleContext, today: NaiveDate) -> Vec<&'a PriceRule> {
    let mut candidates: Vec<&PriceRule> = rules
        .iter()
        .filter(|rule| rule.matches(context, today))
        .collect();
    candidates.sort_by(|a, b| b.specificity_cmp(a));
    candidates
}

/// The single best rule for this context, or `None`.
pub fn find_best_rule<'a>(rules: &'a [PriceRule], context: &RuleContext, today: NaiveDate) -> Option<&'a PriceRule> {
    rank_rules(rules, context, today).into_iter().next()
}
