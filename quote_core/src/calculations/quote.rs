//! # Quote Aggregation
//!
//! Prices a whole quote: every print item (through the item resolver and the
//! price rule matcher) plus custom line items, then applies delivery, discount
//! and VAT once on the combined subtotal and reports the profit against the
//! production cost.
//!
//! ## Failure Policy
//!
//! - A print item that cannot be priced stays in [`QuoteResult::lines`] with
//!   its message and contributes nothing to the totals.
//! - Invalid settings (a post cost that is not a non-negative number) or a
//!   request whose `items` is not a list reject the whole quote.
//!
//! ## Edit Mode
//!
//! With `use_stored_totals`, a print item that carries a saved `subtotaal` (or
//! `verkoopprijs_per_stuk`) keeps that amount. Reopening a saved quote then
//! never changes its price, even when the settings changed in the meantime.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::calculations::quote::{calculate_quote, QuoteRequest};
//!
//! let request = QuoteRequest::from_json_str(r#"{
//!     "items": [
//!         { "aantal": 2, "hours": 1, "weight": 100, "filamentType": "PLA Basic" }
//!     ],
//!     "form": { "korting": 10, "btw": 21 },
//!     "options": {
//!         "custom_items": [
//!             { "title": "Assembly", "quantity": 1, "price_amount": 15, "cost_amount": 5 }
//!         ]
//!     }
//! }"#).unwrap();
//!
//! let result = calculate_quote(&request).unwrap();
//! assert_eq!(result.totals.custom_items_total, 15.0);
//! assert!(result.totals.total_incl_vat > result.totals.total_final);
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::calculations::delivery::DeliveryType;
use crate::calculations::item_cost::{calculate_item_cost, ItemCost, ItemOverrides, PrintItem};
use crate::calculations::price_rules::{find_best_rule, PriceRule, RuleContext};
use crate::calculations::print_quote::SOFT_DISCOUNT_BONUS;
use crate::errors::{PricingError, PricingResult};
use crate::money::{clamp_percent, format_eur, format_percent, non_negative, round_money};
use crate::notes::NoteSet;
use crate::numeric::{lenient_active, lenient_bool, lenient_id, number_or, Numeric};
use crate::settings::{PricingSettings, QuoteForm, ResolvedRates};

fn default_selected() -> bool {
    true
}

/// A non-print line: a service, bundle or assembly job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomItem {
    #[serde(default)]
    pub title: String,

    /// Quantity (default 1)
    #[serde(default)]
    pub quantity: Option<Numeric>,

    #[serde(default)]
    pub unit: Option<String>,

    /// Sale price per unit
    #[serde(default)]
    pub price_amount: Option<Numeric>,

    /// Internal cost per unit
    #[serde(default)]
    pub cost_amount: Option<Numeric>,

    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_optional: bool,

    /// Only consulted for optional items
    #[serde(default = "default_selected", deserialize_with = "lenient_active")]
    pub is_selected: bool,
}

impl CustomItem {
    /// Non-optional items are always included
    pub fn included(&self) -> bool {
        !self.is_optional || self.is_selected
    }
}

/// Options for one quote computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteOptions {
    #[serde(default, deserialize_with = "lenient_id")]
    pub client_id: Option<i64>,

    #[serde(default)]
    pub custom_items: Vec<CustomItem>,

    /// Keep saved line totals of print items (edit mode)
    #[serde(default, deserialize_with = "lenient_bool")]
    pub use_stored_totals: bool,

    /// Day used for price rule validity; defaults to the local date
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Everything needed to price a quote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Request schema version, checked when loading from a file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub items: Vec<PrintItem>,

    #[serde(default)]
    pub form: QuoteForm,

    #[serde(default)]
    pub settings: PricingSettings,

    #[serde(default)]
    pub price_rules: Vec<PriceRule>,

    #[serde(default)]
    pub options: QuoteOptions,
}

impl QuoteRequest {
    /// Build a request from loosely typed JSON.
    ///
    /// `items` must be a JSON array; anything else rejects the request before
    /// any pricing happens.
    pub fn from_json_value(value: Value) -> PricingResult<Self> {
        match value.get("items") {
            Some(Value::Array(_)) => {}
            Some(other) => {
                return Err(PricingError::invalid_input(
                    "items",
                    other.to_string(),
                    "Print items must be a list",
                ))
            }
            None => return Err(PricingError::missing_field("items")),
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn from_json_str(json: &str) -> PricingResult<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json_value(value)
    }
}

/// Result line for one print item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintLine {
    /// Position in the request's item list
    pub index: usize,
    pub label: Option<String>,
    pub filament_type: Option<String>,
    pub quantity: u32,

    /// Price rule that priced this line
    pub price_rule_id: Option<i64>,

    /// Amount kept from the saved quote (edit mode)
    pub frozen_total: Option<f64>,

    /// Contribution to the prints total
    pub subtotal: f64,

    pub cost: Option<ItemCost>,

    #[serde(rename = "fout", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PrintLine {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Result line for one custom item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomLine {
    pub index: usize,
    pub title: String,
    pub unit: Option<String>,
    pub quantity: f64,
    pub unit_price: f64,
    pub unit_cost: f64,
    pub line_total: f64,
    pub line_cost: f64,
    pub margin_amount: f64,
    pub margin_percent: f64,
    pub is_optional: bool,
    pub selected: bool,
}

/// A quote line, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuoteLine {
    Print(PrintLine),
    Custom(CustomLine),
}

/// Aggregate totals, rounded to cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteTotals {
    pub prints_total: f64,
    pub design_total: f64,
    pub drying_total: f64,
    /// Item extras plus the form's extra allowances, start cost and transport
    pub extra_allowances_total: f64,
    pub custom_items_total: f64,
    pub subtotal_before_delivery: f64,
    pub delivery_type: DeliveryType,
    pub delivery_cost: f64,
    pub subtotal: f64,
    pub discount_percent: f64,
    pub discount_value: f64,
    /// Net total after discount, excluding VAT
    pub total_final: f64,
    /// Informational only
    pub soft_discount_percent: f64,
    pub soft_discount_value: f64,
    pub total_with_soft_discount: f64,
    pub vat_percent: f64,
    pub vat_amount: f64,
    pub total_incl_vat: f64,
}

/// Cost vs. revenue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfitAnalysis {
    /// Raw material + electricity of print items plus custom line costs
    pub production_cost: f64,
    pub revenue: f64,
    pub profit_amount: f64,
    pub profit_percent: f64,
}

/// Fully priced quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResult {
    pub lines: Vec<QuoteLine>,
    pub totals: QuoteTotals,
    pub profit: ProfitAnalysis,
    pub notes: NoteSet,
}

impl QuoteResult {
    pub fn print_lines(&self) -> impl Iterator<Item = &PrintLine> {
        self.lines.iter().filter_map(|line| match line {
            QuoteLine::Print(print) => Some(print),
            QuoteLine::Custom(_) => None,
        })
    }

    pub fn custom_lines(&self) -> impl Iterator<Item = &CustomLine> {
        self.lines.iter().filter_map(|line| match line {
            QuoteLine::Custom(custom) => Some(custom),
            QuoteLine::Print(_) => None,
        })
    }

    /// Number of print items that could not be priced
    pub fn failed_items(&self) -> usize {
        self.print_lines().filter(|line| line.is_error()).count()
    }
}

#[derive(Default)]
struct Accumulator {
    prints: f64,
    design: f64,
    drying: f64,
    extra: f64,
    custom: f64,
    production_cost: f64,
}

fn rule_note(rule: &PriceRule, filament: Option<&str>) -> String {
    let mut note = format!("Price rule #{} applied", rule.id);
    if let Some(filament) = filament {
        note.push_str(&format!(" to {}", filament));
    }
    if let Some(client_id) = rule.client_id {
        note.push_str(&format!(" for client #{}", client_id));
    }
    let mut parts = Vec::new();
    if let Some(price) = rule.price_override() {
        parts.push(format!("{}/kg", format_eur(price)));
    }
    if let Some(margin) = rule.margin_override_percent() {
        parts.push(format!("margin {}", format_percent(margin)));
    }
    if !parts.is_empty() {
        note.push_str(": ");
        note.push_str(&parts.join(", "));
    }
    note
}

fn custom_line(index: usize, item: &CustomItem) -> CustomLine {
    let quantity = non_negative(number_or(item.quantity.as_ref(), 1.0));
    let unit_price = number_or(item.price_amount.as_ref(), 0.0);
    let unit_cost = number_or(item.cost_amount.as_ref(), 0.0);

    let line_total = round_money(unit_price * quantity);
    let line_cost = round_money(unit_cost * quantity);
    let margin_amount = round_money(line_total - line_cost);
    let margin_percent = if line_cost != 0.0 {
        round_money(margin_amount / line_cost * 100.0)
    } else {
        0.0
    };

    CustomLine {
        index,
        title: item.title.clone(),
        unit: item.unit.clone(),
        quantity,
        unit_price,
        unit_cost,
        line_total,
        line_cost,
        margin_amount,
        margin_percent,
        is_optional: item.is_optional,
        selected: item.included(),
    }
}

fn local_today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Price a whole quote.
///
/// # Returns
///
/// * `Ok(QuoteResult)` - Lines, totals, profit and notes; item-level failures
///   are reported on their lines
/// * `Err(PricingError::InvalidSettings)` - The settings' post cost is unusable
pub fn calculate_quote(request: &QuoteRequest) -> PricingResult<QuoteResult> {
    let settings = &request.settings;
    let form = &request.form;
    let options = &request.options;

    let post_cost = settings.validated_post_cost()?;
    let rates = ResolvedRates::resolve(settings, form);
    let today = options.today.unwrap_or_else(local_today);

    debug!(
        items = request.items.len(),
        custom_items = options.custom_items.len(),
        rules = request.price_rules.len(),
        use_stored_totals = options.use_stored_totals,
        "Calculating quote"
    );

    let mut acc = Accumulator::default();
    let mut notes = NoteSet::new();
    let mut lines = Vec::with_capacity(request.items.len() + options.custom_items.len());

    for (index, item) in request.items.iter().enumerate() {
        let context = RuleContext {
            client_id: options.client_id,
            material_id: item.resolved_material_id(),
            weight_kg: item.batch_weight_kg(),
        };
        let rule = find_best_rule(&request.price_rules, &context, today);
        let overrides = rule
            .map(|rule| ItemOverrides {
                price_per_kg: rule.price_override(),
                margin_percent: rule.margin_override_percent(),
            })
            .unwrap_or_default();

        let computed = calculate_item_cost(item, settings, form, &overrides);
        let frozen_total = if options.use_stored_totals {
            item.stored_total().map(round_money)
        } else {
            None
        };

        let mut line = PrintLine {
            index,
            label: item.label.clone(),
            filament_type: item.resolved_filament_type().map(str::to_string),
            quantity: item.count(),
            price_rule_id: None,
            frozen_total,
            subtotal: 0.0,
            cost: None,
            error: None,
        };

        match (frozen_total, computed) {
            (Some(stored), computed) => {
                acc.prints += stored;
                line.subtotal = stored;
                match computed {
                    Ok(cost) => {
                        acc.production_cost += cost.material_and_energy_cost();
                        line.cost = Some(cost);
                    }
                    Err(e) => warn!(index, error = %e, "Saved line has no recomputable production cost"),
                }
                notes.insert(format!(
                    "Line {} keeps its saved price of {}",
                    index + 1,
                    format_eur(stored)
                ));
            }
            (None, Ok(cost)) => {
                if let Some(rule) = rule {
                    notes.insert(rule_note(rule, item.resolved_filament_type()));
                    line.price_rule_id = Some(rule.id);
                }
                let totals = &cost.quote.totals;
                acc.prints += totals.prints_total;
                acc.design += totals.design_total;
                acc.drying += totals.drying.total;
                acc.extra += totals.extra_allowances;
                acc.production_cost += cost.material_and_energy_cost();
                notes.extend(cost.quote.notes.iter().cloned());
                line.subtotal = cost.subtotal;
                line.cost = Some(cost);
            }
            (None, Err(e)) => {
                warn!(index, error = %e, "Skipping print item that cannot be priced");
                line.error = Some(e.to_string());
            }
        }

        lines.push(QuoteLine::Print(line));
    }

    acc.extra += rates.form_extras;

    for (index, item) in options.custom_items.iter().enumerate() {
        let line = custom_line(index, item);
        if line.selected {
            acc.custom += line.line_total;
            acc.production_cost += line.line_cost;
        }
        lines.push(QuoteLine::Custom(line));
    }

    let delivery_type = match form.delivery(settings) {
        Ok(delivery) => delivery,
        Err(e) => {
            warn!(error = %e, "Unknown delivery type, pricing as pickup");
            notes.insert(format!(
                "Unknown delivery type '{}', priced as pickup",
                form.delivery_code(settings).unwrap_or_default()
            ));
            DeliveryType::Pickup
        }
    };

    let prints_total = round_money(acc.prints);
    let design_total = round_money(acc.design);
    let drying_total = round_money(acc.drying);
    let extra_allowances_total = round_money(acc.extra);
    let custom_items_total = round_money(acc.custom);
    let subtotal_before_delivery = round_money(
        prints_total + design_total + drying_total + extra_allowances_total + custom_items_total,
    );

    let delivery_cost = round_money(delivery_type.flat_cost(post_cost));
    let subtotal = round_money(subtotal_before_delivery + delivery_cost);

    let discount_percent = rates.discount_percent;
    let discount_value = round_money(subtotal * discount_percent / 100.0);
    let total_final = round_money(subtotal - discount_value);

    let soft_discount_percent = clamp_percent(discount_percent + SOFT_DISCOUNT_BONUS);
    let soft_discount_value = round_money(subtotal * soft_discount_percent / 100.0);
    let total_with_soft_discount = round_money(subtotal - soft_discount_value);

    let vat_percent = rates.vat_percent;
    let vat_amount = round_money(total_final * vat_percent / 100.0);
    let total_incl_vat = round_money(total_final + vat_amount);

    if discount_percent > 0.0 {
        notes.insert(format!(
            "Discount of {} applied: -{}",
            format_percent(discount_percent),
            format_eur(discount_value)
        ));
    } else {
        notes.insert("No discount applied");
    }
    notes.insert(format!(
        "Delivery: {} ({})",
        delivery_type.display_name(),
        format_eur(delivery_cost)
    ));

    let production_cost = round_money(acc.production_cost);
    let profit_amount = round_money(total_final - production_cost);
    let profit_percent = if production_cost > 0.0 {
        round_money(profit_amount / production_cost * 100.0)
    } else {
        0.0
    };

    let result = QuoteResult {
        lines,
        totals: QuoteTotals {
            prints_total,
            design_total,
            drying_total,
            extra_allowances_total,
            custom_items_total,
            subtotal_before_delivery,
            delivery_type,
            delivery_cost,
            subtotal,
            discount_percent,
            discount_value,
            total_final,
            soft_discount_percent,
            soft_discount_value,
            total_with_soft_discount,
            vat_percent,
            vat_amount,
            total_incl_vat,
        },
        profit: ProfitAnalysis {
            production_cost,
            revenue: total_final,
            profit_amount,
            profit_percent,
        },
        notes,
    };

    debug!(
        total_final = result.totals.total_final,
        total_incl_vat = result.totals.total_incl_vat,
        failed_items = result.failed_items(),
        "Quote calculated"
    );

    Ok(result)
}
