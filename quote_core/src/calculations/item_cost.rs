//! # Print Item Costing
//!
//! Turns one print item from the quote screen into a priced batch. The item
//! carries its own overrides (margin, design rate, material price, ad-hoc
//! extra costs); the quote form and the global settings fill in the rest. The
//! actual arithmetic is delegated to [`print_quote::calculate`] with pickup
//! delivery and no discount, since both are applied once for the whole quote.
//!
//! ## Margin Precedence
//!
//! First match wins:
//!
//! 1. margin override from a matched price rule
//! 2. form "no margin" flag (0%)
//! 3. form "per-item margins" flag (item margin, else the global margin)
//! 4. item's legacy override flag with a positive custom percent
//! 5. global margin

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::delivery::DeliveryType;
use crate::calculations::print_quote::{self, PrintJobParameters, PrintQuote};
use crate::errors::{PricingError, PricingResult};
use crate::money::{non_negative, round_money};
use crate::numeric::{lenient_bool, lenient_id, number, number_or, Numeric};
use crate::settings::{PricingSettings, QuoteForm, ResolvedRates};

/// Hourly rate for assembly work on a print item
pub const ASSEMBLY_RATE_PER_HOUR: f64 = 35.0;

/// Material reference attached to a print item by the material catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaterialRef {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<i64>,

    /// Material name, doubles as filament type
    #[serde(default)]
    pub naam: Option<String>,

    /// Catalog price per kg
    #[serde(default)]
    pub prijs_per_kg: Option<Numeric>,
}

/// One configured batch of identical prints as entered on the quote screen.
///
/// ## JSON Example
///
/// ```json
/// {
///   "naam": "Bracket",
///   "aantal": 4,
///   "hours": 1, "minutes": 30, "seconds": 0,
///   "weight": "42,5",
///   "materiaal_id": 7,
///   "filamentType": "PETG",
///   "modelleringNodig": true,
///   "modellering_uur": 0.5,
///   "assemblage_uur": 0.25
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrintItem {
    #[serde(default, rename = "naam")]
    pub label: Option<String>,

    /// Number of prints (default 1)
    #[serde(default, rename = "aantal")]
    pub quantity: Option<Numeric>,

    #[serde(default, alias = "uren")]
    pub hours: Option<Numeric>,
    #[serde(default, alias = "minuten")]
    pub minutes: Option<Numeric>,
    #[serde(default, alias = "seconden")]
    pub seconds: Option<Numeric>,

    /// Weight per print in grams
    #[serde(default)]
    pub weight: Option<Numeric>,

    #[serde(default, rename = "materiaal_id", deserialize_with = "lenient_id")]
    pub material_id: Option<i64>,

    #[serde(default, rename = "materiaal", alias = "material")]
    pub material: Option<MaterialRef>,

    #[serde(default, rename = "filamentType")]
    pub filament_type: Option<String>,

    #[serde(default, rename = "filamentDisplayName")]
    pub filament_display_name: Option<String>,

    /// Item-level price per kg
    #[serde(default, rename = "prijs_per_kg")]
    pub price_per_kg: Option<Numeric>,

    /// Item margin in percent, used in per-item margin mode
    #[serde(default)]
    pub margin: Option<Numeric>,

    #[serde(default, rename = "override_marge", deserialize_with = "lenient_bool")]
    pub override_margin: bool,

    #[serde(default, rename = "custom_winstmarge_perc")]
    pub custom_margin_percent: Option<Numeric>,

    #[serde(default, rename = "modelleringNodig", deserialize_with = "lenient_bool")]
    pub design_required: bool,

    #[serde(default, rename = "modellering_uur")]
    pub design_hours: Option<Numeric>,

    #[serde(default, rename = "gebruik_custom_uurtarief", deserialize_with = "lenient_bool")]
    pub use_custom_rate: bool,

    #[serde(default, rename = "custom_uurtarief")]
    pub custom_rate: Option<Numeric>,

    #[serde(default, rename = "nozzle_slijtagekost")]
    pub nozzle_wear_cost: Option<Numeric>,

    #[serde(default, rename = "post_processing_kost")]
    pub post_processing_cost: Option<Numeric>,

    #[serde(default, rename = "scan_kost")]
    pub scan_cost: Option<Numeric>,

    #[serde(default, rename = "assemblage_uur")]
    pub assembly_hours: Option<Numeric>,

    #[serde(default, rename = "manuele_toeslag")]
    pub manual_surcharge: Option<Numeric>,

    /// Line subtotal saved with the quote (edit mode)
    #[serde(default, rename = "subtotaal")]
    pub stored_subtotal: Option<Numeric>,

    /// Unit price saved with the quote (edit mode)
    #[serde(default, rename = "verkoopprijs_per_stuk")]
    pub stored_unit_price: Option<Numeric>,
}

impl PrintItem {
    /// Print duration in hours from the hours/minutes/seconds fields
    pub fn duration_hours(&self) -> f64 {
        let seconds = number_or(self.hours.as_ref(), 0.0) * 3600.0
            + number_or(self.minutes.as_ref(), 0.0) * 60.0
            + number_or(self.seconds.as_ref(), 0.0);
        seconds / 3600.0
    }

    /// Filament type: `filamentType`, then the material name, then the
    /// display name.
    pub fn resolved_filament_type(&self) -> Option<&str> {
        let material_name = self.material.as_ref().and_then(|m| m.naam.as_deref());
        [self.filament_type.as_deref(), material_name, self.filament_display_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|name| !name.is_empty())
    }

    /// Material id for price rule matching
    pub fn resolved_material_id(&self) -> Option<i64> {
        self.material_id
            .or_else(|| self.material.as_ref().and_then(|m| m.id))
    }

    /// Number of prints, truncated; falls back to 1 when absent
    pub fn count(&self) -> u32 {
        let count = number_or(self.quantity.as_ref(), 1.0).trunc();
        if count >= 1.0 {
            count as u32
        } else {
            0
        }
    }

    /// Batch weight in kg (weight per print × count)
    pub fn batch_weight_kg(&self) -> f64 {
        non_negative(number_or(self.weight.as_ref(), 0.0)) * f64::from(self.count()) / 1000.0
    }

    /// Positive price per kg from the item or its material reference
    pub fn own_price_per_kg(&self) -> Option<f64> {
        number(self.price_per_kg.as_ref())
            .or_else(|| self.material.as_ref().and_then(|m| number(m.prijs_per_kg.as_ref())))
            .filter(|price| *price > 0.0)
    }

    /// Sum of ad-hoc extra costs, assembly priced at [`ASSEMBLY_RATE_PER_HOUR`]
    pub fn extra_costs(&self) -> f64 {
        let direct: f64 = [
            &self.nozzle_wear_cost,
            &self.post_processing_cost,
            &self.scan_cost,
            &self.manual_surcharge,
        ]
        .iter()
        .map(|value| non_negative(number_or(value.as_ref(), 0.0)))
        .sum();
        let assembly = non_negative(number_or(self.assembly_hours.as_ref(), 0.0)) * ASSEMBLY_RATE_PER_HOUR;
        direct + assembly
    }

    /// Stored line subtotal for edit mode: `subtotaal`, else
    /// `verkoopprijs_per_stuk × count`. Zero or negative figures were never
    /// persisted prices and do not count.
    pub fn stored_total(&self) -> Option<f64> {
        number(self.stored_subtotal.as_ref())
            .filter(|total| *total > 0.0)
            .or_else(|| {
                number(self.stored_unit_price.as_ref())
                    .filter(|unit| *unit > 0.0)
                    .map(|unit| unit * f64::from(self.count().max(1)))
            })
    }
}

/// Which margin policy priced an item, with the percent it resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "percent", rename_all = "snake_case")]
pub enum MarginMode {
    NoMargin,
    PerItemMargin(f64),
    RuleOverrideMargin(f64),
    GlobalMargin(f64),
}

impl MarginMode {
    /// Resolve the margin for one item in a single ordered pass.
    pub fn resolve(item: &PrintItem, form: &QuoteForm, rates: &ResolvedRates, rule_margin: Option<f64>) -> Self {
        if let Some(percent) = rule_margin {
            return MarginMode::RuleOverrideMargin(non_negative(percent));
        }
        if form.no_margin {
            return MarginMode::NoMargin;
        }
        if form.per_item_margins {
            let percent = number(item.margin.as_ref()).unwrap_or(rates.global_margin_percent);
            return MarginMode::PerItemMargin(non_negative(percent));
        }
        if item.override_margin {
            if let Some(percent) = number(item.custom_margin_percent.as_ref()).filter(|p| *p > 0.0) {
                return MarginMode::PerItemMargin(percent);
            }
        }
        MarginMode::GlobalMargin(rates.global_margin_percent)
    }

    pub fn percent(&self) -> f64 {
        match self {
            MarginMode::NoMargin => 0.0,
            MarginMode::PerItemMargin(p) | MarginMode::RuleOverrideMargin(p) | MarginMode::GlobalMargin(p) => *p,
        }
    }
}

/// Overrides handed down from a matched price rule.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ItemOverrides {
    pub price_per_kg: Option<f64>,
    pub margin_percent: Option<f64>,
}

/// Priced print item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemCost {
    pub quote: PrintQuote,

    /// Line total (prints + design + drying + extras)
    #[serde(rename = "subtotaal")]
    pub subtotal: f64,

    /// Production cost: everything except margin
    #[serde(rename = "nettoKost")]
    pub production_cost: f64,

    #[serde(rename = "verkoopprijs_per_stuk")]
    pub unit_price: f64,

    #[serde(rename = "subtotalBeforeDelivery")]
    pub subtotal_before_delivery: f64,

    #[serde(rename = "dryingApplied")]
    pub drying_applied: bool,

    pub margin_mode: MarginMode,
}

impl ItemCost {
    /// Raw material + electricity for the whole batch, the baseline for
    /// profit analysis.
    pub fn material_and_energy_cost(&self) -> f64 {
        let per_print = &self.quote.per_print_exact;
        round_money((per_print.material_raw + per_print.electricity) * f64::from(self.quote.input.number_of_prints))
    }
}

/// Price one print item.
///
/// # Arguments
///
/// * `item` - The print item
/// * `settings` - Global pricing settings
/// * `form` - The quote form overlay
/// * `overrides` - Price/margin from a matched price rule
///
/// # Returns
///
/// * `Ok(ItemCost)` - Priced item
/// * `Err(PricingError)` - Item cannot be priced; the quote shows the message
///   and skips the item in its totals
pub fn calculate_item_cost(
    item: &PrintItem,
    settings: &PricingSettings,
    form: &QuoteForm,
    overrides: &ItemOverrides,
) -> PricingResult<ItemCost> {
    let rates = ResolvedRates::resolve(settings, form);

    let filament_type = item
        .resolved_filament_type()
        .ok_or_else(|| PricingError::invalid_input("material", "", "No material selected"))?
        .to_string();

    let weight = number(item.weight.as_ref()).unwrap_or(0.0);
    if weight <= 0.0 {
        return Err(PricingError::invalid_input(
            "weight",
            weight.to_string(),
            "Weight must be greater than 0",
        ));
    }

    let margin_mode = MarginMode::resolve(item, form, &rates, overrides.margin_percent);

    let (design_hours, design_rate) = if item.design_required {
        let rate = if item.use_custom_rate {
            number_or(item.custom_rate.as_ref(), rates.design_rate)
        } else {
            rates.design_rate
        };
        (number_or(item.design_hours.as_ref(), 0.0), rate)
    } else {
        (0.0, rates.design_rate)
    };

    let mut filament_prices: BTreeMap<String, f64> = settings.filament_prices.clone();
    if let Some(price) = overrides
        .price_per_kg
        .filter(|p| *p > 0.0)
        .or_else(|| item.own_price_per_kg())
    {
        filament_prices.insert(filament_type.clone(), price);
    }

    let params = PrintJobParameters {
        printing_time_hours: Some(item.duration_hours().into()),
        filament_type: Some(filament_type),
        filament_weight_grams: Some(weight.into()),
        number_of_prints: Some(item.quantity.clone().unwrap_or(Numeric::Number(1.0))),
        design_hours: Some(design_hours.into()),
        design_rate_per_hour: Some(design_rate.into()),
        delivery_type: Some(DeliveryType::Pickup.code().to_string()),
        travel_distance_km: None,
        extra_allowances: Some(item.extra_costs().into()),
        discount_percent: Some(0.0.into()),
        profit_margin: Some((margin_mode.percent() / 100.0).into()),
        material_markup: Some((rates.material_markup_percent / 100.0).into()),
        electricity_cost_per_kwh: Some(rates.electricity_price.into()),
        filament_prices,
    };

    let quote = print_quote::calculate(&params)?;

    let count = f64::from(quote.input.number_of_prints);
    let totals = &quote.totals;
    let subtotal = totals.subtotal_before_delivery;
    let production_cost = round_money(
        quote.per_print_exact.cost_before_margin * count
            + totals.design_total
            + totals.drying.total
            + totals.extra_allowances,
    );
    let unit_price = round_money(subtotal / count);

    debug!(
        filament = %quote.input.filament_type,
        count = quote.input.number_of_prints,
        subtotal,
        ?margin_mode,
        "Priced print item"
    );

    Ok(ItemCost {
        subtotal,
        production_cost,
        unit_price,
        subtotal_before_delivery: totals.subtotal_before_delivery,
        drying_applied: totals.drying.applied,
        margin_mode,
        quote,
    })
}
