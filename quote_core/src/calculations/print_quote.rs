//! # Single-Print Quote
//!
//! Prices one homogeneous batch of identical prints: same filament, same
//! weight, same print time.
//!
//! ## Cost Model
//!
//! Per print:
//!
//! ```text
//! material_raw         = weight_g × price_per_kg / 1000
//! material_with_markup = material_raw × (1 + markup)
//! electricity          = hours × 1.0 kW × €/kWh
//! cost_before_margin   = material_with_markup + electricity
//! cost_with_margin     = cost_before_margin × (1 + margin)
//! ```
//!
//! The batch adds design time, a drying surcharge for moisture-sensitive
//! filaments, extra allowances, delivery and a discount.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::calculations::print_quote::{calculate, PrintJobParameters};
//!
//! let params = PrintJobParameters::new(2.0, "PLA Basic", 100.0, 1)
//!     .with_profit_margin(0.25)
//!     .with_material_markup(0.2)
//!     .with_electricity_cost(0.12);
//!
//! let quote = calculate(&params).unwrap();
//! assert_eq!(quote.per_print.cost_with_margin, 3.81);
//! assert_eq!(quote.totals.delivery_cost, 0.0);
//! assert_eq!(quote.totals.subtotal, 3.81);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::delivery::{
    DeliveryType, POST_COST_LARGE_ORDER, POST_COST_SMALL_ORDER, POST_THRESHOLD,
};
use crate::errors::{PricingError, PricingResult};
use crate::filament::{
    default_prices, merge_prices, requires_drying, DRYING_COST_PER_PRINT, DRYING_FIXED_COST,
};
use crate::money::{clamp_percent, format_eur, format_percent, non_negative, round_money};
use crate::numeric::{number_or, Numeric};

/// Printer power draw assumed for electricity cost
pub const PRINTER_POWER_KW: f64 = 1.0;

/// Extra discount points for the informational "soft discount" figure
pub const SOFT_DISCOUNT_BONUS: f64 = 5.0;

pub const DEFAULT_PROFIT_MARGIN: f64 = 0.25;
pub const DEFAULT_MATERIAL_MARKUP: f64 = 0.20;
pub const DEFAULT_ELECTRICITY_COST: f64 = 0.22;
pub const DEFAULT_DESIGN_RATE: f64 = 40.0;

/// Raw parameters for one print batch.
///
/// Numeric fields accept JSON numbers or strings (`"12,5"` is 12.5). Missing
/// optional fields use the crate defaults.
///
/// ## JSON Example
///
/// ```json
/// {
///   "printing_time_hours": 2,
///   "filament_type": "PETG",
///   "filament_weight_grams": "85,5",
///   "number_of_prints": 4,
///   "delivery_type": "post",
///   "discount_percent": 10,
///   "filament_prices": { "PETG": 21.5 }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrintJobParameters {
    /// Print time per piece in hours (required, > 0)
    pub printing_time_hours: Option<Numeric>,

    /// Filament type, key into the price table (required)
    pub filament_type: Option<String>,

    /// Filament weight per piece in grams (required, > 0)
    pub filament_weight_grams: Option<Numeric>,

    /// Number of identical prints (required, ≥ 1, truncated)
    pub number_of_prints: Option<Numeric>,

    pub design_hours: Option<Numeric>,
    pub design_rate_per_hour: Option<Numeric>,

    /// "afhaling", "post", "24h" or "48h" (default "afhaling")
    pub delivery_type: Option<String>,

    /// Recorded with the quote; not priced
    pub travel_distance_km: Option<Numeric>,

    pub extra_allowances: Option<Numeric>,

    /// Discount in percent, clamped to [0, 100]
    pub discount_percent: Option<Numeric>,

    /// Profit margin as a fraction (0.25 = 25%)
    pub profit_margin: Option<Numeric>,

    /// Material markup as a fraction (0.2 = 20%)
    pub material_markup: Option<Numeric>,

    pub electricity_cost_per_kwh: Option<Numeric>,

    /// Price per kg overrides, merged over the built-in table
    #[serde(default)]
    pub filament_prices: BTreeMap<String, f64>,
}

impl PrintJobParameters {
    /// Parameters with the four required fields set
    pub fn new(
        printing_time_hours: f64,
        filament_type: impl Into<String>,
        weight_grams: f64,
        number_of_prints: u32,
    ) -> Self {
        PrintJobParameters {
            printing_time_hours: Some(printing_time_hours.into()),
            filament_type: Some(filament_type.into()),
            filament_weight_grams: Some(weight_grams.into()),
            number_of_prints: Some(f64::from(number_of_prints).into()),
            ..Default::default()
        }
    }

    pub fn with_design(mut self, hours: f64, rate_per_hour: f64) -> Self {
        self.design_hours = Some(hours.into());
        self.design_rate_per_hour = Some(rate_per_hour.into());
        self
    }

    pub fn with_delivery(mut self, delivery: DeliveryType) -> Self {
        self.delivery_type = Some(delivery.code().to_string());
        self
    }

    pub fn with_extra_allowances(mut self, amount: f64) -> Self {
        self.extra_allowances = Some(amount.into());
        self
    }

    pub fn with_discount(mut self, percent: f64) -> Self {
        self.discount_percent = Some(percent.into());
        self
    }

    pub fn with_profit_margin(mut self, fraction: f64) -> Self {
        self.profit_margin = Some(fraction.into());
        self
    }

    pub fn with_material_markup(mut self, fraction: f64) -> Self {
        self.material_markup = Some(fraction.into());
        self
    }

    pub fn with_electricity_cost(mut self, per_kwh: f64) -> Self {
        self.electricity_cost_per_kwh = Some(per_kwh.into());
        self
    }

    pub fn with_filament_price(mut self, filament_type: impl Into<String>, price_per_kg: f64) -> Self {
        self.filament_prices.insert(filament_type.into(), price_per_kg);
        self
    }

    /// Validate and coerce into a [`NormalizedJob`].
    ///
    /// Checks run in a fixed order and stop at the first failure: print time,
    /// filament type, weight, number of prints, delivery type.
    pub fn normalize(&self) -> PricingResult<NormalizedJob> {
        let printing_time_hours = required_positive(
            self.printing_time_hours.as_ref(),
            "printing_time_hours",
            "Print time must be greater than 0",
        )?;

        let filament_type = match self.filament_type.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(PricingError::missing_field("filament_type")),
        };
        let prices = merge_prices(default_prices(), &self.filament_prices);
        let price_per_kg = prices.price_per_kg(&filament_type)?;

        let filament_weight_grams = required_positive(
            self.filament_weight_grams.as_ref(),
            "filament_weight_grams",
            "Weight must be greater than 0",
        )?;

        let raw_count = self
            .number_of_prints
            .as_ref()
            .ok_or_else(|| PricingError::missing_field("number_of_prints"))?;
        let count = raw_count.value().map(f64::trunc).unwrap_or(0.0);
        if count < 1.0 {
            return Err(PricingError::invalid_input(
                "number_of_prints",
                display_raw(raw_count),
                "Number of prints must be at least 1",
            ));
        }
        if count > f64::from(u32::MAX) {
            return Err(PricingError::invalid_input(
                "number_of_prints",
                display_raw(raw_count),
                format!("Number of prints must not exceed {}", u32::MAX),
            ));
        }

        let delivery_type = match self.delivery_type.as_deref().map(str::trim) {
            None | Some("") => DeliveryType::default(),
            Some(code) => code.parse()?,
        };

        Ok(NormalizedJob {
            printing_time_hours,
            filament_type,
            price_per_kg: non_negative(price_per_kg),
            filament_weight_grams,
            number_of_prints: count as u32,
            design_hours: non_negative(number_or(self.design_hours.as_ref(), 0.0)),
            design_rate_per_hour: non_negative(number_or(
                self.design_rate_per_hour.as_ref(),
                DEFAULT_DESIGN_RATE,
            )),
            delivery_type,
            travel_distance_km: non_negative(number_or(self.travel_distance_km.as_ref(), 0.0)),
            extra_allowances: non_negative(number_or(self.extra_allowances.as_ref(), 0.0)),
            discount_percent: clamp_percent(number_or(self.discount_percent.as_ref(), 0.0)),
            profit_margin: non_negative(number_or(
                self.profit_margin.as_ref(),
                DEFAULT_PROFIT_MARGIN,
            )),
            material_markup: non_negative(number_or(
                self.material_markup.as_ref(),
                DEFAULT_MATERIAL_MARKUP,
            )),
            electricity_cost_per_kwh: non_negative(number_or(
                self.electricity_cost_per_kwh.as_ref(),
                DEFAULT_ELECTRICITY_COST,
            )),
        })
    }
}

fn display_raw(value: &Numeric) -> String {
    match value {
        Numeric::Number(n) => n.to_string(),
        Numeric::Text(s) => s.clone(),
    }
}

fn required_positive(value: Option<&Numeric>, field: &str, reason: &str) -> PricingResult<f64> {
    let raw = value.ok_or_else(|| PricingError::missing_field(field))?;
    match raw.value() {
        Some(v) if v > 0.0 => Ok(v),
        _ => Err(PricingError::invalid_input(field, display_raw(raw), reason)),
    }
}

/// Validated, coerced job parameters echoed back with the quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedJob {
    pub printing_time_hours: f64,
    pub filament_type: String,
    /// Effective price per kg after overrides
    pub price_per_kg: f64,
    pub filament_weight_grams: f64,
    pub number_of_prints: u32,
    pub design_hours: f64,
    pub design_rate_per_hour: f64,
    pub delivery_type: DeliveryType,
    pub travel_distance_km: f64,
    pub extra_allowances: f64,
    pub discount_percent: f64,
    pub profit_margin: f64,
    pub material_markup: f64,
    pub electricity_cost_per_kwh: f64,
}

/// Cost of a single print.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerPrintCost {
    pub material_raw: f64,
    pub material_with_markup: f64,
    pub electricity: f64,
    pub cost_before_margin: f64,
    pub cost_with_margin: f64,
}

impl PerPrintCost {
    /// Every figure rounded to cents, for display
    pub fn rounded(&self) -> Self {
        PerPrintCost {
            material_raw: round_money(self.material_raw),
            material_with_markup: round_money(self.material_with_markup),
            electricity: round_money(self.electricity),
            cost_before_margin: round_money(self.cost_before_margin),
            cost_with_margin: round_money(self.cost_with_margin),
        }
    }
}

/// Drying surcharge split into its parts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DryingCost {
    pub applied: bool,
    pub fixed: f64,
    pub variable: f64,
    pub total: f64,
}

/// Batch totals, rounded to cents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrintTotals {
    pub prints_total: f64,
    pub design_total: f64,
    pub drying: DryingCost,
    pub extra_allowances: f64,
    pub subtotal_before_delivery: f64,
    pub delivery_cost: f64,
    pub subtotal: f64,
    pub discount_percent: f64,
    pub discount_value: f64,
    pub total_final: f64,
    /// Informational: discount + 5 points, applied to the subtotal
    pub soft_discount_percent: f64,
    pub soft_discount_value: f64,
    pub total_with_soft_discount: f64,
}

impl PrintTotals {
    pub fn drying_total(&self) -> f64 {
        self.drying.total
    }
}

/// Full breakdown for one print batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintQuote {
    pub input: NormalizedJob,
    /// Per-print figures rounded to cents
    pub per_print: PerPrintCost,
    /// Unrounded per-print figures; batch totals are built from these
    pub per_print_exact: PerPrintCost,
    pub totals: PrintTotals,
    pub notes: Vec<String>,
}

/// Price one print batch.
///
/// # Returns
///
/// * `Ok(PrintQuote)` - Breakdown with notes
/// * `Err(PricingError)` - First validation failure
pub fn calculate(params: &PrintJobParameters) -> PricingResult<PrintQuote> {
    let job = params.normalize()?;
    let quote = calculate_normalized(job);
    debug!(
        filament = %quote.input.filament_type,
        count = quote.input.number_of_prints,
        total_final = quote.totals.total_final,
        "Calculated print quote"
    );
    Ok(quote)
}

fn calculate_normalized(job: NormalizedJob) -> PrintQuote {
    let count = f64::from(job.number_of_prints);

    let material_raw = job.filament_weight_grams * (job.price_per_kg / 1000.0);
    let material_with_markup = material_raw * (1.0 + job.material_markup);
    let electricity = job.printing_time_hours * PRINTER_POWER_KW * job.electricity_cost_per_kwh;
    let cost_before_margin = material_with_markup + electricity;
    let cost_with_margin = cost_before_margin * (1.0 + job.profit_margin);

    let per_print_exact = PerPrintCost {
        material_raw,
        material_with_markup,
        electricity,
        cost_before_margin,
        cost_with_margin,
    };

    let prints_total = round_money(cost_with_margin * count);
    let design_total = round_money(job.design_hours * job.design_rate_per_hour);

    let drying = if requires_drying(&job.filament_type) {
        let variable = round_money(DRYING_COST_PER_PRINT * count);
        DryingCost {
            applied: true,
            fixed: DRYING_FIXED_COST,
            variable,
            total: round_money(DRYING_FIXED_COST + variable),
        }
    } else {
        DryingCost::default()
    };

    let extra_allowances = round_money(job.extra_allowances);
    let subtotal_before_delivery = round_money(prints_total + design_total + drying.total + extra_allowances);
    let delivery_cost = job.delivery_type.single_print_cost(subtotal_before_delivery);
    let subtotal = round_money(subtotal_before_delivery + delivery_cost);

    let discount_value = round_money(subtotal * job.discount_percent / 100.0);
    let total_final = round_money(subtotal - discount_value);

    let soft_discount_percent = clamp_percent(job.discount_percent + SOFT_DISCOUNT_BONUS);
    let soft_discount_value = round_money(subtotal * soft_discount_percent / 100.0);
    let total_with_soft_discount = round_money(subtotal - soft_discount_value);

    let discount_percent = job.discount_percent;
    let notes = job_notes(&job, &drying);

    PrintQuote {
        input: job,
        per_print: per_print_exact.rounded(),
        per_print_exact,
        totals: PrintTotals {
            prints_total,
            design_total,
            drying,
            extra_allowances,
            subtotal_before_delivery,
            delivery_cost,
            subtotal,
            discount_percent,
            discount_value,
            total_final,
            soft_discount_percent,
            soft_discount_value,
            total_with_soft_discount,
        },
        notes,
    }
}

fn job_notes(job: &NormalizedJob, drying: &DryingCost) -> Vec<String> {
    let mut notes = vec![
        format!(
            "Material markup of {} applied to filament cost",
            format_percent(job.material_markup * 100.0)
        ),
        format!(
            "Profit margin of {} applied to production cost",
            format_percent(job.profit_margin * 100.0)
        ),
        format!("Design time billed at {}/h", format_eur(job.design_rate_per_hour)),
    ];

    if drying.applied {
        notes.push(format!(
            "Drying surcharge for {}: {} per batch + {} per print",
            job.filament_type,
            format_eur(DRYING_FIXED_COST),
            format_eur(DRYING_COST_PER_PRINT)
        ));
    } else {
        notes.push(format!("No drying surcharge for {}", job.filament_type));
    }

    if job.delivery_type == DeliveryType::Post {
        notes.push(format!(
            "Post delivery: {} below a {} subtotal, {} from {}",
            format_eur(POST_COST_SMALL_ORDER),
            format_eur(POST_THRESHOLD),
            format_eur(POST_COST_LARGE_ORDER),
            format_eur(POST_THRESHOLD),
        ));
    }

    notes.push("Prices exclude VAT".to_string());
    notes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pla_example() -> PrintJobParameters {
        PrintJobParameters::new(2.0, "PLA Basic", 100.0, 1)
            .with_profit_margin(0.25)
            .with_material_markup(0.2)
            .with_electricity_cost(0.12)
    }

    // Zero-cost prints so the subtotal is driven by extra allowances alone
    fn free_prints(extra: f64) -> PrintJobParameters {
        PrintJobParameters::new(1.0, "PLA Basic", 10.0, 1)
            .with_filament_price("PLA Basic", 0.0)
            .with_electricity_cost(0.0)
            .with_extra_allowances(extra)
            .with_delivery(DeliveryType::Post)
    }

    #[test]
    fn test_pla_basic_example() {
        let quote = calculate(&pla_example()).unwrap();

        assert!((quote.per_print_exact.material_raw - 2.338).abs() < 1e-12);
        assert_eq!(quote.per_print.material_raw, 2.34);
        assert_eq!(quote.per_print.material_with_markup, 2.81);
        assert_eq!(quote.per_print.electricity, 0.24);
        assert_eq!(quote.per_print.cost_before_margin, 3.05);
        assert_eq!(quote.per_print.cost_with_margin, 3.81);
        assert_eq!(quote.totals.prints_total, 3.81);
        assert_eq!(quote.totals.delivery_cost, 0.0);
        assert_eq!(quote.totals.subtotal, 3.81);
        assert_eq!(quote.totals.total_final, 3.81);
        assert_eq!(quote.input.delivery_type, DeliveryType::Pickup);
    }

    #[test]
    fn test_deterministic() {
        let params = pla_example().with_design(1.5, 42.0).with_discount(7.5);
        let a = calculate(&params).unwrap();
        let b = calculate(&params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_drying_only_for_drying_set() {
        let petg = calculate(&PrintJobParameters::new(1.0, "PETG", 50.0, 4)).unwrap();
        assert!(petg.totals.drying.applied);
        assert_eq!(petg.totals.drying.variable, 0.2);
        assert_eq!(petg.totals.drying_total(), 5.2);

        for filament in ["PLA Basic", "ABS", "PETG-CF", "ASA"] {
            let quote = calculate(&PrintJobParameters::new(1.0, filament, 50.0, 4)).unwrap();
            assert_eq!(quote.totals.drying_total(), 0.0, "{filament}");
        }
    }

    #[test]
    fn test_post_threshold() {
        let below = calculate(&free_prints(49.99)).unwrap();
        assert_eq!(below.totals.subtotal_before_delivery, 49.99);
        assert_eq!(below.totals.delivery_cost, 7.0);

        let at = calculate(&free_prints(50.0)).unwrap();
        assert_eq!(at.totals.delivery_cost, 5.0);

        let above = calculate(&free_prints(50.01)).unwrap();
        assert_eq!(above.totals.delivery_cost, 5.0);
        assert!(above.notes.iter().any(|n| n.starts_with("Post delivery")));
    }

    #[test]
    fn test_discount_clamped() {
        let negative = calculate(&free_prints(100.0).with_discount(-10.0)).unwrap();
        assert_eq!(negative.totals.discount_percent, 0.0);
        assert_eq!(negative.totals.discount_value, 0.0);
        assert_eq!(negative.totals.total_final, negative.totals.subtotal);

        let excessive = calculate(&free_prints(100.0).with_discount(150.0)).unwrap();
        assert_eq!(excessive.totals.discount_percent, 100.0);
        assert_eq!(excessive.totals.total_final, 0.0);
    }

    #[test]
    fn test_soft_discount_is_separate() {
        let quote = calculate(&free_prints(95.0).with_discount(10.0)).unwrap();
        // 95 + 5 post = 100
        assert_eq!(quote.totals.subtotal, 100.0);
        assert_eq!(quote.totals.total_final, 90.0);
        assert_eq!(quote.totals.soft_discount_percent, 15.0);
        assert_eq!(quote.totals.total_with_soft_discount, 85.0);
    }

    #[test]
    fn test_design_and_extras_in_subtotal() {
        let params = PrintJobParameters::new(1.0, "PLA Basic", 10.0, 2)
            .with_filament_price("PLA Basic", 0.0)
            .with_electricity_cost(0.0)
            .with_design(2.0, 40.0)
            .with_extra_allowances(3.5);
        let quote = calculate(&params).unwrap();
        assert_eq!(quote.totals.design_total, 80.0);
        assert_eq!(quote.totals.subtotal_before_delivery, 83.5);
    }

    #[test]
    fn test_validation_order() {
        let empty = PrintJobParameters::default();
        assert_eq!(
            calculate(&empty).unwrap_err(),
            PricingError::missing_field("printing_time_hours")
        );

        let mut params = PrintJobParameters::new(0.0, "Nylon", 0.0, 0);
        assert_eq!(calculate(&params).unwrap_err().error_code(), "INVALID_INPUT");

        params.printing_time_hours = Some(1.0.into());
        assert_eq!(calculate(&params).unwrap_err().error_code(), "UNKNOWN_FILAMENT");

        params.filament_type = Some("PLA Basic".to_string());
        match calculate(&params).unwrap_err() {
            PricingError::InvalidInput { field, .. } => assert_eq!(field, "filament_weight_grams"),
            other => panic!("unexpected error: {other:?}"),
        }

        params.filament_weight_grams = Some(10.0.into());
        match calculate(&params).unwrap_err() {
            PricingError::InvalidInput { field, .. } => assert_eq!(field, "number_of_prints"),
            other => panic!("unexpected error: {other:?}"),
        }

        params.number_of_prints = Some(1.0.into());
        params.delivery_type = Some("drone".to_string());
        assert_eq!(calculate(&params).unwrap_err().error_code(), "INVALID_DELIVERY_TYPE");
    }

    #[test]
    fn test_lenient_numbers() {
        let json = r#"{
            "printing_time_hours": "1,5",
            "filament_type": "PLA Basic",
            "filament_weight_grams": "100",
            "number_of_prints": "2.9",
            "profit_margin": "abc",
            "design_rate_per_hour": -12
        }"#;
        let params: PrintJobParameters = serde_json::from_str(json).unwrap();
        let job = params.normalize().unwrap();
        assert_eq!(job.printing_time_hours, 1.5);
        assert_eq!(job.number_of_prints, 2);
        assert_eq!(job.profit_margin, DEFAULT_PROFIT_MARGIN);
        assert_eq!(job.design_rate_per_hour, 0.0);
    }

    #[test]
    fn test_override_price_does_not_leak() {
        let cheap = calculate(&pla_example().with_filament_price("PLA Basic", 10.0)).unwrap();
        assert_eq!(cheap.per_print.material_raw, 1.0);
        let normal = calculate(&pla_example()).unwrap();
        assert!((normal.per_print_exact.material_raw - 2.338).abs() < 1e-12);
    }

    #[test]
    fn test_batch_total_uses_unrounded_unit_cost() {
        // 1 g × 23.38 €/kg × 1.2 + 0.1 h × 0.22 €/kWh = 0.050056, × 1.25 = 0.06257
        let quote = calculate(&PrintJobParameters::new(0.1, "PLA Basic", 1.0, 1000)).unwrap();
        assert_eq!(quote.per_print.cost_with_margin, 0.06);
        assert!((quote.per_print_exact.cost_with_margin - 0.06257).abs() < 1e-12);
        assert_eq!(quote.totals.prints_total, 62.57);
        assert_eq!(quote.totals.subtotal_before_delivery, 62.57);
    }

    #[test]
    fn test_count_beyond_u32_rejected() {
        let mut params = PrintJobParameters::new(1.0, "PLA Basic", 10.0, 1);
        params.number_of_prints = Some(1e12.into());
        match calculate(&params).unwrap_err() {
            PricingError::InvalidInput { field, .. } => assert_eq!(field, "number_of_prints"),
            other => panic!("unexpected error: {other:?}"),
        }

        params.number_of_prints = Some(f64::from(u32::MAX).into());
        assert_eq!(calculate(&params).unwrap().input.number_of_prints, u32::MAX);
    }
}
