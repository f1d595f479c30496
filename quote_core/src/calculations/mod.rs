//! # Pricing Calculations
//!
//! Each calculation follows the same pattern:
//!
//! - an input type (JSON-serializable, lenient about number formats)
//! - a result type (JSON-serializable, amounts rounded to cents)
//! - a pure function `input -> PricingResult<result>`
//!
//! ## Available Calculations
//!
//! - [`print_quote`] - Single print job with delivery and discount
//! - [`item_cost`] - One print item of a quote, margin policy resolved
//! - [`price_rules`] - Rule matching and specificity ranking
//! - [`quote`] - Whole quote: print items, custom lines, delivery, VAT, profit
//! - [`delivery`] - Delivery types and their costs

pub mod delivery;
pub mod item_cost;
pub mod price_rules;
pub mod print_quote;
pub mod quote;

use serde::{Deserialize, Serialize};

use crate::errors::PricingResult;

// Re-export commonly used types
pub use delivery::DeliveryType;
pub use item_cost::{calculate_item_cost, ItemCost, MarginMode, PrintItem};
pub use price_rules::{find_best_rule, PriceRule, RuleContext};
pub use print_quote::{PrintJobParameters, PrintQuote};
pub use quote::{calculate_quote, CustomItem, QuoteRequest, QuoteResult};

/// Any calculation the engine can run, tagged by `type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationItem {
    /// Single print job
    PrintJob(PrintJobParameters),
    /// Full quote
    Quote(QuoteRequest),
}

/// Output of [`CalculationItem::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CalculationOutput {
    PrintJob(PrintQuote),
    Quote(QuoteResult),
}

impl CalculationItem {
    /// Get the calculation type as a string
    pub fn calc_type(&self) -> &'static str {
        match self {
            CalculationItem::PrintJob(_) => "PrintJob",
            CalculationItem::Quote(_) => "Quote",
        }
    }

    pub fn run(&self) -> PricingResult<CalculationOutput> {
        match self {
            CalculationItem::PrintJob(params) => print_quote::calculate(params).map(CalculationOutput::PrintJob),
            CalculationItem::Quote(request) => quote::calculate_quote(request).map(CalculationOutput::Quote),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_calculation_dispatch() {
        let item: CalculationItem = serde_json::from_str(
            r#"{
                "type": "PrintJob",
                "printing_time_hours": 1,
                "filament_type": "PLA Basic",
                "filament_weight_grams": 100,
                "number_of_prints": 1
            }"#,
        )
        .unwrap();
        assert_eq!(item.calc_type(), "PrintJob");
        assert!(matches!(item.run().unwrap(), CalculationOutput::PrintJob(_)));

        let item: CalculationItem = serde_json::from_str(r#"{ "type": "Quote", "items": [] }"#).unwrap();
        assert_eq!(item.calc_type(), "Quote");
        match item.run().unwrap() {
            CalculationOutput::Quote(result) => assert_eq!(result.totals.total_final, 0.0),
            other => panic!("unexpected output {:?}", other),
        }
    }
}
