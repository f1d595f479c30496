//! # Filament Catalog
//!
//! Built-in filament prices (€ per kg) and the set of filaments that must be
//! dried before printing.
//!
//! The built-in table is an immutable base catalog. Prices coming from the
//! material catalog or from a matched price rule are applied with
//! [`merge_prices`], which always returns a new table.
//!
//! ## Example
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use quote_core::filament::{default_prices, merge_prices, requires_drying};
//!
//! let mut overrides = BTreeMap::new();
//! overrides.insert("PLA Basic".to_string(), 19.99);
//!
//! let table = merge_prices(default_prices(), &overrides);
//! assert_eq!(table.price_per_kg("PLA Basic").unwrap(), 19.99);
//! assert_eq!(default_prices().price_per_kg("PLA Basic").unwrap(), 23.38);
//! assert!(requires_drying("PETG"));
//! ```

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::errors::{PricingError, PricingResult};

/// Filaments that need a drying cycle before printing
pub const DRYING_REQUIRED: [&str; 3] = ["TPU", "PLA Wood", "PETG"];

/// Fixed part of the drying surcharge, charged once per batch
pub const DRYING_FIXED_COST: f64 = 5.00;

/// Variable part of the drying surcharge, per print
pub const DRYING_COST_PER_PRINT: f64 = 0.05;

static DEFAULT_PRICES: Lazy<FilamentPriceTable> = Lazy::new(|| {
    let prices: [(&str, f64); 12] = [
        ("PLA Basic", 23.38),
        ("PLA Matte", 24.99),
        ("PLA Silk", 27.99),
        ("PLA Wood", 32.99),
        ("PLA-CF", 34.99),
        ("PETG", 24.99),
        ("PETG-CF", 37.99),
        ("ABS", 22.99),
        ("ASA", 29.99),
        ("TPU", 39.99),
        ("PC", 39.99),
        ("PA-CF", 79.99),
    ];
    FilamentPriceTable(
        prices
            .iter()
            .map(|(name, price)| (name.to_string(), *price))
            .collect(),
    )
});

/// Whether this filament type carries the drying surcharge
pub fn requires_drying(filament_type: &str) -> bool {
    DRYING_REQUIRED.contains(&filament_type)
}

/// Filament type → price per kg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilamentPriceTable(BTreeMap<String, f64>);

impl FilamentPriceTable {
    /// Look up the price per kg, or fail listing every supported type
    pub fn price_per_kg(&self, filament_type: &str) -> PricingResult<f64> {
        self.0
            .get(filament_type)
            .copied()
            .ok_or_else(|| PricingError::unknown_filament(filament_type, self.types()))
    }

    pub fn contains(&self, filament_type: &str) -> bool {
        self.0.contains_key(filament_type)
    }

    /// All known filament types, sorted
    pub fn types(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The built-in base catalog
pub fn default_prices() -> &'static FilamentPriceTable {
    &DEFAULT_PRICES
}

/// Copy `base` and lay `overrides` over it.
///
/// Non-finite or negative override prices are ignored.
pub fn merge_prices(base: &FilamentPriceTable, overrides: &BTreeMap<String, f64>) -> FilamentPriceTable {
    let mut merged = base.0.clone();
    for (name, price) in overrides {
        if price.is_finite() && *price >= 0.0 {
            merged.insert(name.clone(), *price);
        }
    }
    FilamentPriceTable(merged)
}
