//! # quote_core - 3D Print Quote Engine
//!
//! `quote_core` prices 3D print jobs for a print shop: a single batch of
//! identical prints, or a full quote of several print items plus custom line
//! items, price rules, delivery, discount and VAT. All inputs and outputs are
//! JSON-serializable, so the same calls serve a CLI, a web backend or a
//! script.
//!
//! ## Design Philosophy
//!
//! - **Stateless**: Pure functions that take input and return results
//! - **JSON-First**: All types implement Serialize/Deserialize
//! - **Lenient Input**: Numbers may arrive as strings with a decimal comma
//! - **Rich Errors**: Structured error types, not just strings
//!
//! ## Quick Start
//!
//! ```rust
//! use quote_core::calculations::delivery::DeliveryType;
//! use quote_core::calculations::print_quote::{calculate, PrintJobParameters};
//!
//! let params = PrintJobParameters::new(1.5, "PETG", 80.0, 4).with_delivery(DeliveryType::Post);
//! let quote = calculate(&params).unwrap();
//!
//! // Serialize to JSON for storage or transmission
//! let json = serde_json::to_string_pretty(&quote).unwrap();
//! assert!(json.contains("total_final"));
//! ```
//!
//! ## Modules
//!
//! - [`calculations`] - Single-print quotes, item costs, price rules, full quotes
//! - [`settings`] - Pricing settings and the per-quote form overlay
//! - [`filament`] - Filament price table and drying policy
//! - [`money`] - Cent rounding and formatting
//! - [`numeric`] - Lenient number and flag parsing
//! - [`notes`] - Ordered, de-duplicated quote notes
//! - [`errors`] - Structured error types
//! - [`file_io`] - Loading requests and atomic result saves

pub mod calculations;
pub mod errors;
pub mod filament;
pub mod file_io;
pub mod money;
pub mod notes;
pub mod numeric;
pub mod settings;

// Re-export commonly used types at crate root for convenience
pub use calculations::print_quote::{PrintJobParameters, PrintQuote};
pub use calculations::quote::{calculate_quote, QuoteRequest, QuoteResult};
pub use errors::{PricingError, PricingResult};
pub use file_io::{load_job, load_request, save_result};
pub use settings::{PricingSettings, QuoteForm};
