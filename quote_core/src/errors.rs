//! # Error Types
//!
//! Structured error types for quote_core. Errors carry enough context for a
//! front end to show a precise message next to the offending print item, and
//! they serialize cleanly so the CLI can emit them as JSON.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::errors::{PricingError, PricingResult};
//!
//! fn validate_weight(weight_g: f64) -> PricingResult<()> {
//!     if weight_g <= 0.0 {
//!         return Err(PricingError::invalid_input(
//!             "filament_weight_grams",
//!             weight_g.to_string(),
//!             "Weight must be greater than 0",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for quote_core operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Structured error type for pricing operations.
///
/// Validation variants are raised by the single-print calculator and end up as
/// per-item errors in a quote. `InvalidSettings` is the only variant that
/// aborts a whole quote.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum PricingError {
    /// An input value is invalid (out of range, not a number, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Filament type not present in the effective price table
    #[error("Unknown filament type '{filament_type}'. Supported types: {}", supported.join(", "))]
    UnknownFilament {
        filament_type: String,
        supported: Vec<String>,
    },

    /// Delivery type outside afhaling/post/24h/48h
    #[error("Invalid delivery type '{value}'. Expected one of: afhaling, post, 24h, 48h")]
    InvalidDeliveryType { value: String },

    /// Global settings are unusable; the whole quote is rejected
    #[error("Invalid settings for '{field}': {reason}")]
    InvalidSettings { field: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },
}

impl PricingError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        PricingError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        PricingError::MissingField {
            field: field.into(),
        }
    }

    /// Create an UnknownFilament error; the supported list is sorted here
    pub fn unknown_filament(filament_type: impl Into<String>, mut supported: Vec<String>) -> Self {
        supported.sort();
        PricingError::UnknownFilament {
            filament_type: filament_type.into(),
            supported,
        }
    }

    /// Create an InvalidSettings error
    pub fn invalid_settings(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PricingError::InvalidSettings {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        PricingError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            PricingError::InvalidInput { .. } => "INVALID_INPUT",
            PricingError::MissingField { .. } => "MISSING_FIELD",
            PricingError::UnknownFilament { .. } => "UNKNOWN_FILAMENT",
            PricingError::InvalidDeliveryType { .. } => "INVALID_DELIVERY_TYPE",
            PricingError::InvalidSettings { .. } => "INVALID_SETTINGS",
            PricingError::FileError { .. } => "FILE_ERROR",
            PricingError::SerializationError { .. } => "SERIALIZATION_ERROR",
            PricingError::VersionMismatch { .. } => "VERSION_MISMATCH",
        }
    }
}

impl From<serde_json::Error> for PricingError {
    fn from(e: serde_json::Error) -> Self {
        PricingError::SerializationError {
            reason: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let error = PricingError::invalid_input("filament_weight_grams", "-5", "Weight must be greater than 0");
        let json = serde_json::to_string(&error).unwrap();
        let roundtrip: PricingError = serde_json::from_str(&json).unwrap();
        assert_eq!(error, roundtrip);
    }

    #[test]
    fn test_unknown_filament_lists_sorted_types() {
        let error = PricingError::unknown_filament(
            "Nylon",
            vec!["TPU".to_string(), "ABS".to_string(), "PETG".to_string()],
        );
        assert_eq!(
            error.to_string(),
            "Unknown filament type 'Nylon'. Supported types: ABS, PETG, TPU"
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(PricingError::missing_field("test").error_code(), "MISSING_FIELD");
        assert_eq!(
            PricingError::invalid_settings("post_cost", "negative").error_code(),
            "INVALID_SETTINGS"
        );
    }
}
