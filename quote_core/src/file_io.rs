//! # File I/O Module
//!
//! Reads pricing requests and writes results:
//! - **Atomic saves**: Write to .tmp, sync, rename to prevent corruption
//! - **Version validation**: Request files may carry a schema `version`
//!
//! ## File Format
//!
//! Requests and results are plain JSON. A quote request file holds a
//! [`QuoteRequest`]; a job file holds [`PrintJobParameters`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use quote_core::calculations::quote::calculate_quote;
//! use quote_core::file_io::{load_request, save_result};
//! use std::path::Path;
//!
//! let request = load_request(Path::new("quote.json"))?;
//! let result = calculate_quote(&request)?;
//!
//! // Save with atomic write
//! save_result(&result, Path::new("quote.result.json"))?;
//! # Ok::<(), quote_core::errors::PricingError>(())
//! ```

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::calculations::print_quote::PrintJobParameters;
use crate::calculations::quote::QuoteRequest;
use crate::errors::{PricingError, PricingResult};

/// Current request file schema version
pub const REQUEST_SCHEMA_VERSION: &str = "0.1.0";

fn read_json(path: &Path) -> PricingResult<Value> {
    let mut file = File::open(path).map_err(|e| {
        PricingError::file_error("open", path.display().to_string(), e.to_string())
    })?;

    let mut contents = String::new();
    file.read_to_string(&mut contents).map_err(|e| {
        PricingError::file_error("read", path.display().to_string(), e.to_string())
    })?;

    serde_json::from_str(&contents).map_err(|e| PricingError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Load a quote request from a file.
///
/// # Returns
///
/// * `Ok(QuoteRequest)` - Successfully loaded request
/// * `Err(PricingError::VersionMismatch)` - File version is incompatible
/// * `Err(PricingError::InvalidInput)` - `items` is not a list
/// * `Err(PricingError::SerializationError)` - Invalid JSON
/// * `Err(PricingError::FileError)` - I/O error
pub fn load_request(path: &Path) -> PricingResult<QuoteRequest> {
    let value = read_json(path)?;

    if let Some(version) = value.get("version").and_then(Value::as_str) {
        validate_version(version)?;
    }

    let request = QuoteRequest::from_json_value(value)?;
    debug!(path = %path.display(), items = request.items.len(), "Loaded quote request");
    Ok(request)
}

/// Load single-print job parameters from a file.
pub fn load_job(path: &Path) -> PricingResult<PrintJobParameters> {
    let value = read_json(path)?;
    Ok(serde_json::from_value(value)?)
}

/// Save any result to a file with atomic write semantics.
///
/// The save process:
/// 1. Serialize to pretty JSON
/// 2. Write to a temporary file (.tmp)
/// 3. Sync to disk (fsync)
/// 4. Rename .tmp over the target (atomic on most filesystems)
pub fn save_result<T: Serialize>(result: &T, path: &Path) -> PricingResult<()> {
    let json = serde_json::to_string_pretty(result).map_err(|e| PricingError::SerializationError {
        reason: e.to_string(),
    })?;

    let tmp_path = path.with_extension("json.tmp");

    let mut tmp_file = File::create(&tmp_path).map_err(|e| {
        PricingError::file_error("create temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.write_all(json.as_bytes()).map_err(|e| {
        PricingError::file_error("write temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    tmp_file.sync_all().map_err(|e| {
        PricingError::file_error("sync temp file", tmp_path.display().to_string(), e.to_string())
    })?;

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        PricingError::file_error("rename to final", path.display().to_string(), e.to_string())
    })?;

    debug!(path = %path.display(), "Saved result");
    Ok(())
}

/// Validate that a file version is compatible with the current schema.
fn validate_version(file_version: &str) -> PricingResult<()> {
    let mismatch = || PricingError::VersionMismatch {
        file_version: file_version.to_string(),
        expected_version: REQUEST_SCHEMA_VERSION.to_string(),
    };

    let file_parts: Vec<u32> = file_version
        .split('.')
        .filter_map(|p| p.trim().parse().ok())
        .collect();
    let current_parts: Vec<u32> = REQUEST_SCHEMA_VERSION
        .split('.')
        .filter_map(|p| p.parse().ok())
        .collect();

    if file_parts.is_empty() || current_parts.is_empty() {
        return Err(mismatch());
    }

    // Major version must match
    if file_parts[0] != current_parts[0] {
        return Err(mismatch());
    }

    // For 0.x versions a newer minor is not readable
    if current_parts[0] == 0 && file_parts.len() > 1 && current_parts.len() > 1 && file_parts[1] > current_parts[1] {
        return Err(mismatch());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        temp_dir().join(format!("quote_core_test_{}_{}.json", name, std::process::id()))
    }

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_load_request() {
        let path = temp_path("request");
        write(
            &path,
            r#"{
                "version": "0.1.0",
                "items": [ { "aantal": 2, "hours": 1, "weight": 50, "filamentType": "PLA Basic" } ],
                "settings": { "btw_percentage": 6 }
            }"#,
        );

        let request = load_request(&path).unwrap();
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.settings.vat_percent, 6.0);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_request_rejects_newer_schema() {
        let path = temp_path("newer");
        write(&path, r#"{ "version": "0.3.0", "items": [] }"#);

        let err = load_request(&path).unwrap_err();
        assert_eq!(err.error_code(), "VERSION_MISMATCH");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_errors() {
        let missing = temp_path("does_not_exist");
        assert_eq!(load_request(&missing).unwrap_err().error_code(), "FILE_ERROR");

        let path = temp_path("garbage");
        write(&path, "{ not json");
        assert_eq!(load_job(&path).unwrap_err().error_code(), "SERIALIZATION_ERROR");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_job() {
        let path = temp_path("job");
        write(
            &path,
            r#"{ "printing_time_hours": "1,5", "filament_type": "PETG", "filament_weight_grams": 80, "number_of_prints": 4 }"#,
        );

        let job = load_job(&path).unwrap();
        assert_eq!(job.filament_type.as_deref(), Some("PETG"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_atomic_save_creates_no_tmp_file() {
        let path = temp_path("atomic");
        let tmp_path = path.with_extension("json.tmp");

        let value = serde_json::json!({ "total_final": 12.5 });
        save_result(&value, &path).unwrap();

        assert!(!tmp_path.exists());
        let saved: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["total_final"], 12.5);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_version_validation() {
        assert!(validate_version(REQUEST_SCHEMA_VERSION).is_ok());
        assert!(validate_version("0.1.7").is_ok());
        assert!(validate_version("0.0.9").is_ok());
        assert!(validate_version("1.0.0").is_err());
        assert!(validate_version("0.2.0").is_err());
        assert!(validate_version("latest").is_err());
    }
}
