//! # Lenient Numeric Input
//!
//! Quote inputs come from web forms and a REST store, so numbers arrive as
//! JSON numbers, as strings, and with either `.` or `,` as decimal separator.
//! [`Numeric`] keeps the raw value; parsing happens at the point of use so each
//! field can apply its own default.
//!
//! ## Example
//!
//! ```rust
//! use quote_core::numeric::{parse_decimal, Numeric};
//!
//! assert_eq!(parse_decimal("12,5"), Some(12.5));
//! assert_eq!(Numeric::from("3,75").value(), Some(3.75));
//! assert_eq!(Numeric::from("abc").value(), None);
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A number as it arrived over the wire: either a JSON number or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    /// Parsed finite value, or `None` for empty/garbage/non-finite input
    pub fn value(&self) -> Option<f64> {
        match self {
            Numeric::Number(n) if n.is_finite() => Some(*n),
            Numeric::Number(_) => None,
            Numeric::Text(s) => parse_decimal(s),
        }
    }
}

impl From<f64> for Numeric {
    fn from(n: f64) -> Self {
        Numeric::Number(n)
    }
}

impl From<&str> for Numeric {
    fn from(s: &str) -> Self {
        Numeric::Text(s.to_string())
    }
}

/// Parse a decimal that may use a comma separator ("12,5" → 12.5).
///
/// Returns `None` for empty input or anything that does not parse to a finite
/// number.
pub fn parse_decimal(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Resolve an optional numeric field, falling back to `default` when the field
/// is absent or does not parse.
pub fn number_or(value: Option<&Numeric>, default: f64) -> f64 {
    value.and_then(Numeric::value).unwrap_or(default)
}

/// Resolve an optional numeric field to `Some(value)` only when it parses.
pub fn number(value: Option<&Numeric>) -> Option<f64> {
    value.and_then(Numeric::value)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim().to_ascii_lowercase();
            matches!(s.as_str(), "1" | "true" | "yes" | "on" | "ja")
        }
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Deserialize a flag that may be `true`, `1`, `"1"`, `"true"` or `"on"`.
/// Missing or null values are `false`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map(truthy).unwrap_or(false))
}

/// Deserialize an "active" flag: everything counts as active except the
/// explicit off values `"0"`, `0` and `false`.
pub fn lenient_active<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let s = s.trim();
            s != "0" && !s.eq_ignore_ascii_case("false")
        }
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::Bool(b)) => b,
        _ => true,
    })
}

/// Deserialize an optional record id given as a number or numeric string.
/// `null`, `""` and `0` all mean "not set".
pub fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let id = match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    Ok(id.filter(|id| *id != 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Flags {
        #[serde(default, deserialize_with = "lenient_bool")]
        flag: bool,
        #[serde(default = "default_true", deserialize_with = "lenient_active")]
        active: bool,
        #[serde(default, deserialize_with = "lenient_id")]
        id: Option<i64>,
    }

    fn default_true() -> bool {
        true
    }

    #[test]
    fn test_parse_decimal_comma() {
        assert_eq!(parse_decimal("12,5"), Some(12.5));
        assert_eq!(parse_decimal(" 0.22 "), Some(0.22));
        assert_eq!(parse_decimal(""), None);
        assert_eq!(parse_decimal("NaN"), None);
        assert_eq!(parse_decimal("inf"), None);
    }

    #[test]
    fn test_numeric_from_json() {
        let n: Numeric = serde_json::from_str("2.5").unwrap();
        assert_eq!(n.value(), Some(2.5));
        let t: Numeric = serde_json::from_str("\"2,5\"").unwrap();
        assert_eq!(t.value(), Some(2.5));
        assert_eq!(number_or(None, 7.0), 7.0);
        assert_eq!(number_or(Some(&Numeric::from("x")), 7.0), 7.0);
    }

    #[test]
    fn test_lenient_flags() {
        let f: Flags = serde_json::from_str(r#"{"flag": "1", "active": "0", "id": "12"}"#).unwrap();
        assert!(f.flag);
        assert!(!f.active);
        assert_eq!(f.id, Some(12));

        let f: Flags = serde_json::from_str(r#"{"flag": 0, "id": 0}"#).unwrap();
        assert!(!f.flag);
        assert!(f.active);
        assert_eq!(f.id, None);

        let f: Flags = serde_json::from_str(r#"{"active": "1", "id": null}"#).unwrap();
        assert!(f.active);
        assert_eq!(f.id, None);
    }
}
