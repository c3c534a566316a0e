//! Upstream quote payloads and the field normalizer.
//!
//! Quote providers are inconsistent about numeric fields: the same key can
//! arrive as a bare number (`"currentPrice": 150.0`), as a wrapped object
//! (`"currentPrice": {"raw": 150.0, "fmt": "150.00"}`), as `null`, or not at
//! all. Every such field is deserialized into a [`FieldValue`] so the
//! ambiguity never leaks past this module.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A numeric field whose upstream shape is not known ahead of time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum FieldValue {
    /// `null`, or the key was absent.
    #[default]
    Missing,
    /// A bare JSON number.
    Number(f64),
    /// An object exposing a numeric `raw` member.
    Wrapped { raw: f64 },
    /// Anything else (strings, booleans, arrays, objects without a numeric `raw`).
    Unrecognized,
}

impl FieldValue {
    /// The plain numeric value, if this field carries one.
    pub fn as_number(&self) -> Option<f64> {
        match *self {
            FieldValue::Number(n) | FieldValue::Wrapped { raw: n } => Some(n),
            FieldValue::Missing | FieldValue::Unrecognized => None,
        }
    }
}

/// Never fails: anything that is not a number or a `{ "raw": <number> }`
/// object carries no value. Strings are not coerced.
impl From<&Value> for FieldValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Missing,
            Value::Number(n) => n.as_f64().map_or(FieldValue::Unrecognized, FieldValue::Number),
            Value::Object(map) => match map.get("raw").and_then(Value::as_f64) {
                Some(raw) => FieldValue::Wrapped { raw },
                None => FieldValue::Unrecognized,
            },
            _ => FieldValue::Unrecognized,
        }
    }
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(FieldValue::from(&value))
    }
}

/// Quote summary record as returned by the upstream provider.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuoteRecord {
    #[serde(default)]
    pub financial_data: Option<FinancialData>,
    #[serde(default)]
    pub default_key_statistics: Option<KeyStatistics>,
    /// Requested alongside the other modules; not interpreted.
    #[serde(default)]
    pub summary_detail: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialData {
    #[serde(default)]
    pub current_price: FieldValue,
    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatistics {
    #[serde(default)]
    pub trailing_eps: FieldValue,
    #[serde(default)]
    pub price_to_book: FieldValue,
}

impl RawQuoteRecord {
    pub fn current_price(&self) -> Option<f64> {
        self.financial_data
            .as_ref()
            .and_then(|f| f.current_price.as_number())
    }

    /// Reporting currency; empty strings count as absent.
    pub fn currency(&self) -> Option<&str> {
        self.financial_data
            .as_ref()
            .and_then(|f| f.currency.as_deref())
            .filter(|c| !c.is_empty())
    }

    pub fn trailing_eps(&self) -> Option<f64> {
        self.default_key_statistics
            .as_ref()
            .and_then(|s| s.trailing_eps.as_number())
    }

    pub fn price_to_book(&self) -> Option<f64> {
        self.default_key_statistics
            .as_ref()
            .and_then(|s| s.price_to_book.as_number())
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn normalize(value: Value) -> Option<f64> {
        FieldValue::from(&value).as_number()
    }

    #[test]
    fn test_normalize_null_and_absent() {
        assert_eq!(FieldValue::default().as_number(), None);
        assert_eq!(FieldValue::from(&Value::Null), FieldValue::Missing);
        assert_eq!(normalize(Value::Null), None);
    }

    #[test]
    fn test_normalize_bare_number() {
        assert_eq!(normalize(json!(42)), Some(42.0));
        assert_eq!(normalize(json!(-1.5)), Some(-1.5));
    }

    #[test]
    fn test_normalize_wrapped_number() {
        assert_eq!(normalize(json!({"raw": 42})), Some(42.0));
        assert_eq!(normalize(json!({"raw": 3.5, "fmt": "3.50"})), Some(3.5));
    }

    #[test]
    fn test_normalize_unrecognized_shapes() {
        assert_eq!(normalize(json!({})), None);
        assert_eq!(normalize(json!("42")), None);
        assert_eq!(normalize(json!({"raw": "42"})), None);
        assert_eq!(normalize(json!([42])), None);
        assert_eq!(normalize(json!(true)), None);
        assert_eq!(FieldValue::from(&json!("42")), FieldValue::Unrecognized);
    }

    #[test]
    fn test_record_with_mixed_shapes() {
        let record: RawQuoteRecord = serde_json::from_value(json!({
            "financialData": { "currentPrice": 150.0, "currency": "EUR" },
            "defaultKeyStatistics": {
                "trailingEps": { "raw": 5.0, "fmt": "5.00" },
                "priceToBook": "n/a"
            }
        }))
        .unwrap();

        assert_eq!(record.current_price(), Some(150.0));
        assert_eq!(record.currency(), Some("EUR"));
        assert_eq!(record.trailing_eps(), Some(5.0));
        assert_eq!(record.price_to_book(), None);
    }

    #[test]
    fn test_record_missing_blocks() {
        let record: RawQuoteRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record.current_price(), None);
        assert_eq!(record.currency(), None);
        assert_eq!(record.trailing_eps(), None);
        assert_eq!(record.price_to_book(), None);
    }

    #[test]
    fn test_record_null_fields_and_odd_currency() {
        let record: RawQuoteRecord = serde_json::from_value(json!({
            "financialData": { "currentPrice": null, "currency": 840 },
            "defaultKeyStatistics": { "trailingEps": null }
        }))
        .unwrap();

        assert_eq!(record.current_price(), None);
        assert_eq!(record.currency(), None);
        assert_eq!(record.trailing_eps(), None);
    }

    #[test]
    fn test_empty_currency_is_absent() {
        let record: RawQuoteRecord = serde_json::from_value(json!({
            "financialData": { "currentPrice": { "raw": 10 }, "currency": "" }
        }))
        .unwrap();

        assert_eq!(record.current_price(), Some(10.0));
        assert_eq!(record.currency(), None);
    }
}
