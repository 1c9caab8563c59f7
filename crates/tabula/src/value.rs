//! Runtime cell values.
//!
//! Rows reach the engine as loosely typed key/value maps (ORM results, decoded
//! JSON, YAML fixtures). [`CellValue`] is the closed set of shapes a cell can
//! take, so type inference and formatting dispatch stay exhaustive.
//!
//! Values serialize through [`serde_json::Value`], which means a [`Row`] can be
//! read from any serde format:
//!
//! ```rust
//! use tabula::{CellValue, Row};
//!
//! let row: Row = serde_json::from_str(r#"{"name": "Web", "price": 1000}"#).unwrap();
//! assert_eq!(row["name"], CellValue::from("Web"));
//! assert_eq!(row["price"].as_f64(), Some(1000.0));
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// A single data row: column key to raw value.
pub type Row = BTreeMap<String, CellValue>;

/// Serialization format for [`CellValue::Date`].
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Numeric value, keeping integers exact.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl Number {
    /// Converts to `f64` for arithmetic and formatting.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{}", n),
            Number::U64(n) => write!(f, "{}", n),
            Number::F64(n) => write!(f, "{}", n),
        }
    }
}

/// A raw cell value.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Json", into = "Json")]
pub enum CellValue {
    /// Absent value.
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    /// An already-typed date or timestamp.
    Date(NaiveDateTime),
    List(Vec<CellValue>),
    Map(BTreeMap<String, CellValue>),
}

impl CellValue {
    /// Returns `true` for values that display as "not set": null, empty or
    /// whitespace-only strings, and empty lists or maps.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::String(s) => s.trim().is_empty(),
            CellValue::List(items) => items.is_empty(),
            CellValue::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[CellValue]> {
        match self {
            CellValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, CellValue>> {
        match self {
            CellValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Numeric view of the value. Strings are parsed after stripping
    /// thousands separators and surrounding whitespace.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(n.to_f64()),
            CellValue::String(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Plain-text rendering used for sniffing, merging and fallbacks.
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::String(s) => s.clone(),
            CellValue::Date(d) => d.format(DATE_TIME_FORMAT).to_string(),
            CellValue::List(items) => items
                .iter()
                .map(CellValue::to_display_string)
                .collect::<Vec<_>>()
                .join(", "),
            CellValue::Map(_) => Json::from(self.clone()).to_string(),
        }
    }

    /// Length of the value's JSON serialization.
    pub fn serialized_len(&self) -> usize {
        match self {
            CellValue::String(s) => s.len() + 2,
            other => Json::from(other.clone()).to_string().len(),
        }
    }

    /// Value equality used for grouping: like `==`, except numbers compare by
    /// magnitude across integer and float representations.
    pub fn loosely_equals(&self, other: &CellValue) -> bool {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.to_f64() == b.to_f64(),
            (a, b) => a == b,
        }
    }

    /// Returns `true` when the value reads back unchanged from its JSON form.
    /// Dates come back as strings, unsigned integers that fit `i64` as signed
    /// ones, and non-finite floats as null.
    pub fn is_json_exact(&self) -> bool {
        match self {
            CellValue::Date(_) => false,
            CellValue::Number(Number::U64(n)) => *n > i64::MAX as u64,
            CellValue::Number(Number::F64(n)) => n.is_finite(),
            CellValue::List(items) => items.iter().all(CellValue::is_json_exact),
            CellValue::Map(map) => map.values().all(CellValue::is_json_exact),
            _ => true,
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "bool",
            CellValue::Number(_) => "number",
            CellValue::String(_) => "string",
            CellValue::Date(_) => "date",
            CellValue::List(_) => "list",
            CellValue::Map(_) => "map",
        }
    }
}

/// Parses a human-entered number such as `"1,000"` or `" -12.5 "`.
pub fn parse_numeric(s: &str) -> Option<f64> {
    let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<Json> for CellValue {
    fn from(json: Json) -> Self {
        match json {
            Json::Null => CellValue::Null,
            Json::Bool(b) => CellValue::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CellValue::Number(Number::I64(i))
                } else if let Some(u) = n.as_u64() {
                    CellValue::Number(Number::U64(u))
                } else {
                    CellValue::Number(Number::F64(n.as_f64().unwrap_or(0.0)))
                }
            }
            Json::String(s) => CellValue::String(s),
            Json::Array(items) => CellValue::List(items.into_iter().map(CellValue::from).collect()),
            Json::Object(map) => {
                CellValue::Map(map.into_iter().map(|(k, v)| (k, CellValue::from(v))).collect())
            }
        }
    }
}

impl From<CellValue> for Json {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Null => Json::Null,
            CellValue::Bool(b) => Json::Bool(b),
            CellValue::Number(Number::I64(n)) => Json::from(n),
            CellValue::Number(Number::U64(n)) => Json::from(n),
            CellValue::Number(Number::F64(n)) => serde_json::Number::from_f64(n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            CellValue::String(s) => Json::String(s),
            CellValue::Date(d) => Json::String(d.format(DATE_TIME_FORMAT).to_string()),
            CellValue::List(items) => Json::Array(items.into_iter().map(Json::from).collect()),
            CellValue::Map(map) => {
                Json::Object(map.into_iter().map(|(k, v)| (k, Json::from(v))).collect())
            }
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(Number::I64(n as i64))
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(Number::I64(n))
    }
}

impl From<u64> for CellValue {
    fn from(n: u64) -> Self {
        CellValue::Number(Number::U64(n))
    }
}

impl From<usize> for CellValue {
    fn from(n: usize) -> Self {
        CellValue::Number(Number::U64(n as u64))
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(Number::F64(n))
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(d: NaiveDateTime) -> Self {
        CellValue::Date(d)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(d: NaiveDate) -> Self {
        CellValue::Date(d.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<Vec<CellValue>> for CellValue {
    fn from(items: Vec<CellValue>) -> Self {
        CellValue::List(items)
    }
}

impl From<Row> for CellValue {
    fn from(map: Row) -> Self {
        CellValue::Map(map)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

/// Builds a [`Row`] from `(key, value)` pairs.
///
/// ```rust
/// use tabula::{row, CellValue};
///
/// let r = row([("first_name", "John"), ("last_name", "Doe")]);
/// assert_eq!(r["last_name"], CellValue::from("Doe"));
/// ```
pub fn row<K, V, I>(pairs: I) -> Row
where
    K: Into<String>,
    V: Into<CellValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_values() {
        assert!(CellValue::Null.is_empty());
        assert!(CellValue::from("").is_empty());
        assert!(CellValue::from("   ").is_empty());
        assert!(CellValue::List(vec![]).is_empty());
        assert!(!CellValue::from("x").is_empty());
        assert!(!CellValue::from(0).is_empty());
        assert!(!CellValue::from(false).is_empty());
    }

    #[test]
    fn json_conversion_keeps_integers_exact() {
        let value = CellValue::from(json!(1000));
        assert_eq!(value, CellValue::Number(Number::I64(1000)));
        assert_eq!(value.to_display_string(), "1000");

        let value = CellValue::from(json!(12.5));
        assert_eq!(value, CellValue::Number(Number::F64(12.5)));
    }

    #[test]
    fn nested_json_becomes_list_and_map() {
        let value = CellValue::from(json!({"items": [{"a": 1}, "b"]}));
        let map = value.as_map().unwrap();
        let items = map["items"].as_list().unwrap();
        assert_eq!(items.len(), 2);
        assert!(items[0].as_map().is_some());
    }

    #[test]
    fn date_serializes_as_string() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let json = serde_json::to_value(CellValue::from(date)).unwrap();
        assert_eq!(json, json!("2024-04-01 00:00:00"));
    }

    #[test]
    fn json_exactness() {
        let date = CellValue::from(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        let lossy = [
            date.clone(),
            CellValue::from(3usize),
            CellValue::from(f64::NAN),
            CellValue::List(vec![CellValue::from("a"), date]),
        ];
        for value in &lossy {
            assert!(!value.is_json_exact(), "{:?}", value);
            assert_ne!(&CellValue::from(Json::from(value.clone())), value);
        }

        let exact = [
            CellValue::from("2024-04-01"),
            CellValue::from(-3),
            CellValue::from(u64::MAX),
            CellValue::from(2.5),
            CellValue::from(json!({"a": [1, null, true]})),
        ];
        for value in &exact {
            assert!(value.is_json_exact(), "{:?}", value);
            let text = serde_json::to_string(value).unwrap();
            assert_eq!(&serde_json::from_str::<CellValue>(&text).unwrap(), value);
        }
    }

    #[test]
    fn numeric_strings_parse() {
        assert_eq!(CellValue::from("1,000").as_f64(), Some(1000.0));
        assert_eq!(CellValue::from(" -12.5 ").as_f64(), Some(-12.5));
        assert_eq!(CellValue::from("abc").as_f64(), None);
        assert_eq!(CellValue::from("").as_f64(), None);
    }

    #[test]
    fn loose_equality_across_number_kinds() {
        let a = CellValue::Number(Number::I64(3));
        let b = CellValue::Number(Number::F64(3.0));
        assert_ne!(a, b);
        assert!(a.loosely_equals(&b));
        assert!(CellValue::Null.loosely_equals(&CellValue::Null));
    }

    #[test]
    fn row_deserializes_from_json() {
        let r: Row = serde_json::from_value(json!({"x": null, "y": [1, 2]})).unwrap();
        assert!(r["x"].is_null());
        assert_eq!(r["y"].to_display_string(), "1, 2");
    }
}
