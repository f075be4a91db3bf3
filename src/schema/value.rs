use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Local timestamps accepted by `FieldValue::as_date`, with optional fraction.
const LOCAL_STAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// The value held by a control or stored as an external dependency.
///
/// Deserializes from plain YAML/JSON scalars and lists. Dates are carried as
/// ISO text and parsed on demand by `as_date`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn empty_text() -> Self {
        FieldValue::Text(String::new())
    }

    /// Null or the empty string. Extraction treats these as "no value".
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Whether the value counts as "filled" for gating purposes.
    ///
    /// `false`, `0`, NaN, null and `""` are empty. Lists always count as
    /// filled, even when they hold no items.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Null => false,
            FieldValue::Bool(b) => *b,
            FieldValue::Int(n) => *n != 0,
            FieldValue::Float(n) => *n != 0.0 && !n.is_nan(),
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::List(_) => true,
        }
    }

    /// Numeric coercion: null and blank text are 0, unparseable text is NaN.
    pub fn as_number(&self) -> f64 {
        match self {
            FieldValue::Null => 0.0,
            FieldValue::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            FieldValue::Int(n) => *n as f64,
            FieldValue::Float(n) => *n,
            FieldValue::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            FieldValue::List(items) => match items.as_slice() {
                [] => 0.0,
                [single] => single.as_number(),
                _ => f64::NAN,
            },
        }
    }

    /// Equality where integers and floats with the same magnitude match.
    pub fn strict_eq(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Float(b)) | (FieldValue::Float(b), FieldValue::Int(a)) => {
                (*a as f64) == *b
            }
            _ => self == other,
        }
    }

    /// Parse the value as a calendar date, dropping any time component.
    pub fn as_date(&self) -> Option<NaiveDate> {
        let FieldValue::Text(raw) = self else {
            return None;
        };
        let raw = raw.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return Some(date);
        }
        if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
            return Some(stamp.date_naive());
        }
        LOCAL_STAMP_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
            .map(|stamp| stamp.date())
    }

    /// Length for text and list values; `None` for everything else.
    pub fn length(&self) -> Option<usize> {
        match self {
            FieldValue::Text(s) => Some(s.chars().count()),
            FieldValue::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Text used when the value is sent as a URL segment or query parameter.
    pub fn to_param_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::Float(n) => n.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items
                .iter()
                .map(FieldValue::to_param_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(n) => Value::from(*n),
            FieldValue::Float(n) => number_to_json(*n),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
        }
    }

    /// Convert a JSON value. Objects have no counterpart and are kept as
    /// their serialized text.
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::Int(i),
                None => FieldValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => FieldValue::Text(s.clone()),
            Value::Array(items) => FieldValue::List(items.iter().map(FieldValue::from_json).collect()),
            Value::Object(_) => FieldValue::Text(value.to_string()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// Integral values become JSON integers; non-finite values become null.
pub fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
