use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::schema::value::FieldValue;

/// A single validation rule attached to a control.
///
/// Schema files write these as `- rule: required` or
/// `- rule: min_length` / `length: 3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Validator {
    Required,
    RequiredTrue,
    Min { min: f64 },
    Max { max: f64 },
    MinLength { length: usize },
    MaxLength { length: usize },
    Pattern { pattern: String },
    Email,

    /// Lower date bound, maintained by date-constraint propagation.
    MinDate { date: NaiveDate },

    /// Upper date bound, maintained by date-constraint propagation.
    MaxDate { date: NaiveDate },
}

/// A failed validation, keyed the way hosts look messages up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "error", rename_all = "snake_case")]
pub enum ValidationError {
    Required,
    Min { min: f64, actual: f64 },
    Max { max: f64, actual: f64 },
    MinDate { min: NaiveDate, actual: NaiveDate },
    MaxDate { max: NaiveDate, actual: NaiveDate },
    MinLength { required: usize, actual: usize },
    MaxLength { required: usize, actual: usize },
    Pattern { pattern: String, actual: String },
    Email,

    /// Group-level: `desde` is greater than `hasta`.
    Range,
}

impl ValidationError {
    pub fn key(&self) -> &'static str {
        match self {
            ValidationError::Required => "required",
            ValidationError::Min { .. } | ValidationError::MinDate { .. } => "min",
            ValidationError::Max { .. } | ValidationError::MaxDate { .. } => "max",
            ValidationError::MinLength { .. } => "minlength",
            ValidationError::MaxLength { .. } => "maxlength",
            ValidationError::Pattern { .. } => "pattern",
            ValidationError::Email => "email",
            ValidationError::Range => "rangeError",
        }
    }
}

impl Validator {
    pub fn min_length(length: usize) -> Self {
        Validator::MinLength { length }
    }

    pub fn max_length(length: usize) -> Self {
        Validator::MaxLength { length }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Validator::Pattern {
            pattern: pattern.into(),
        }
    }

    pub fn is_date_bound(&self) -> bool {
        matches!(self, Validator::MinDate { .. } | Validator::MaxDate { .. })
    }

    /// Check one value. Every rule except `Required`/`RequiredTrue` passes on
    /// blank input.
    pub fn validate(&self, value: &FieldValue) -> Option<ValidationError> {
        match self {
            Validator::Required => is_empty_input(value).then_some(ValidationError::Required),
            Validator::RequiredTrue => {
                (value != &FieldValue::Bool(true)).then_some(ValidationError::Required)
            }
            Validator::Min { min } => {
                if is_empty_input(value) {
                    return None;
                }
                let actual = value.as_number();
                (!actual.is_nan() && actual < *min).then_some(ValidationError::Min { min: *min, actual })
            }
            Validator::Max { max } => {
                if is_empty_input(value) {
                    return None;
                }
                let actual = value.as_number();
                (!actual.is_nan() && actual > *max).then_some(ValidationError::Max { max: *max, actual })
            }
            Validator::MinLength { length } => {
                if is_empty_input(value) {
                    return None;
                }
                let actual = value.length()?;
                (actual < *length).then_some(ValidationError::MinLength {
                    required: *length,
                    actual,
                })
            }
            Validator::MaxLength { length } => {
                let actual = value.length()?;
                (actual > *length).then_some(ValidationError::MaxLength {
                    required: *length,
                    actual,
                })
            }
            Validator::Pattern { pattern } => {
                if is_empty_input(value) {
                    return None;
                }
                let regex = compiled_pattern(pattern)?;
                let actual = value.to_param_string();
                (!regex.is_match(&actual)).then(|| ValidationError::Pattern {
                    pattern: pattern.clone(),
                    actual,
                })
            }
            Validator::Email => {
                if is_empty_input(value) {
                    return None;
                }
                (!email_regex().is_match(&value.to_param_string())).then_some(ValidationError::Email)
            }
            Validator::MinDate { date } => {
                let actual = value.as_date()?;
                (actual < *date).then_some(ValidationError::MinDate { min: *date, actual })
            }
            Validator::MaxDate { date } => {
                let actual = value.as_date()?;
                (actual > *date).then_some(ValidationError::MaxDate { max: *date, actual })
            }
        }
    }
}

/// Run every validator in order, collecting all failures.
pub fn validate_all(validators: &[Validator], value: &FieldValue) -> Vec<ValidationError> {
    validators.iter().filter_map(|v| v.validate(value)).collect()
}

fn is_empty_input(value: &FieldValue) -> bool {
    match value {
        FieldValue::Null => true,
        other => other.length() == Some(0),
    }
}

/// Anchored regex for a `Pattern` rule, compiled once per distinct pattern.
/// Invalid patterns are logged the first time and yield `None` from then on.
pub fn compiled_pattern(pattern: &str) -> Option<Regex> {
    static PATTERNS: OnceLock<Mutex<HashMap<String, Option<Regex>>>> = OnceLock::new();
    let mut cache = PATTERNS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    cache
        .entry(pattern.to_string())
        .or_insert_with(|| match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => Some(regex),
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid pattern validator ignored");
                None
            }
        })
        .clone()
}

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r#"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"#,
        )
        .expect("email pattern is valid")
    })
}

// ============================================================================
// Message lookup
// ============================================================================

/// User-facing message for the first error in lookup precedence:
/// required, min, max, email, pattern, minlength, maxlength.
pub fn error_message(errors: &[ValidationError]) -> Option<String> {
    const ORDER: [&str; 7] = ["required", "min", "max", "email", "pattern", "minlength", "maxlength"];

    let error = ORDER
        .iter()
        .find_map(|key| errors.iter().find(|e| e.key() == *key))?;

    let message = match error {
        ValidationError::Required => "Este campo es obligatorio".to_string(),
        ValidationError::Min { min, .. } => format!("El valor debe ser mayor o igual a {}", min),
        ValidationError::MinDate { min, .. } => format!("El valor debe ser mayor o igual a {}", min),
        ValidationError::Max { max, .. } => format!("El valor debe ser menor o igual a {}", max),
        ValidationError::MaxDate { max, .. } => format!("El valor debe ser menor o igual a {}", max),
        ValidationError::Email => "Debe ser un correo electrónico válido".to_string(),
        ValidationError::Pattern { .. } => "El formato no es válido".to_string(),
        ValidationError::MinLength { required, .. } => {
            format!("Debe tener al menos {} caracteres", required)
        }
        ValidationError::MaxLength { required, .. } => {
            format!("Debe tener como máximo {} caracteres", required)
        }
        ValidationError::Range => return None,
    };
    Some(message)
}
