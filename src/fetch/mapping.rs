use std::cmp::Ordering;

use serde_json::Value;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::fetch::error::FetchError;
use crate::schema::field::{FieldDefinition, SelectOption};
use crate::schema::value::FieldValue;

/// Turn a response body into the field's sorted option list.
///
/// With a response mapper the mapped items are used, `value_to_show` is a
/// dotted path and each option's `data` is the item's own `data` member.
/// Otherwise items come from the body's `data` array, `value_to_show` names a
/// top-level key and `data` is the whole item.
pub fn map_response(field: &FieldDefinition, response: &Value) -> Result<Vec<SelectOption>, FetchError> {
    let mut options: Vec<SelectOption> = match &field.response_mapper {
        Some(mapper) => (mapper.0)(response)
            .iter()
            .map(|item| SelectOption {
                key: item_key(item),
                value: display_value_at_path(item, field.value_to_show.as_deref()),
                data: item.get("data").cloned().unwrap_or(Value::Null),
            })
            .collect(),
        None => {
            let items = response
                .get("data")
                .and_then(Value::as_array)
                .ok_or_else(|| FetchError::Decode("response has no 'data' array".into()))?;
            items
                .iter()
                .map(|item| SelectOption {
                    key: item_key(item),
                    value: display_value(item, field.value_to_show.as_deref()),
                    data: item.clone(),
                })
                .collect()
        }
    };

    sort_options(&mut options);
    Ok(options)
}

fn item_key(item: &Value) -> FieldValue {
    item.get("id").map(FieldValue::from_json).unwrap_or_default()
}

/// Display text: the item's `key` member when configured, else the default
/// label. Missing values become the empty string.
pub fn display_value(item: &Value, key: Option<&str>) -> String {
    match key {
        Some(key) => item.get(key).map(as_display).unwrap_or_default(),
        None => default_label(item),
    }
}

/// Like `display_value`, but `path` is followed through nested objects.
pub fn display_value_at_path(item: &Value, path: Option<&str>) -> String {
    match path {
        Some(path) => value_at_path(item, path).map(as_display).unwrap_or_default(),
        None => default_label(item),
    }
}

/// `nombre` when it holds a truthy value, else `name`.
fn default_label(item: &Value) -> String {
    match item.get("nombre") {
        Some(nombre) if is_truthy(nombre) => as_display(nombre),
        _ => item.get("name").map(as_display).unwrap_or_default(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Follow a dotted property path (`"persona.nombre"`).
pub fn value_at_path<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(item, |current, key| current.get(key))
}

fn as_display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// Collation
// ============================================================================

/// Primary collation key: decomposed, combining marks removed, lowercased.
pub fn collation_key(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Accent- and case-insensitive comparison, falling back to the raw text so
/// the order is total.
pub fn compare_labels(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

pub fn sort_options(options: &mut [SelectOption]) {
    options.sort_by(|a, b| compare_labels(&a.value, &b.value));
}
