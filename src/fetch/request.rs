use std::sync::OnceLock;

use regex::{NoExpand, Regex};
use tracing::warn;

use crate::schema::field::FieldDefinition;
use crate::schema::value::FieldValue;

/// One outbound GET for a field's options.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionRequest {
    pub field: String,
    pub url: String,
    pub params: Vec<(String, String)>,
}

impl OptionRequest {
    /// URL with the query string appended, percent-encoded.
    pub fn full_url(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.url, separator, query)
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\{.*?\}").expect("placeholder pattern is valid"))
}

/// Build the request for `field`.
///
/// The dependency value is placed by the first mode that applies: path
/// placeholder, query parameters from every `dependency` field (read through
/// `lookup`), or trailing path segment. `external` holds the already
/// resolved external-dependency parameters to append. Blank parameter values
/// are dropped.
///
/// Returns `None` when the field has no `api_url`.
pub fn build_request(
    field: &FieldDefinition,
    base_url: &str,
    dependency_value: Option<&FieldValue>,
    lookup: &dyn Fn(&str) -> Option<FieldValue>,
    external: &[(String, String)],
) -> Option<OptionRequest> {
    let api_url = field.api_url.as_deref()?;
    let mut url = format!("{}{}", base_url, api_url);
    let mut params: Vec<(String, String)> = Vec::new();

    let filled = dependency_value.filter(|v| v.is_truthy());

    if let (true, Some(value)) = (field.url_param_dependency, filled) {
        url = placeholder_regex()
            .replace_all(&url, NoExpand(&value.to_param_string()))
            .into_owned();
    } else if let (true, Some(list)) = (field.url_query_param, field.dependency.as_deref()) {
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            match lookup(name) {
                Some(value) => params.push((name.to_string(), value.to_param_string())),
                None => warn!(field = %field.name, dependency = %name, "query dependency has no control"),
            }
        }
    } else if let (true, Some(value)) = (field.url_end_param, filled) {
        url = format!("{}/{}", url, value.to_param_string());
    }

    params.extend(external.iter().cloned());
    params.retain(|(_, v)| !v.is_empty() && v != "undefined" && v != "null");

    Some(OptionRequest {
        field: field.name.clone(),
        url,
        params,
    })
}
