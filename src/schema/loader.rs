use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::FormError;
use crate::schema::field::FieldGroup;

/// A schema file: an optional title plus the ordered field groups.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub groups: Vec<FieldGroup>,
}

pub fn parse_schema_yaml(content: &str, origin: &str) -> Result<FormSchema, FormError> {
    serde_yaml::from_str(content).map_err(|source| FormError::Yaml {
        path: origin.to_string(),
        source,
    })
}

pub fn parse_schema_json(content: &str, origin: &str) -> Result<FormSchema, FormError> {
    serde_json::from_str(content).map_err(|source| FormError::Json {
        path: origin.to_string(),
        source,
    })
}

/// Load a schema from a `.yaml`, `.yml` or `.json` file.
pub fn load_schema(path: &Path) -> Result<FormSchema, FormError> {
    let origin = path.display().to_string();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !matches!(extension.as_str(), "yaml" | "yml" | "json") {
        return Err(FormError::UnsupportedFormat(origin));
    }

    let content = std::fs::read_to_string(path).map_err(|source| FormError::Io {
        path: origin.clone(),
        source,
    })?;

    if extension == "json" {
        parse_schema_json(&content, &origin)
    } else {
        parse_schema_yaml(&content, &origin)
    }
}
