use thiserror::Error;

/// Errors raised while loading a schema or building a form from it.
#[derive(Debug, Error)]
pub enum FormError {
    /// A value gate names a field that has no control.
    #[error("field '{field}' depends on '{dependency}', which has no control")]
    UnknownDependency { field: String, dependency: String },

    /// A `dependency` list contains an empty name (e.g. `"a,,b"`).
    #[error("field '{field}' declares a malformed dependency list '{list}'")]
    MalformedDependency { field: String, list: String },

    /// Two visible fields share a name.
    #[error("duplicate field name '{0}'")]
    DuplicateField(String),

    #[error("failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML schema {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON schema {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported schema format '{0}' (expected .yaml, .yml or .json)")]
    UnsupportedFormat(String),
}
