use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "dynamic-form",
    version,
    about = "Build declarative forms, resolve their dependencies and extract their values"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: dynamic-form.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Base URL prepended to every option endpoint
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a form and print the state of every control
    Inspect {
        #[command(flatten)]
        form: FormArgs,
    },

    /// Build a form, apply values and print the extracted payload as JSON
    Extract {
        #[command(flatten)]
        form: FormArgs,

        /// External dependency value (key=value), repeatable
        #[arg(long = "external")]
        external: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct FormArgs {
    /// Path to the form schema (.yaml, .yml or .json)
    #[arg(long)]
    pub schema: String,

    /// Build in edit mode
    #[arg(long)]
    pub edit: bool,

    /// Build in readonly mode
    #[arg(long)]
    pub readonly: bool,

    /// Field assignment (name=value), repeatable, applied in order
    #[arg(long = "set")]
    pub set: Vec<String>,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `dynamic-form.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub form: FormConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormConfig {
    pub base_url: Option<String>,

    #[serde(default)]
    pub edit_mode: bool,

    #[serde(default)]
    pub readonly: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long a command waits for outstanding option requests.
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            wait_ms: default_wait_ms(),
        }
    }
}

// Serde default helpers
fn default_timeout_ms() -> u64 { 10_000 }
fn default_wait_ms() -> u64 { 15_000 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("dynamic-form.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

/// Resolved run settings: CLI > config file > defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub base_url: String,
    pub edit_mode: bool,
    pub readonly: bool,
    pub timeout_ms: u64,
    pub wait_ms: u64,
}

pub fn resolve_settings(cli_base_url: Option<&str>, form: &FormArgs, config: &AppConfig) -> RunSettings {
    RunSettings {
        base_url: cli_base_url
            .or(config.form.base_url.as_deref())
            .unwrap_or_default()
            .to_string(),
        edit_mode: form.edit || config.form.edit_mode,
        readonly: form.readonly || config.form.readonly,
        timeout_ms: config.http.timeout_ms,
        wait_ms: config.http.wait_ms,
    }
}
