use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cli::config::{FormArgs, RunSettings};
use crate::fetch::transport::HttpTransport;
use crate::form::dynamic_form::DynamicForm;
use crate::form::events::FormEvent;
use crate::form::service::FormService;
use crate::schema::loader::load_schema;
use crate::schema::value::FieldValue;

// ============================================================================
// Shared helpers
// ============================================================================

/// Parse a `name=value` assignment. The value is read as JSON when it parses,
/// otherwise kept as text.
pub fn parse_assignment(raw: &str) -> Result<(String, FieldValue), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing field name in '{}'", raw));
    }
    let value = match serde_json::from_str::<serde_json::Value>(value) {
        Ok(json) => FieldValue::from_json(&json),
        Err(_) => FieldValue::text(value),
    };
    Ok((name.to_string(), value))
}

fn build_service(settings: &RunSettings) -> Result<FormService, Box<dyn std::error::Error>> {
    let transport = HttpTransport::with_timeout(Duration::from_millis(settings.timeout_ms))?;
    let mut service = FormService::new(Arc::new(transport)).with_base_url(&settings.base_url);
    service.set_edit_mode(settings.edit_mode);
    service.set_readonly(settings.readonly);
    Ok(service)
}

/// Build the form, apply the assignments in order and wait for option
/// requests after each step.
fn prepare_form(
    service: &FormService,
    args: &FormArgs,
    settings: &RunSettings,
) -> Result<DynamicForm, Box<dyn std::error::Error>> {
    let schema = load_schema(Path::new(&args.schema))?;
    let wait = Duration::from_millis(settings.wait_ms);

    let mut form = service.build(schema.groups, None)?;
    for name in external_fields(&form) {
        service.register_external_dependency_watcher(&mut form, &name);
    }
    form.wait_for_options(wait);

    for raw in &args.set {
        let (name, value) = parse_assignment(raw)?;
        if !form.input(&name, value) {
            warn!(field = %name, "assignment ignored: no such control");
        }
        form.wait_for_options(wait);
    }

    for event in form.drain_events() {
        if let FormEvent::FetchFailed { field, error } = event {
            warn!(field = %field, message = %error.user_message(), "options unavailable");
        }
    }
    Ok(form)
}

fn external_fields(form: &DynamicForm) -> Vec<String> {
    form.fields()
        .iter()
        .filter(|f| f.visible && f.has_external_dependencies())
        .map(|f| f.name.clone())
        .collect()
}

/// One line per control: name, state flags, value and first error message.
pub fn format_inspection(form: &DynamicForm) -> String {
    let mut out = format!("status: {:?}\n", form.status());
    for control in form.controls() {
        let state = if control.is_enabled() { "enabled" } else { "disabled" };
        let mut line = format!(
            "  {} [{}] = {}",
            control.name(),
            state,
            control.value().to_json()
        );
        if control.is_placeholder() {
            line.push_str(" (placeholder)");
        }
        let options = form.options(control.name());
        if !options.is_empty() {
            line.push_str(&format!(" ({} options)", options.len()));
        }
        if let Some(message) = form.error_message(control.name()) {
            line.push_str(&format!(" ! {}", message));
        }
        out.push_str(&line);
        out.push('\n');
    }
    for error in form.errors() {
        out.push_str(&format!("  form error: {}\n", error.key()));
    }
    out
}

// ============================================================================
// inspect subcommand
// ============================================================================

pub fn cmd_inspect(args: &FormArgs, settings: &RunSettings) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(settings)?;
    let form = prepare_form(&service, args, settings)?;
    print!("{}", format_inspection(&form));
    Ok(())
}

// ============================================================================
// extract subcommand
// ============================================================================

pub fn cmd_extract(
    args: &FormArgs,
    external: &[String],
    settings: &RunSettings,
) -> Result<(), Box<dyn std::error::Error>> {
    let service = build_service(settings)?;
    let mut values = Vec::with_capacity(external.len());
    for raw in external {
        values.push(parse_assignment(raw)?);
    }
    service.set_external_dependency_values(values);

    let mut form = prepare_form(&service, args, settings)?;
    let payload = service.extract(&mut form);
    info!(valid = form.is_valid(), entries = payload.len(), "extracted form value");

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}
