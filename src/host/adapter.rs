use std::time::Duration;

use tracing::{debug, warn};

use crate::error::FormError;
use crate::form::dynamic_form::DynamicForm;
use crate::form::events::FormEvent;
use crate::form::extract::FormValuePayload;
use crate::form::service::FormService;
use crate::resolver::external::ExternalWatcher;
use crate::schema::field::FieldGroup;
use crate::schema::value::FieldValue;

/// Initial inputs of a hosted form.
#[derive(Debug, Clone, Default)]
pub struct HostInputs {
    pub base_url: Option<String>,
    pub edit_mode: bool,
    pub readonly: bool,
}

/// Input changes delivered after init. `None` means "unchanged".
#[derive(Debug, Clone, Default)]
pub struct HostChanges {
    /// Reset every control when set.
    pub reset: bool,
    pub base_url: Option<String>,
    pub edit_mode: Option<bool>,
}

/// Headless host for one dynamic form: drives the service through the
/// lifecycle a UI component would, and exposes the imperative field API.
pub struct FormHost {
    service: FormService,
    inputs: HostInputs,
    form: Option<DynamicForm>,
    watchers: Vec<ExternalWatcher>,
}

impl FormHost {
    pub fn new(service: FormService, inputs: HostInputs) -> Self {
        Self {
            service,
            inputs,
            form: None,
            watchers: Vec::new(),
        }
    }

    pub fn service(&self) -> &FormService {
        &self.service
    }

    pub fn form(&self) -> Option<&DynamicForm> {
        self.form.as_ref()
    }

    pub fn form_mut(&mut self) -> Option<&mut DynamicForm> {
        self.form.as_mut()
    }

    /// Build the form and watch every field with external dependencies.
    /// The initial validity event is queued by the build.
    pub fn init(&mut self, groups: Vec<FieldGroup>) -> Result<(), FormError> {
        if self.inputs.readonly {
            self.service.set_readonly(true);
        }
        if self.inputs.edit_mode {
            self.service.set_edit_mode(true);
        }
        if let Some(url) = &self.inputs.base_url {
            self.service.set_base_url(url);
        }

        let external_fields: Vec<String> = groups
            .iter()
            .flat_map(|g| g.fields.iter())
            .filter(|f| f.has_external_dependencies())
            .map(|f| f.name.clone())
            .collect();

        let mut form = self.service.build(groups, self.form.take())?;
        self.watchers = external_fields
            .iter()
            .filter_map(|name| self.service.register_external_dependency_watcher(&mut form, name))
            .collect();

        debug!(watchers = self.watchers.len(), "form host initialised");
        self.form = Some(form);
        Ok(())
    }

    pub fn on_changes(&mut self, changes: HostChanges) {
        if changes.reset {
            if let Some(form) = self.form.as_mut() {
                form.reset();
            }
        }
        if let Some(url) = changes.base_url.filter(|u| !u.is_empty()) {
            self.service.set_base_url(&url);
        }
        if let Some(edit_mode) = changes.edit_mode {
            self.inputs.edit_mode = edit_mode;
            self.service.set_edit_mode(edit_mode);
        }
    }

    // ------------------------------------------------------------------------
    // External dependencies
    // ------------------------------------------------------------------------

    pub fn update_external_dependencies<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        self.service.set_external_dependency_values(values);
        self.refresh_dependent_fields();
    }

    pub fn remove_external_dependency(&mut self, key: &str) {
        self.service.remove_external_dependency(key);
        self.refresh_dependent_fields();
    }

    /// Recheck every watched field against the current external values.
    pub fn refresh_dependent_fields(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        for watcher in &self.watchers {
            form.recheck(*watcher);
        }
    }

    // ------------------------------------------------------------------------
    // Field API
    // ------------------------------------------------------------------------

    pub fn update_form_field(&mut self, name: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        if let Some(form) = self.form_with(name) {
            form.set_value(name, value);
        }
    }

    pub fn disable_field(&mut self, name: &str) {
        match self.form_with(name) {
            Some(form) => {
                form.disable(name);
            }
            None => warn!(field = %name, "cannot disable: field does not exist in the form"),
        }
    }

    pub fn enable_field(&mut self, name: &str) {
        match self.form_with(name) {
            Some(form) => {
                form.enable(name);
            }
            None => warn!(field = %name, "cannot enable: field does not exist in the form"),
        }
    }

    /// Re-write a field's current value so its dependents re-evaluate.
    pub fn simulate_field_change(&mut self, name: &str) {
        if let Some(form) = self.form_with(name) {
            if let Some(value) = form.value(name).cloned() {
                form.set_value(name, value);
            }
        }
    }

    pub fn form_field_value(&self, name: &str) -> Option<FieldValue> {
        self.form.as_ref()?.value(name).cloned()
    }

    /// Queue a value-changed event. `explicit` overrides the control value.
    pub fn emit_value_changed(&mut self, name: &str, explicit: Option<FieldValue>) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let Some(field) = form.field(name).cloned() else {
            warn!(field = %name, "value change for unknown field");
            return;
        };
        let value = explicit
            .or_else(|| form.value(name).cloned())
            .unwrap_or_default();
        form.push_event(FormEvent::ValueChanged { field, value });
    }

    pub fn wait_for_options(&mut self, timeout: Duration) -> usize {
        self.form
            .as_mut()
            .map(|f| f.wait_for_options(timeout))
            .unwrap_or(0)
    }

    pub fn submit(&mut self) -> Option<FormValuePayload> {
        let form = self.form.as_mut()?;
        Some(self.service.extract(form))
    }

    pub fn error_message(&self, name: &str) -> Option<String> {
        self.form.as_ref()?.error_message(name)
    }

    pub fn drain_events(&mut self) -> Vec<FormEvent> {
        self.form
            .as_mut()
            .map(DynamicForm::drain_events)
            .unwrap_or_default()
    }

    /// Reset and release the form.
    pub fn destroy(&mut self) {
        if let Some(mut form) = self.form.take() {
            form.reset();
            form.teardown();
        }
        self.watchers.clear();
    }

    fn form_with(&mut self, name: &str) -> Option<&mut DynamicForm> {
        self.form.as_mut().filter(|f| f.contains(name))
    }
}
