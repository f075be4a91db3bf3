use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::fetch::error::normalize_fetch_error;
use crate::form::events::FormEvent;
use crate::resolver::control::Control;
use crate::resolver::external::ExternalWatcher;
use crate::resolver::{FormPolicy, GroupLayout, OptionsUpdate, Resolver};
use crate::schema::field::{FieldDefinition, SelectOption};
use crate::schema::validator::{error_message, ValidationError};
use crate::schema::value::FieldValue;

/// Names of the controls the range validator compares.
pub const RANGE_FROM: &str = "desde";
pub const RANGE_TO: &str = "hasta";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Valid,
    Invalid,
    /// Every control is disabled.
    Disabled,
}

/// A built form: the resolved controls plus container-level validation and
/// the event queue the host drains.
pub struct DynamicForm {
    resolver: Resolver,
    range_validation: bool,
    events: Vec<FormEvent>,
    last_validity: bool,
}

impl DynamicForm {
    pub(crate) fn assemble(resolver: Resolver, range_validation: bool) -> Self {
        let mut form = Self {
            resolver,
            range_validation,
            events: Vec::new(),
            last_validity: false,
        };

        let policy = form.resolver.policy();
        if policy.edit_mode {
            form.resolver.mark_all_touched();
        }
        if policy.readonly {
            form.resolver.disable_all();
        }

        form.last_validity = form.is_valid();
        form.events.push(FormEvent::ValidityChanged(form.last_validity));
        form
    }

    // ------------------------------------------------------------------------
    // State
    // ------------------------------------------------------------------------

    pub fn policy(&self) -> FormPolicy {
        self.resolver.policy()
    }

    pub fn status(&self) -> FormStatus {
        if self.all_disabled() {
            return FormStatus::Disabled;
        }
        let controls_valid = self.resolver.registry().iter().all(|(_, c)| c.is_valid());
        if controls_valid && self.errors().is_empty() {
            FormStatus::Valid
        } else {
            FormStatus::Invalid
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status() == FormStatus::Valid
    }

    /// Container-level errors.
    pub fn errors(&self) -> Vec<ValidationError> {
        if !self.range_validation || self.all_disabled() {
            return Vec::new();
        }
        let number = |name: &str| {
            self.resolver
                .control(name)
                .map(|c| c.value().as_number())
                .unwrap_or(f64::NAN)
        };
        // NaN on either side fails the comparison.
        if number(RANGE_FROM) <= number(RANGE_TO) {
            Vec::new()
        } else {
            vec![ValidationError::Range]
        }
    }

    fn all_disabled(&self) -> bool {
        self.resolver.registry().iter().all(|(_, c)| c.is_disabled())
    }

    pub fn has_range_validation(&self) -> bool {
        self.range_validation
    }

    pub fn control(&self, name: &str) -> Option<&Control> {
        self.resolver.control(name)
    }

    /// Every control, placeholders included, in registration order.
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.resolver.registry().iter().map(|(_, c)| c)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.resolver.control(name).is_some()
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.resolver.control(name).map(Control::value)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.resolver.field(name)
    }

    /// Every field definition, hidden ones included, in schema order.
    pub fn fields(&self) -> &[FieldDefinition] {
        self.resolver.fields()
    }

    pub fn layout(&self) -> &[GroupLayout] {
        self.resolver.layout()
    }

    pub fn options(&self, name: &str) -> &[SelectOption] {
        self.resolver
            .field(name)
            .map(|f| f.options.as_slice())
            .unwrap_or(&[])
    }

    pub fn error_message(&self, name: &str) -> Option<String> {
        self.resolver
            .control(name)
            .and_then(|c| error_message(c.errors()))
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub(crate) fn resolver_mut(&mut self) -> &mut Resolver {
        &mut self.resolver
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    pub fn set_value(&mut self, name: &str, value: impl Into<FieldValue>) -> bool {
        let found = self.resolver.set_value(name, value.into());
        self.track_validity();
        found
    }

    /// Like `set_value`, but the control is also marked dirty.
    pub fn input(&mut self, name: &str, value: impl Into<FieldValue>) -> bool {
        let found = self.resolver.input(name, value.into());
        self.track_validity();
        found
    }

    pub fn enable(&mut self, name: &str) -> bool {
        let found = self.resolver.enable(name);
        self.track_validity();
        found
    }

    pub fn disable(&mut self, name: &str) -> bool {
        let found = self.resolver.disable(name);
        self.track_validity();
        found
    }

    pub fn reset(&mut self) {
        self.resolver.reset_all();
        self.track_validity();
    }

    pub fn mark_all_touched(&mut self) {
        self.resolver.mark_all_touched();
    }

    pub fn watch_external(&mut self, name: &str) -> Option<ExternalWatcher> {
        let watcher = self.resolver.watch_external(name);
        self.track_validity();
        watcher
    }

    pub fn recheck(&mut self, watcher: ExternalWatcher) {
        self.resolver.recheck_external(watcher);
        self.track_validity();
    }

    pub fn recheck_all(&mut self) {
        self.resolver.recheck_all_external();
        self.track_validity();
    }

    pub fn pending_requests(&self) -> usize {
        self.resolver.pending_requests()
    }

    /// Apply option responses that have already arrived.
    pub fn poll_options(&mut self) -> usize {
        let updates = self.resolver.poll_options();
        self.record_updates(updates)
    }

    /// Block until outstanding option requests finish or `timeout` passes.
    pub fn wait_for_options(&mut self, timeout: Duration) -> usize {
        let updates = self.resolver.wait_for_options(timeout);
        self.record_updates(updates)
    }

    fn record_updates(&mut self, updates: Vec<OptionsUpdate>) -> usize {
        let applied = updates.len();
        for update in updates {
            let event = match update {
                OptionsUpdate::Loaded { field, count } => FormEvent::OptionsLoaded { field, count },
                OptionsUpdate::Failed { field, error } => FormEvent::FetchFailed {
                    field,
                    error: normalize_fetch_error(&error),
                },
            };
            self.events.push(event);
        }
        applied
    }

    pub(crate) fn push_event(&mut self, event: FormEvent) {
        self.events.push(event);
    }

    pub fn drain_events(&mut self) -> Vec<FormEvent> {
        std::mem::take(&mut self.events)
    }

    /// Release every subscription; late option responses are ignored.
    pub fn teardown(&mut self) {
        debug!(controls = self.resolver.registry().len(), "tearing down form");
        self.resolver.teardown();
    }

    /// Queue `ValidityChanged` when the overall validity flipped.
    fn track_validity(&mut self) {
        let valid = self.is_valid();
        if valid != self.last_validity {
            self.last_validity = valid;
            self.events.push(FormEvent::ValidityChanged(valid));
        }
    }
}
