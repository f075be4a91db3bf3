//! Dependency resolution: turns a schema into a registry of live controls and
//! keeps them consistent as values change.
//!
//! Wiring is stored as data (`gates::Gate`) rather than callbacks. A write to
//! a control notifies the gates subscribed to it; a gate that changes its
//! target's value or enabled state notifies the target's own subscribers in
//! turn, depth first.

pub mod builder;
pub mod control;
pub mod external;
pub mod gates;
pub mod registry;

use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::fetch::dispatcher::{FetchOutcome, OptionFetcher};
use crate::fetch::error::FetchError;
use crate::fetch::mapping::map_response;
use crate::fetch::request::build_request;
use crate::fetch::transport::OptionTransport;
use crate::resolver::control::{Control, ControlId};
use crate::resolver::external::{ExternalWatcher, SharedContext};
use crate::resolver::gates::SubscriptionTable;
use crate::resolver::registry::ControlRegistry;
use crate::schema::field::FieldDefinition;
use crate::schema::value::FieldValue;

/// Notification depth after which a cascade is abandoned.
pub const MAX_CASCADE_DEPTH: usize = 32;

/// Form-wide policy captured when a form is built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormPolicy {
    pub edit_mode: bool,
    pub readonly: bool,
}

/// Where one schema group's fields sit in the flattened field list.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupLayout {
    pub title: Option<String>,
    pub count_columns: Option<u32>,
    pub fields: Range<usize>,
    pub is_range_validator: bool,
}

/// Result of applying one finished option request.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionsUpdate {
    Loaded { field: String, count: usize },
    Failed { field: String, error: FetchError },
}

pub struct Resolver {
    pub(crate) fields: Vec<FieldDefinition>,
    pub(crate) layout: Vec<GroupLayout>,
    /// Control of each field, `None` for hidden fields.
    pub(crate) slots: Vec<Option<ControlId>>,
    pub(crate) registry: ControlRegistry,
    pub(crate) subscriptions: SubscriptionTable,
    pub(crate) watchers: Vec<ExternalWatcher>,
    pub(crate) policy: FormPolicy,
    pub(crate) context: SharedContext,
    pub(crate) fetcher: OptionFetcher,
}

impl Resolver {
    pub(crate) fn empty(
        fields: Vec<FieldDefinition>,
        layout: Vec<GroupLayout>,
        policy: FormPolicy,
        context: SharedContext,
        transport: Arc<dyn OptionTransport>,
    ) -> Self {
        let slots = vec![None; fields.len()];
        Self {
            fields,
            layout,
            slots,
            registry: ControlRegistry::default(),
            subscriptions: SubscriptionTable::default(),
            watchers: Vec::new(),
            policy,
            context,
            fetcher: OptionFetcher::new(transport),
        }
    }

    pub fn policy(&self) -> FormPolicy {
        self.policy
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn layout(&self) -> &[GroupLayout] {
        &self.layout
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn subscriptions(&self) -> &SubscriptionTable {
        &self.subscriptions
    }

    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.visible && f.name == name)
    }

    pub(crate) fn field_mut(&mut self, slot: usize) -> &mut FieldDefinition {
        &mut self.fields[slot]
    }

    pub fn control(&self, name: &str) -> Option<&Control> {
        self.registry.by_name(name)
    }

    /// Position and control of a visible field.
    pub(crate) fn slot_with_control(&self, name: &str) -> Option<(usize, ControlId)> {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name == name)
            .find_map(|(slot, _)| self.slots[slot].map(|id| (slot, id)))
    }

    // ------------------------------------------------------------------------
    // Host-facing mutations
    // ------------------------------------------------------------------------

    /// Programmatic write. Subscribers are always notified.
    pub fn set_value(&mut self, name: &str, value: FieldValue) -> bool {
        let Some(id) = self.lookup(name) else {
            return false;
        };
        self.registry.get_mut(id).set_value(value);
        self.notify(id);
        true
    }

    /// Write as if typed by the user: the control also becomes dirty.
    pub fn input(&mut self, name: &str, value: FieldValue) -> bool {
        let Some(id) = self.lookup(name) else {
            return false;
        };
        let control = self.registry.get_mut(id);
        control.set_value(value);
        control.mark_dirty();
        self.notify(id);
        true
    }

    pub fn enable(&mut self, name: &str) -> bool {
        let Some(id) = self.lookup(name) else {
            return false;
        };
        self.registry.get_mut(id).enable();
        self.notify(id);
        true
    }

    pub fn disable(&mut self, name: &str) -> bool {
        let Some(id) = self.lookup(name) else {
            return false;
        };
        self.registry.get_mut(id).disable();
        self.notify(id);
        true
    }

    pub fn mark_touched(&mut self, name: &str) -> bool {
        let Some(id) = self.lookup(name) else {
            return false;
        };
        self.registry.get_mut(id).mark_touched();
        true
    }

    /// Reset every control, then let the wiring react to each reset.
    pub fn reset_all(&mut self) {
        for control in self.registry.iter_mut() {
            control.reset();
        }
        for id in self.registry.ids() {
            self.notify(id);
        }
    }

    pub fn mark_all_touched(&mut self) {
        for control in self.registry.iter_mut() {
            control.mark_touched();
            control.revalidate();
        }
    }

    pub fn disable_all(&mut self) {
        for control in self.registry.iter_mut() {
            control.disable();
        }
    }

    fn lookup(&self, name: &str) -> Option<ControlId> {
        let id = self.registry.id(name);
        if id.is_none() {
            warn!(field = %name, "no control with this name in the form");
        }
        id
    }

    // ------------------------------------------------------------------------
    // Propagation
    // ------------------------------------------------------------------------

    pub(crate) fn notify(&mut self, source: ControlId) {
        self.notify_at_depth(source, 0);
    }

    fn notify_at_depth(&mut self, source: ControlId, depth: usize) {
        if depth >= MAX_CASCADE_DEPTH {
            warn!(
                control = %self.registry.get(source).name(),
                depth,
                "dependency cascade too deep; stopping propagation"
            );
            return;
        }
        for gate in self.subscriptions.subscribers(source) {
            if self.evaluate(gate) {
                let target = self.subscriptions.gate(gate).target;
                self.notify_at_depth(target, depth + 1);
            }
        }
    }

    /// Evaluate a freshly installed gate and propagate what it changed.
    pub(crate) fn run_gate(&mut self, gate: gates::GateId) {
        if self.evaluate(gate) {
            let target = self.subscriptions.gate(gate).target;
            self.notify(target);
        }
    }

    // ------------------------------------------------------------------------
    // Remote options
    // ------------------------------------------------------------------------

    /// Fire an option request for the field at `slot`. Does not wait.
    pub(crate) fn request_options(&mut self, slot: usize, dependency_value: Option<FieldValue>, use_external: bool) {
        let request = {
            let field = &self.fields[slot];
            let registry = &self.registry;
            let lookup = |name: &str| registry.by_name(name).map(|c| c.value().clone());
            let external = if use_external {
                self.context
                    .with_external(|store| store.params_for(&field.external_dependencies))
            } else {
                Vec::new()
            };
            build_request(
                field,
                &self.context.base_url(),
                dependency_value.as_ref(),
                &lookup,
                &external,
            )
        };

        if let Some(request) = request {
            self.fetcher.dispatch(slot, request);
        }
    }

    /// Drop the field's options and ignore any response still on its way.
    pub(crate) fn clear_options(&mut self, slot: usize) {
        self.fields[slot].options.clear();
        self.fetcher.cancel(slot);
    }

    pub fn pending_requests(&self) -> usize {
        self.fetcher.in_flight()
    }

    /// Apply every response that has already arrived.
    pub fn poll_options(&mut self) -> Vec<OptionsUpdate> {
        let mut updates = Vec::new();
        while let Some(outcome) = self.fetcher.try_next() {
            updates.extend(self.apply_outcome(outcome));
        }
        updates
    }

    /// Block until every in-flight request has answered or `timeout` passes.
    pub fn wait_for_options(&mut self, timeout: Duration) -> Vec<OptionsUpdate> {
        let deadline = Instant::now() + timeout;
        let mut updates = Vec::new();
        while self.fetcher.in_flight() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.fetcher.next_timeout(remaining) {
                Some(outcome) => updates.extend(self.apply_outcome(outcome)),
                None => break,
            }
        }
        updates
    }

    fn apply_outcome(&mut self, outcome: FetchOutcome) -> Option<OptionsUpdate> {
        if !self.fetcher.is_current(&outcome) {
            debug!(field = %outcome.request.field, ticket = outcome.ticket, "discarding stale option response");
            return None;
        }

        let field = &mut self.fields[outcome.slot];
        let mapped = outcome
            .result
            .and_then(|body| map_response(field, &body));

        match mapped {
            Ok(options) => {
                let count = options.len();
                field.options = options;
                debug!(field = %field.name, count, "options loaded");
                Some(OptionsUpdate::Loaded {
                    field: field.name.clone(),
                    count,
                })
            }
            Err(error) => {
                warn!(field = %field.name, url = %outcome.request.full_url(), error = %error, "option request failed");
                Some(OptionsUpdate::Failed {
                    field: field.name.clone(),
                    error,
                })
            }
        }
    }

    /// Drop all wiring and make outstanding requests stale.
    pub fn teardown(&mut self) {
        self.subscriptions.release_all();
        self.watchers.clear();
        self.fetcher.cancel_all();
    }
}
