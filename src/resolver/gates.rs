use std::collections::HashMap;

use tracing::trace;

use crate::resolver::control::ControlId;
use crate::resolver::Resolver;
use crate::schema::validator::Validator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GateId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueGateMode {
    /// Enabled while the source equals the gate value.
    Include,
    /// Enabled while the source differs from the gate value.
    Exclude,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GateKind {
    ValueEquality { source: ControlId, mode: ValueGateMode },
    Dependencies { sources: Vec<ControlId> },
    DateBounds { source: ControlId },
}

/// One installed piece of wiring: `kind` decides `target`'s state from its
/// sources. `slot` is the target field's position in the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub slot: usize,
    pub target: ControlId,
    pub kind: GateKind,
}

impl Gate {
    pub fn sources(&self) -> Vec<ControlId> {
        match &self.kind {
            GateKind::ValueEquality { source, .. } | GateKind::DateBounds { source } => vec![*source],
            GateKind::Dependencies { sources } => sources.clone(),
        }
    }
}

/// Every gate of one form plus the source → gates subscription index.
/// Subscriptions are only ever released all together.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    gates: Vec<Gate>,
    by_source: HashMap<ControlId, Vec<GateId>>,
}

impl SubscriptionTable {
    pub(crate) fn install(&mut self, gate: Gate) -> GateId {
        let id = GateId(self.gates.len());
        let mut sources = gate.sources();
        sources.dedup();
        for source in sources {
            self.by_source.entry(source).or_default().push(id);
        }
        self.gates.push(gate);
        id
    }

    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id.0]
    }

    /// Gates observing `source`, in installation order.
    pub fn subscribers(&self, source: ControlId) -> Vec<GateId> {
        self.by_source.get(&source).cloned().unwrap_or_default()
    }

    pub fn gates_for(&self, target: ControlId) -> impl Iterator<Item = &Gate> {
        self.gates.iter().filter(move |g| g.target == target)
    }

    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }

    pub(crate) fn release_all(&mut self) {
        self.gates.clear();
        self.by_source.clear();
    }
}

impl Resolver {
    /// Evaluate one gate. Returns whether the target's value or enabled state
    /// changed.
    pub(crate) fn evaluate(&mut self, id: GateId) -> bool {
        let gate = self.subscriptions.gate(id).clone();
        let before = self.registry.get(gate.target).state();

        match &gate.kind {
            GateKind::ValueEquality { source, mode } => self.apply_value_gate(&gate, *source, *mode),
            GateKind::Dependencies { sources } => self.apply_dependency_gate(&gate, sources),
            GateKind::DateBounds { source } => self.apply_date_gate(&gate, *source),
        }

        let changed = self.registry.get(gate.target).state() != before;
        trace!(
            field = %self.fields[gate.slot].name,
            gate = ?gate.kind,
            changed,
            "gate evaluated"
        );
        changed
    }

    fn apply_value_gate(&mut self, gate: &Gate, source: ControlId, mode: ValueGateMode) {
        let field = &self.fields[gate.slot];
        let declared = match mode {
            ValueGateMode::Include => field.value_dependency.as_ref(),
            ValueGateMode::Exclude => field.value_exclude_dependency.as_ref(),
        };
        let Some(declared) = declared else {
            return;
        };

        let current = self.registry.get(source).value();
        let matches = match mode {
            ValueGateMode::Include => current.strict_eq(&declared.value_dep),
            ValueGateMode::Exclude => !current.strict_eq(&declared.value_dep),
        };
        let override_validators = declared.validation.clone();

        let control = self.registry.get_mut(gate.target);
        if matches {
            control.enable();
            control.set_validators(override_validators);
        } else {
            control.disable();
            control.reset();
            control.clear_validators();
        }
    }

    fn apply_dependency_gate(&mut self, gate: &Gate, sources: &[ControlId]) {
        let field = &self.fields[gate.slot];
        let value_gated = field.has_value_gate();

        // The value gate owns enablement while it keeps the field disabled.
        if value_gated && self.registry.get(gate.target).is_disabled() {
            return;
        }

        let all_filled = sources
            .iter()
            .all(|id| self.registry.get(*id).value().is_truthy());

        if all_filled {
            let first = self.registry.get(sources[0]).value().clone();
            let stays_disabled = !value_gated && field.disabled;
            let fetch = field.api_url.is_some() && first.is_truthy();
            let use_external = field.has_external_dependencies();
            let edit_mode = self.policy.edit_mode;

            let control = self.registry.get_mut(gate.target);
            if stays_disabled {
                control.disable();
            } else {
                control.enable();
            }
            if !edit_mode {
                control.reset();
            }

            if fetch {
                self.request_options(gate.slot, Some(first), use_external);
            }
        } else {
            let control = self.registry.get_mut(gate.target);
            control.reset();
            if !value_gated {
                control.disable();
            }
            self.clear_options(gate.slot);
        }
    }

    fn apply_date_gate(&mut self, gate: &Gate, source: ControlId) {
        let Some(date) = self.registry.get(source).value().as_date() else {
            self.registry.get_mut(gate.target).revalidate();
            return;
        };

        let field = &mut self.fields[gate.slot];
        let min = field.min_date_fn.as_ref().map(|f| f.apply(date));
        let max = field.max_date_fn.as_ref().map(|f| f.apply(date));
        if min.is_some() {
            field.min_date = min;
        }
        if max.is_some() {
            field.max_date = max;
        }

        let control = self.registry.get_mut(gate.target);
        let mut validators: Vec<Validator> = control
            .validators()
            .iter()
            .filter(|v| !v.is_date_bound())
            .cloned()
            .collect();
        if let Some(date) = min {
            validators.push(Validator::MinDate { date });
        }
        if let Some(date) = max {
            validators.push(Validator::MaxDate { date });
        }
        control.set_validators(validators);
    }
}
