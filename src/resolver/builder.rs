use std::sync::Arc;

use tracing::{debug, error, info};

use crate::error::FormError;
use crate::fetch::transport::OptionTransport;
use crate::resolver::control::{Control, ControlId};
use crate::resolver::external::SharedContext;
use crate::resolver::gates::{Gate, GateKind, ValueGateMode};
use crate::resolver::{FormPolicy, GroupLayout, Resolver};
use crate::schema::field::{FieldDefinition, FieldGroup, FieldKind};

/// Split a `dependency` list into trimmed names. An empty name is an error.
pub fn parse_dependency_list(field: &str, list: &str) -> Result<Vec<String>, FormError> {
    list.split(',')
        .map(str::trim)
        .map(|name| {
            if name.is_empty() {
                Err(FormError::MalformedDependency {
                    field: field.to_string(),
                    list: list.to_string(),
                })
            } else {
                Ok(name.to_string())
            }
        })
        .collect()
}

impl Resolver {
    /// Construct every control for `groups` and install the wiring between
    /// them. Option fetches triggered here are dispatched but not awaited.
    pub fn build(
        groups: Vec<FieldGroup>,
        policy: FormPolicy,
        context: SharedContext,
        transport: Arc<dyn OptionTransport>,
    ) -> Result<Resolver, FormError> {
        let mut fields = Vec::new();
        let mut layout = Vec::with_capacity(groups.len());
        for group in groups {
            let start = fields.len();
            fields.extend(group.fields.into_iter().map(|mut field| {
                field.clear_blank_descriptors();
                field
            }));
            layout.push(GroupLayout {
                title: group.title,
                count_columns: group.count_columns,
                fields: start..fields.len(),
                is_range_validator: group.is_range_validator,
            });
        }

        let mut resolver = Resolver::empty(fields, layout, policy, context, transport);
        for slot in 0..resolver.fields.len() {
            if resolver.fields[slot].visible {
                resolver.construct(slot)?;
            }
        }

        info!(
            controls = resolver.registry.len(),
            gates = resolver.subscriptions.len(),
            edit_mode = policy.edit_mode,
            readonly = policy.readonly,
            "form built"
        );
        Ok(resolver)
    }

    fn construct(&mut self, slot: usize) -> Result<(), FormError> {
        let field = &self.fields[slot];
        if self
            .registry
            .by_name(&field.name)
            .is_some_and(|c| !c.is_placeholder())
        {
            return Err(FormError::DuplicateField(field.name.clone()));
        }

        let disabled = self.policy.readonly || field.dependency.is_some() || field.disabled;
        let validators = if self.policy.readonly {
            Vec::new()
        } else {
            field.validation.clone()
        };
        let upgrades = self.registry.id(&field.name).is_some();
        let control = Control::new(&field.name, field.initial_value(), !disabled, validators);
        let id = self.registry.register(control);
        self.slots[slot] = Some(id);

        if upgrades {
            debug!(field = %self.fields[slot].name, "placeholder control replaced by its field");
            self.notify(id);
        }

        if self.fields[slot].fetches_on_build() {
            self.request_options(slot, None, false);
        }

        if !self.policy.readonly {
            self.install_gates(slot, id)?;
        }
        Ok(())
    }

    fn install_gates(&mut self, slot: usize, target: ControlId) -> Result<(), FormError> {
        let field = &self.fields[slot];

        let value_gate = match (&field.value_dependency, &field.value_exclude_dependency) {
            (Some(gate), _) => Some((gate.dependency.clone(), ValueGateMode::Include)),
            (None, Some(gate)) => Some((gate.dependency.clone(), ValueGateMode::Exclude)),
            (None, None) => None,
        };
        let dependencies = field
            .dependency
            .as_deref()
            .map(|list| parse_dependency_list(&field.name, list))
            .transpose()?;
        let date_source = date_source(field);

        if let Some((dependency, mode)) = value_gate {
            let source = self
                .registry
                .id(&dependency)
                .ok_or_else(|| FormError::UnknownDependency {
                    field: self.fields[slot].name.clone(),
                    dependency: dependency.clone(),
                })?;
            self.install_and_run(Gate {
                slot,
                target,
                kind: GateKind::ValueEquality { source, mode },
            });
        }

        if let Some(names) = dependencies {
            let sources = names
                .iter()
                .map(|name| self.registry.ensure_placeholder(name))
                .collect();
            self.install_and_run(Gate {
                slot,
                target,
                kind: GateKind::Dependencies { sources },
            });
        }

        if let Some(name) = date_source {
            match self.registry.id(&name) {
                Some(source) => self.install_and_run(Gate {
                    slot,
                    target,
                    kind: GateKind::DateBounds { source },
                }),
                None => error!(
                    field = %self.fields[slot].name,
                    date_dependency = %name,
                    "date dependency has no control; date bounds not wired"
                ),
            }
        }
        Ok(())
    }

    fn install_and_run(&mut self, gate: Gate) {
        let id = self.subscriptions.install(gate);
        self.run_gate(id);
    }
}

fn date_source(field: &FieldDefinition) -> Option<String> {
    if field.kind != FieldKind::Date {
        return None;
    }
    if field.min_date_fn.is_none() && field.max_date_fn.is_none() {
        return None;
    }
    field.date_dependency.clone()
}

