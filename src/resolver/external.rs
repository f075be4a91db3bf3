use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::resolver::control::ControlId;
use crate::resolver::Resolver;
use crate::schema::value::FieldValue;

/// Values sourced outside the form, keyed by signal name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExternalDependencyStore {
    values: HashMap<String, FieldValue>,
}

impl ExternalDependencyStore {
    /// Shallow merge, last write wins per key.
    pub fn merge<I, K>(&mut self, values: I)
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        for (key, value) in values {
            self.values.insert(key.into(), value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.values.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Query parameters for the present subset of `names`, in `names` order.
    pub fn params_for(&self, names: &[String]) -> Vec<(String, String)> {
        names
            .iter()
            .filter_map(|name| {
                self.values
                    .get(name)
                    .map(|value| (name.clone(), value.to_param_string()))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Default)]
struct ContextState {
    base_url: String,
    external: ExternalDependencyStore,
}

/// State a form service shares with every form it builds: the base URL and
/// the external dependency store. Single-threaded by construction.
#[derive(Debug, Clone, Default)]
pub struct SharedContext(Rc<RefCell<ContextState>>);

impl SharedContext {
    pub fn base_url(&self) -> String {
        self.0.borrow().base_url.clone()
    }

    pub fn set_base_url(&self, url: &str) {
        self.0.borrow_mut().base_url = url.to_string();
    }

    pub fn with_external<R>(&self, f: impl FnOnce(&ExternalDependencyStore) -> R) -> R {
        f(&self.0.borrow().external)
    }

    pub fn update_external<R>(&self, f: impl FnOnce(&mut ExternalDependencyStore) -> R) -> R {
        f(&mut self.0.borrow_mut().external)
    }
}

/// Handle returned when a field's external dependencies are watched. Pass it
/// back to `recheck` after external values change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExternalWatcher {
    pub(crate) slot: usize,
    pub(crate) target: ControlId,
}

impl Resolver {
    /// Install external gating for `field_name` and evaluate it once.
    pub fn watch_external(&mut self, field_name: &str) -> Option<ExternalWatcher> {
        let Some((slot, target)) = self.slot_with_control(field_name) else {
            warn!(field = %field_name, "no control for field; external dependencies not watched");
            return None;
        };

        let watcher = ExternalWatcher { slot, target };
        if !self.watchers.contains(&watcher) {
            self.watchers.push(watcher);
        }
        self.recheck_external(watcher);
        Some(watcher)
    }

    /// Re-evaluate external gating for one watched field.
    pub fn recheck_external(&mut self, watcher: ExternalWatcher) {
        let ExternalWatcher { slot, target } = watcher;
        let before = self.registry.get(target).state();

        let field = &self.fields[slot];
        let external_ok = self.context.with_external(|store| {
            field.external_dependencies.iter().all(|key| store.contains(key))
        });
        let form_ok = match field.dependency.as_deref() {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .all(|name| {
                    self.registry
                        .by_name(name)
                        .is_some_and(|c| c.value().is_truthy())
                }),
            None => true,
        };
        let has_api = field.api_url.is_some();
        let use_external = field.has_external_dependencies();

        if external_ok && form_ok {
            if self.policy.readonly {
                debug!(field = %field.name, "readonly form; external gate leaves control disabled");
            } else {
                self.registry.get_mut(target).enable();
            }
            if has_api {
                self.request_options(slot, None, use_external);
            }
        } else if !self.policy.edit_mode || !self.registry.get(target).value().is_truthy() {
            let control = self.registry.get_mut(target);
            control.disable();
            control.reset();
            self.clear_options(slot);
        }

        if self.registry.get(target).state() != before {
            self.notify(target);
        }
    }

    /// Re-evaluate every watched field, in registration order.
    pub fn recheck_all_external(&mut self) {
        for watcher in self.watchers.clone() {
            self.recheck_external(watcher);
        }
    }
}
