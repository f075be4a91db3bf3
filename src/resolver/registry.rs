use std::collections::HashMap;

use crate::resolver::control::{Control, ControlId};

/// Index-addressed table of a form's controls with a name index.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    controls: Vec<Control>,
    index: HashMap<String, ControlId>,
}

impl ControlRegistry {
    pub fn id(&self, name: &str) -> Option<ControlId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: ControlId) -> &Control {
        &self.controls[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: ControlId) -> &mut Control {
        &mut self.controls[id.0]
    }

    pub fn by_name(&self, name: &str) -> Option<&Control> {
        self.id(name).map(|id| self.get(id))
    }

    /// Register `control`, upgrading a placeholder of the same name in place.
    pub(crate) fn register(&mut self, control: Control) -> ControlId {
        if let Some(id) = self.id(control.name()) {
            self.controls[id.0].upgrade(control);
            return id;
        }
        let id = ControlId(self.controls.len());
        self.index.insert(control.name().to_string(), id);
        self.controls.push(control);
        id
    }

    pub(crate) fn ensure_placeholder(&mut self, name: &str) -> ControlId {
        match self.id(name) {
            Some(id) => id,
            None => self.register(Control::placeholder(name)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControlId, &Control)> {
        self.controls
            .iter()
            .enumerate()
            .map(|(i, c)| (ControlId(i), c))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Control> {
        self.controls.iter_mut()
    }

    pub fn ids(&self) -> Vec<ControlId> {
        (0..self.controls.len()).map(ControlId).collect()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
