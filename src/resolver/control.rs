use crate::schema::validator::{validate_all, ValidationError, Validator};
use crate::schema::value::FieldValue;

/// Handle to a control inside its form's registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub(crate) usize);

impl ControlId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Live state behind one field.
///
/// Errors are recomputed whenever the value or the validators change; a
/// disabled control reports none.
#[derive(Debug, Clone)]
pub struct Control {
    name: String,
    value: FieldValue,
    enabled: bool,
    touched: bool,
    dirty: bool,
    validators: Vec<Validator>,
    errors: Vec<ValidationError>,
    placeholder: bool,
}

impl Control {
    pub(crate) fn new(name: &str, value: FieldValue, enabled: bool, validators: Vec<Validator>) -> Self {
        let mut control = Self {
            name: name.to_string(),
            value,
            enabled,
            touched: false,
            dirty: false,
            validators,
            errors: Vec::new(),
            placeholder: false,
        };
        control.revalidate();
        control
    }

    /// Stand-in for a dependency that has no field yet: empty and required.
    pub(crate) fn placeholder(name: &str) -> Self {
        let mut control = Self::new(name, FieldValue::empty_text(), true, vec![Validator::Required]);
        control.placeholder = true;
        control
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_disabled(&self) -> bool {
        !self.enabled
    }

    pub fn is_touched(&self) -> bool {
        self.touched
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn validators(&self) -> &[Validator] {
        &self.validators
    }

    pub fn errors(&self) -> &[ValidationError] {
        if self.enabled {
            &self.errors
        } else {
            &[]
        }
    }

    pub fn has_error(&self, key: &str) -> bool {
        self.errors().iter().any(|e| e.key() == key)
    }

    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Value and enabled flag, used to detect whether a gate changed anything.
    pub(crate) fn state(&self) -> (FieldValue, bool) {
        (self.value.clone(), self.enabled)
    }

    pub(crate) fn set_value(&mut self, value: FieldValue) {
        self.value = value;
        self.revalidate();
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn mark_touched(&mut self) {
        self.touched = true;
    }

    pub(crate) fn enable(&mut self) {
        self.enabled = true;
    }

    pub(crate) fn disable(&mut self) {
        self.enabled = false;
    }

    pub(crate) fn reset(&mut self) {
        self.value = FieldValue::Null;
        self.touched = false;
        self.dirty = false;
        self.revalidate();
    }

    pub(crate) fn set_validators(&mut self, validators: Vec<Validator>) {
        self.validators = validators;
        self.revalidate();
    }

    pub(crate) fn clear_validators(&mut self) {
        self.set_validators(Vec::new());
    }

    pub(crate) fn revalidate(&mut self) {
        self.errors = validate_all(&self.validators, &self.value);
    }

    /// Turn a placeholder into the real control for its field, keeping the
    /// slot (and so every subscription on it).
    pub(crate) fn upgrade(&mut self, real: Control) {
        *self = real;
    }
}
