use serde_json::{Map, Value};
use tracing::debug;

use crate::form::dynamic_form::DynamicForm;
use crate::schema::field::{FieldDefinition, FieldKind, SelectOption, TypeModel, ALL_OPTION_KEY};
use crate::schema::value::{number_to_json, FieldValue};

/// Flat submission payload, in field order.
pub type FormValuePayload = Map<String, Value>;

/// Collect the payload for every visible field, recording on each field
/// definition whether it is `active`, its extracted value and, for selects,
/// the selected option.
pub fn extract(form: &mut DynamicForm) -> FormValuePayload {
    let mut payload = FormValuePayload::new();
    let resolver = form.resolver_mut();

    for slot in 0..resolver.fields.len() {
        let Some(id) = resolver.slots[slot] else {
            continue;
        };
        let value = resolver.registry.get(id).value().clone();
        let field = resolver.field_mut(slot);

        if value.is_blank() {
            field.active = false;
            field.value = None;
            payload.insert(field.name.clone(), Value::Null);
            continue;
        }

        field.active = true;
        match field.kind {
            FieldKind::Select => extract_select(field, value, &mut payload),
            FieldKind::Date => {
                payload.insert(field.name.clone(), value.to_json());
                field.value = Some(value);
            }
            _ => {
                let extracted = match field.type_model {
                    Some(TypeModel::Number) => number_to_json(value.as_number()),
                    _ => value.to_json(),
                };
                payload.insert(field.name.clone(), extracted);
                field.value = Some(value);
            }
        }
    }

    debug!(entries = payload.len(), "form value extracted");
    payload
}

fn extract_select(field: &mut FieldDefinition, value: FieldValue, payload: &mut FormValuePayload) {
    let all = FieldValue::Int(ALL_OPTION_KEY);
    if value.strict_eq(&all) && !field.options.iter().any(SelectOption::is_all) {
        field.options.insert(0, SelectOption::all());
    }

    let selected = field
        .options
        .iter()
        .find(|option| option.key.strict_eq(&value))
        .cloned();

    match &field.filter_param {
        Some(filter) => {
            let key = selected.as_ref().map(|o| o.key.to_json()).unwrap_or(Value::Null);
            payload.insert(filter.clone(), key);
        }
        None => {
            let entry = selected.as_ref().map(selection_object).unwrap_or(Value::Null);
            payload.insert(field.name.clone(), entry);
        }
    }

    field.value = Some(value);
    field.selected_option = selected;
}

/// `{id, nombre}` for a selected option; `id` is null when the key is not
/// numeric.
fn selection_object(option: &SelectOption) -> Value {
    let mut object = Map::new();
    object.insert("id".to_string(), number_to_json(option.key.as_number()));
    object.insert("nombre".to_string(), Value::String(option.value.clone()));
    Value::Object(object)
}
