use serde::Serialize;

use crate::fetch::error::NormalizedError;
use crate::schema::field::FieldDefinition;
use crate::schema::value::FieldValue;

/// Notifications a form queues for its host. Drained with
/// `DynamicForm::drain_events`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum FormEvent {
    /// Overall validity flipped (also queued once at init).
    ValidityChanged(bool),

    /// The host reported an explicit interaction with a field.
    ValueChanged {
        field: FieldDefinition,
        value: FieldValue,
    },

    OptionsLoaded { field: String, count: usize },

    FetchFailed {
        field: String,
        error: NormalizedError,
    },
}
