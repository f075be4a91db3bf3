pub mod cli;
pub mod error;
pub mod fetch;
pub mod form;
pub mod host;
pub mod resolver;
pub mod schema;

pub use error::FormError;
pub use fetch::error::{FetchError, NormalizedError, normalize_fetch_error};
pub use fetch::transport::{HttpTransport, MockTransport, OptionTransport};
pub use form::dynamic_form::{DynamicForm, FormStatus};
pub use form::events::FormEvent;
pub use form::extract::{FormValuePayload, extract};
pub use form::service::FormService;
pub use host::adapter::{FormHost, HostChanges, HostInputs};
pub use resolver::FormPolicy;
pub use schema::field::{FieldDefinition, FieldGroup, FieldKind, SelectOption};
pub use schema::value::FieldValue;
