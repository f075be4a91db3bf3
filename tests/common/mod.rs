#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use dynamic_form::fetch::transport::MockTransport;
use dynamic_form::form::dynamic_form::DynamicForm;
use dynamic_form::form::service::FormService;
use dynamic_form::schema::field::{FieldDefinition, FieldGroup, FieldKind};

pub const BASE_URL: &str = "http://api.test";
pub const WAIT: Duration = Duration::from_secs(5);

pub fn text(name: &str) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Text)
}

pub fn select(name: &str) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Select)
}

pub fn date(name: &str) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Date)
}

pub fn group(fields: Vec<FieldDefinition>) -> Vec<FieldGroup> {
    vec![FieldGroup::new(fields)]
}

/// Service backed by `mock`, pointed at `BASE_URL`.
pub fn service_with(mock: &Arc<MockTransport>) -> FormService {
    let transport = Arc::clone(mock);
    FormService::new(transport).with_base_url(BASE_URL)
}

/// Service whose transport answers every request with an empty list.
pub fn offline_service() -> FormService {
    service_with(&Arc::new(MockTransport::new()))
}

pub fn build(fields: Vec<FieldDefinition>) -> DynamicForm {
    offline_service()
        .build(group(fields), None)
        .expect("form builds")
}

pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}
