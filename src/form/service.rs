use std::sync::Arc;

use tracing::{debug, info};

use crate::error::FormError;
use crate::fetch::transport::{HttpTransport, OptionTransport};
use crate::form::dynamic_form::DynamicForm;
use crate::form::extract::{extract, FormValuePayload};
use crate::resolver::external::{ExternalWatcher, SharedContext};
use crate::resolver::{FormPolicy, Resolver};
use crate::schema::field::FieldGroup;
use crate::schema::value::FieldValue;

/// Builds forms and owns the state they share: mode flags, base URL, the
/// external dependency store and the option transport.
///
/// Mode flags are read when a form is built. The base URL and the external
/// store are shared with every form this service has built.
pub struct FormService {
    policy: FormPolicy,
    context: SharedContext,
    transport: Arc<dyn OptionTransport>,
}

impl FormService {
    pub fn new(transport: Arc<dyn OptionTransport>) -> Self {
        Self {
            policy: FormPolicy::default(),
            context: SharedContext::default(),
            transport,
        }
    }

    pub fn with_http() -> Self {
        Self::new(Arc::new(HttpTransport::new()))
    }

    pub fn with_base_url(self, url: &str) -> Self {
        self.set_base_url(url);
        self
    }

    pub fn set_base_url(&self, url: &str) {
        debug!(base_url = %url, "base URL updated");
        self.context.set_base_url(url);
    }

    pub fn base_url(&self) -> String {
        self.context.base_url()
    }

    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.policy.edit_mode = edit_mode;
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.policy.readonly = readonly;
    }

    pub fn policy(&self) -> FormPolicy {
        self.policy
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Shallow merge into the external store; last write wins per key.
    pub fn set_external_dependency_values<I, K>(&self, values: I)
    where
        I: IntoIterator<Item = (K, FieldValue)>,
        K: Into<String>,
    {
        self.context.update_external(|store| store.merge(values));
    }

    pub fn remove_external_dependency(&self, key: &str) {
        if self.context.update_external(|store| store.remove(key)).is_some() {
            debug!(key = %key, "external dependency removed");
        }
    }

    pub fn external_value(&self, key: &str) -> Option<FieldValue> {
        self.context.with_external(|store| store.get(key).cloned())
    }

    /// Build a fresh form from `groups`. `previous`, if any, is torn down.
    pub fn build(&self, groups: Vec<FieldGroup>, previous: Option<DynamicForm>) -> Result<DynamicForm, FormError> {
        if let Some(mut old) = previous {
            old.teardown();
        }

        let range_validation = groups.iter().any(|g| g.is_range_validator);
        let resolver = Resolver::build(
            groups,
            self.policy,
            self.context.clone(),
            Arc::clone(&self.transport),
        )?;

        let form = DynamicForm::assemble(resolver, range_validation);
        info!(status = ?form.status(), "form assembled");
        Ok(form)
    }

    pub fn extract(&self, form: &mut DynamicForm) -> FormValuePayload {
        extract(form)
    }

    /// Install external gating for `field` and evaluate it once.
    pub fn register_external_dependency_watcher(
        &self,
        form: &mut DynamicForm,
        field: &str,
    ) -> Option<ExternalWatcher> {
        form.watch_external(field)
    }
}
