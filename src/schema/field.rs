use std::fmt;
use std::sync::Arc;

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::schema::validator::Validator;
use crate::schema::value::FieldValue;

/// Sentinel option key meaning "all values".
pub const ALL_OPTION_KEY: i64 = -1;
pub const ALL_OPTION_LABEL: &str = "TODOS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Select,
    Date,
    DateRange,
    SearchableSelect,
    TextArea,
    Button,
    Toggle,
    MultiSelectChips,
    AutocompleteSelect,
    AutocompleteInput,
    Checkbox,
}

/// How extraction coerces a plain field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeModel {
    Boolean,
    Number,
}

/// One selectable option, as produced by the option fetcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub key: FieldValue,
    pub value: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl SelectOption {
    pub fn new(key: impl Into<FieldValue>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            data: Value::Null,
        }
    }

    /// The `-1` / "TODOS" option.
    pub fn all() -> Self {
        Self::new(ALL_OPTION_KEY, ALL_OPTION_LABEL)
    }

    pub fn is_all(&self) -> bool {
        self.key.strict_eq(&FieldValue::Int(ALL_OPTION_KEY))
    }
}

/// Single-field value gate: the field is enabled while `dependency` holds
/// (`value_dependency`) or does not hold (`value_exclude_dependency`)
/// `value_dep`. While enabled, `validation` replaces the field's validators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueGate {
    pub dependency: String,
    pub value_dep: FieldValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<Validator>,
}

impl ValueGate {
    pub fn new(dependency: impl Into<String>, value_dep: impl Into<FieldValue>) -> Self {
        Self {
            dependency: dependency.into(),
            value_dep: value_dep.into(),
            validation: Vec::new(),
        }
    }

    pub fn with_validation(mut self, validation: Vec<Validator>) -> Self {
        self.validation = validation;
        self
    }
}

/// Pure function deriving a bound from a source date.
#[derive(Clone)]
pub struct DateFn(pub Arc<dyn Fn(NaiveDate) -> NaiveDate + Send + Sync>);

impl fmt::Debug for DateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DateFn(..)")
    }
}

impl PartialEq for DateFn {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// How a date field's min/max bound is derived from its source date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DateBound {
    OffsetDays { days: i64 },
    OffsetMonths { months: i32 },
    Fixed { date: NaiveDate },
    #[serde(skip)]
    Custom(DateFn),
}

impl DateBound {
    pub fn custom(f: impl Fn(NaiveDate) -> NaiveDate + Send + Sync + 'static) -> Self {
        DateBound::Custom(DateFn(Arc::new(f)))
    }

    /// Out-of-range offsets leave the source date unchanged.
    pub fn apply(&self, source: NaiveDate) -> NaiveDate {
        match self {
            DateBound::OffsetDays { days } => {
                let delta = Days::new(days.unsigned_abs());
                let shifted = if *days >= 0 {
                    source.checked_add_days(delta)
                } else {
                    source.checked_sub_days(delta)
                };
                shifted.unwrap_or(source)
            }
            DateBound::OffsetMonths { months } => {
                let delta = Months::new(months.unsigned_abs());
                let shifted = if *months >= 0 {
                    source.checked_add_months(delta)
                } else {
                    source.checked_sub_months(delta)
                };
                shifted.unwrap_or(source)
            }
            DateBound::Fixed { date } => *date,
            DateBound::Custom(f) => (f.0)(source),
        }
    }
}

/// Programmatic response mapper: turns a raw response into the list of
/// items to build options from.
#[derive(Clone)]
pub struct ResponseMapper(pub Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>);

impl ResponseMapper {
    pub fn new(f: impl Fn(&Value) -> Vec<Value> + Send + Sync + 'static) -> Self {
        ResponseMapper(Arc::new(f))
    }
}

impl fmt::Debug for ResponseMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseMapper(..)")
    }
}

fn default_true() -> bool {
    true
}

/// An empty descriptor string means "not set".
fn non_blank(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.and_then(non_blank))
}

/// Declarative description of one form field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: FieldKind,

    #[serde(default)]
    pub label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default)]
    pub disabled: bool,

    /// Set by extraction: whether the field contributed a value.
    #[serde(default)]
    pub active: bool,

    /// Initial value. `None` means the kind's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FieldValue>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_model: Option<TypeModel>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<Validator>,

    /// Comma-separated names of fields that must all be filled.
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_dependency: Option<ValueGate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_exclude_dependency: Option<ValueGate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_dependencies: Vec<String>,

    // ---- Remote option source ----
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Put the dependency value into the `{...}` placeholder of `api_url`.
    #[serde(default)]
    pub url_param_dependency: bool,

    /// Send every `dependency` field's value as a query parameter.
    #[serde(default)]
    pub url_query_param: bool,

    /// Append the dependency value as the last path segment.
    #[serde(default)]
    pub url_end_param: bool,

    /// Payload key for the selected option's key (select fields).
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub filter_param: Option<String>,

    /// Dotted path to the display value inside each response item.
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub value_to_show: Option<String>,

    #[serde(skip)]
    pub response_mapper: Option<ResponseMapper>,

    // ---- Date bounds ----
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub date_dependency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date_fn: Option<DateBound>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date_fn: Option<DateBound>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<SelectOption>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            label: String::new(),
            placeholder: None,
            visible: true,
            disabled: false,
            active: false,
            value: None,
            type_model: None,
            validation: Vec::new(),
            dependency: None,
            value_dependency: None,
            value_exclude_dependency: None,
            external_dependencies: Vec::new(),
            api_url: None,
            url_param_dependency: false,
            url_query_param: false,
            url_end_param: false,
            filter_param: None,
            value_to_show: None,
            response_mapper: None,
            date_dependency: None,
            min_date_fn: None,
            max_date_fn: None,
            min_date: None,
            max_date: None,
            options: Vec::new(),
            selected_option: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_validation(mut self, validation: Vec<Validator>) -> Self {
        self.validation = validation;
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = non_blank(dependency.into());
        self
    }

    pub fn with_value_dependency(mut self, gate: ValueGate) -> Self {
        self.value_dependency = Some(gate);
        self
    }

    pub fn with_value_exclude_dependency(mut self, gate: ValueGate) -> Self {
        self.value_exclude_dependency = Some(gate);
        self
    }

    pub fn with_external_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.external_dependencies = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = non_blank(api_url.into());
        self
    }

    pub fn with_url_param_dependency(mut self) -> Self {
        self.url_param_dependency = true;
        self
    }

    pub fn with_url_query_param(mut self) -> Self {
        self.url_query_param = true;
        self
    }

    pub fn with_url_end_param(mut self) -> Self {
        self.url_end_param = true;
        self
    }

    pub fn with_filter_param(mut self, filter_param: impl Into<String>) -> Self {
        self.filter_param = non_blank(filter_param.into());
        self
    }

    pub fn with_type_model(mut self, type_model: TypeModel) -> Self {
        self.type_model = Some(type_model);
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_date_bounds(
        mut self,
        source: impl Into<String>,
        min: Option<DateBound>,
        max: Option<DateBound>,
    ) -> Self {
        self.date_dependency = non_blank(source.into());
        self.min_date_fn = min;
        self.max_date_fn = max;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// The value a fresh control starts with.
    pub fn initial_value(&self) -> FieldValue {
        match &self.value {
            Some(v) => v.clone(),
            None if self.kind == FieldKind::MultiSelectChips => FieldValue::List(Vec::new()),
            None => FieldValue::empty_text(),
        }
    }

    /// Drop descriptors holding the empty string, for definitions whose
    /// fields were assigned directly.
    pub fn clear_blank_descriptors(&mut self) {
        for descriptor in [
            &mut self.dependency,
            &mut self.api_url,
            &mut self.filter_param,
            &mut self.value_to_show,
            &mut self.date_dependency,
        ] {
            if descriptor.as_deref() == Some("") {
                *descriptor = None;
            }
        }
    }

    pub fn has_value_gate(&self) -> bool {
        self.value_dependency.is_some() || self.value_exclude_dependency.is_some()
    }

    pub fn has_external_dependencies(&self) -> bool {
        !self.external_dependencies.is_empty()
    }

    /// Options are fetched at build time when the URL needs no dependency
    /// value.
    pub fn fetches_on_build(&self) -> bool {
        self.api_url.is_some()
            && !self.url_param_dependency
            && !self.url_query_param
            && !self.url_end_param
    }
}

/// An ordered group of fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldGroup {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count_columns: Option<u32>,

    pub fields: Vec<FieldDefinition>,

    /// Attach the `desde <= hasta` group validator.
    #[serde(default)]
    pub is_range_validator: bool,
}

impl FieldGroup {
    pub fn new(fields: Vec<FieldDefinition>) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }

    pub fn with_range_validator(mut self) -> Self {
        self.is_range_validator = true;
        self
    }
}
