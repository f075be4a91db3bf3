use std::io::Write;

use chrono::{Datelike, NaiveDate};
use dynamic_form::{
    error::FormError,
    schema::{
        field::{DateBound, FieldDefinition, FieldKind, SelectOption, TypeModel},
        loader::{load_schema, parse_schema_json, parse_schema_yaml},
        validator::Validator,
        value::FieldValue,
    },
};
use serde_json::json;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// =========================================================================
// FieldValue
// =========================================================================

#[test]
fn truthiness_follows_form_emptiness() {
    assert!(!FieldValue::Null.is_truthy());
    assert!(!FieldValue::text("").is_truthy());
    assert!(!FieldValue::Bool(false).is_truthy());
    assert!(!FieldValue::Int(0).is_truthy());
    assert!(!FieldValue::Float(f64::NAN).is_truthy());

    assert!(FieldValue::text("0").is_truthy());
    assert!(FieldValue::Int(-1).is_truthy());
    assert!(FieldValue::List(vec![]).is_truthy());
}

#[test]
fn blank_is_only_null_or_empty_text() {
    assert!(FieldValue::Null.is_blank());
    assert!(FieldValue::text("").is_blank());
    assert!(!FieldValue::Int(0).is_blank());
    assert!(!FieldValue::Bool(false).is_blank());
}

#[test]
fn numeric_coercion() {
    assert_eq!(FieldValue::Null.as_number(), 0.0);
    assert_eq!(FieldValue::text("").as_number(), 0.0);
    assert_eq!(FieldValue::text(" 12.5 ").as_number(), 12.5);
    assert_eq!(FieldValue::Bool(true).as_number(), 1.0);
    assert!(FieldValue::text("abc").as_number().is_nan());
}

#[test]
fn strict_eq_matches_int_and_float_magnitudes() {
    assert!(FieldValue::Int(3).strict_eq(&FieldValue::Float(3.0)));
    assert!(!FieldValue::Int(3).strict_eq(&FieldValue::text("3")));
    assert!(FieldValue::text("S").strict_eq(&FieldValue::text("S")));
}

#[test]
fn dates_parse_from_iso_text_and_drop_time() {
    assert_eq!(FieldValue::text("2024-03-15").as_date(), Some(ymd(2024, 3, 15)));
    assert_eq!(
        FieldValue::text("2024-03-15T18:30:00Z").as_date(),
        Some(ymd(2024, 3, 15))
    );
    assert_eq!(
        FieldValue::text("2024-03-15T08:00:00").as_date(),
        Some(ymd(2024, 3, 15))
    );
    assert_eq!(
        FieldValue::text("2024-01-05T10:00:00.000").as_date(),
        Some(ymd(2024, 1, 5))
    );
    assert_eq!(
        FieldValue::text("2024-01-05 23:59:59.5").as_date(),
        Some(ymd(2024, 1, 5))
    );
    assert_eq!(FieldValue::text("2024-01-05T10:00").as_date(), Some(ymd(2024, 1, 5)));
    assert_eq!(FieldValue::text("not a date").as_date(), None);
    assert_eq!(FieldValue::Int(20240315).as_date(), None);
}

#[test]
fn json_conversion_keeps_scalars() {
    let value = FieldValue::from_json(&json!([1, "a", null, true, 2.5]));
    assert_eq!(
        value,
        FieldValue::List(vec![
            FieldValue::Int(1),
            FieldValue::text("a"),
            FieldValue::Null,
            FieldValue::Bool(true),
            FieldValue::Float(2.5),
        ])
    );
    assert_eq!(value.to_json(), json!([1, "a", null, true, 2.5]));
    assert_eq!(FieldValue::Float(f64::NAN).to_json(), json!(null));
}

// =========================================================================
// Field definitions
// =========================================================================

#[test]
fn initial_value_depends_on_kind() {
    assert_eq!(
        FieldDefinition::new("a", FieldKind::Text).initial_value(),
        FieldValue::text("")
    );
    assert_eq!(
        FieldDefinition::new("tags", FieldKind::MultiSelectChips).initial_value(),
        FieldValue::List(vec![])
    );
    assert_eq!(
        FieldDefinition::new("a", FieldKind::Text).with_value(7).initial_value(),
        FieldValue::Int(7)
    );
}

#[test]
fn fetch_on_build_only_without_url_modes() {
    let plain = FieldDefinition::new("country", FieldKind::Select).with_api_url("/countries");
    assert!(plain.fetches_on_build());

    let query = plain.clone().with_url_query_param();
    assert!(!query.fetches_on_build());

    let no_api = FieldDefinition::new("x", FieldKind::Select);
    assert!(!no_api.fetches_on_build());
}

#[test]
fn all_option_is_recognised() {
    assert!(SelectOption::all().is_all());
    assert_eq!(SelectOption::all().value, "TODOS");
    assert!(!SelectOption::new(1, "uno").is_all());
}

#[test]
fn date_bounds_apply_offsets() {
    let source = ymd(2024, 1, 31);
    assert_eq!(DateBound::OffsetDays { days: 1 }.apply(source), ymd(2024, 2, 1));
    assert_eq!(DateBound::OffsetDays { days: -31 }.apply(source), ymd(2023, 12, 31));
    assert_eq!(DateBound::OffsetMonths { months: 1 }.apply(source), ymd(2024, 2, 29));
    assert_eq!(
        DateBound::Fixed { date: ymd(2030, 1, 1) }.apply(source),
        ymd(2030, 1, 1)
    );
    let custom = DateBound::custom(|d| d.with_day(1).unwrap_or(d));
    assert_eq!(custom.apply(source), ymd(2024, 1, 1));
}

// =========================================================================
// Schema loading
// =========================================================================

const SCHEMA_YAML: &str = r#"
title: Filtros
groups:
  - title: Ubicación
    count_columns: 2
    fields:
      - name: country
        type: select
        label: País
        api_url: /countries
        validation:
          - rule: required
      - name: city
        type: select
        dependency: country
        api_url: /cities
        url_query_param: true
      - name: internal
        type: text
        visible: false
  - is_range_validator: true
    fields:
      - name: desde
        type: text
        type_model: number
      - name: hasta
        type: text
        type_model: number
        validation:
          - rule: min
            min: 0
          - rule: max_length
            length: 5
      - name: start
        type: date
        date_dependency: desde
        min_date_fn:
          kind: offset_days
          days: 1
"#;

#[test]
fn yaml_schema_parses_with_defaults() {
    let schema = parse_schema_yaml(SCHEMA_YAML, "inline").unwrap();
    assert_eq!(schema.title.as_deref(), Some("Filtros"));
    assert_eq!(schema.groups.len(), 2);

    let first = &schema.groups[0];
    assert_eq!(first.count_columns, Some(2));
    assert!(!first.is_range_validator);
    assert_eq!(first.fields[0].kind, FieldKind::Select);
    assert!(first.fields[0].visible);
    assert_eq!(first.fields[0].validation, vec![Validator::Required]);
    assert_eq!(first.fields[1].dependency.as_deref(), Some("country"));
    assert!(first.fields[1].url_query_param);
    assert!(!first.fields[2].visible);

    let second = &schema.groups[1];
    assert!(second.is_range_validator);
    assert_eq!(second.fields[0].type_model, Some(TypeModel::Number));
    assert_eq!(
        second.fields[1].validation,
        vec![Validator::Min { min: 0.0 }, Validator::max_length(5)]
    );
    assert_eq!(
        second.fields[2].min_date_fn,
        Some(DateBound::OffsetDays { days: 1 })
    );
}

#[test]
fn json_schema_parses() {
    let content = json!({
        "groups": [{
            "fields": [{
                "name": "kind",
                "type": "toggle",
                "value": true
            }, {
                "name": "detail",
                "type": "text_area",
                "value_dependency": { "dependency": "kind", "value_dep": true }
            }]
        }]
    })
    .to_string();

    let schema = parse_schema_json(&content, "inline").unwrap();
    let fields = &schema.groups[0].fields;
    assert_eq!(fields[0].kind, FieldKind::Toggle);
    assert_eq!(fields[0].value, Some(FieldValue::Bool(true)));
    let gate = fields[1].value_dependency.as_ref().unwrap();
    assert_eq!(gate.value_dep, FieldValue::Bool(true));
    assert!(gate.validation.is_empty());
}

#[test]
fn empty_descriptors_load_as_unset() {
    let schema = parse_schema_yaml(
        r#"
groups:
  - fields:
      - name: city
        type: select
        dependency: ""
        api_url: ""
        filter_param: ""
        value_to_show: ""
      - name: end
        type: date
        date_dependency: ""
"#,
        "inline",
    )
    .unwrap();

    let city = &schema.groups[0].fields[0];
    assert_eq!(city.dependency, None);
    assert_eq!(city.api_url, None);
    assert_eq!(city.filter_param, None);
    assert_eq!(city.value_to_show, None);
    assert!(!city.fetches_on_build());
    assert_eq!(schema.groups[0].fields[1].date_dependency, None);
}

#[test]
fn builders_treat_empty_descriptors_as_unset() {
    let field = FieldDefinition::new("city", FieldKind::Select)
        .with_dependency("")
        .with_api_url("")
        .with_filter_param("");
    assert_eq!(field.dependency, None);
    assert_eq!(field.api_url, None);
    assert_eq!(field.filter_param, None);

    let kept = FieldDefinition::new("city", FieldKind::Select).with_dependency("a,,b");
    assert_eq!(kept.dependency.as_deref(), Some("a,,b"));
}

#[test]
fn load_schema_reads_yaml_file() {
    let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
    file.write_all(SCHEMA_YAML.as_bytes()).unwrap();

    let schema = load_schema(file.path()).unwrap();
    assert_eq!(schema.groups[0].fields.len(), 3);
}

#[test]
fn load_schema_rejects_unknown_extension() {
    let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    let err = load_schema(file.path()).unwrap_err();
    assert!(matches!(err, FormError::UnsupportedFormat(_)));
}

#[test]
fn load_schema_reports_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_schema(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, FormError::Io { .. }));
}

#[test]
fn malformed_yaml_is_an_error() {
    let err = parse_schema_yaml("groups: [ { fields: 3 } ]", "bad.yaml").unwrap_err();
    assert!(matches!(err, FormError::Yaml { .. }));
    assert!(err.to_string().contains("bad.yaml"));
}
