use std::sync::Arc;
use std::time::Duration;

use dynamic_form::{
    fetch::{
        dispatcher::OptionFetcher,
        error::{FetchError, NormalizedError, GENERIC_ERROR_MESSAGE, normalize_fetch_error},
        mapping::{collation_key, compare_labels, display_value, display_value_at_path, map_response},
        request::{OptionRequest, build_request},
        transport::{MockTransport, OptionTransport},
    },
    schema::{
        field::{FieldDefinition, FieldKind, ResponseMapper},
        value::FieldValue,
    },
};
use serde_json::{Value, json};

const BASE: &str = "http://api.test";

fn no_lookup(_: &str) -> Option<FieldValue> {
    None
}

fn select(name: &str, api_url: &str) -> FieldDefinition {
    FieldDefinition::new(name, FieldKind::Select).with_api_url(api_url)
}

fn labels(options: &[dynamic_form::SelectOption]) -> Vec<&str> {
    options.iter().map(|o| o.value.as_str()).collect()
}

// =========================================================================
// Request construction
// =========================================================================

#[test]
fn plain_url_has_no_params() {
    let field = select("country", "/countries");
    let request = build_request(&field, BASE, None, &no_lookup, &[]).unwrap();
    assert_eq!(request.full_url(), "http://api.test/countries");
    assert_eq!(request.field, "country");
}

#[test]
fn no_api_url_means_no_request() {
    let field = FieldDefinition::new("x", FieldKind::Select);
    assert!(build_request(&field, BASE, None, &no_lookup, &[]).is_none());
}

#[test]
fn path_placeholder_is_replaced_everywhere() {
    let field = select("city", "/countries/{country}/cities/{id}").with_url_param_dependency();
    let value = FieldValue::text("CO");
    let request = build_request(&field, BASE, Some(&value), &no_lookup, &[]).unwrap();
    assert_eq!(request.url, "http://api.test/countries/CO/cities/CO");
}

#[test]
fn placeholder_replacement_is_literal() {
    let field = select("city", "/c/{x}").with_url_param_dependency();
    let value = FieldValue::text("$1");
    let request = build_request(&field, BASE, Some(&value), &no_lookup, &[]).unwrap();
    assert_eq!(request.url, "http://api.test/c/$1");
}

#[test]
fn query_mode_reads_every_dependency() {
    let field = select("city", "/cities")
        .with_dependency("country, region")
        .with_url_query_param();
    let lookup = |name: &str| match name {
        "country" => Some(FieldValue::text("CO")),
        "region" => Some(FieldValue::Int(5)),
        _ => None,
    };
    let request = build_request(&field, BASE, None, &lookup, &[]).unwrap();
    assert_eq!(
        request.params,
        vec![
            ("country".to_string(), "CO".to_string()),
            ("region".to_string(), "5".to_string())
        ]
    );
    assert_eq!(request.full_url(), "http://api.test/cities?country=CO&region=5");
}

#[test]
fn blank_query_values_are_dropped() {
    let field = select("city", "/cities")
        .with_dependency("country,region")
        .with_url_query_param();
    let lookup = |name: &str| match name {
        "country" => Some(FieldValue::text("CO")),
        _ => Some(FieldValue::Null),
    };
    let request = build_request(&field, BASE, None, &lookup, &[]).unwrap();
    assert_eq!(request.full_url(), "http://api.test/cities?country=CO");
}

#[test]
fn end_segment_mode_appends_value() {
    let field = select("city", "/cities").with_url_end_param();
    let value = FieldValue::Int(7);
    let request = build_request(&field, BASE, Some(&value), &no_lookup, &[]).unwrap();
    assert_eq!(request.url, "http://api.test/cities/7");

    let empty = FieldValue::text("");
    let request = build_request(&field, BASE, Some(&empty), &no_lookup, &[]).unwrap();
    assert_eq!(request.url, "http://api.test/cities");
}

#[test]
fn placeholder_mode_wins_over_end_segment() {
    let field = select("city", "/c/{id}")
        .with_url_param_dependency()
        .with_url_end_param();
    let value = FieldValue::text("9");
    let request = build_request(&field, BASE, Some(&value), &no_lookup, &[]).unwrap();
    assert_eq!(request.url, "http://api.test/c/9");
}

#[test]
fn external_params_are_appended_and_encoded() {
    let field = select("branch", "/branches");
    let external = vec![
        ("company".to_string(), "ACME & Co".to_string()),
        ("year".to_string(), "null".to_string()),
    ];
    let request = build_request(&field, BASE, None, &no_lookup, &external).unwrap();
    assert_eq!(request.full_url(), "http://api.test/branches?company=ACME%20%26%20Co");
}

// =========================================================================
// Response mapping
// =========================================================================

#[test]
fn maps_data_array_and_sorts_by_label() {
    let field = select("city", "/cities");
    let body = json!({ "data": [
        { "id": 2, "nombre": "Zipaquirá" },
        { "id": 1, "nombre": "ávila" },
        { "id": 3, "name": "Bogotá" }
    ]});
    let options = map_response(&field, &body).unwrap();
    assert_eq!(labels(&options), vec!["ávila", "Bogotá", "Zipaquirá"]);
    assert_eq!(options[0].key, FieldValue::Int(1));
    assert_eq!(options[0].data, json!({ "id": 1, "nombre": "ávila" }));
}

#[test]
fn value_to_show_is_a_top_level_key_for_data_arrays() {
    let mut field = select("person", "/people");
    field.value_to_show = Some("persona.documento".into());
    let body = json!({ "data": [
        { "id": "a", "persona.documento": "flat" },
        { "id": "b", "persona": { "documento": 1234 } }
    ]});
    let options = map_response(&field, &body).unwrap();
    assert_eq!(labels(&options), vec!["", "flat"]);
}

#[test]
fn value_to_show_follows_dotted_path_with_mapper() {
    let mut field = select("person", "/people");
    field.value_to_show = Some("persona.documento".into());
    field.response_mapper = Some(ResponseMapper::new(|body: &Value| {
        body["items"].as_array().cloned().unwrap_or_default()
    }));
    let body = json!({ "items": [
        { "id": "a", "persona": { "documento": 1234 } },
        { "id": "b", "persona": {} }
    ]});
    let options = map_response(&field, &body).unwrap();
    assert_eq!(labels(&options), vec!["", "1234"]);
}

#[test]
fn response_mapper_replaces_data_lookup() {
    let mut field = select("item", "/items");
    field.response_mapper = Some(ResponseMapper::new(|body: &Value| {
        body["results"].as_array().cloned().unwrap_or_default()
    }));
    let body = json!({ "results": [
        { "id": 10, "name": "Diez", "data": { "extra": true } }
    ]});
    let options = map_response(&field, &body).unwrap();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].key, FieldValue::Int(10));
    assert_eq!(options[0].data, json!({ "extra": true }));
}

#[test]
fn missing_data_array_is_a_decode_error() {
    let field = select("item", "/items");
    let err = map_response(&field, &json!({ "items": [] })).unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)));
}

#[test]
fn display_prefers_nombre_then_name() {
    assert_eq!(display_value(&json!({ "nombre": "Uno", "name": "One" }), None), "Uno");
    assert_eq!(display_value(&json!({ "name": "One" }), None), "One");
    assert_eq!(display_value(&json!({ "id": 1 }), None), "");
}

#[test]
fn falsy_nombre_falls_through_to_name() {
    assert_eq!(display_value(&json!({ "nombre": 0, "name": "Cero" }), None), "Cero");
    assert_eq!(display_value(&json!({ "nombre": "", "name": "Vacío" }), None), "Vacío");
    assert_eq!(display_value(&json!({ "nombre": false }), None), "");
    assert_eq!(display_value(&json!({ "nombre": 7, "name": "Siete" }), None), "7");
    assert_eq!(display_value_at_path(&json!({ "nombre": null, "name": "N" }), None), "N");
}

#[test]
fn collation_ignores_accents_and_case() {
    assert_eq!(collation_key("Ñandú"), "nandu");
    assert!(compare_labels("árbol", "Banco").is_lt());
    assert!(compare_labels("a", "A").is_gt());
}

// =========================================================================
// Error normalization
// =========================================================================

fn status(code: u16, body: Value) -> FetchError {
    FetchError::Status { status: code, body }
}

#[test]
fn unauthorized_clears_session() {
    let normalized = normalize_fetch_error(&status(401, json!({ "message": "expired" })));
    assert!(normalized.clears_session());
    assert_eq!(normalized.user_message(), "expired");
}

#[test]
fn rejected_uses_server_message() {
    for code in [400, 409] {
        let normalized = normalize_fetch_error(&status(code, json!({ "message": "duplicado" })));
        assert_eq!(
            normalized,
            NormalizedError::Rejected {
                message: Some("duplicado".into())
            }
        );
    }
}

#[test]
fn payment_required_reads_nested_message() {
    let normalized = normalize_fetch_error(&status(402, json!({ "data": { "mensaje": "Saldo insuficiente" } })));
    assert_eq!(
        normalized,
        NormalizedError::PaymentRequired {
            status: 402,
            message: Some("Saldo insuficiente".into())
        }
    );
}

#[test]
fn unprocessable_and_too_early_keep_details() {
    let body = json!({ "message": "invalid", "fields": ["a"] });
    assert_eq!(
        normalize_fetch_error(&status(422, body.clone())),
        NormalizedError::Unprocessable { detail: body }
    );

    let normalized = normalize_fetch_error(&status(425, json!({ "message": { "errors": ["wait"] } })));
    assert_eq!(normalized, NormalizedError::TooEarly { errors: json!(["wait"]) });
}

#[test]
fn server_error_reads_previous_message() {
    let normalized = normalize_fetch_error(&status(500, json!({ "previous": { "message": "db down" } })));
    assert_eq!(normalized.user_message(), "db down");
}

#[test]
fn everything_else_is_generic() {
    assert_eq!(
        normalize_fetch_error(&FetchError::Transport("refused".into())),
        NormalizedError::Generic
    );
    assert_eq!(normalize_fetch_error(&status(503, Value::Null)), NormalizedError::Generic);
    assert_eq!(NormalizedError::Generic.user_message(), GENERIC_ERROR_MESSAGE);
    assert_eq!(
        normalize_fetch_error(&status(500, json!({}))).user_message(),
        GENERIC_ERROR_MESSAGE
    );
}

// =========================================================================
// Transport & dispatcher
// =========================================================================

fn request(field: &str, url: &str) -> OptionRequest {
    OptionRequest {
        field: field.to_string(),
        url: url.to_string(),
        params: Vec::new(),
    }
}

#[test]
fn mock_transport_records_and_answers() {
    let mock = MockTransport::new()
        .respond("http://api.test/a", json!({ "data": [{ "id": 1 }] }))
        .fail("http://api.test/b", status(401, Value::Null));

    assert_eq!(
        mock.get(&request("a", "http://api.test/a")).unwrap(),
        json!({ "data": [{ "id": 1 }] })
    );
    assert!(mock.get(&request("b", "http://api.test/b")).is_err());
    assert_eq!(mock.get(&request("c", "http://api.test/c")).unwrap(), json!({ "data": [] }));
    assert_eq!(
        mock.requested_urls(),
        vec!["http://api.test/a", "http://api.test/b", "http://api.test/c"]
    );
}

#[test]
fn only_latest_ticket_per_slot_is_current() {
    let mock = Arc::new(MockTransport::new());
    let mut fetcher = OptionFetcher::new(mock);

    let first = fetcher.dispatch(0, request("city", "http://api.test/cities/1"));
    let second = fetcher.dispatch(0, request("city", "http://api.test/cities/2"));
    let other = fetcher.dispatch(1, request("zone", "http://api.test/zones"));
    assert!(first < second);
    assert_eq!(fetcher.in_flight(), 3);

    let mut outcomes = Vec::new();
    while let Some(outcome) = fetcher.next_timeout(Duration::from_secs(5)) {
        outcomes.push(outcome);
        if outcomes.len() == 3 {
            break;
        }
    }
    assert_eq!(outcomes.len(), 3);
    assert_eq!(fetcher.in_flight(), 0);

    for outcome in &outcomes {
        let current = fetcher.is_current(outcome);
        match outcome.ticket {
            t if t == first => assert!(!current),
            t if t == second || t == other => assert!(current),
            t => panic!("unexpected ticket {}", t),
        }
    }
}

#[test]
fn cancelled_slots_have_no_current_ticket() {
    let mut fetcher = OptionFetcher::new(Arc::new(MockTransport::new()));
    fetcher.dispatch(0, request("city", "http://api.test/cities"));
    fetcher.cancel(0);

    let outcome = fetcher.next_timeout(Duration::from_secs(5)).unwrap();
    assert!(!fetcher.is_current(&outcome));
}
