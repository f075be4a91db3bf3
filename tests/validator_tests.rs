use chrono::NaiveDate;
use dynamic_form::schema::{
    validator::{ValidationError, Validator, compiled_pattern, error_message, validate_all},
    value::FieldValue,
};

fn check(validator: Validator, value: impl Into<FieldValue>) -> Option<ValidationError> {
    validator.validate(&value.into())
}

// =========================================================================
// Individual rules
// =========================================================================

#[test]
fn required_rejects_null_empty_text_and_empty_list() {
    assert_eq!(check(Validator::Required, FieldValue::Null), Some(ValidationError::Required));
    assert_eq!(check(Validator::Required, ""), Some(ValidationError::Required));
    assert_eq!(
        check(Validator::Required, FieldValue::List(vec![])),
        Some(ValidationError::Required)
    );
    assert_eq!(check(Validator::Required, 0), None);
    assert_eq!(check(Validator::Required, false), None);
}

#[test]
fn required_true_needs_literal_true() {
    assert_eq!(check(Validator::RequiredTrue, true), None);
    assert!(check(Validator::RequiredTrue, false).is_some());
    assert!(check(Validator::RequiredTrue, "true").is_some());
}

#[test]
fn min_and_max_skip_blank_and_non_numeric() {
    assert_eq!(check(Validator::Min { min: 5.0 }, ""), None);
    assert_eq!(check(Validator::Min { min: 5.0 }, "abc"), None);
    assert_eq!(check(Validator::Min { min: 5.0 }, "5"), None);
    assert_eq!(
        check(Validator::Min { min: 5.0 }, 4),
        Some(ValidationError::Min { min: 5.0, actual: 4.0 })
    );
    assert_eq!(
        check(Validator::Max { max: 10.0 }, 10.5),
        Some(ValidationError::Max { max: 10.0, actual: 10.5 })
    );
}

#[test]
fn length_rules_count_characters() {
    assert_eq!(check(Validator::min_length(3), ""), None);
    assert_eq!(
        check(Validator::min_length(3), "ñá"),
        Some(ValidationError::MinLength { required: 3, actual: 2 })
    );
    assert_eq!(check(Validator::max_length(3), "ñáé"), None);
    assert!(check(Validator::max_length(3), "abcd").is_some());
    assert_eq!(check(Validator::max_length(3), 12345), None);
}

#[test]
fn pattern_matches_whole_value() {
    let digits = Validator::pattern("[0-9]+");
    assert_eq!(check(digits.clone(), "123"), None);
    assert!(check(digits.clone(), "12a").is_some());
    assert_eq!(check(digits.clone(), ""), None);
    // Numbers are matched through their text.
    assert_eq!(check(digits, 42), None);
}

#[test]
fn invalid_pattern_is_ignored() {
    assert_eq!(check(Validator::pattern("(["), "anything"), None);
    assert_eq!(check(Validator::pattern("(["), "again"), None);
    assert!(compiled_pattern("([").is_none());
}

#[test]
fn compiled_patterns_are_anchored_and_reused() {
    let first = compiled_pattern("[a-z]{2}").unwrap();
    let second = compiled_pattern("[a-z]{2}").unwrap();
    assert_eq!(first.as_str(), "^(?:[a-z]{2})$");
    assert_eq!(first.as_str(), second.as_str());
    assert!(first.is_match("ab"));
    assert!(!second.is_match("abc"));

    let rule = Validator::pattern("[a-z]{2}");
    for _ in 0..3 {
        assert_eq!(check(rule.clone(), "xy"), None);
        assert!(check(rule.clone(), "x1").is_some());
    }
}

#[test]
fn email_rule() {
    assert_eq!(check(Validator::Email, "ana@example.com"), None);
    assert_eq!(check(Validator::Email, ""), None);
    assert_eq!(check(Validator::Email, "ana@"), Some(ValidationError::Email));
}

#[test]
fn date_bounds_compare_calendar_days() {
    let bound = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
    assert_eq!(check(Validator::MinDate { date: bound }, "2024-05-10"), None);
    assert_eq!(check(Validator::MinDate { date: bound }, "2024-05-10T23:00:00"), None);
    assert_eq!(
        check(Validator::MinDate { date: bound }, "2024-05-09").map(|e| e.key()),
        Some("min")
    );
    assert_eq!(
        check(Validator::MaxDate { date: bound }, "2024-05-11").map(|e| e.key()),
        Some("max")
    );
    assert_eq!(check(Validator::MaxDate { date: bound }, ""), None);
}

#[test]
fn validate_all_collects_every_failure() {
    let validators = vec![Validator::min_length(5), Validator::pattern("[a-z]+")];
    let errors = validate_all(&validators, &FieldValue::text("AB"));
    let keys: Vec<_> = errors.iter().map(ValidationError::key).collect();
    assert_eq!(keys, vec!["minlength", "pattern"]);
}

// =========================================================================
// Messages
// =========================================================================

#[test]
fn message_precedence_prefers_required() {
    let errors = vec![
        ValidationError::MaxLength { required: 3, actual: 4 },
        ValidationError::Required,
    ];
    assert_eq!(error_message(&errors).as_deref(), Some("Este campo es obligatorio"));
}

#[test]
fn messages_carry_rule_parameters() {
    assert_eq!(
        error_message(&[ValidationError::Min { min: 1.0, actual: 0.0 }]).as_deref(),
        Some("El valor debe ser mayor o igual a 1")
    );
    assert_eq!(
        error_message(&[ValidationError::Max { max: 2.5, actual: 3.0 }]).as_deref(),
        Some("El valor debe ser menor o igual a 2.5")
    );
    assert_eq!(
        error_message(&[ValidationError::MinLength { required: 4, actual: 1 }]).as_deref(),
        Some("Debe tener al menos 4 caracteres")
    );
    assert_eq!(
        error_message(&[ValidationError::MaxLength { required: 8, actual: 9 }]).as_deref(),
        Some("Debe tener como máximo 8 caracteres")
    );
    assert_eq!(
        error_message(&[ValidationError::Email, ValidationError::Pattern {
            pattern: "x".into(),
            actual: "y".into(),
        }])
        .as_deref(),
        Some("Debe ser un correo electrónico válido")
    );
}

#[test]
fn no_message_without_known_errors() {
    assert_eq!(error_message(&[]), None);
    assert_eq!(error_message(&[ValidationError::Range]), None);
    assert_eq!(ValidationError::Range.key(), "rangeError");
}
