use assert_call::{call, CallRecorder};
use serde_json::json;

use super::*;
use crate::{serialize_json, NameValue, OnFieldChanged, Record, SerializeOptions};

fn non_empty(target: &Record, field: Option<&str>) -> Result<ValidationResults, ValidatorError> {
    Ok(target
        .iter()
        .filter(|(name, _)| field.map_or(true, |f| f == name.as_str()))
        .map(|(name, value)| {
            let result = match value.as_str() {
                Some("") => FieldResult::invalid("required"),
                _ => FieldResult::valid(),
            };
            (name.clone(), result)
        })
        .collect())
}

fn ab_model() -> ValidableModel<Record, impl Validator<Record>> {
    Model::validable(
        Record::new().with("a", "").with("b", "ok"),
        ValidationErrors::for_fields(["a", "b"]),
        non_empty,
    )
}

#[test]
fn validation_convergence() {
    let mut m = ab_model();
    assert!(!m.validate(None).unwrap());
    assert_eq!(m.errors().error("a"), Some("required"));

    m.change_field(NameValue::new("a", "x")).unwrap();
    assert!(m.validate(Some("a")).unwrap());
    assert_eq!(m.errors().error("a"), None);
    assert!(m.is_valid());
}

#[test]
fn change_revalidates_tracked_field() {
    let mut m = ab_model();
    m.change_field(("b", "")).unwrap();
    assert_eq!(m.errors().error("b"), Some("required"));
    assert!(!m.is_valid());

    m.change_field(("b", "back")).unwrap();
    assert!(m.is_valid());
}

#[test]
fn error_map_identity_is_stable() {
    let mut m = ab_model();
    let before: *const ValidationErrors = m.errors();
    m.validate(None).unwrap();
    m.validate(Some("b")).unwrap();
    m.change_field(("a", "y")).unwrap();
    m.clean_errors();
    let after: *const ValidationErrors = m.errors();
    assert_eq!(before, after);
}

#[test]
fn email_scenario() {
    let validator = |t: &Record, field: Option<&str>| -> Result<ValidationResults, ValidatorError> {
        let mut results = ValidationResults::new();
        if field.map_or(true, |f| f == "email") {
            let error = match t.get("email").and_then(Value::as_str) {
                Some("") | None => FieldResult::invalid("required"),
                Some(_) => FieldResult::valid(),
            };
            results.insert("email".into(), error);
        }
        Ok(results)
    };
    let errors: ValidationErrors = [("email", ErrorProvider::with_error("required"))]
        .into_iter()
        .collect();
    let mut m = Model::validable(Record::new().with("email", ""), errors, validator);

    assert!(!m.is_valid());
    assert_eq!(m.errors().error("email"), Some("required"));

    m.change_field(("email", "a@b.com")).unwrap();
    assert!(m.validate(Some("email")).unwrap());
    assert!(m.is_valid());
}

#[test]
fn initial_state_comes_from_seeded_errors() {
    let m = ab_model();
    assert!(m.is_valid());
    assert_eq!(m.errors().len(), 2);
}

#[test]
fn untracked_fields_do_not_validate() {
    let mut cr = CallRecorder::new();
    let validator = |_: &Record, field: Option<&str>| -> Result<ValidationResults, ValidatorError> {
        call!("validate {}", field.unwrap_or("*"));
        Ok(ValidationResults::new())
    };
    let mut m = Model::validable(
        Record::new().with("a", 1).with("b", 2),
        ValidationErrors::for_fields(["a"]),
        validator,
    );

    m.change_field(("b", 3)).unwrap();
    cr.verify(());
    m.change_field(("a", 3)).unwrap();
    cr.verify("validate a");
    m.change_field(("a", 3)).unwrap();
    cr.verify(());
}

#[test]
fn validate_unknown_field() {
    let mut m = ab_model();
    let e = m.validate(Some("zzz")).unwrap_err();
    assert!(matches!(e, ModelError::PropertyNotFound(_)));
}

#[test]
fn validate_field_without_entry_is_valid() {
    let mut m = Model::validable(
        Record::new().with("a", "").with("b", ""),
        ValidationErrors::for_fields(["a"]),
        |t: &Record, _: Option<&str>| -> Result<ValidationResults, ValidatorError> {
            non_empty(t, Some("a"))
        },
    );
    assert!(m.validate_field("b").unwrap());
    assert!(!m.validate_field("a").unwrap());
}

#[test]
fn validator_fault_propagates() {
    let mut m = Model::validable(
        Record::new().with("a", 1),
        ValidationErrors::for_fields(["a"]),
        |_: &Record, _: Option<&str>| -> Result<ValidationResults, ValidatorError> {
            Err(ValidatorError::new("backend down"))
        },
    );

    let e = m.validate(None).unwrap_err();
    assert_eq!(e.to_string(), "backend down");

    let e = m.change_field(("a", 2)).unwrap_err();
    assert!(matches!(e, ModelError::Validator(_)));
    assert_eq!(m.field("a"), Ok(Value::Number(2.0)));
}

#[test]
fn clean_errors_keeps_entries() {
    let mut m = ab_model();
    m.validate(None).unwrap();
    assert!(!m.is_valid());

    m.clean_errors();
    assert!(m.is_valid());
    assert!(m.errors().contains("a"));
    assert_eq!(m.errors().get("a"), Some(&ErrorProvider::new()));
}

#[test]
fn results_for_new_fields_are_added() {
    let mut m = Model::validable(
        Record::new().with("a", ""),
        ValidationErrors::new(),
        non_empty,
    );
    assert!(!m.validate(None).unwrap());
    assert!(m.errors().contains("a"));
}

#[test]
fn validable_all_tracks_every_field() {
    let m = Model::validable_all(Record::new().with("a", "").with("b", "ok"), non_empty);
    let names: Vec<_> = m.errors().iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["a", "b"]);
}

#[test]
fn chained_observer_runs_first() {
    let mut cr = CallRecorder::new();
    let next = OnFieldChanged(|_: &Record, name: &str, _: &Value| call!("next {name}"));
    let validator = |_: &Record, field: Option<&str>| -> Result<ValidationResults, ValidatorError> {
        call!("validate {}", field.unwrap_or("*"));
        Ok(ValidationResults::new())
    };
    let mut m = Model::with_observer(
        Record::new().with("a", 1),
        Validation::chained(ValidationErrors::for_fields(["a"]), validator, next),
    );

    m.change_field(("a", 2)).unwrap();
    cr.verify(["next a", "validate a"]);
}

#[test]
fn snapshot_excludes_validation_members() {
    let mut m = ab_model();
    m.validate(None).unwrap();

    let v = m.to_value();
    assert_eq!(
        serialize_json(&v, &SerializeOptions::default()).unwrap(),
        json!({ "a": "", "b": "ok" })
    );
    assert_eq!(
        serialize_json(&v, &SerializeOptions::new().with_validation_fields(false)).unwrap(),
        json!({
            "a": "",
            "b": "ok",
            "errors": { "a": { "error": "required" }, "b": {} },
            "isValid": false
        })
    );
}

#[test]
fn submit_guard_via_validable() {
    fn check(model: &mut impl Validable) -> bool {
        model.validate_all().unwrap() && model.is_valid()
    }
    let mut m = ab_model();
    assert!(!check(&mut m));
    m.change_field(("a", "filled")).unwrap();
    assert!(check(&mut m));
}
