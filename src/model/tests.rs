use std::{cell::RefCell, rc::Rc};

use assert_call::{call, CallRecorder};
use serde_json::json;

use super::*;
use crate::{to_json, FromValue, Member};

#[derive(Debug, Clone, PartialEq)]
struct Person {
    name: String,
    age: f64,
}

impl Entity for Person {
    fn schema(&self) -> Schema<Self> {
        Schema::new()
            .field(
                "name",
                |p: &Person| p.name.to_value(),
                |p: &mut Person, v| {
                    p.name = FromValue::from_value(v)?;
                    Ok(())
                },
            )
            .field(
                "age",
                |p: &Person| p.age.to_value(),
                |p: &mut Person, v| {
                    p.age = FromValue::from_value(v)?;
                    Ok(())
                },
            )
    }
}

impl ToValue for Person {
    fn to_value(&self) -> Value {
        Value::Object(Object::new().with("name", &*self.name).with("age", self.age))
    }
}

fn person() -> Person {
    Person {
        name: "Ann".into(),
        age: 30.0,
    }
}

fn spy() -> OnFieldChanged<impl FnMut(&Record, &str, &Value)> {
    OnFieldChanged(|_: &Record, name: &str, prev: &Value| call!("{name}:{prev:?}"))
}

#[test]
fn no_op_change_does_not_notify() {
    let mut cr = CallRecorder::new();
    let mut m = Model::with_observer(Record::new().with("a", 1), spy());

    assert!(!m.change_field(("a", 1)).unwrap());
    cr.verify(());
    assert_eq!(m.target().get("a"), Some(&Value::Number(1.0)));
}

#[test]
fn change_notifies_with_previous_value() {
    let mut cr = CallRecorder::new();
    let mut m = Model::with_observer(Record::new().with("a", 1), spy());

    assert!(m.change_field(NameValue::new("a", 2)).unwrap());
    cr.verify("a:Number(1.0)");
    assert_eq!(m.field("a"), Ok(Value::Number(2.0)));
}

#[test]
fn unknown_field_is_rejected() {
    let mut cr = CallRecorder::new();
    let mut m = Model::with_observer(Record::new().with("a", 1), spy());

    let e = m.change_field(("missing", 1)).unwrap_err();
    assert_eq!(e.to_string(), "Property 'missing' not found in model.");
    assert!(matches!(e, ModelError::PropertyNotFound(_)));
    assert_eq!(m.target(), &Record::new().with("a", 1));
    cr.verify(());
}

#[test]
fn input_event_calls_prevent_default() {
    let mut cr = CallRecorder::new();
    let mut m = Model::new(Record::new().with("a", "x"));

    let e = InputEvent::new(InputElement::new("a", "y")).with_prevent_default(|| call!("prevent"));
    assert!(m.change_field(e).unwrap());
    cr.verify("prevent");
    assert_eq!(m.field("a"), Ok(Value::from("y")));
}

#[test]
fn prevent_default_runs_even_for_unknown_fields() {
    let mut cr = CallRecorder::new();
    let mut m = Model::new(Record::new());

    let e = InputEvent::new(InputElement::new("b", "y")).with_prevent_default(|| call!("prevent"));
    assert!(m.change_field(e).is_err());
    cr.verify("prevent");
}

#[test]
fn number_input_is_converted() {
    let mut m = Model::new(person());

    let e = InputEvent::new(InputElement::new("age", " 41 ").with_type("number"));
    assert!(m.change_field(e).unwrap());
    assert_eq!(m.target().age, 41.0);
}

#[test]
fn number_input_that_does_not_parse_is_ignored() {
    let mut cr = CallRecorder::new();
    let mut m = Model::with_observer(
        person(),
        OnFieldChanged(|_: &Person, name: &str, _: &Value| call!("{name}")),
    );

    let e = InputEvent::new(InputElement::new("age", "abc").with_type("number"));
    assert!(!m.change_field(e).unwrap());
    assert_eq!(m.target().age, 30.0);
    cr.verify(());
}

#[test]
fn text_input_keeps_string() {
    let mut m = Model::new(Record::new().with("a", 0));

    let e = InputEvent::new(InputElement::new("a", "12"));
    assert!(m.change_field(e).unwrap());
    assert_eq!(m.field("a"), Ok(Value::from("12")));
}

#[test]
fn mistyped_value_is_rejected() {
    let mut m = Model::new(person());

    let e = m.change_field(("age", "old")).unwrap_err();
    assert!(matches!(e, ModelError::InvalidValue { ref name, .. } if name == "age"));
    assert_eq!(
        e.to_string(),
        "invalid value for 'age': expected number, found string"
    );
    assert_eq!(m.target(), &person());
}

#[test]
fn observer_errors_propagate() {
    struct Failing;
    impl FieldObserver<Record> for Failing {
        fn on_field_changed(
            &mut self,
            _: &Record,
            _: &str,
            _: &Value,
        ) -> Result<(), ModelError> {
            Err(ValidatorError::new("observer failed").into())
        }
    }

    let mut m = Model::with_observer(Record::new().with("a", 1), Failing);
    let e = m.change_field(("a", 2)).unwrap_err();
    assert_eq!(e.to_string(), "observer failed");
}

#[test]
fn set_writes_known_fields_in_order() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut m = Model::with_observer(
        Record::new().with("a", 1).with("b", 2),
        OnFieldChanged({
            let seen = seen.clone();
            move |_: &Record, name: &str, _: &Value| seen.borrow_mut().push(name.to_owned())
        }),
    );

    m.set([("b", 20), ("a", 10), ("a", 10)], SetOptions::default())
        .unwrap();
    assert_eq!(*seen.borrow(), ["b", "a"]);
    assert_eq!(m.target(), &Record::new().with("a", 10).with("b", 20));
}

#[test]
fn set_unknown_field() {
    let mut m = Model::new(Record::new().with("a", 1));

    let e = m
        .set([("a", 5), ("zzz", 6)], SetOptions::default())
        .unwrap_err();
    assert!(matches!(e, ModelError::PropertyNotFound(_)));
    assert_eq!(m.field("a"), Ok(Value::Number(5.0)));

    m.set(
        [("zzz", 7), ("a", 8)],
        SetOptions::default().ignore_unknown_fields(),
    )
    .unwrap();
    assert_eq!(m.field("a"), Ok(Value::Number(8.0)));
    assert!(!m.has_field("zzz"));
}

#[test]
fn silent_set_does_not_notify() {
    let mut cr = CallRecorder::new();
    let mut m = Model::with_observer(Record::new().with("a", 1), spy());

    m.set([("a", 2)], SetOptions::silent()).unwrap();
    cr.verify(());
    assert_eq!(m.field("a"), Ok(Value::Number(2.0)));
}

#[test]
fn schema_is_fixed_at_construction() {
    let m = Model::new(Record::new().with("a", 1).with("b", 2));
    let names: Vec<_> = m.schema().names().collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(
        m.field("c"),
        Err(PropertyNotFoundError::new("c"))
    );
}

#[test]
fn snapshot_hides_change_field() {
    let m = Model::new(person());
    assert_eq!(to_json(&m).unwrap(), json!({ "name": "Ann", "age": 30 }));

    let Value::Object(o) = m.to_value() else {
        panic!("expected object");
    };
    assert_eq!(
        o.member("changeField").map(Member::kind),
        Some(MemberKind::Validation)
    );
}

#[test]
fn observer_defaults_accept_changes() {
    struct Tagged;
    impl FieldObserver<Record> for Tagged {
        fn snapshot_members(&self, object: &mut Object) {
            object.insert_member("tag", MemberKind::Validation, "t");
        }
    }

    let mut m = Model::with_observer(Record::new().with("a", 1), Tagged);
    assert!(m.change_field(("a", 2)).unwrap());
    assert_eq!(m.field("a"), Ok(Value::Number(2.0)));

    let Value::Object(o) = m.to_value() else {
        panic!("expected object");
    };
    assert_eq!(o.member("tag").map(Member::kind), Some(MemberKind::Validation));
    assert_eq!(to_json(&m).unwrap(), json!({ "a": 2 }));

    let mut m = Model::with_observer(Record::new().with("a", 1), ());
    assert!(m.change_field(("a", 3)).unwrap());
}
