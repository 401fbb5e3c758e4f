use rstest::rstest;

use super::*;
use crate::{Model, Record};

#[rstest]
#[case(Rule::required(), Value::from(""), Err("is required"))]
#[case(Rule::required(), Value::Undefined, Err("is required"))]
#[case(Rule::required(), Value::none(), Err("is required"))]
#[case(Rule::required(), Value::from(0), Ok(()))]
#[case(Rule::min_length(3), Value::from("ab"), Err("must be at least 3 characters"))]
#[case(Rule::min_length(3), Value::from("abc"), Ok(()))]
#[case(Rule::min_length(3), Value::from(""), Ok(()))]
#[case(Rule::max_length(2), Value::from("äöü"), Err("must be at most 2 characters"))]
#[case(Rule::max_length(2), Value::Sequence(vec![1.into()]), Ok(()))]
#[case(Rule::range(1.0, 10.0), Value::from(10), Ok(()))]
#[case(Rule::range(1.0, 10.0), Value::from("11"), Err("must be between 1 and 10"))]
#[case(Rule::range(1.0, 10.0), Value::from("x"), Err("must be between 1 and 10"))]
#[case(Rule::range(1.0, 10.0), Value::Null, Ok(()))]
fn rule_check(#[case] rule: Rule, #[case] value: Value, #[case] expected: Result<(), &str>) {
    assert_eq!(rule.check(&value), expected.map_err(str::to_owned));
}

#[test]
fn matches_rule() {
    let rule = Rule::matches(Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());
    assert_eq!(rule.check(&"a@b.com".into()), Ok(()));
    assert_eq!(
        rule.check(&"nope".into()),
        Err("has an invalid format".to_owned())
    );
    assert_eq!(rule.check(&Value::from(5)), Err("has an invalid format".to_owned()));
}

#[test]
fn custom_rule_and_message() {
    let even = Rule::custom(|v| match to_number(v) as i64 % 2 {
        0 => Ok(()),
        _ => Err("must be even".into()),
    });
    assert_eq!(even.check(&Value::from(4)), Ok(()));
    assert_eq!(even.check(&Value::from(3)), Err("must be even".to_owned()));

    let rule = Rule::required().with_message("enter a value");
    assert_eq!(rule.check(&"".into()), Err("enter a value".to_owned()));
}

#[test]
fn optional_values_are_unwrapped() {
    let rule = Rule::min_length(2);
    assert_eq!(rule.check(&Value::some("a")), Err("must be at least 2 characters".to_owned()));
    assert_eq!(rule.check(&Value::some("ab")), Ok(()));
}

fn form_rules() -> Rules<Record> {
    Rules::new()
        .field("email", [Rule::required(), Rule::max_length(5)])
        .field("age", [Rule::range(18.0, 99.0)])
}

#[test]
fn first_failure_wins() {
    let rules = form_rules();
    let target = Record::new().with("email", "").with("age", 20);
    let results = rules.validate(&target, None).unwrap();
    assert_eq!(results["email"], FieldResult::invalid("is required"));
    assert_eq!(results["age"], FieldResult::valid());

    let target = Record::new().with("email", "toolong").with("age", 20);
    let results = rules.validate(&target, Some("email")).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results["email"], FieldResult::invalid("must be at most 5 characters"));
}

#[test]
fn errors_has_entry_per_ruled_field() {
    let errors = form_rules().errors();
    let names: Vec<_> = errors.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, ["email", "age"]);
    assert!(errors.is_valid());
}

#[test]
fn field_missing_from_schema_is_a_fault() {
    let rules: Rules<Record> = Rules::new().field("phone", [Rule::required()]);
    let e = rules.validate(&Record::new().with("email", ""), None).unwrap_err();
    assert_eq!(e.to_string(), "Property 'phone' not found in model.");
}

#[test]
fn rules_drive_a_model() {
    let rules = form_rules();
    let errors = rules.errors();
    let mut m = Model::validable(Record::new().with("email", "").with("age", 30), errors, rules);

    assert!(!m.validate(None).unwrap());
    assert_eq!(m.errors().error("email"), Some("is required"));

    m.change_field(("email", "a@b")).unwrap();
    assert!(m.is_valid());

    m.change_field(("age", 5)).unwrap();
    assert_eq!(m.errors().error("age"), Some("must be between 18 and 99"));
}
