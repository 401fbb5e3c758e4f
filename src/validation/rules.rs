use std::{marker::PhantomData, rc::Rc};

use indexmap::IndexMap;
use parse_display::Display;
use regex::Regex;

use crate::{
    to_number, Entity, FieldResult, PropertyNotFoundError, ValidationErrors, ValidationResults,
    Validator, ValidatorError, Value,
};

#[cfg(test)]
mod tests;

#[derive(Display)]
enum RuleKind {
    #[display("is required")]
    Required,
    #[display("must be at least {0} characters")]
    MinLength(usize),
    #[display("must be at most {0} characters")]
    MaxLength(usize),
    #[display("must be between {0} and {1}")]
    Range(f64, f64),
    #[display("has an invalid format")]
    Matches(Regex),
    #[display("is invalid")]
    Custom(Rc<dyn Fn(&Value) -> Result<(), String>>),
}

/// A single check applied to a field value.
///
/// Every rule except [`Rule::required`] accepts empty values
/// (`undefined`, `null`, an empty optional, an empty string or sequence).
pub struct Rule {
    kind: RuleKind,
    message: Option<String>,
}

impl Rule {
    fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn required() -> Self {
        Self::new(RuleKind::Required)
    }
    pub fn min_length(min: usize) -> Self {
        Self::new(RuleKind::MinLength(min))
    }
    pub fn max_length(max: usize) -> Self {
        Self::new(RuleKind::MaxLength(max))
    }
    /// Inclusive numeric range. Strings are read as numbers.
    pub fn range(min: f64, max: f64) -> Self {
        Self::new(RuleKind::Range(min, max))
    }
    pub fn matches(regex: Regex) -> Self {
        Self::new(RuleKind::Matches(regex))
    }
    /// A check returning its own error message.
    pub fn custom(f: impl Fn(&Value) -> Result<(), String> + 'static) -> Self {
        Self::new(RuleKind::Custom(Rc::new(f)))
    }

    /// Replaces the default error message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn check(&self, value: &Value) -> Result<(), String> {
        let value = value.flatten_optional();
        if is_empty(&value) {
            return match self.kind {
                RuleKind::Required => Err(self.message()),
                _ => Ok(()),
            };
        }
        let ok = match &self.kind {
            RuleKind::Required => true,
            RuleKind::MinLength(min) => length(&value).map_or(true, |len| len >= *min),
            RuleKind::MaxLength(max) => length(&value).map_or(true, |len| len <= *max),
            RuleKind::Range(min, max) => {
                let n = to_number(&value);
                *min <= n && n <= *max
            }
            RuleKind::Matches(regex) => value.as_str().is_some_and(|s| regex.is_match(s)),
            RuleKind::Custom(f) => {
                return f(&value).map_err(|e| self.message.clone().unwrap_or(e));
            }
        };
        if ok {
            Ok(())
        } else {
            Err(self.message())
        }
    }

    fn message(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| self.kind.to_string())
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null | Value::Optional(None) => true,
        Value::String(s) => s.is_empty(),
        Value::Sequence(items) => items.is_empty(),
        _ => false,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Sequence(items) => Some(items.len()),
        Value::Buffer(buffer) => Some(buffer.len()),
        _ => None,
    }
}

/// A [`Validator`] built from per-field rule lists.
///
/// The rules of a field run in order and the first failure is the field's error.
pub struct Rules<E> {
    fields: IndexMap<String, Vec<Rule>>,
    _entity: PhantomData<fn(&E)>,
}

impl<E: Entity> Rules<E> {
    pub fn new() -> Self {
        Self {
            fields: IndexMap::new(),
            _entity: PhantomData,
        }
    }

    pub fn field(mut self, name: impl Into<String>, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.entry(name.into()).or_default().extend(rules);
        self
    }

    /// An error map with an empty entry for every field that has rules.
    pub fn errors(&self) -> ValidationErrors {
        ValidationErrors::for_fields(self.fields.keys().cloned())
    }
}

impl<E: Entity> Default for Rules<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity> Validator<E> for Rules<E> {
    fn validate(
        &self,
        target: &E,
        field: Option<&str>,
    ) -> Result<ValidationResults, ValidatorError> {
        let schema = target.schema();
        let mut results = ValidationResults::new();
        for (name, rules) in &self.fields {
            if field.is_some_and(|field| field != name) {
                continue;
            }
            let accessor = schema
                .get(name)
                .ok_or_else(|| ValidatorError::new(PropertyNotFoundError::new(name.as_str())))?;
            let value = accessor.get(target);
            let error = rules.iter().find_map(|rule| rule.check(&value).err());
            results.insert(name.clone(), FieldResult { error });
        }
        Ok(results)
    }
}
