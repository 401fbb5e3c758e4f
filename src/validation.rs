use indexmap::IndexMap;
use parse_display::Display;

use crate::{
    BoxError, Entity, FieldObserver, MemberKind, Model, ModelError, Object, PropertyNotFoundError,
    ToValue, Value,
};

mod rules;

pub use rules::*;

#[cfg(test)]
mod tests;

/// Validation state of a single field. An empty `error` means the field is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorProvider {
    pub error: Option<String>,
}
impl ErrorProvider {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_error(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

impl ToValue for ErrorProvider {
    fn to_value(&self) -> Value {
        Value::Object(Object::new().with("error", self.error.clone()))
    }
}

/// Per-field validation state.
///
/// The map is only ever updated in place; validation merges new results into it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(IndexMap<String, ErrorProvider>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an entry with no error for each name.
    pub fn for_fields<N: Into<String>>(names: impl IntoIterator<Item = N>) -> Self {
        names
            .into_iter()
            .map(|name| (name, ErrorProvider::new()))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ErrorProvider> {
        self.0.get(name)
    }
    /// Returns the current error of a field, if any.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(|p| p.error.as_deref())
    }
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, ErrorProvider> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.0.values().all(ErrorProvider::is_valid)
    }

    fn merge(&mut self, results: ValidationResults) {
        for (name, result) in results {
            self.0.entry(name).or_default().error = result.error;
        }
    }

    fn clean(&mut self) {
        for provider in self.0.values_mut() {
            provider.error = None;
        }
    }
}

impl<N: Into<String>> FromIterator<(N, ErrorProvider)> for ValidationErrors {
    fn from_iter<I: IntoIterator<Item = (N, ErrorProvider)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, p)| (n.into(), p)).collect())
    }
}

impl ToValue for ValidationErrors {
    fn to_value(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.as_str(), v.to_value())).collect())
    }
}

/// Result a validator reports for one field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldResult {
    pub error: Option<String>,
}
impl FieldResult {
    pub fn valid() -> Self {
        Self { error: None }
    }
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
        }
    }
}

pub type ValidationResults = IndexMap<String, FieldResult>;

/// A fault inside a validator. Invalid input is never reported this way.
#[derive(Debug, Display)]
#[display("{0}")]
pub struct ValidatorError(BoxError);

impl ValidatorError {
    pub fn new(error: impl Into<BoxError>) -> Self {
        Self(error.into())
    }
    pub fn into_inner(self) -> BoxError {
        self.0
    }
}

impl std::error::Error for ValidatorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.0.as_ref())
    }
}

/// Validates an entity, either one field (`field` is `Some`) or all of it.
pub trait Validator<E> {
    fn validate(&self, target: &E, field: Option<&str>)
        -> Result<ValidationResults, ValidatorError>;
}

impl<E, F> Validator<E> for F
where
    F: Fn(&E, Option<&str>) -> Result<ValidationResults, ValidatorError>,
{
    fn validate(
        &self,
        target: &E,
        field: Option<&str>,
    ) -> Result<ValidationResults, ValidatorError> {
        self(target, field)
    }
}

/// Observer that keeps [`ValidationErrors`] up to date.
///
/// A change to a field that has an entry in the error map re-validates that field.
/// Other fields never trigger validation.
pub struct Validation<V, O = ()> {
    errors: ValidationErrors,
    validator: V,
    next: O,
}

impl<V> Validation<V> {
    pub fn new(errors: ValidationErrors, validator: V) -> Self {
        Self::chained(errors, validator, ())
    }
}

impl<V, O> Validation<V, O> {
    /// Creates a validation observer that notifies `next` before validating.
    pub fn chained(errors: ValidationErrors, validator: V, next: O) -> Self {
        Self {
            errors,
            validator,
            next,
        }
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }
    pub fn is_valid(&self) -> bool {
        self.errors.is_valid()
    }
    pub fn validator(&self) -> &V {
        &self.validator
    }
    pub fn next(&self) -> &O {
        &self.next
    }

    fn run<E>(&mut self, target: &E, name: Option<&str>) -> Result<bool, ValidatorError>
    where
        V: Validator<E>,
    {
        log::trace!("validate {}", name.unwrap_or("<all>"));
        let results = self.validator.validate(target, name)?;
        self.errors.merge(results);
        Ok(match name {
            Some(name) => self.errors.get(name).map_or(true, ErrorProvider::is_valid),
            None => self.errors.is_valid(),
        })
    }
}

impl<E, V: Validator<E>, O: FieldObserver<E>> FieldObserver<E> for Validation<V, O> {
    fn on_field_changed(
        &mut self,
        target: &E,
        name: &str,
        prev_value: &Value,
    ) -> Result<(), ModelError> {
        self.next.on_field_changed(target, name, prev_value)?;
        if self.errors.contains(name) {
            self.run(target, Some(name))?;
        }
        Ok(())
    }

    fn snapshot_members(&self, object: &mut Object) {
        self.next.snapshot_members(object);
        object.insert_member("errors", MemberKind::Validation, self.errors.to_value());
        object.insert_member("isValid", MemberKind::Validation, self.is_valid());
        object.insert_member("validate", MemberKind::Validation, Value::function("validate"));
    }
}

/// A model that can be checked before it is submitted.
pub trait Validable {
    /// Validates every field. Returns the aggregate validity.
    fn validate_all(&mut self) -> Result<bool, ModelError>;
    fn is_valid(&self) -> bool;
}

pub type ValidableModel<E, V, O = ()> = Model<E, Validation<V, O>>;

impl<E: Entity, V: Validator<E>> Model<E, Validation<V>> {
    pub fn validable(target: E, errors: ValidationErrors, validator: V) -> Self {
        Model::with_observer(target, Validation::new(errors, validator))
    }

    /// Creates a validable model with an empty error entry for every schema field.
    pub fn validable_all(target: E, validator: V) -> Self {
        let mut model = Self::validable(target, ValidationErrors::new(), validator);
        model.observer.errors = ValidationErrors::for_fields(model.schema.names());
        model
    }
}

impl<E, V: Validator<E>, O: FieldObserver<E>> Model<E, Validation<V, O>> {
    pub fn errors(&self) -> &ValidationErrors {
        &self.observer.errors
    }

    /// `true` when no field currently has an error. Recomputed on every call.
    pub fn is_valid(&self) -> bool {
        self.observer.is_valid()
    }

    /// Runs the validator and merges its results into [`errors`](Self::errors).
    ///
    /// With a field name, returns whether that field is valid; otherwise returns
    /// [`is_valid`](Self::is_valid).
    pub fn validate(&mut self, name: Option<&str>) -> Result<bool, ModelError> {
        if let Some(name) = name {
            if !self.schema.contains(name) {
                return Err(PropertyNotFoundError::new(name).into());
            }
        }
        Ok(self.observer.run(&self.target, name)?)
    }
    pub fn validate_field(&mut self, name: &str) -> Result<bool, ModelError> {
        self.validate(Some(name))
    }

    /// Clears every error, keeping the entries.
    pub fn clean_errors(&mut self) {
        self.observer.errors.clean();
    }
}

impl<E, V: Validator<E>, O: FieldObserver<E>> Validable for Model<E, Validation<V, O>> {
    fn validate_all(&mut self) -> Result<bool, ModelError> {
        self.validate(None)
    }
    fn is_valid(&self) -> bool {
        self.observer.is_valid()
    }
}
