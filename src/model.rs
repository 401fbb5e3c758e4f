use std::{borrow::Cow, fmt};

use derive_ex::Ex;
use indexmap::IndexMap;
use parse_display::Display;

use crate::{to_number, MemberKind, Object, ToValue, ValidatorError, Value, ValueTypeError};

#[cfg(test)]
mod tests;

/// A direct field change.
#[derive(Clone, Debug, PartialEq)]
pub struct NameValue {
    pub name: String,
    pub value: Value,
}
impl NameValue {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The element part of an input event.
#[derive(Clone, Debug, PartialEq)]
pub struct InputElement {
    pub name: String,
    pub value: Value,
    /// Declared element type. `"number"` makes the value go through [`to_number`].
    pub input_type: Option<String>,
}
impl InputElement {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            input_type: None,
        }
    }
    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }
}

/// The minimal shape of a UI input event.
pub struct InputEvent {
    pub target: InputElement,
    prevent_default: Option<Box<dyn FnOnce()>>,
}
impl InputEvent {
    pub fn new(target: InputElement) -> Self {
        Self {
            target,
            prevent_default: None,
        }
    }
    pub fn with_prevent_default(mut self, f: impl FnOnce() + 'static) -> Self {
        self.prevent_default = Some(Box::new(f));
        self
    }
}
impl fmt::Debug for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputEvent")
            .field("target", &self.target)
            .field("prevent_default", &self.prevent_default.is_some())
            .finish()
    }
}

/// Argument of [`Model::change_field`].
#[derive(Debug)]
pub enum FieldChange {
    Input(InputEvent),
    Direct(NameValue),
}
impl From<InputEvent> for FieldChange {
    fn from(value: InputEvent) -> Self {
        FieldChange::Input(value)
    }
}
impl From<NameValue> for FieldChange {
    fn from(value: NameValue) -> Self {
        FieldChange::Direct(value)
    }
}
impl<N: Into<String>, V: Into<Value>> From<(N, V)> for FieldChange {
    fn from((name, value): (N, V)) -> Self {
        FieldChange::Direct(NameValue::new(name, value))
    }
}

type FieldGetter<E> = Box<dyn Fn(&E) -> Value>;
type FieldSetter<E> = Box<dyn Fn(&mut E, Value) -> Result<(), ValueTypeError>>;

/// Accessor pair of a single settable field.
pub struct Field<E> {
    name: Cow<'static, str>,
    get: FieldGetter<E>,
    set: FieldSetter<E>,
}
impl<E> Field<E> {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn get(&self, target: &E) -> Value {
        (self.get)(target)
    }
    pub fn set(&self, target: &mut E, value: Value) -> Result<(), ValueTypeError> {
        (self.set)(target, value)
    }
}

/// Registry of the fields an entity declares, in declaration order.
pub struct Schema<E> {
    fields: Vec<Field<E>>,
}

impl<E> Schema<E> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    pub fn field(
        mut self,
        name: impl Into<Cow<'static, str>>,
        get: impl Fn(&E) -> Value + 'static,
        set: impl Fn(&mut E, Value) -> Result<(), ValueTypeError> + 'static,
    ) -> Self {
        let name = name.into();
        self.fields.retain(|f| f.name != name);
        self.fields.push(Field {
            name,
            get: Box::new(get),
            set: Box::new(set),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Field<E>> {
        self.fields.iter().find(|f| f.name == name)
    }
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.fields.iter().map(|f| f.name())
    }
    pub fn iter(&self) -> std::slice::Iter<'_, Field<E>> {
        self.fields.iter()
    }
    pub fn len(&self) -> usize {
        self.fields.len()
    }
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E> Default for Schema<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Schema<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// An object whose fields can be changed through a [`Model`].
///
/// Usually implemented with `#[derive(Entity)]`.
pub trait Entity: Sized + 'static {
    /// Builds the field registry. Called once when a [`Model`] is created.
    fn schema(&self) -> Schema<Self>;
}

/// A dynamic entity. Its fields are the keys present when the model is created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record(IndexMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl Entity for Record {
    fn schema(&self) -> Schema<Self> {
        self.0.keys().fold(Schema::new(), |schema, key| {
            let get_key = key.clone();
            let set_key = key.clone();
            schema.field(
                key.clone(),
                move |r: &Record| r.0.get(&get_key).cloned().unwrap_or_default(),
                move |r: &mut Record, value| {
                    r.0.insert(set_key.clone(), value);
                    Ok(())
                },
            )
        })
    }
}

impl ToValue for Record {
    fn to_value(&self) -> Value {
        Value::Object(self.0.iter().map(|(k, v)| (k.as_str(), v.clone())).collect())
    }
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("Property '{name}' not found in model.")]
pub struct PropertyNotFoundError {
    pub name: String,
}
impl PropertyNotFoundError {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl std::error::Error for PropertyNotFoundError {}

#[derive(Debug, Display)]
pub enum ModelError {
    #[display("{0}")]
    PropertyNotFound(PropertyNotFoundError),
    #[display("invalid value for '{name}': {source}")]
    InvalidValue {
        name: String,
        source: ValueTypeError,
    },
    #[display("{0}")]
    Validator(ValidatorError),
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::PropertyNotFound(e) => Some(e),
            ModelError::InvalidValue { source, .. } => Some(source),
            ModelError::Validator(e) => Some(e),
        }
    }
}
impl From<PropertyNotFoundError> for ModelError {
    fn from(value: PropertyNotFoundError) -> Self {
        ModelError::PropertyNotFound(value)
    }
}
impl From<ValidatorError> for ModelError {
    fn from(value: ValidatorError) -> Self {
        ModelError::Validator(value)
    }
}

/// Receives committed field writes.
///
/// Observers are chained: an observer that wraps another calls it first.
pub trait FieldObserver<E> {
    fn on_field_changed(
        &mut self,
        _target: &E,
        _name: &str,
        _prev_value: &Value,
    ) -> Result<(), ModelError> {
        Ok(())
    }

    /// Adds the observer's own members to a snapshot of the model.
    fn snapshot_members(&self, _object: &mut Object) {}
}

impl<E> FieldObserver<E> for () {}

/// Adapts a closure into a [`FieldObserver`].
pub struct OnFieldChanged<F>(pub F);

impl<E, F: FnMut(&E, &str, &Value)> FieldObserver<E> for OnFieldChanged<F> {
    fn on_field_changed(
        &mut self,
        target: &E,
        name: &str,
        prev_value: &Value,
    ) -> Result<(), ModelError> {
        (self.0)(target, name, prev_value);
        Ok(())
    }
}

/// Options of [`Model::set`].
#[derive(Clone, Copy, Debug, Ex)]
#[derive_ex(Default)]
pub struct SetOptions {
    /// Do not notify the observer.
    pub silent: bool,
    /// Fail on names missing from the schema instead of skipping them.
    #[default(true)]
    pub error_if_unknown_field: bool,
}

impl SetOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            ..Self::default()
        }
    }
    pub fn ignore_unknown_fields(mut self) -> Self {
        self.error_if_unknown_field = false;
        self
    }
}

/// The single write path of an entity.
///
/// Every write goes through [`change_field`](Self::change_field) or [`set`](Self::set),
/// and every committed write is reported to the observer `O`.
pub struct Model<E, O = ()> {
    pub(crate) target: E,
    pub(crate) schema: Schema<E>,
    pub(crate) observer: O,
}

impl<E: Entity> Model<E> {
    pub fn new(target: E) -> Self {
        Self::with_observer(target, ())
    }
}

impl<E: Entity, O> Model<E, O> {
    pub fn with_observer(target: E, observer: O) -> Self {
        let schema = target.schema();
        Self {
            target,
            schema,
            observer,
        }
    }
}

impl<E, O> Model<E, O> {
    pub fn target(&self) -> &E {
        &self.target
    }
    pub fn into_target(self) -> E {
        self.target
    }
    pub fn schema(&self) -> &Schema<E> {
        &self.schema
    }
    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.schema.contains(name)
    }

    /// Reads a field through the schema.
    pub fn field(&self, name: &str) -> Result<Value, PropertyNotFoundError> {
        self.schema
            .get(name)
            .map(|f| f.get(&self.target))
            .ok_or_else(|| PropertyNotFoundError::new(name))
    }
}

impl<E, O: FieldObserver<E>> Model<E, O> {
    /// Applies a field change and notifies the observer.
    ///
    /// Returns `Ok(false)` when nothing was written: the new value equals the current one,
    /// or a numeric input did not parse. The observer is not called in that case.
    pub fn change_field(&mut self, change: impl Into<FieldChange>) -> Result<bool, ModelError> {
        let (name, value, numeric) = match change.into() {
            FieldChange::Input(InputEvent {
                target,
                prevent_default,
            }) => {
                if let Some(prevent_default) = prevent_default {
                    prevent_default();
                }
                let numeric = target.input_type.as_deref() == Some("number");
                (target.name, target.value, numeric)
            }
            FieldChange::Direct(NameValue { name, value }) => (name, value, false),
        };

        let field = self
            .schema
            .get(&name)
            .ok_or_else(|| PropertyNotFoundError::new(name.as_str()))?;
        let prev_value = field.get(&self.target);
        let value = if numeric {
            let n = to_number(&value);
            if n.is_nan() {
                log::debug!("field `{name}`: `{value:?}` is not a number, keeping current value");
                return Ok(false);
            }
            Value::Number(n)
        } else {
            value
        };
        if value == prev_value {
            log::debug!("field `{name}` unchanged");
            return Ok(false);
        }
        field
            .set(&mut self.target, value)
            .map_err(|source| ModelError::InvalidValue {
                name: name.clone(),
                source,
            })?;
        log::trace!("field `{name}` changed");
        self.observer
            .on_field_changed(&self.target, &name, &prev_value)?;
        Ok(true)
    }

    /// Writes several fields at once. Only names declared by the schema are written.
    ///
    /// Entries are applied in order. When an unknown name fails the call, the entries
    /// before it stay applied.
    pub fn set<K, V>(
        &mut self,
        entries: impl IntoIterator<Item = (K, V)>,
        options: SetOptions,
    ) -> Result<&mut Self, ModelError>
    where
        K: AsRef<str>,
        V: Into<Value>,
    {
        for (name, value) in entries {
            let name = name.as_ref();
            let Some(field) = self.schema.get(name) else {
                if options.error_if_unknown_field {
                    return Err(PropertyNotFoundError::new(name).into());
                }
                continue;
            };
            let value = value.into();
            let prev_value = field.get(&self.target);
            if value == prev_value {
                continue;
            }
            field
                .set(&mut self.target, value)
                .map_err(|source| ModelError::InvalidValue {
                    name: name.to_owned(),
                    source,
                })?;
            if !options.silent {
                self.observer
                    .on_field_changed(&self.target, name, &prev_value)?;
            }
        }
        Ok(self)
    }
}

impl<E: ToValue, O: FieldObserver<E>> ToValue for Model<E, O> {
    fn to_value(&self) -> Value {
        let mut object = match self.target.to_value() {
            Value::Object(object) => object,
            value => Object::new().with("target", value),
        };
        object.insert_member(
            "changeField",
            MemberKind::Validation,
            Value::function("changeField"),
        );
        self.observer.snapshot_members(&mut object);
        Value::Object(object)
    }
}

impl<E: fmt::Debug, O> fmt::Debug for Model<E, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("target", &self.target)
            .field("schema", &self.schema)
            .finish()
    }
}
