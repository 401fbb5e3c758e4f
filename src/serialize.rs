use std::{borrow::Cow, fmt, rc::Rc};

use derive_ex::Ex;
use parse_display::Display;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number};

use crate::{BoxError, MemberKind, Object, ToValue, TypedBuffer, Value};


/// What a custom serializer hook decided for a value.
pub enum SerializerStep {
    /// Continue with the built-in rules, using this value instead.
    Next(Value),
    /// Stop and return this JSON. `None` means `undefined`.
    Done(Option<serde_json::Value>),
}

pub type SerializerHook = Rc<dyn Fn(&Value) -> Result<SerializerStep, BoxError>>;

/// Options of [`serialize`].
#[derive(Clone, Ex)]
#[derive_ex(Default)]
pub struct SerializeOptions {
    /// Runs before the built-in rules at every level of the walk.
    pub serializer: Option<SerializerHook>,
    /// Drop members contributed by field models and validation state.
    #[default(true)]
    pub exclude_validation_fields: bool,
    /// Drop the type marker of serializable objects.
    #[default(true)]
    pub exclude_serializable_marker: bool,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_serializer(
        mut self,
        serializer: impl Fn(&Value) -> Result<SerializerStep, BoxError> + 'static,
    ) -> Self {
        self.serializer = Some(Rc::new(serializer));
        self
    }
    pub fn with_validation_fields(mut self, exclude: bool) -> Self {
        self.exclude_validation_fields = exclude;
        self
    }
    pub fn with_serializable_marker(mut self, exclude: bool) -> Self {
        self.exclude_serializable_marker = exclude;
        self
    }

    fn excludes(&self, kind: MemberKind) -> bool {
        match kind {
            MemberKind::Data => false,
            MemberKind::Validation => self.exclude_validation_fields,
            MemberKind::SerializableMarker => self.exclude_serializable_marker,
        }
    }
}

impl fmt::Debug for SerializeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerializeOptions")
            .field("serializer", &self.serializer.as_ref().map(|_| ".."))
            .field("exclude_validation_fields", &self.exclude_validation_fields)
            .field(
                "exclude_serializable_marker",
                &self.exclude_serializable_marker,
            )
            .finish()
    }
}

/// A failure raised by user code during [`serialize`]. The original error is kept as the source.
#[derive(Debug, Display)]
pub enum SerializeError {
    #[display("failed to read `{0}`: {1}")]
    Getter(String, BoxError),
    #[display("serializer hook failed: {0}")]
    Hook(BoxError),
    #[display("snapshot does not match the requested type: {0}")]
    Shape(serde_json::Error),
}

impl SerializeError {
    pub fn into_inner(self) -> BoxError {
        match self {
            SerializeError::Getter(_, e) | SerializeError::Hook(e) => e,
            SerializeError::Shape(e) => Box::new(e),
        }
    }
}

impl std::error::Error for SerializeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerializeError::Getter(_, e) | SerializeError::Hook(e) => Some(e.as_ref()),
            SerializeError::Shape(e) => Some(e),
        }
    }
}

/// Converts a value graph into plain JSON.
///
/// Returns `Ok(None)` where JavaScript would produce `undefined`: for [`Value::Undefined`]
/// and for an empty [`Value::Optional`].
///
/// Functions and symbols never appear in the output. Object members whose [`MemberKind`]
/// is excluded by `options` are skipped. An object that ends up with no keys but has a
/// scalar-extraction function serializes to that scalar.
///
/// Errors from getters and from the serializer hook are returned unchanged inside
/// [`SerializeError`].
pub fn serialize(
    value: &Value,
    options: &SerializeOptions,
) -> Result<Option<serde_json::Value>, SerializeError> {
    let mut value = Cow::Borrowed(value);
    if let Some(serializer) = &options.serializer {
        match serializer(&*value).map_err(SerializeError::Hook)? {
            SerializerStep::Done(json) => return Ok(json),
            SerializerStep::Next(next) => value = Cow::Owned(next),
        }
    }

    Ok(match &*value {
        Value::Undefined => None,
        Value::Null => Some(serde_json::Value::Null),
        Value::Buffer(buffer) => Some(buffer_to_json(buffer)),
        Value::Optional(None) => None,
        Value::Optional(Some(inner)) => serialize(inner, options)?,
        Value::Sequence(items) => Some(serde_json::Value::Array(
            items
                .iter()
                .map(|item| Ok(serialize(item, options)?.unwrap_or(serde_json::Value::Null)))
                .collect::<Result<_, SerializeError>>()?,
        )),
        Value::Object(object) => serialize_object(object, options)?,
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Number(n) => Some(number_to_json(*n)),
        Value::String(s) => Some(serde_json::Value::String(s.clone())),
        Value::BigInt(n) => Some(serde_json::Value::String(n.to_string())),
        Value::Function(name) => Some(serde_json::Value::String(format!(
            "function {name}() {{ [native code] }}"
        ))),
        Value::Symbol(description) => Some(serde_json::Value::String(format!(
            "Symbol({})",
            description.as_deref().unwrap_or_default()
        ))),
    })
}

fn serialize_object(
    object: &Object,
    options: &SerializeOptions,
) -> Result<Option<serde_json::Value>, SerializeError> {
    let mut map = Map::new();
    let mut keys = 0;
    for member in object.members() {
        if options.excludes(member.kind()) {
            continue;
        }
        let value = member
            .read()
            .map_err(|e| SerializeError::Getter(member.name().to_owned(), e))?;
        if value.is_callable_or_symbol() {
            continue;
        }
        keys += 1;
        if let Some(json) = serialize(&value, options)? {
            map.insert(member.name().to_owned(), json);
        }
    }
    if keys == 0 {
        if let Some(scalar) = object.value_of() {
            return serialize(&scalar, options);
        }
    }
    Ok(Some(serde_json::Value::Object(map)))
}

fn buffer_to_json(buffer: &TypedBuffer) -> serde_json::Value {
    serde_json::Value::Array(buffer.to_vec().into_iter().map(Into::into).collect())
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        serde_json::Value::from(n as i64)
    } else {
        Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

/// Same as [`serialize`], but `undefined` becomes `null`.
pub fn serialize_json(
    value: &Value,
    options: &SerializeOptions,
) -> Result<serde_json::Value, SerializeError> {
    Ok(serialize(value, options)?.unwrap_or(serde_json::Value::Null))
}

/// Serializes anything convertible to [`Value`] with default options.
pub fn to_json(value: &(impl ToValue + ?Sized)) -> Result<serde_json::Value, SerializeError> {
    serialize_json(&value.to_value(), &SerializeOptions::default())
}

/// Serializes anything convertible to [`Value`] and renders it as JSON text.
pub fn to_json_string(
    value: &(impl ToValue + ?Sized),
    options: &SerializeOptions,
) -> Result<String, SerializeError> {
    let json = serialize_json(&value.to_value(), options)?;
    Ok(json.to_string())
}

/// Serializes a value and reads the snapshot back as a typed JSON model.
pub fn serialize_as<T: DeserializeOwned>(
    value: &(impl ToValue + ?Sized),
    options: &SerializeOptions,
) -> Result<T, SerializeError> {
    let json = serialize_json(&value.to_value(), options)?;
    serde_json::from_value(json).map_err(SerializeError::Shape)
}
