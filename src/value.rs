use std::{
    borrow::Cow,
    collections::{BTreeMap, HashMap},
    fmt,
    rc::Rc,
    time::{SystemTime, UNIX_EPOCH},
};

use indexmap::IndexMap;
use parse_display::Display;


/// Error type produced by user callbacks (getters, serializer hooks, validators).
pub type BoxError = Box<dyn std::error::Error>;

/// Member name used by serializable objects to carry their type marker.
pub const SERIALIZABLE_MARKER: &str = "_serializable";

/// A runtime datum that can be converted to JSON by [`serialize`](crate::serialize()).
///
/// The variants are the categories the serializer distinguishes.
/// [`Value::Optional`] is the zero-or-one wrapper; [`Value::Undefined`] is the absence of a value.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    BigInt(i128),
    Buffer(TypedBuffer),
    Optional(Option<Box<Value>>),
    Sequence(Vec<Value>),
    Object(Object),
    /// A callable member. Carries only its name; it never reaches a snapshot.
    Function(String),
    Symbol(Option<String>),
}

impl Value {
    pub fn some(value: impl Into<Value>) -> Self {
        Value::Optional(Some(Box::new(value.into())))
    }
    pub fn none() -> Self {
        Value::Optional(None)
    }
    pub fn function(name: impl Into<String>) -> Self {
        Value::Function(name.into())
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::BigInt(_) => "bigint",
            Value::Buffer(_) => "buffer",
            Value::Optional(_) => "optional",
            Value::Sequence(_) => "sequence",
            Value::Object(_) => "object",
            Value::Function(_) => "function",
            Value::Symbol(_) => "symbol",
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Returns `true` for values that are never part of a data snapshot.
    pub fn is_callable_or_symbol(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Symbol(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Unwraps nested optionals. An empty optional becomes [`Value::Undefined`].
    pub fn flatten_optional(&self) -> Cow<'_, Value> {
        match self {
            Value::Optional(Some(inner)) => inner.flatten_optional(),
            Value::Optional(None) => Cow::Owned(Value::Undefined),
            value => Cow::Borrowed(value),
        }
    }
}

/// Converts a value to a number the way an HTML number input does (`+value`).
///
/// Returns `NaN` when the value has no numeric reading.
pub fn to_number(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => *n,
        Value::String(s) => parse_number(s),
        Value::BigInt(n) => *n as f64,
        Value::Sequence(items) => match items.as_slice() {
            [] => 0.0,
            [item] if !matches!(item, Value::Sequence(_) | Value::Object(_)) => to_number(item),
            _ => f64::NAN,
        },
        Value::Object(o) => o.value_of().map_or(f64::NAN, |v| to_number(&v)),
        Value::Buffer(_) | Value::Optional(_) | Value::Function(_) | Value::Symbol(_) => f64::NAN,
    }
}

fn parse_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    let radix = match s.get(..2) {
        Some("0x" | "0X") => 16,
        Some("0o" | "0O") => 8,
        Some("0b" | "0B") => 2,
        _ => 10,
    };
    if radix != 10 {
        let digits = &s[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    }
    let unsigned = s.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(s);
    if unsigned == "Infinity" {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    if !unsigned
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

/// A fixed-width numeric array.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypedBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    I8(Vec<i8>),
    I16(Vec<i16>),
    I32(Vec<i32>),
}

impl TypedBuffer {
    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::U8(v) => v.len(),
            TypedBuffer::U16(v) => v.len(),
            TypedBuffer::U32(v) => v.len(),
            TypedBuffer::I8(v) => v.len(),
            TypedBuffer::I16(v) => v.len(),
            TypedBuffer::I32(v) => v.len(),
        }
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the elements widened to `i64`, in order.
    pub fn to_vec(&self) -> Vec<i64> {
        match self {
            TypedBuffer::U8(v) => v.iter().map(|&x| i64::from(x)).collect(),
            TypedBuffer::U16(v) => v.iter().map(|&x| i64::from(x)).collect(),
            TypedBuffer::U32(v) => v.iter().map(|&x| i64::from(x)).collect(),
            TypedBuffer::I8(v) => v.iter().map(|&x| i64::from(x)).collect(),
            TypedBuffer::I16(v) => v.iter().map(|&x| i64::from(x)).collect(),
            TypedBuffer::I32(v) => v.iter().map(|&x| i64::from(x)).collect(),
        }
    }
}

macro_rules! impl_typed_buffer_from {
    ($($t:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<Vec<$t>> for TypedBuffer {
                fn from(value: Vec<$t>) -> Self {
                    TypedBuffer::$variant(value)
                }
            }
        )*
    };
}
impl_typed_buffer_from!(u8 => U8, u16 => U16, u32 => U32, i8 => I8, i16 => I16, i32 => I32);

/// How a member takes part in serialization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[display(style = "snake_case")]
pub enum MemberKind {
    /// Regular data.
    Data,
    /// Structural member contributed by a field model or validation state.
    Validation,
    /// Type marker of a serializable object. Has no runtime meaning.
    SerializableMarker,
}

type Getter = Rc<dyn Fn() -> Result<Value, BoxError>>;
type ValueOf = Rc<dyn Fn() -> Value>;

#[derive(Clone)]
enum Slot {
    Value(Value),
    Getter(Getter),
}

/// A named entry of an [`Object`].
#[derive(Clone)]
pub struct Member {
    name: String,
    kind: MemberKind,
    slot: Slot,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Returns the stored value, or `None` if the member is a getter.
    pub fn value(&self) -> Option<&Value> {
        match &self.slot {
            Slot::Value(v) => Some(v),
            Slot::Getter(_) => None,
        }
    }

    /// Reads the member, running its getter if it has one.
    pub fn read(&self) -> Result<Cow<'_, Value>, BoxError> {
        match &self.slot {
            Slot::Value(v) => Ok(Cow::Borrowed(v)),
            Slot::Getter(f) => f().map(Cow::Owned),
        }
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.kind == other.kind
            && match (&self.slot, &other.slot) {
                (Slot::Value(a), Slot::Value(b)) => a == b,
                (Slot::Getter(a), Slot::Getter(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.slot {
            Slot::Value(v) => fmt::Debug::fmt(v, f),
            Slot::Getter(_) => write!(f, "<getter>"),
        }
    }
}

/// An ordered key/value mapping, optionally carrying a scalar-extraction function.
///
/// Member names are unique; inserting an existing name replaces the member in place.
#[derive(Clone, Default)]
pub struct Object {
    members: Vec<Member>,
    value_of: Option<ValueOf>,
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an object with no members whose scalar form is produced by `value_of`.
    ///
    /// Date/time-like types use this to serialize to their primitive form.
    pub fn container(value_of: impl Fn() -> Value + 'static) -> Self {
        Self {
            members: Vec::new(),
            value_of: Some(Rc::new(value_of)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }
    pub fn with_member(
        mut self,
        name: impl Into<String>,
        kind: MemberKind,
        value: impl Into<Value>,
    ) -> Self {
        self.insert_slot(name.into(), kind, Slot::Value(value.into()));
        self
    }
    pub fn with_getter(
        mut self,
        name: impl Into<String>,
        getter: impl Fn() -> Result<Value, BoxError> + 'static,
    ) -> Self {
        self.insert_slot(name.into(), MemberKind::Data, Slot::Getter(Rc::new(getter)));
        self
    }
    pub fn with_value_of(mut self, value_of: impl Fn() -> Value + 'static) -> Self {
        self.value_of = Some(Rc::new(value_of));
        self
    }

    /// Marks this object as serializable by adding the [`SERIALIZABLE_MARKER`] member.
    pub fn with_serializable_marker(self) -> Self {
        self.with_member(
            SERIALIZABLE_MARKER,
            MemberKind::SerializableMarker,
            Value::Bool(true),
        )
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.insert_slot(name.into(), MemberKind::Data, Slot::Value(value.into()));
    }
    pub fn insert_member(
        &mut self,
        name: impl Into<String>,
        kind: MemberKind,
        value: impl Into<Value>,
    ) {
        self.insert_slot(name.into(), kind, Slot::Value(value.into()));
    }
    fn insert_slot(&mut self, name: String, kind: MemberKind, slot: Slot) {
        if let Some(m) = self.members.iter_mut().find(|m| m.name == name) {
            m.kind = kind;
            m.slot = slot;
        } else {
            self.members.push(Member { name, kind, slot });
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Member> {
        let index = self.members.iter().position(|m| m.name == name)?;
        Some(self.members.remove(index))
    }

    /// Returns the stored value of a member. Getters are not run.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.member(name).and_then(Member::value)
    }
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }
    pub fn members(&self) -> std::slice::Iter<'_, Member> {
        self.members.iter()
    }
    pub fn len(&self) -> usize {
        self.members.len()
    }
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn has_value_of(&self) -> bool {
        self.value_of.is_some()
    }
    /// Runs the scalar-extraction function, if any.
    pub fn value_of(&self) -> Option<Value> {
        self.value_of.as_ref().map(|f| f())
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.members == other.members
            && match (&self.value_of, &other.value_of) {
                (None, None) => true,
                (Some(a), Some(b)) => Rc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_map();
        for m in &self.members {
            d.entry(&m.name, m);
        }
        if self.value_of.is_some() {
            d.entry(&"<value_of>", &"..");
        }
        d.finish()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Object {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut o = Object::new();
        for (k, v) in iter {
            o.insert(k, v);
        }
        o
    }
}

/// Conversion of a borrowed value into a [`Value`].
pub trait ToValue {
    fn to_value(&self) -> Value;
}

/// Conversion of a [`Value`] back into a typed field.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self, ValueTypeError>;
}

#[derive(Debug, Display, Clone, PartialEq, Eq)]
#[display("expected {expected}, found {found}")]
pub struct ValueTypeError {
    pub expected: &'static str,
    pub found: &'static str,
}
impl ValueTypeError {
    pub fn new(expected: &'static str, value: &Value) -> Self {
        Self {
            expected,
            found: value.type_name(),
        }
    }
}

impl std::error::Error for ValueTypeError {}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}
impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        Ok(value)
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}
impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Bool(b) => Ok(b),
            v => Err(ValueTypeError::new("boolean", &v)),
        }
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::String(self.to_owned())
    }
}
impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}
impl FromValue for String {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::String(s) => Ok(s),
            v => Err(ValueTypeError::new("string", &v)),
        }
    }
}

macro_rules! impl_float_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Number(f64::from(*self))
                }
            }
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    value.to_value()
                }
            }
        )*
    };
}
impl_float_value!(f32, f64, i8, i16, i32, u8, u16, u32);

macro_rules! impl_wide_int_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Number(*self as f64)
                }
            }
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    value.to_value()
                }
            }
        )*
    };
}
impl_wide_int_value!(i64, u64, isize, usize);

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Number(n) => Ok(n),
            v => Err(ValueTypeError::new("number", &v)),
        }
    }
}
impl FromValue for f32 {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        f64::from_value(value).map(|n| n as f32)
    }
}

macro_rules! impl_from_value_int {
    ($($t:ty),*) => {
        $(
            impl FromValue for $t {
                fn from_value(value: Value) -> Result<Self, ValueTypeError> {
                    match value {
                        // `MAX as f64` rounds up to a power of two for 64-bit types.
                        Value::Number(n)
                            if n.fract() == 0.0
                                && n >= <$t>::MIN as f64
                                && n < <$t>::MAX as f64 + 1.0 =>
                        {
                            Ok(n as $t)
                        }
                        Value::BigInt(n) => <$t>::try_from(n)
                            .map_err(|_| ValueTypeError::new(stringify!($t), &Value::BigInt(n))),
                        v => Err(ValueTypeError::new(stringify!($t), &v)),
                    }
                }
            }
        )*
    };
}
impl_from_value_int!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

impl ToValue for i128 {
    fn to_value(&self) -> Value {
        Value::BigInt(*self)
    }
}
impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Value::BigInt(value)
    }
}
impl FromValue for i128 {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::BigInt(n) => Ok(n),
            Value::Number(n)
                if n.fract() == 0.0 && n >= i128::MIN as f64 && n < i128::MAX as f64 + 1.0 =>
            {
                Ok(n as i128)
            }
            v => Err(ValueTypeError::new("bigint", &v)),
        }
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        Value::Optional(self.as_ref().map(|v| Box::new(v.to_value())))
    }
}
impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Undefined | Value::Null | Value::Optional(None) => Ok(None),
            Value::Optional(Some(v)) => T::from_value(*v).map(Some),
            v => T::from_value(v).map(Some),
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::Sequence(self.iter().map(ToValue::to_value).collect())
    }
}
impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}
impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Sequence(items) => items.into_iter().map(T::from_value).collect(),
            v => Err(ValueTypeError::new("sequence", &v)),
        }
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}
impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}
impl<T: ToValue + ?Sized> ToValue for Rc<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl ToValue for TypedBuffer {
    fn to_value(&self) -> Value {
        Value::Buffer(self.clone())
    }
}
impl FromValue for TypedBuffer {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Buffer(b) => Ok(b),
            v => Err(ValueTypeError::new("buffer", &v)),
        }
    }
}

impl ToValue for Object {
    fn to_value(&self) -> Value {
        Value::Object(self.clone())
    }
}
impl FromValue for Object {
    fn from_value(value: Value) -> Result<Self, ValueTypeError> {
        match value {
            Value::Object(o) => Ok(o),
            v => Err(ValueTypeError::new("object", &v)),
        }
    }
}

impl ToValue for SystemTime {
    fn to_value(&self) -> Value {
        let millis = match self.duration_since(UNIX_EPOCH) {
            Ok(d) => d.as_millis() as f64,
            Err(e) => -(e.duration().as_millis() as f64),
        };
        Value::Object(Object::container(move || Value::Number(millis)))
    }
}

impl<T: ToValue> ToValue for IndexMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Object(self.iter().map(|(k, v)| (k.as_str(), v.to_value())).collect())
    }
}
impl<T: ToValue> ToValue for BTreeMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Object(self.iter().map(|(k, v)| (k.as_str(), v.to_value())).collect())
    }
}
impl<T: ToValue> ToValue for HashMap<String, T> {
    fn to_value(&self) -> Value {
        Value::Object(self.iter().map(|(k, v)| (k.as_str(), v.to_value())).collect())
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Value {
        match self {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(items) => items.as_slice().to_value(),
            serde_json::Value::Object(map) => {
                Value::Object(map.iter().map(|(k, v)| (k.as_str(), v.to_value())).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
impl From<TypedBuffer> for Value {
    fn from(value: TypedBuffer) -> Self {
        Value::Buffer(value)
    }
}
impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Object(value)
    }
}
impl From<SystemTime> for Value {
    fn from(value: SystemTime) -> Self {
        value.to_value()
    }
}
impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        value.to_value()
    }
}
impl<T: ToValue> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.to_value()
    }
}
impl<T: ToValue> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        value.to_value()
    }
}
