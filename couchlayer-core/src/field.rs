//! Typed field descriptors used to serialize and populate records.
//!
//! A record type describes its document body as an ordered list of [`Field`]s. Each field knows
//! its JSON key, its semantic [`FieldKind`] and how to read and write the typed value on the
//! record. The generic [`Fields::serialize`] and [`Fields::populate`] routines then do the
//! conversion for every field, so record types never hand-write casts from loosely typed maps.
//!
//! Population never fails: a missing key, or a value of the wrong JSON type, leaves the field
//! at its type's zero value ([`FieldValue::zero`]).
//!
//! # Example
//!
//! ```ignore
//! use couchlayer::field::Fields;
//!
//! let fields = Fields::<User>::builder()
//!     .field("firstname", |u: &User| &u.firstname, |u: &mut User| &mut u.firstname)
//!     .field("age", |u: &User| &u.age, |u: &mut User| &mut u.age)
//!     .build();
//! ```

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::row::Row;

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Integer,
    Unsigned,
    Float,
    Timestamp,
    Uuid,
    Json,
    Optional(Box<FieldKind>),
    List(Box<FieldKind>),
}

/// A Rust type that can be stored as a field of a record.
pub trait FieldValue: Sized {
    fn kind() -> FieldKind;

    /// The value a field takes when its key is missing or unreadable.
    fn zero() -> Self;

    fn to_json(&self) -> Value;

    /// Decodes a JSON value, returning `None` when it has the wrong shape.
    fn from_json(value: &Value) -> Option<Self>;
}

impl FieldValue for String {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn zero() -> Self {
        String::new()
    }

    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FieldValue for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn zero() -> Self {
        false
    }

    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

macro_rules! integer_field_value {
    ($kind:ident, $read:ident: $($ty:ty),*) => {
        $(
            impl FieldValue for $ty {
                fn kind() -> FieldKind {
                    FieldKind::$kind
                }

                fn zero() -> Self {
                    0
                }

                fn to_json(&self) -> Value {
                    Value::from(*self)
                }

                fn from_json(value: &Value) -> Option<Self> {
                    value.$read().and_then(|number| <$ty>::try_from(number).ok())
                }
            }
        )*
    };
}

integer_field_value!(Integer, as_i64: i8, i16, i32, i64);
integer_field_value!(Unsigned, as_u64: u8, u16, u32, u64);

impl FieldValue for f64 {
    fn kind() -> FieldKind {
        FieldKind::Float
    }

    fn zero() -> Self {
        0.0
    }

    // Non-finite values have no JSON form and are written as null.
    fn to_json(&self) -> Value {
        Value::from(*self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl FieldValue for f32 {
    fn kind() -> FieldKind {
        FieldKind::Float
    }

    fn zero() -> Self {
        0.0
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64().map(|number| number as f32)
    }
}

impl FieldValue for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn zero() -> Self {
        DateTime::<Utc>::default()
    }

    fn to_json(&self) -> Value {
        Value::String(self.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }

    fn from_json(value: &Value) -> Option<Self> {
        value
            .as_str()
            .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
            .map(|timestamp| timestamp.with_timezone(&Utc))
    }
}

impl FieldValue for Uuid {
    fn kind() -> FieldKind {
        FieldKind::Uuid
    }

    fn zero() -> Self {
        Uuid::nil()
    }

    fn to_json(&self) -> Value {
        Value::String(self.hyphenated().to_string())
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_str().and_then(|text| Uuid::parse_str(text).ok())
    }
}

impl FieldValue for Value {
    fn kind() -> FieldKind {
        FieldKind::Json
    }

    fn zero() -> Self {
        Value::Null
    }

    fn to_json(&self) -> Value {
        self.clone()
    }

    fn from_json(value: &Value) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn kind() -> FieldKind {
        FieldKind::Optional(Box::new(T::kind()))
    }

    fn zero() -> Self {
        None
    }

    fn to_json(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_json)
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => Some(None),
            other => T::from_json(other).map(Some),
        }
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    fn kind() -> FieldKind {
        FieldKind::List(Box::new(T::kind()))
    }

    fn zero() -> Self {
        Vec::new()
    }

    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(FieldValue::to_json).collect())
    }

    fn from_json(value: &Value) -> Option<Self> {
        value.as_array()?.iter().map(T::from_json).collect()
    }
}

type ReadFn<R> = Box<dyn Fn(&R) -> Value + Send + Sync>;
type WriteFn<R> = Box<dyn Fn(&mut R, Option<&Value>) + Send + Sync>;

/// Descriptor of one document field of the record type `R`.
pub struct Field<R> {
    name: &'static str,
    kind: FieldKind,
    read: ReadFn<R>,
    write: WriteFn<R>,
}

impl<R> Field<R> {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Reads the field from `record` as JSON.
    pub fn read(&self, record: &R) -> Value {
        (self.read)(record)
    }

    /// Writes `value` into the field, falling back to the zero value when it is absent or
    /// has the wrong shape.
    pub fn write(&self, record: &mut R, value: Option<&Value>) {
        (self.write)(record, value)
    }
}

impl<R> fmt::Debug for Field<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// The ordered field-descriptor list of a record type.
#[derive(Debug)]
pub struct Fields<R> {
    fields: Vec<Field<R>>,
}

impl<R: 'static> Fields<R> {
    pub fn builder() -> FieldsBuilder<R> {
        FieldsBuilder::new()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Field<R>> {
        self.fields.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Field<R>> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Produces the document body for `record`, one key per field in declaration order.
    pub fn serialize(&self, record: &R) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|field| (field.name.to_string(), field.read(record)))
            .collect()
    }

    /// Assigns every field of `record` from `row`.
    pub fn populate(&self, record: &mut R, row: &Row) {
        for field in &self.fields {
            field.write(record, row.get(field.name));
        }
    }
}

/// Builder for [`Fields`].
pub struct FieldsBuilder<R> {
    fields: Vec<Field<R>>,
}

impl<R: 'static> FieldsBuilder<R> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Appends a field stored under `name`, accessed through `get` and `get_mut`.
    pub fn field<T, G, M>(mut self, name: &'static str, get: G, get_mut: M) -> Self
    where
        T: FieldValue + 'static,
        G: Fn(&R) -> &T + Send + Sync + 'static,
        M: Fn(&mut R) -> &mut T + Send + Sync + 'static,
    {
        self.fields.push(Field {
            name,
            kind: T::kind(),
            read: Box::new(move |record: &R| get(record).to_json()),
            write: Box::new(move |record: &mut R, value: Option<&Value>| {
                *get_mut(record) = value.and_then(T::from_json).unwrap_or_else(T::zero);
            }),
        });
        self
    }

    pub fn build(self) -> Fields<R> {
        Fields { fields: self.fields }
    }
}

impl<R: 'static> Default for FieldsBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}
