mod adapter;
mod hash;

#[cfg(test)]
mod tests;

pub use adapter::{CoerceInput, PropertyValueAdapter};
pub use hash::hash_value;

use bigdecimal::BigDecimal;
use catalog_primitives::PropertyType;
use chrono::{DateTime, FixedOffset};
use num_bigint::BigInt;
use url::Url;
use uuid::Uuid;

///
/// Value
///
/// The abstract value carried by one scalar `PropertyType`. A `Property`
/// holds either one `Value` or, when its
/// `PropertyDef` is multivalued, a `Vec<Value>` (see [`PropertyValue`]).
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(std::string::String),
    Text(std::string::String),
    BigInteger(BigInt),
    BigDecimal(BigDecimal),
    DateTime(DateTime<FixedOffset>),
    Uri(Url),
    Uuid(Uuid),
    Clob(std::string::String),
    Blob(Vec<u8>),
}

impl Value {
    /// The `PropertyType` this value is an instance of.
    #[must_use]
    pub const fn property_type(&self) -> PropertyType {
        match self {
            Self::Integer(_) => PropertyType::Integer,
            Self::Float(_) => PropertyType::Float,
            Self::Boolean(_) => PropertyType::Boolean,
            Self::String(_) => PropertyType::String,
            Self::Text(_) => PropertyType::Text,
            Self::BigInteger(_) => PropertyType::BigInteger,
            Self::BigDecimal(_) => PropertyType::BigDecimal,
            Self::DateTime(_) => PropertyType::DateTime,
            Self::Uri(_) => PropertyType::Uri,
            Self::Uuid(_) => PropertyType::Uuid,
            Self::Clob(_) => PropertyType::Clob,
            Self::Blob(_) => PropertyType::Blob,
        }
    }

    /// `String` values are capped at 8192 UTF-8 bytes; `Text` is
    /// unbounded. This reports whether the cap is satisfied for the `String`
    /// kind specifically — callers enforce it at write time.
    #[must_use]
    pub fn within_string_bound(&self) -> bool {
        match self {
            Self::String(s) => s.len() <= MAX_STRING_LEN,
            _ => true,
        }
    }

    /// Canonical string form used for SQL `value_text` storage and,
    /// for every kind but BLOB, the JSON wire form. BLOB's canonical
    /// text is a hex string; callers writing to a binary-capable column may
    /// prefer `value_binary` directly instead.
    #[must_use]
    pub fn to_canonical_text(&self) -> std::string::String {
        match self {
            Self::Integer(i) => i.to_string(),
            Self::Float(f) => f.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::String(s) | Self::Text(s) | Self::Clob(s) => s.clone(),
            Self::BigInteger(b) => b.to_string(),
            Self::BigDecimal(d) => d.to_string(),
            Self::DateTime(d) => d.to_rfc3339(),
            Self::Uri(u) => u.to_string(),
            Self::Uuid(u) => u.to_string(),
            Self::Blob(b) => hex::encode(b),
        }
    }
}

/// `String` kind is capped at 8192 bytes; `Text` is unbounded.
pub const MAX_STRING_LEN: usize = 8192;

///
/// PropertyValue
///
/// The value stored against one property slot: a single scalar, or — for a
/// multivalued `PropertyDef` — an ordered sequence of scalars of the same
/// kind. An absent value (`None` at the `Property`/`Aspect` level) and an
/// empty `Multi(vec![])` are distinguishable in memory but collapse to the
/// same representation at rest.
///

#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Scalar(Value),
    Multi(Vec<Value>),
}

impl PropertyValue {
    #[must_use]
    pub const fn is_multi(&self) -> bool {
        matches!(self, Self::Multi(_))
    }

    /// View as a slice regardless of cardinality, for iteration.
    #[must_use]
    pub fn as_slice(&self) -> &[Value] {
        match self {
            Self::Scalar(v) => std::slice::from_ref(v),
            Self::Multi(vs) => vs,
        }
    }

    #[must_use]
    pub fn property_type(&self) -> Option<PropertyType> {
        self.as_slice().first().map(Value::property_type)
    }
}
