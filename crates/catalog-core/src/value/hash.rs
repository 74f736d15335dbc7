use super::{PropertyValue, Value};
use catalog_primitives::hash::{fnv1a_64, rolling_fnv1a_64, NULL_MARKER};

/// FNV-1a digest of one value. Each kind hashes its canonical byte
/// form: integers little-endian, floats by IEEE-754 bit pattern, big
/// numbers/date-times/URIs by canonical string form, UUIDs by
/// most-then-least-significant 8 bytes. `None` hashes to the reserved
/// `0xFF` marker byte, distinguishing it from every representable value.
#[must_use]
pub fn hash_value(value: Option<&Value>) -> u64 {
    match value {
        None => fnv1a_64(&[NULL_MARKER]),
        Some(v) => fnv1a_64(&canonical_bytes(v)),
    }
}

/// Digest of a full `PropertyValue` (scalar or multivalued). Multivalued
/// digests are computed by rolling each element's canonical bytes through
/// one FNV-1a pass in order, so two value lists hash equal iff they have the
/// same elements in the same order.
#[must_use]
pub fn hash_property_value(value: Option<&PropertyValue>) -> u64 {
    match value {
        None => fnv1a_64(&[NULL_MARKER]),
        Some(PropertyValue::Scalar(v)) => hash_value(Some(v)),
        Some(PropertyValue::Multi(items)) => {
            let mut seed = catalog_primitives::hash::FNV_OFFSET_BASIS;
            for item in items {
                seed = rolling_fnv1a_64(seed, &canonical_bytes(item));
            }
            seed
        }
    }
}

fn canonical_bytes(value: &Value) -> Vec<u8> {
    match value {
        Value::Integer(i) => i.to_le_bytes().to_vec(),
        Value::Float(f) => f.to_bits().to_le_bytes().to_vec(),
        Value::Boolean(b) => vec![u8::from(*b)],
        Value::String(s) | Value::Text(s) | Value::Clob(s) => s.as_bytes().to_vec(),
        Value::BigInteger(b) => b.to_string().into_bytes(),
        Value::BigDecimal(d) => d.to_string().into_bytes(),
        Value::DateTime(d) => d.to_rfc3339().into_bytes(),
        Value::Uri(u) => u.as_str().as_bytes().to_vec(),
        Value::Uuid(u) => {
            let (hi, lo) = u.as_u64_pair();
            let mut bytes = Vec::with_capacity(16);
            bytes.extend_from_slice(&hi.to_be_bytes());
            bytes.extend_from_slice(&lo.to_be_bytes());
            bytes
        }
        Value::Blob(b) => b.clone(),
    }
}
