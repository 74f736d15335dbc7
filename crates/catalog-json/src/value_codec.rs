use crate::error::{JsonError, JsonResult};
use catalog_core::value::{CoerceInput, PropertyValue, PropertyValueAdapter, Value};
use catalog_primitives::PropertyType;
use serde_json::{Map, Value as Json};

///
/// value_codec
///
/// Serializes a `Value` to its canonical JSON form: numbers as JSON
/// numbers, BigInteger/BigDecimal/DateTime/Uri/Uuid as strings via
/// [`Value::to_canonical_text`], BLOB as a hex string, everything else as a
/// plain JSON string. Deserialization goes through the same
/// `PropertyValueAdapter`/`CoerceInput` machinery `catalog-core` already uses
/// for coercion from any other input source, so the wire format never grows
/// its own parsing rules.
///

#[must_use]
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Integer(i) => Json::from(*i),
        Value::Float(f) => Json::from(*f),
        Value::Boolean(b) => Json::from(*b),
        Value::String(s) | Value::Text(s) | Value::Clob(s) => Json::from(s.clone()),
        Value::BigInteger(_)
        | Value::BigDecimal(_)
        | Value::DateTime(_)
        | Value::Uri(_)
        | Value::Uuid(_)
        | Value::Blob(_) => Json::from(value.to_canonical_text()),
    }
}

#[must_use]
pub fn property_value_to_json(value: &PropertyValue) -> Json {
    match value {
        PropertyValue::Scalar(v) => value_to_json(v),
        PropertyValue::Multi(vs) => Json::Array(vs.iter().map(value_to_json).collect()),
    }
}

/// `None` maps to JSON `null` (an absent/unset property), matching the same
/// collapse of "empty" and "null" multivalued values observed at rest in the
/// SQL backend.
#[must_use]
pub fn optional_property_value_to_json(value: Option<&PropertyValue>) -> Json {
    value.map_or(Json::Null, property_value_to_json)
}

fn json_to_coerce_input(json: &Json, path: &str) -> JsonResult<CoerceInput> {
    match json {
        Json::Bool(b) => Ok(CoerceInput::Boolean(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(CoerceInput::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(CoerceInput::Float(f))
            } else {
                Err(JsonError::ShapeMismatch {
                    path: path.to_string(),
                    expected: "i64 or f64 number",
                    found: "out-of-range number",
                })
            }
        }
        Json::String(s) => Ok(CoerceInput::Str(s.clone())),
        Json::Array(items) => Ok(CoerceInput::Sequence(
            items
                .iter()
                .map(|item| json_to_coerce_input(item, path))
                .collect::<JsonResult<Vec<_>>>()?,
        )),
        Json::Null => Err(JsonError::ShapeMismatch {
            path: path.to_string(),
            expected: "scalar or array value",
            found: "null",
        }),
        Json::Object(_) => Err(JsonError::ShapeMismatch {
            path: path.to_string(),
            expected: "scalar or array value",
            found: "object",
        }),
    }
}

/// Decode a (possibly `null`) JSON value into an `Option<PropertyValue>`
/// coerced toward `target`. `null` always decodes to `None`, regardless of
/// `multivalued` — an absent value and an empty multivalued sequence are
/// both represented this way.
pub fn property_value_from_json(
    json: &Json,
    target: PropertyType,
    multivalued: bool,
    adapter: PropertyValueAdapter,
    path: &str,
) -> JsonResult<Option<PropertyValue>> {
    if json.is_null() {
        return Ok(None);
    }
    let input = json_to_coerce_input(json, path)?;
    Ok(Some(adapter.coerce(input, target, multivalued)?))
}

/// Decode a JSON value that must resolve to a single scalar `Value` (used
/// for `PropertyDef.defaultValue`, which is never a sequence regardless of
/// the owning property's `multivalued` flag).
pub fn scalar_value_from_json(
    json: &Json,
    target: PropertyType,
    adapter: PropertyValueAdapter,
    path: &str,
) -> JsonResult<Value> {
    let input = json_to_coerce_input(json, path)?;
    match adapter.coerce(input, target, false)? {
        PropertyValue::Scalar(v) => Ok(v),
        PropertyValue::Multi(_) => Err(JsonError::ShapeMismatch {
            path: path.to_string(),
            expected: "scalar value",
            found: "sequence",
        }),
    }
}

pub(crate) fn get_field<'a>(obj: &'a Map<String, Json>, path: &str, field: &'static str) -> JsonResult<&'a Json> {
    obj.get(field).ok_or_else(|| JsonError::MissingField {
        path: path.to_string(),
        field,
    })
}

pub(crate) fn get_object<'a>(json: &'a Json, path: &str) -> JsonResult<&'a Map<String, Json>> {
    json.as_object().ok_or_else(|| JsonError::ShapeMismatch {
        path: path.to_string(),
        expected: "object",
        found: json_kind_name(json),
    })
}

pub(crate) fn get_array<'a>(json: &'a Json, path: &str) -> JsonResult<&'a Vec<Json>> {
    json.as_array().ok_or_else(|| JsonError::ShapeMismatch {
        path: path.to_string(),
        expected: "array",
        found: json_kind_name(json),
    })
}

pub(crate) fn get_str<'a>(obj: &'a Map<String, Json>, path: &str, field: &'static str) -> JsonResult<&'a str> {
    get_field(obj, path, field)?
        .as_str()
        .ok_or_else(|| JsonError::ShapeMismatch {
            path: format!("{path}.{field}"),
            expected: "string",
            found: json_kind_name(&obj[field]),
        })
}

pub(crate) fn get_bool(obj: &Map<String, Json>, path: &str, field: &'static str) -> JsonResult<bool> {
    get_field(obj, path, field)?
        .as_bool()
        .ok_or_else(|| JsonError::ShapeMismatch {
            path: format!("{path}.{field}"),
            expected: "boolean",
            found: json_kind_name(&obj[field]),
        })
}

pub(crate) fn json_kind_name(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::value::PropertyValueAdapter;

    #[test]
    fn integer_round_trips_through_json_number() {
        let value = Value::Integer(42);
        let json = value_to_json(&value);
        assert_eq!(json, Json::from(42));
        let decoded = scalar_value_from_json(&json, PropertyType::Integer, PropertyValueAdapter::new(), "test").unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn uuid_round_trips_through_json_string() {
        let uuid = uuid::Uuid::new_v4();
        let value = Value::Uuid(uuid);
        let json = value_to_json(&value);
        assert_eq!(json, Json::from(uuid.to_string()));
        let decoded = scalar_value_from_json(&json, PropertyType::Uuid, PropertyValueAdapter::new(), "test").unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn multivalued_sequence_round_trips() {
        let pv = PropertyValue::Multi(vec![
            Value::String("electronics".into()),
            Value::String("gadget".into()),
        ]);
        let json = property_value_to_json(&pv);
        assert!(json.is_array());
        let decoded = property_value_from_json(
            &json,
            PropertyType::String,
            true,
            PropertyValueAdapter::new(),
            "test",
        )
        .unwrap();
        assert_eq!(decoded, Some(pv));
    }

    #[test]
    fn null_decodes_to_none_regardless_of_multivalued() {
        let decoded = property_value_from_json(
            &Json::Null,
            PropertyType::String,
            true,
            PropertyValueAdapter::new(),
            "test",
        )
        .unwrap();
        assert_eq!(decoded, None);
    }
}
