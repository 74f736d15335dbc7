use super::{PropertyValue, Value};
use crate::error::CoreError;
use bigdecimal::BigDecimal;
use catalog_primitives::PropertyType;
use chrono::{DateTime, FixedOffset, TimeZone};
use num_bigint::BigInt;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

///
/// CoerceInput
///
/// Loosely-typed input accepted by [`PropertyValueAdapter`]. This is the
/// shape a caller (the JSON codec, a SQL row reader, or a hand-written
/// integrator) hands in before it is coerced toward a target `PropertyType`.
///

#[derive(Clone, Debug, PartialEq)]
pub enum CoerceInput {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Str(String),
    Bytes(Vec<u8>),
    Sequence(Vec<CoerceInput>),
}

impl CoerceInput {
    const fn kind_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Boolean(_) => "boolean",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Sequence(_) => "sequence",
        }
    }
}

impl From<Value> for CoerceInput {
    fn from(value: Value) -> Self {
        match value {
            Value::Integer(i) => Self::Integer(i),
            Value::Float(f) => Self::Float(f),
            Value::Boolean(b) => Self::Boolean(b),
            Value::String(s) | Value::Text(s) | Value::Clob(s) => Self::Str(s),
            Value::BigInteger(b) => Self::Str(b.to_string()),
            Value::BigDecimal(d) => Self::Str(d.to_string()),
            Value::DateTime(d) => Self::Str(d.to_rfc3339()),
            Value::Uri(u) => Self::Str(u.to_string()),
            Value::Uuid(u) => Self::Str(u.to_string()),
            Value::Blob(b) => Self::Bytes(b),
        }
    }
}

/// Zero-offset "process zone" fallback when no explicit zone is configured.
fn utc_offset() -> FixedOffset {
    FixedOffset::east_opt(0).expect("zero offset is always valid")
}

///
/// PropertyValueAdapter
///
/// Coerces arbitrary [`CoerceInput`] toward a target `PropertyType`.
/// Holds the configured time zone used when a temporal input carries no
/// explicit offset; defaults to UTC ("process zone") when unset.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PropertyValueAdapter {
    default_offset: Option<FixedOffset>,
}

impl PropertyValueAdapter {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            default_offset: None,
        }
    }

    #[must_use]
    pub const fn with_default_offset(offset: FixedOffset) -> Self {
        Self {
            default_offset: Some(offset),
        }
    }

    fn process_offset(self) -> FixedOffset {
        self.default_offset.unwrap_or_else(utc_offset)
    }

    /// Coerce one input toward `target`. For a multivalued `target`, `input`
    /// must be a `Sequence`; each element is coerced independently and a
    /// scalar input is rejected.
    pub fn coerce(
        self,
        input: CoerceInput,
        target: PropertyType,
        multivalued: bool,
    ) -> Result<PropertyValue, CoreError> {
        if multivalued {
            let CoerceInput::Sequence(items) = input else {
                return Err(CoreError::coerce_because(
                    input.kind_name(),
                    target,
                    "multivalued property requires a sequence input",
                ));
            };
            let values = items
                .into_iter()
                .map(|item| self.coerce_scalar(item, target))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(PropertyValue::Multi(values));
        }

        if matches!(input, CoerceInput::Sequence(_)) {
            return Err(CoreError::coerce_because(
                "sequence",
                target,
                "single-valued property cannot accept a sequence",
            ));
        }
        Ok(PropertyValue::Scalar(self.coerce_scalar(input, target)?))
    }

    fn coerce_scalar(self, input: CoerceInput, target: PropertyType) -> Result<Value, CoreError> {
        let from_type = input.kind_name();
        match (target, input) {
            (PropertyType::Integer, CoerceInput::Integer(i)) => Ok(Value::Integer(i)),
            (PropertyType::Integer, CoerceInput::Float(f)) => Ok(Value::Integer(f as i64)),
            (PropertyType::Integer, CoerceInput::Str(s)) => s
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),

            (PropertyType::Float, CoerceInput::Integer(i)) => Ok(Value::Float(i as f64)),
            (PropertyType::Float, CoerceInput::Float(f)) => Ok(Value::Float(f)),
            (PropertyType::Float, CoerceInput::Str(s)) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),

            (PropertyType::Boolean, CoerceInput::Boolean(b)) => Ok(Value::Boolean(b)),
            (PropertyType::Boolean, CoerceInput::Integer(i)) => Ok(Value::Boolean(i != 0)),
            (PropertyType::Boolean, CoerceInput::Str(s)) => match s.as_str() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(CoreError::coerce_because(
                    from_type,
                    target,
                    "expected literal 'true' or 'false'",
                )),
            },

            (PropertyType::String, CoerceInput::Str(s)) => {
                if s.len() > super::MAX_STRING_LEN {
                    return Err(CoreError::coerce_because(
                        from_type,
                        target,
                        format!("exceeds maximum length of {} bytes", super::MAX_STRING_LEN),
                    ));
                }
                Ok(Value::String(s))
            }
            (PropertyType::Text, CoerceInput::Str(s)) => Ok(Value::Text(s)),
            (PropertyType::Clob, CoerceInput::Str(s)) => Ok(Value::Clob(s)),

            (PropertyType::BigInteger, CoerceInput::Str(s)) => BigInt::from_str(&s)
                .map(Value::BigInteger)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),
            (PropertyType::BigInteger, CoerceInput::Integer(i)) => {
                Ok(Value::BigInteger(BigInt::from(i)))
            }

            (PropertyType::BigDecimal, CoerceInput::Str(s)) => BigDecimal::from_str(&s)
                .map(Value::BigDecimal)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),
            (PropertyType::BigDecimal, CoerceInput::Float(f)) => {
                BigDecimal::from_str(&f.to_string())
                    .map(Value::BigDecimal)
                    .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string()))
            }
            (PropertyType::BigDecimal, CoerceInput::Integer(i)) => {
                Ok(Value::BigDecimal(BigDecimal::from(i)))
            }

            (PropertyType::DateTime, CoerceInput::Str(s)) => {
                parse_datetime(&s, self.process_offset())
                    .map(Value::DateTime)
                    .map_err(|e| CoreError::coerce_because(from_type, target, e))
            }
            (PropertyType::DateTime, CoerceInput::Integer(epoch_millis)) => {
                DateTime::from_timestamp_millis(epoch_millis)
                    .map(|d| Value::DateTime(d.with_timezone(&self.process_offset())))
                    .ok_or_else(|| {
                        CoreError::coerce_because(from_type, target, "out of range timestamp")
                    })
            }

            (PropertyType::Uri, CoerceInput::Str(s)) => Url::parse(&s)
                .map(Value::Uri)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),

            (PropertyType::Uuid, CoerceInput::Str(s)) => Uuid::parse_str(&s)
                .map(Value::Uuid)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),

            (PropertyType::Blob, CoerceInput::Bytes(b)) => Ok(Value::Blob(b)),
            (PropertyType::Blob, CoerceInput::Str(s)) => hex::decode(&s)
                .map(Value::Blob)
                .map_err(|e| CoreError::coerce_because(from_type, target, e.to_string())),

            (target, _) => Err(CoreError::coerce(from_type, target)),
        }
    }
}

fn parse_datetime(s: &str, default_offset: FixedOffset) -> Result<DateTime<FixedOffset>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt);
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| {
            default_offset
                .from_local_datetime(&naive)
                .single()
                .unwrap_or_else(|| default_offset.from_utc_datetime(&naive))
        })
        .map_err(|e| e.to_string())
}
