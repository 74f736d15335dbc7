use catalog_core::error::CoreError;
use thiserror::Error as ThisError;

///
/// JsonError
///
/// The wire-format side of the error taxonomy: malformed JSON, an
/// unknown hierarchy/property type code, or a UUID reference that does not
/// resolve. `Core` forwards a `CoreError` raised while rebuilding the
/// in-memory graph (e.g. a duplicate hierarchy name, a schema mutation
/// refusal) from already-parsed JSON.
///

#[derive(Debug, ThisError)]
pub enum JsonError {
    #[error("malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("expected {expected} at {path}, found {found}")]
    ShapeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("missing required field '{field}' at {path}")]
    MissingField { path: String, field: &'static str },

    #[error("unknown type code '{code}' at {path}")]
    UnknownTypeCode { path: String, code: String },

    #[error("unresolved entity reference '{uuid}' at {path}")]
    UnresolvedEntity { path: String, uuid: String },

    #[error(transparent)]
    Core(#[from] CoreError),
}

pub type JsonResult<T> = Result<T, JsonError>;
