use catalog_core::error::CoreError;
use catalog_db::DbError;
use catalog_json::JsonError;
use thiserror::Error as ThisError;

///
/// CatalogError
///
/// Top-level error type for the facade crate, unifying `CoreError`
/// (catalog-core), `DbError` (catalog-db), and `JsonError` (catalog-json) —
/// callers match on [`CatalogError::class`] rather than the originating
/// crate's variant.
///

#[derive(Debug, ThisError)]
pub enum CatalogError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Json(#[from] JsonError),

    #[error("configuration error: {0}")]
    Config(String),
}

///
/// ErrorClass
///
/// The seven error kinds the engine distinguishes, independent of which crate raised
/// them.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Coerce,
    Schema,
    NotFound,
    Storage,
    TransactionAborted,
    WireFormat,
    Invariant,
    Config,
}

impl CatalogError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Core(err) => core_class(err),
            Self::Db(err) => db_class(err),
            Self::Json(err) => json_class(err),
            Self::Config(_) => ErrorClass::Config,
        }
    }
}

fn core_class(err: &CoreError) -> ErrorClass {
    if matches!(err, CoreError::Coerce { .. }) {
        ErrorClass::Coerce
    } else if matches!(err, CoreError::Invariant { .. }) {
        ErrorClass::Invariant
    } else if err.is_not_found() {
        ErrorClass::NotFound
    } else if err.is_schema_error() {
        ErrorClass::Schema
    } else {
        ErrorClass::Invariant
    }
}

fn db_class(err: &DbError) -> ErrorClass {
    match err {
        DbError::Storage(_) => ErrorClass::Storage,
        DbError::TransactionAborted { .. } => ErrorClass::TransactionAborted,
        DbError::MappingRejected { .. } => ErrorClass::Schema,
        DbError::NoSuchMapping { .. } => ErrorClass::NotFound,
        DbError::Core(core) => core_class(core),
    }
}

fn json_class(err: &JsonError) -> ErrorClass {
    match err {
        JsonError::Core(core) => core_class(core),
        JsonError::Malformed(_)
        | JsonError::ShapeMismatch { .. }
        | JsonError::MissingField { .. }
        | JsonError::UnknownTypeCode { .. }
        | JsonError::UnresolvedEntity { .. } => ErrorClass::WireFormat,
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
