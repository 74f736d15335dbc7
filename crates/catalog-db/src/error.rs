use catalog_core::error::CoreError;
use thiserror::Error as ThisError;

///
/// DbError
///
/// Error taxonomy for the persistence engine. `StorageError` wraps a
/// `sqlx` failure (constraint violation, connection loss); `TransactionAborted`
/// is raised by the save protocol when any step fails mid-transaction, after
/// the rollback has already been issued. `Core` forwards a `CoreError` that
/// originates from the in-memory model (e.g. reconstructing a value on
/// load).
///

#[derive(Debug, ThisError)]
pub enum DbError {
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("transaction aborted: {cause}")]
    TransactionAborted { cause: Box<DbError> },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("aspect table mapping rejected: {reason}")]
    MappingRejected { reason: String },

    #[error("no aspect table mapping registered for aspect def '{name}'")]
    NoSuchMapping { name: String },
}

impl DbError {
    #[must_use]
    pub fn aborted(cause: Self) -> Self {
        Self::TransactionAborted {
            cause: Box::new(cause),
        }
    }
}

pub type DbResult<T> = Result<T, DbError>;
