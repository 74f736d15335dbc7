use catalog_primitives::PropertyType;
use thiserror::Error as ThisError;
use uuid::Uuid;

///
/// CoreError
///
/// Error taxonomy for the in-memory data model.
/// `StorageError`/`TransactionAborted` live in `catalog-db`; `WireFormatError`
/// lives in `catalog-json`. Both wrap a `CoreError` when the underlying cause
/// originates here.
///

#[derive(Debug, ThisError)]
pub enum CoreError {
    #[error("cannot coerce value from {from_type} to {to_type}{cause}", cause = .cause.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
    Coerce {
        from_type: &'static str,
        to_type: PropertyType,
        cause: Option<String>,
    },

    #[error("duplicate property name '{name}' in aspect def '{aspect_def}'")]
    DuplicateProperty { aspect_def: String, name: String },

    #[error("duplicate hierarchy name '{name}' in catalog")]
    DuplicateHierarchy { name: String },

    #[error("hierarchy '{name}' is not modifiable")]
    NotModifiable { name: String },

    #[error("aspect def '{name}' does not allow adding properties")]
    NotAddable { name: String },

    #[error("aspect def '{name}' does not allow removing properties")]
    NotRemovable { name: String },

    #[error("property '{name}' is not writable")]
    NotWritable { name: String },

    #[error("property '{name}' is not nullable")]
    NotNullable { name: String },

    #[error("hierarchy kind mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("no such property '{name}'")]
    NoSuchProperty { name: String },

    #[error("no such aspect def '{name}'")]
    NoSuchAspectDef { name: String },

    #[error("no such hierarchy '{name}'")]
    NoSuchHierarchy { name: String },

    #[error("no such tree node at path {path:?}")]
    NoSuchNode { path: Vec<String> },

    #[error("no such catalog {id}")]
    NoSuchCatalog { id: Uuid },

    #[error("invariant violated: {message}")]
    Invariant { message: String },
}

impl CoreError {
    #[must_use]
    pub fn coerce(from_type: &'static str, to_type: PropertyType) -> Self {
        Self::Coerce {
            from_type,
            to_type,
            cause: None,
        }
    }

    #[must_use]
    pub fn coerce_because(
        from_type: &'static str,
        to_type: PropertyType,
        cause: impl Into<String>,
    ) -> Self {
        Self::Coerce {
            from_type,
            to_type,
            cause: Some(cause.into()),
        }
    }

    /// Whether this is a schema-mutation refusal (add/remove/write/null flag).
    #[must_use]
    pub const fn is_schema_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateProperty { .. }
                | Self::DuplicateHierarchy { .. }
                | Self::NotModifiable { .. }
                | Self::NotAddable { .. }
                | Self::NotRemovable { .. }
                | Self::NotWritable { .. }
                | Self::NotNullable { .. }
                | Self::TypeMismatch { .. }
        )
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NoSuchProperty { .. }
                | Self::NoSuchAspectDef { .. }
                | Self::NoSuchHierarchy { .. }
                | Self::NoSuchNode { .. }
                | Self::NoSuchCatalog { .. }
        )
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
