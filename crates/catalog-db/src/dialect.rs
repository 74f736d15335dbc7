use catalog_primitives::PropertyType;

///
/// SqlDialect
///
/// The minimal adapter contract a SQL backend needs to satisfy: a stable name
/// for diagnostics and a PropertyType→column-type mapping. Connection
/// acquisition, transaction start/commit/rollback, and parameterized
/// execution are provided directly by `sqlx`'s per-database traits
/// (`Executor`, `Transaction`) rather than re-wrapped here — grounded on
/// `RAprogramm-entity-derive`'s `entity-core::Transactional`/`TransactionOps`
/// split, which likewise keeps the dialect-specific surface to type mapping
/// and leaves transaction mechanics to `sqlx` itself.
///

pub trait SqlDialect: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// SQL column-type string for a generic-table property type, e.g.
    /// Integer→BIGINT, DateTime→VARCHAR(64), UUID→CHAR(36).
    fn column_type(&self, property_type: PropertyType) -> &'static str;

    /// Column type used for the generic `property_value.value_binary`
    /// column, if the dialect supports native binary storage.
    fn binary_column_type(&self) -> &'static str;
}

///
/// SqliteDialect
///
/// The dev/test backend, built on `sqlx`'s `sqlite` in-memory
/// database. SQLite's dynamic typing means most of these are advisory
/// rather than enforced, but they are still emitted for portability and
/// documentation of intent.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn column_type(&self, property_type: PropertyType) -> &'static str {
        match property_type {
            PropertyType::Integer => "INTEGER",
            PropertyType::Float => "REAL",
            PropertyType::Boolean => "INTEGER",
            PropertyType::String | PropertyType::Text | PropertyType::Clob => "TEXT",
            PropertyType::BigInteger | PropertyType::BigDecimal => "TEXT",
            PropertyType::DateTime => "TEXT",
            PropertyType::Uri => "TEXT",
            PropertyType::Uuid => "TEXT",
            PropertyType::Blob => "BLOB",
        }
    }

    fn binary_column_type(&self) -> &'static str {
        "BLOB"
    }
}

///
/// PostgresDialect
///
/// Grounded on `r4ntix-influxdb_iox`'s `iox_catalog` (a `sqlx::postgres`
/// catalog crate) for the choice of column widths. Exercised by the
/// `postgres` feature; the save/load protocol in [`crate::dao`] is written
/// against `sqlx::Sqlite` for this crate's own test suite, so this impl
/// documents the mapping a Postgres-backed `Dao` would use rather than
/// being wired into one (see DESIGN.md).
///

#[derive(Clone, Copy, Debug, Default)]
pub struct PostgresDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn column_type(&self, property_type: PropertyType) -> &'static str {
        match property_type {
            PropertyType::Integer => "BIGINT",
            PropertyType::Float => "DOUBLE PRECISION",
            PropertyType::Boolean => "BOOLEAN",
            PropertyType::String => "VARCHAR(8192)",
            PropertyType::Text | PropertyType::Clob => "TEXT",
            PropertyType::BigInteger | PropertyType::BigDecimal => "NUMERIC",
            PropertyType::DateTime => "TIMESTAMPTZ",
            PropertyType::Uri => "TEXT",
            PropertyType::Uuid => "UUID",
            PropertyType::Blob => "BYTEA",
        }
    }

    fn binary_column_type(&self) -> &'static str {
        "BYTEA"
    }
}
