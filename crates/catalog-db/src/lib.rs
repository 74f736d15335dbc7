//! SQL persistence engine for the catalog model: generic and
//! mapped-table routing, the save/load/delete protocol, and the dialect
//! contract a SQL backend must satisfy.

pub mod dao;
pub mod dialect;
pub mod error;
pub mod mapping;

pub use dao::Dao;
pub use dialect::{PostgresDialect, SqlDialect, SqliteDialect};
pub use error::{DbError, DbResult};
pub use mapping::AspectTableMapping;
