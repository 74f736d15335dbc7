//! Facade crate for the catalog engine: [`Factory`] ties `catalog-core`'s
//! in-memory model, `catalog-db`'s persistence engine, and `catalog-json`'s
//! wire codec behind one error type. This is the crate applications should
//! depend on directly, rather than reaching into `catalog-core`/`catalog-db`/
//! `catalog-json` individually.

pub mod config;
pub mod error;
pub mod factory;

pub use config::EngineConfig;
pub use error::{CatalogError, CatalogResult, ErrorClass};
pub use factory::Factory;

/// Workspace version, for downstream tooling and tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///
/// Glob-importable surface for application code: the facade type, domain
/// vocabulary from `catalog-core`, and the persistence/wire types needed to
/// call `Factory`'s methods.
///

pub mod prelude {
    pub use crate::{CatalogError, CatalogResult, EngineConfig, ErrorClass, Factory};
    pub use catalog_core::prelude::*;
    pub use catalog_db::{AspectTableMapping, Dao, SqlDialect};
    pub use catalog_json::JsonFactory;
}
