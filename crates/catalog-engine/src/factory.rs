use crate::{
    config::EngineConfig,
    error::{CatalogError, CatalogResult},
};
use catalog_core::{
    catalog::{Catalog, Species},
    schema::CatalogDef,
};
use catalog_db::{AspectTableMapping, Dao, DbError};
use catalog_json::JsonFactory;
use sqlx::sqlite::SqlitePool;
use uuid::Uuid;

///
/// Factory
///
/// The library's single entry point (Factory / library API): wires a
/// [`Dao`] (persistence, catalog-db) and a [`JsonFactory`] (wire codec,
/// catalog-json) behind one `CatalogError`-speaking surface, the way the
/// teacher's `icydb` facade crate wires `icydb-core` behind `icydb::error::Error`.
///
/// Each side keeps its own `EntityRegistry`/AspectDef dictionary — interning
/// is scoped per-factory, and `Dao`/`JsonFactory` are
/// each a complete factory for their own load path; see DESIGN.md for why
/// this crate does not force them to share one registry.
///

pub struct Factory {
    dao: Dao,
    json: JsonFactory,
}

impl Factory {
    #[must_use]
    pub fn new(dao: Dao) -> Self {
        Self {
            dao,
            json: JsonFactory::new(),
        }
    }

    /// Connect to `config.database_url` and create the generic/fallback
    /// tables. The recommended way to obtain a
    /// `Factory` outside of tests, which construct a `Dao` directly over an
    /// in-memory pool.
    pub async fn connect(config: &EngineConfig) -> CatalogResult<Self> {
        let pool = SqlitePool::connect(&config.database_url)
            .await
            .map_err(DbError::from)?;
        let dao = Dao::new(pool);
        dao.init_schema().await?;
        Ok(Self::new(dao))
    }

    #[must_use]
    pub const fn dao(&self) -> &Dao {
        &self.dao
    }

    #[must_use]
    pub const fn json(&self) -> &JsonFactory {
        &self.json
    }

    /// `create_catalog(globalId, species, def?, upstream?, version)`.
    /// `version` advances the fresh catalog's version counter by that many
    /// steps, so a caller reconstructing a catalog at a known version can
    /// reproduce it without reaching into `Catalog`'s private state.
    #[must_use]
    pub fn create_catalog(
        &self,
        global_id: Uuid,
        species: Species,
        def: Option<CatalogDef>,
        upstream: Option<Uuid>,
        version: u64,
    ) -> Catalog {
        let mut catalog = Catalog::new(global_id, species, def.unwrap_or_default());
        if let Some(upstream) = upstream {
            catalog = catalog.upstream(upstream);
        }
        for _ in 0..version {
            catalog.bump_version();
        }
        catalog
    }

    pub async fn save_catalog(&self, catalog: &Catalog) -> CatalogResult<()> {
        self.dao.save_catalog(catalog).await.map_err(Into::into)
    }

    pub async fn load_catalog(&self, global_id: Uuid) -> CatalogResult<Option<Catalog>> {
        self.dao.load_catalog(global_id).await.map_err(Into::into)
    }

    pub async fn delete_catalog(&self, global_id: Uuid) -> CatalogResult<bool> {
        self.dao.delete_catalog(global_id).await.map_err(Into::into)
    }

    pub fn add_aspect_table_mapping(&self, mapping: AspectTableMapping) {
        self.dao.add_aspect_table_mapping(mapping);
    }

    pub async fn create_table(&self, mapping: &AspectTableMapping) -> CatalogResult<()> {
        self.dao.create_table(mapping).await.map_err(Into::into)
    }

    /// Canonical pretty-printed JSON for `catalog` (Wire format).
    pub fn to_json_pretty(&self, catalog: &Catalog) -> CatalogResult<String> {
        catalog_json::to_string_pretty(catalog).map_err(CatalogError::from)
    }

    /// Canonical compact JSON for `catalog` (Wire format).
    pub fn to_json_compact(&self, catalog: &Catalog) -> CatalogResult<String> {
        catalog_json::to_string_compact(catalog).map_err(CatalogError::from)
    }

    /// Parse `json`, resolving Entities and AspectDefs through this
    /// factory's own `JsonFactory`.
    pub fn from_json(&self, json: &str) -> CatalogResult<Catalog> {
        catalog_json::from_str(json, &self.json).map_err(CatalogError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_catalog_applies_version_and_upstream() {
        let dao = Dao::new(
            sqlx::sqlite::SqlitePoolOptions::new()
                .min_connections(0)
                .connect_lazy("sqlite::memory:")
                .unwrap(),
        );
        let factory = Factory::new(dao);
        let global_id = Uuid::new_v4();
        let upstream = Uuid::new_v4();
        let catalog = factory.create_catalog(global_id, Species::Mirror, None, Some(upstream), 3);
        assert_eq!(catalog.global_id(), global_id);
        assert_eq!(catalog.upstream_id(), Some(upstream));
        assert_eq!(catalog.version(), 3);
    }
}
