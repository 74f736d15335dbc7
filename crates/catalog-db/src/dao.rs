use crate::{
    dialect::{SqlDialect, SqliteDialect},
    error::{DbError, DbResult},
    mapping::AspectTableMapping,
};
use catalog_core::{
    aspect::{Aspect, ObjectMapAspect, PropertyMapAspect},
    catalog::{Catalog, Species},
    entity::{Entity, EntityRegistry},
    error::CoreError,
    hierarchy::{
        AspectMapHierarchy, DirectoryHierarchy, Hierarchy, HierarchyKind, ListHierarchy,
        SetHierarchy, TreeHierarchy, TreeNode,
    },
    schema::{new_aspect_def_handle, AspectDef, AspectDefHandle, CatalogDef, Mutability, Property, PropertyDef},
    value::{CoerceInput, PropertyValue, PropertyValueAdapter, Value},
};
use catalog_primitives::hash::{fnv1a_64, rolling_fnv1a_64};
use catalog_primitives::PropertyType;
use sqlx::{sqlite::SqlitePool, Row};
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

const GENERIC_TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS entity (entity_id TEXT PRIMARY KEY)",
    "CREATE TABLE IF NOT EXISTS catalog (\
        catalog_id TEXT PRIMARY KEY, \
        species TEXT NOT NULL, \
        uri TEXT, \
        upstream_catalog_id TEXT, \
        version_number INTEGER NOT NULL)",
    "CREATE TABLE IF NOT EXISTS aspect_def (\
        aspect_def_id TEXT PRIMARY KEY, \
        name TEXT UNIQUE NOT NULL, \
        hash_version INTEGER NOT NULL, \
        can_add_properties INTEGER NOT NULL, \
        can_remove_properties INTEGER NOT NULL, \
        is_readable INTEGER NOT NULL, \
        is_writable INTEGER NOT NULL)",
    "CREATE TABLE IF NOT EXISTS property_def (\
        aspect_def_id TEXT NOT NULL, \
        name TEXT NOT NULL, \
        property_type TEXT NOT NULL, \
        default_value TEXT, \
        has_default_value INTEGER NOT NULL, \
        is_readable INTEGER NOT NULL, \
        is_writable INTEGER NOT NULL, \
        is_nullable INTEGER NOT NULL, \
        is_removable INTEGER NOT NULL, \
        is_multivalued INTEGER NOT NULL, \
        position INTEGER NOT NULL, \
        PRIMARY KEY (aspect_def_id, name))",
    "CREATE TABLE IF NOT EXISTS catalog_aspect_def (\
        catalog_id TEXT NOT NULL, \
        aspect_def_id TEXT NOT NULL, \
        PRIMARY KEY (catalog_id, aspect_def_id))",
    "CREATE TABLE IF NOT EXISTS hierarchy (\
        catalog_id TEXT NOT NULL, \
        name TEXT NOT NULL, \
        hierarchy_type TEXT NOT NULL, \
        version_number INTEGER NOT NULL, \
        PRIMARY KEY (catalog_id, name))",
    "CREATE TABLE IF NOT EXISTS aspect (\
        entity_id TEXT NOT NULL, \
        aspect_def_id TEXT NOT NULL, \
        catalog_id TEXT NOT NULL, \
        hierarchy_name TEXT NOT NULL, \
        PRIMARY KEY (entity_id, aspect_def_id, catalog_id))",
    "CREATE TABLE IF NOT EXISTS property_value (\
        entity_id TEXT NOT NULL, \
        aspect_def_id TEXT NOT NULL, \
        catalog_id TEXT NOT NULL, \
        property_name TEXT NOT NULL, \
        value_index INTEGER NOT NULL, \
        value_text TEXT, \
        value_binary BLOB, \
        PRIMARY KEY (entity_id, aspect_def_id, catalog_id, property_name, value_index))",
    "CREATE TABLE IF NOT EXISTS hierarchy_entity_list (\
        catalog_id TEXT NOT NULL, hierarchy_name TEXT NOT NULL, \
        entity_id TEXT NOT NULL, list_order INTEGER NOT NULL)",
    "CREATE TABLE IF NOT EXISTS hierarchy_entity_set (\
        catalog_id TEXT NOT NULL, hierarchy_name TEXT NOT NULL, \
        entity_id TEXT NOT NULL, set_order INTEGER NOT NULL)",
    "CREATE TABLE IF NOT EXISTS hierarchy_entity_directory (\
        catalog_id TEXT NOT NULL, hierarchy_name TEXT NOT NULL, \
        entity_key TEXT NOT NULL, entity_id TEXT NOT NULL, dir_order INTEGER NOT NULL)",
    "CREATE TABLE IF NOT EXISTS hierarchy_entity_tree_node (\
        catalog_id TEXT NOT NULL, hierarchy_name TEXT NOT NULL, \
        node_id TEXT NOT NULL, parent_node_id TEXT, node_key TEXT NOT NULL, \
        entity_id TEXT NOT NULL, node_path TEXT NOT NULL, tree_order INTEGER NOT NULL)",
    "CREATE TABLE IF NOT EXISTS hierarchy_aspect_map (\
        catalog_id TEXT NOT NULL, hierarchy_name TEXT NOT NULL, \
        entity_id TEXT NOT NULL, aspect_def_id TEXT NOT NULL, map_order INTEGER NOT NULL)",
];

///
/// Dao
///
/// The persistence engine's entry point: owns the connection
/// pool, the shared `AspectDef` dictionary (AspectDefs persist beyond any
/// one catalog), the `EntityRegistry` used to intern
/// entities on load, and the `AspectTableMapping` registry.
///
/// The save/load protocol runs on a single `sqlx::Sqlite` connection per
/// call, inside one explicit transaction. A Postgres-backed `Dao` would repeat this structure against
/// `sqlx::Postgres`; see DESIGN.md for why only the SQLite path is wired up
/// here.
///

pub struct Dao {
    pool: SqlitePool,
    dialect: SqliteDialect,
    aspect_defs: RwLock<HashMap<String, AspectDefHandle>>,
    mappings: RwLock<HashMap<String, AspectTableMapping>>,
    entities: EntityRegistry,
}

impl Dao {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            dialect: SqliteDialect,
            aspect_defs: RwLock::new(HashMap::new()),
            mappings: RwLock::new(HashMap::new()),
            entities: EntityRegistry::new(),
        }
    }

    #[must_use]
    pub const fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    /// The underlying connection pool, for callers that need to query
    /// mapped tables directly — their contents are addressed
    /// through the mapping's own table, not through `load_catalog`.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create every generic/fallback table. Safe
    /// to call repeatedly (`CREATE TABLE IF NOT EXISTS`).
    #[tracing::instrument(skip(self))]
    pub async fn init_schema(&self) -> DbResult<()> {
        for statement in GENERIC_TABLES {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    /// Create the custom table backing `mapping` (`dao.create_table`).
    pub async fn create_table(&self, mapping: &AspectTableMapping) -> DbResult<()> {
        let def = mapping
            .aspect_def()
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut columns = Vec::new();
        if mapping.has_catalog_id() {
            columns.push("catalog_id TEXT NOT NULL".to_string());
        }
        if mapping.has_entity_id() {
            columns.push("entity_id TEXT NOT NULL".to_string());
        }
        for property in def.properties() {
            if let Some(column) = mapping.column_for(property.name()) {
                let column_type = self.dialect.column_type(property.property_type());
                columns.push(format!("{column} {column_type}"));
            }
        }
        let primary_key = match (mapping.has_catalog_id(), mapping.has_entity_id()) {
            (true, true) => ", PRIMARY KEY (catalog_id, entity_id)".to_string(),
            (false, true) => ", PRIMARY KEY (entity_id)".to_string(),
            (true, false) | (false, false) => String::new(),
        };
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({}{primary_key})",
            mapping.table_name(),
            columns.join(", "),
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    /// Register `mapping`, keyed by its AspectDef's name. The
    /// `AspectTableMapping` registry is read-only after startup.
    pub fn add_aspect_table_mapping(&self, mapping: AspectTableMapping) {
        let name = mapping
            .aspect_def()
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .name()
            .to_string();
        self.mappings
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name, mapping);
    }

    fn register_aspect_def(&self, handle: &AspectDefHandle) {
        let name = handle
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .name()
            .to_string();
        self.aspect_defs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(name)
            .or_insert_with(|| handle.clone());
    }

    /// Look up a previously-registered `AspectDef` by name, as used when
    /// reconstructing a catalog on load.
    #[must_use]
    pub fn aspect_def(&self, name: &str) -> Option<AspectDefHandle> {
        self.aspect_defs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Save `catalog` (Save protocol). Runs as one transaction on one
    /// connection; any failure rolls back the whole operation, leaving the
    /// prior on-disk snapshot intact.
    #[tracing::instrument(skip(self, catalog), fields(catalog_id = %catalog.global_id()))]
    pub async fn save_catalog(&self, catalog: &Catalog) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let result = self.save_catalog_inner(&mut tx, catalog).await;
        match result {
            Ok(()) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                let _ = tx.rollback().await;
                tracing::error!(error = %e, "save_catalog rolled back");
                Err(DbError::aborted(e))
            }
        }
    }

    async fn save_catalog_inner(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog: &Catalog,
    ) -> DbResult<()> {
        let catalog_id = catalog.global_id().to_string();

        sqlx::query(
            "INSERT INTO catalog (catalog_id, species, uri, upstream_catalog_id, version_number) \
             VALUES (?, ?, NULL, ?, ?) \
             ON CONFLICT(catalog_id) DO UPDATE SET \
               species = excluded.species, upstream_catalog_id = excluded.upstream_catalog_id, \
               version_number = excluded.version_number",
        )
        .bind(&catalog_id)
        .bind(species_code(catalog.species()))
        .bind(catalog.upstream_id().map(|u| u.to_string()))
        .bind(i64::try_from(catalog.version()).unwrap_or(i64::MAX))
        .execute(&mut **tx)
        .await?;

        let all_defs: Vec<AspectDefHandle> = catalog
            .def()
            .aspect_def_handles()
            .cloned()
            .chain(catalog.extensions().cloned())
            .collect();
        for handle in &all_defs {
            self.save_aspect_def(tx, &catalog_id, handle).await?;
            self.register_aspect_def(handle);
        }

        for name in catalog.hierarchy_names().map(str::to_string).collect::<Vec<_>>() {
            let hierarchy = catalog.hierarchy(&name).expect("name came from hierarchy_names");
            self.save_hierarchy_metadata(tx, &catalog_id, &name, hierarchy)
                .await?;
            self.save_hierarchy_contents(tx, &catalog_id, &name, hierarchy)
                .await?;
        }

        Ok(())
    }

    async fn save_aspect_def(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog_id: &str,
        handle: &AspectDefHandle,
    ) -> DbResult<()> {
        let def = handle.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let aspect_def_id = def.uuid().to_string();
        let hash_version = aspect_def_hash_version(&def);

        sqlx::query(
            "INSERT INTO aspect_def \
             (aspect_def_id, name, hash_version, can_add_properties, can_remove_properties, is_readable, is_writable) \
             VALUES (?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(aspect_def_id) DO UPDATE SET \
               name = excluded.name, hash_version = excluded.hash_version, \
               can_add_properties = excluded.can_add_properties, \
               can_remove_properties = excluded.can_remove_properties, \
               is_readable = excluded.is_readable, is_writable = excluded.is_writable",
        )
        .bind(&aspect_def_id)
        .bind(def.name())
        .bind(hash_version)
        .bind(def.can_add_properties())
        .bind(def.can_remove_properties())
        .bind(def.is_readable())
        .bind(def.is_writable())
        .execute(&mut **tx)
        .await?;

        sqlx::query("DELETE FROM property_def WHERE aspect_def_id = ?")
            .bind(&aspect_def_id)
            .execute(&mut **tx)
            .await?;
        for (position, property) in def.properties().enumerate() {
            sqlx::query(
                "INSERT INTO property_def \
                 (aspect_def_id, name, property_type, default_value, has_default_value, \
                  is_readable, is_writable, is_nullable, is_removable, is_multivalued, position) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&aspect_def_id)
            .bind(property.name())
            .bind(property.property_type().code())
            .bind(property.default_value().map(Value::to_canonical_text))
            .bind(property.has_default())
            .bind(property.is_readable())
            .bind(property.is_writable())
            .bind(property.is_nullable())
            .bind(property.is_removable())
            .bind(property.is_multivalued())
            .bind(i64::try_from(position).unwrap_or(i64::MAX))
            .execute(&mut **tx)
            .await?;
        }

        sqlx::query(
            "INSERT OR IGNORE INTO catalog_aspect_def (catalog_id, aspect_def_id) VALUES (?, ?)",
        )
        .bind(catalog_id)
        .bind(&aspect_def_id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn save_hierarchy_metadata(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog_id: &str,
        name: &str,
        hierarchy: &(dyn Hierarchy + Send + Sync),
    ) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO hierarchy (catalog_id, name, hierarchy_type, version_number) \
             VALUES (?, ?, ?, 0) \
             ON CONFLICT(catalog_id, name) DO UPDATE SET hierarchy_type = excluded.hierarchy_type",
        )
        .bind(catalog_id)
        .bind(name)
        .bind(hierarchy.kind().type_code())
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    async fn save_hierarchy_contents(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog_id: &str,
        name: &str,
        hierarchy: &(dyn Hierarchy + Send + Sync),
    ) -> DbResult<()> {
        match hierarchy.kind() {
            HierarchyKind::EntityList | HierarchyKind::EntitySet => {
                let (table, order_col) = if hierarchy.kind() == HierarchyKind::EntityList {
                    ("hierarchy_entity_list", "list_order")
                } else {
                    ("hierarchy_entity_set", "set_order")
                };
                sqlx::query(&format!(
                    "DELETE FROM {table} WHERE catalog_id = ? AND hierarchy_name = ?"
                ))
                .bind(catalog_id)
                .bind(name)
                .execute(&mut **tx)
                .await?;

                let entities: Vec<Entity> = downcast_entities(hierarchy);
                for (order, entity) in entities.iter().enumerate() {
                    self.ensure_entity(tx, entity).await?;
                    sqlx::query(&format!(
                        "INSERT INTO {table} (catalog_id, hierarchy_name, entity_id, {order_col}) \
                         VALUES (?, ?, ?, ?)"
                    ))
                    .bind(catalog_id)
                    .bind(name)
                    .bind(entity.global_id().to_string())
                    .bind(i64::try_from(order).unwrap_or(i64::MAX))
                    .execute(&mut **tx)
                    .await?;
                }
                Ok(())
            }
            HierarchyKind::EntityDir => {
                sqlx::query(
                    "DELETE FROM hierarchy_entity_directory WHERE catalog_id = ? AND hierarchy_name = ?",
                )
                .bind(catalog_id)
                .bind(name)
                .execute(&mut **tx)
                .await?;
                let dir = downcast_ref::<DirectoryHierarchy>(hierarchy)
                    .ok_or_else(|| DbError::Core(CoreError::Invariant {
                        message: "ENTITY_DIR kind did not downcast to DirectoryHierarchy".into(),
                    }))?;
                for (order, key) in dir.keys().map(str::to_string).collect::<Vec<_>>().into_iter().enumerate() {
                    let entity = dir.get(&key).cloned().expect("key came from keys()");
                    self.ensure_entity(tx, &entity).await?;
                    sqlx::query(
                        "INSERT INTO hierarchy_entity_directory \
                         (catalog_id, hierarchy_name, entity_key, entity_id, dir_order) \
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(catalog_id)
                    .bind(name)
                    .bind(&key)
                    .bind(entity.global_id().to_string())
                    .bind(i64::try_from(order).unwrap_or(i64::MAX))
                    .execute(&mut **tx)
                    .await?;
                }
                Ok(())
            }
            HierarchyKind::EntityTree => {
                sqlx::query(
                    "DELETE FROM hierarchy_entity_tree_node WHERE catalog_id = ? AND hierarchy_name = ?",
                )
                .bind(catalog_id)
                .bind(name)
                .execute(&mut **tx)
                .await?;
                let tree = downcast_ref::<TreeHierarchy>(hierarchy).ok_or_else(|| {
                    DbError::Core(CoreError::Invariant {
                        message: "ENTITY_TREE kind did not downcast to TreeHierarchy".into(),
                    })
                })?;
                let mut order = 0i64;
                let root_id = Uuid::new_v4().to_string();
                self.ensure_entity(tx, tree.root().value()).await?;
                sqlx::query(
                    "INSERT INTO hierarchy_entity_tree_node \
                     (catalog_id, hierarchy_name, node_id, parent_node_id, node_key, entity_id, node_path, tree_order) \
                     VALUES (?, ?, ?, NULL, '', ?, '', ?)",
                )
                .bind(catalog_id)
                .bind(name)
                .bind(&root_id)
                .bind(tree.root().value().global_id().to_string())
                .bind(order)
                .execute(&mut **tx)
                .await?;
                order += 1;
                self.save_tree_children(tx, catalog_id, name, tree.root(), &root_id, "", &mut order)
                    .await?;
                Ok(())
            }
            HierarchyKind::AspectMap => {
                let map = downcast_ref::<AspectMapHierarchy>(hierarchy).ok_or_else(|| {
                    DbError::Core(CoreError::Invariant {
                        message: "ASPECT_MAP kind did not downcast to AspectMapHierarchy".into(),
                    })
                })?;
                sqlx::query(
                    "DELETE FROM hierarchy_aspect_map WHERE catalog_id = ? AND hierarchy_name = ?",
                )
                .bind(catalog_id)
                .bind(name)
                .execute(&mut **tx)
                .await?;
                let aspect_def_id = map
                    .aspect_def()
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .uuid()
                    .to_string();
                let aspect_def_name = map
                    .aspect_def()
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .name()
                    .to_string();
                let has_mapping = self
                    .mappings
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .contains_key(&aspect_def_name);

                for (order, global_id) in map.keys().collect::<Vec<_>>().into_iter().enumerate() {
                    let aspect = map.get(global_id).expect("key came from keys()");
                    let entity = Entity::new(global_id);
                    self.ensure_entity(tx, &entity).await?;
                    sqlx::query(
                        "INSERT INTO hierarchy_aspect_map \
                         (catalog_id, hierarchy_name, entity_id, aspect_def_id, map_order) \
                         VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(catalog_id)
                    .bind(name)
                    .bind(global_id.to_string())
                    .bind(&aspect_def_id)
                    .bind(i64::try_from(order).unwrap_or(i64::MAX))
                    .execute(&mut **tx)
                    .await?;
                    sqlx::query(
                        "INSERT OR REPLACE INTO aspect \
                         (entity_id, aspect_def_id, catalog_id, hierarchy_name) VALUES (?, ?, ?, ?)",
                    )
                    .bind(global_id.to_string())
                    .bind(&aspect_def_id)
                    .bind(catalog_id)
                    .bind(name)
                    .execute(&mut **tx)
                    .await?;

                    if has_mapping {
                        self.save_mapped_aspect(tx, catalog_id, &entity, &aspect_def_name, aspect)
                            .await?;
                    } else {
                        self.save_generic_aspect(tx, catalog_id, &entity, &aspect_def_id, aspect)
                            .await?;
                    }
                }
                Ok(())
            }
        }
    }

    #[allow(clippy::only_used_in_recursion)]
    async fn save_tree_children<'a>(
        &'a self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog_id: &str,
        name: &str,
        node: &TreeNode,
        node_id: &str,
        path_prefix: &str,
        order: &mut i64,
    ) -> DbResult<()> {
        for (key, child) in node.children() {
            let child_id = Uuid::new_v4().to_string();
            let path = if path_prefix.is_empty() {
                key.to_string()
            } else {
                format!("{path_prefix}/{key}")
            };
            self.ensure_entity(tx, child.value()).await?;
            sqlx::query(
                "INSERT INTO hierarchy_entity_tree_node \
                 (catalog_id, hierarchy_name, node_id, parent_node_id, node_key, entity_id, node_path, tree_order) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(catalog_id)
            .bind(name)
            .bind(&child_id)
            .bind(node_id)
            .bind(key)
            .bind(child.value().global_id().to_string())
            .bind(&path)
            .bind(*order)
            .execute(&mut **tx)
            .await?;
            *order += 1;
            Box::pin(self.save_tree_children(tx, catalog_id, name, child, &child_id, &path, order))
                .await?;
        }
        Ok(())
    }

    async fn ensure_entity(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        entity: &Entity,
    ) -> DbResult<()> {
        sqlx::query("INSERT OR IGNORE INTO entity (entity_id) VALUES (?)")
            .bind(entity.global_id().to_string())
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn save_generic_aspect(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog_id: &str,
        entity: &Entity,
        aspect_def_id: &str,
        aspect: &(dyn Aspect + Send + Sync),
    ) -> DbResult<()> {
        let entity_id = entity.global_id().to_string();
        sqlx::query(
            "DELETE FROM property_value WHERE entity_id = ? AND aspect_def_id = ? AND catalog_id = ?",
        )
        .bind(&entity_id)
        .bind(aspect_def_id)
        .bind(catalog_id)
        .execute(&mut **tx)
        .await?;

        for name in property_names(aspect) {
            let Some(value) = aspect
                .read_obj(&name)
                .map_err(DbError::Core)?
                .cloned()
            else {
                continue;
            };
            for (index, scalar) in value.as_slice().iter().enumerate() {
                let (text, binary) = match scalar {
                    Value::Blob(bytes) => (None, Some(bytes.clone())),
                    other => (Some(other.to_canonical_text()), None),
                };
                sqlx::query(
                    "INSERT INTO property_value \
                     (entity_id, aspect_def_id, catalog_id, property_name, value_index, value_text, value_binary) \
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&entity_id)
                .bind(aspect_def_id)
                .bind(catalog_id)
                .bind(&name)
                .bind(i64::try_from(index).unwrap_or(i64::MAX))
                .bind(text)
                .bind(binary)
                .execute(&mut **tx)
                .await?;
            }
        }
        Ok(())
    }

    async fn save_mapped_aspect(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        catalog_id: &str,
        entity: &Entity,
        aspect_def_name: &str,
        aspect: &(dyn Aspect + Send + Sync),
    ) -> DbResult<()> {
        let mappings = self.mappings.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mapping = mappings
            .get(aspect_def_name)
            .ok_or_else(|| DbError::NoSuchMapping {
                name: aspect_def_name.to_string(),
            })?;

        let mut delete_sql = format!("DELETE FROM {} WHERE 1 = 1", mapping.table_name());
        if mapping.has_catalog_id() {
            delete_sql.push_str(" AND catalog_id = ?");
        }
        if mapping.has_entity_id() {
            delete_sql.push_str(" AND entity_id = ?");
        }
        let mut query = sqlx::query(&delete_sql);
        if mapping.has_catalog_id() {
            query = query.bind(catalog_id.to_string());
        }
        if mapping.has_entity_id() {
            query = query.bind(entity.global_id().to_string());
        }
        query.execute(&mut **tx).await?;

        let mut columns = Vec::new();
        let mut placeholders = Vec::new();
        let mut texts: Vec<Option<String>> = Vec::new();
        if mapping.has_catalog_id() {
            columns.push("catalog_id".to_string());
            placeholders.push("?".to_string());
            texts.push(Some(catalog_id.to_string()));
        }
        if mapping.has_entity_id() {
            columns.push("entity_id".to_string());
            placeholders.push("?".to_string());
            texts.push(Some(entity.global_id().to_string()));
        }
        for (property_name, column) in mapping.column_mapping() {
            let value = aspect.read_obj(property_name).map_err(DbError::Core)?;
            let text = value
                .map(PropertyValue::as_slice)
                .and_then(<[Value]>::first)
                .map(Value::to_canonical_text);
            columns.push(column.clone());
            placeholders.push("?".to_string());
            texts.push(text);
        }

        let insert_sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            mapping.table_name(),
            columns.join(", "),
            placeholders.join(", "),
        );
        let mut insert = sqlx::query(&insert_sql);
        for text in texts {
            insert = insert.bind(text);
        }
        insert.execute(&mut **tx).await?;
        Ok(())
    }

    /// Load a catalog previously saved under `global_id`.
    /// Returns `None` if no such catalog row exists.
    #[tracing::instrument(skip(self))]
    pub async fn load_catalog(&self, global_id: Uuid) -> DbResult<Option<Catalog>> {
        let catalog_id = global_id.to_string();
        let Some(row) = sqlx::query("SELECT species, upstream_catalog_id, version_number FROM catalog WHERE catalog_id = ?")
            .bind(&catalog_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let species = species_from_code(row.get::<String, _>("species"))?;
        let upstream: Option<String> = row.get("upstream_catalog_id");
        let version: i64 = row.get("version_number");

        let aspect_def_rows = sqlx::query("SELECT aspect_def_id FROM catalog_aspect_def WHERE catalog_id = ?")
            .bind(&catalog_id)
            .fetch_all(&self.pool)
            .await?;
        let mut def = CatalogDef::new();
        let mut extensions = Vec::new();
        for row in aspect_def_rows {
            let aspect_def_id: String = row.get("aspect_def_id");
            let handle = self.load_aspect_def(&aspect_def_id).await?;
            let name = handle
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .name()
                .to_string();
            if def.aspect_def(&name).is_none() {
                def.insert_aspect_def_handle(handle.clone())
                    .map_err(DbError::Core)?;
            }
            extensions.push(handle);
        }

        let mut catalog = Catalog::new(global_id, species, def).strict(false);
        if let Some(upstream) = upstream.and_then(|u| Uuid::parse_str(&u).ok()) {
            catalog = catalog.upstream(upstream);
        }
        for _ in 0..version {
            catalog.bump_version();
        }

        let hierarchy_rows = sqlx::query("SELECT name, hierarchy_type FROM hierarchy WHERE catalog_id = ?")
            .bind(&catalog_id)
            .fetch_all(&self.pool)
            .await?;
        for row in hierarchy_rows {
            let name: String = row.get("name");
            let type_code: String = row.get("hierarchy_type");
            let kind = HierarchyKind::from_type_code(&type_code).ok_or_else(|| {
                DbError::Core(CoreError::Invariant {
                    message: format!("unknown hierarchy_type '{type_code}' on load"),
                })
            })?;
            let hierarchy = self
                .load_hierarchy(&catalog_id, &name, kind, &extensions)
                .await?;
            catalog
                .add_hierarchy(name, hierarchy)
                .map_err(DbError::Core)?;
        }

        Ok(Some(catalog))
    }

    async fn load_aspect_def(&self, aspect_def_id: &str) -> DbResult<AspectDefHandle> {
        let row = sqlx::query(
            "SELECT name, can_add_properties, can_remove_properties, is_readable, is_writable \
             FROM aspect_def WHERE aspect_def_id = ?",
        )
        .bind(aspect_def_id)
        .fetch_one(&self.pool)
        .await?;
        let name: String = row.get("name");

        if let Some(existing) = self.aspect_def(&name) {
            return Ok(existing);
        }

        let can_add: bool = row.get("can_add_properties");
        let can_remove: bool = row.get("can_remove_properties");
        let mutability = match (can_add, can_remove) {
            (true, true) => Mutability::Mutable,
            (false, false) => Mutability::Immutable,
            (can_add, can_remove) => Mutability::Full { can_add, can_remove },
        };
        let uuid = Uuid::parse_str(aspect_def_id).map_err(|_| {
            DbError::Core(CoreError::Invariant {
                message: format!("aspect_def_id '{aspect_def_id}' is not a valid uuid"),
            })
        })?;
        let mut def = AspectDef::new(name, uuid, mutability)
            .readable(row.get("is_readable"))
            .writable(row.get("is_writable"));

        let property_rows = sqlx::query(
            "SELECT name, property_type, default_value, has_default_value, is_readable, \
                    is_writable, is_nullable, is_removable, is_multivalued \
             FROM property_def WHERE aspect_def_id = ? ORDER BY position ASC",
        )
        .bind(aspect_def_id)
        .fetch_all(&self.pool)
        .await?;
        for row in property_rows {
            let property_type = PropertyType::from_code(&row.get::<String, _>("property_type"))
                .ok_or_else(|| {
                    DbError::Core(CoreError::Invariant {
                        message: "unknown property_type code on load".into(),
                    })
                })?;
            let mut property = PropertyDef::new(row.get::<String, _>("name"), property_type)
                .readable(row.get("is_readable"))
                .writable(row.get("is_writable"))
                .nullable(row.get("is_nullable"))
                .removable(row.get("is_removable"))
                .multivalued(row.get("is_multivalued"));
            let has_default: bool = row.get("has_default_value");
            if has_default {
                if let Some(text) = row.get::<Option<String>, _>("default_value") {
                    let value = PropertyValueAdapter::new()
                        .coerce(CoerceInput::Str(text), property_type, false)
                        .map_err(DbError::Core)?;
                    if let PropertyValue::Scalar(v) = value {
                        property = property.with_default(v);
                    }
                }
            }
            def = def.with_property(property).map_err(DbError::Core)?;
        }

        let handle = new_aspect_def_handle(def);
        self.register_aspect_def(&handle);
        Ok(handle)
    }

    async fn load_hierarchy(
        &self,
        catalog_id: &str,
        name: &str,
        kind: HierarchyKind,
        extensions: &[AspectDefHandle],
    ) -> DbResult<Box<dyn Hierarchy + Send + Sync>> {
        match kind {
            HierarchyKind::EntityList | HierarchyKind::EntitySet => {
                let (table, order_col) = if kind == HierarchyKind::EntityList {
                    ("hierarchy_entity_list", "list_order")
                } else {
                    ("hierarchy_entity_set", "set_order")
                };
                let rows = sqlx::query(&format!(
                    "SELECT entity_id FROM {table} WHERE catalog_id = ? AND hierarchy_name = ? \
                     ORDER BY {order_col} ASC"
                ))
                .bind(catalog_id)
                .bind(name)
                .fetch_all(&self.pool)
                .await?;
                if kind == HierarchyKind::EntityList {
                    let mut list = ListHierarchy::new(name);
                    for row in rows {
                        list.add(self.entity_from_row(&row)?).map_err(DbError::Core)?;
                    }
                    Ok(Box::new(list))
                } else {
                    let mut set = SetHierarchy::new(name);
                    for row in rows {
                        set.add(self.entity_from_row(&row)?).map_err(DbError::Core)?;
                    }
                    Ok(Box::new(set))
                }
            }
            HierarchyKind::EntityDir => {
                let rows = sqlx::query(
                    "SELECT entity_key, entity_id FROM hierarchy_entity_directory \
                     WHERE catalog_id = ? AND hierarchy_name = ? ORDER BY dir_order ASC",
                )
                .bind(catalog_id)
                .bind(name)
                .fetch_all(&self.pool)
                .await?;
                let mut dir = DirectoryHierarchy::new(name);
                for row in rows {
                    let key: String = row.get("entity_key");
                    dir.put(key, self.entity_from_row(&row)?).map_err(DbError::Core)?;
                }
                Ok(Box::new(dir))
            }
            HierarchyKind::EntityTree => {
                let rows = sqlx::query(
                    "SELECT node_id, parent_node_id, node_key, entity_id FROM hierarchy_entity_tree_node \
                     WHERE catalog_id = ? AND hierarchy_name = ? ORDER BY tree_order ASC",
                )
                .bind(catalog_id)
                .bind(name)
                .fetch_all(&self.pool)
                .await?;
                let mut rows_iter = rows.into_iter();
                let Some(root_row) = rows_iter.next() else {
                    return Ok(Box::new(TreeHierarchy::new(name, Entity::new(Uuid::new_v4()))));
                };
                let root_entity = self.entity_from_row(&root_row)?;
                let root_id: String = root_row.get("node_id");
                let mut tree = TreeHierarchy::new(name, root_entity);
                let mut nodes: HashMap<String, Vec<String>> = HashMap::new();
                let mut paths: HashMap<String, Vec<String>> = HashMap::new();
                paths.insert(root_id.clone(), Vec::new());
                for row in rows_iter {
                    let node_id: String = row.get("node_id");
                    let parent_id: String = row.get("parent_node_id");
                    let key: String = row.get("node_key");
                    let entity = self.entity_from_row(&row)?;
                    let parent_path = paths.get(&parent_id).cloned().unwrap_or_default();
                    tree.add_at_path(&parent_path, key.clone(), TreeNode::new(entity))
                        .map_err(DbError::Core)?;
                    let mut child_path = parent_path;
                    child_path.push(key);
                    nodes.entry(parent_id).or_default().push(node_id.clone());
                    paths.insert(node_id, child_path);
                }
                Ok(Box::new(tree))
            }
            HierarchyKind::AspectMap => {
                let rows = sqlx::query(
                    "SELECT entity_id, aspect_def_id FROM hierarchy_aspect_map \
                     WHERE catalog_id = ? AND hierarchy_name = ? ORDER BY map_order ASC",
                )
                .bind(catalog_id)
                .bind(name)
                .fetch_all(&self.pool)
                .await?;
                let aspect_def_id = rows
                    .first()
                    .map(|row| row.get::<String, _>("aspect_def_id"));
                let handle = match aspect_def_id {
                    Some(id) => self.load_aspect_def(&id).await?,
                    None => extensions
                        .iter()
                        .find(|h| {
                            h.read()
                                .unwrap_or_else(std::sync::PoisonError::into_inner)
                                .name()
                                == name
                        })
                        .cloned()
                        .ok_or_else(|| DbError::NoSuchMapping { name: name.to_string() })?,
                };
                let mut map = AspectMapHierarchy::new(name, handle.clone());
                let aspect_def_name = handle
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .name()
                    .to_string();
                let has_mapping = self
                    .mappings
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .contains_key(&aspect_def_name);
                for row in rows {
                    let entity_id: String = row.get("entity_id");
                    let entity = Uuid::parse_str(&entity_id)
                        .map(|id| self.entities.get_or_register(id))
                        .map_err(|_| {
                            DbError::Core(CoreError::Invariant {
                                message: "invalid entity_id on load".into(),
                            })
                        })?;
                    let aspect: Box<dyn Aspect + Send + Sync> = if has_mapping {
                        Box::new(
                            self.load_mapped_aspect(catalog_id, &entity, &aspect_def_name, &handle)
                                .await?,
                        )
                    } else {
                        Box::new(
                            self.load_generic_aspect(catalog_id, &entity, &handle).await?,
                        )
                    };
                    map.put(entity, aspect).map_err(DbError::Core)?;
                }
                Ok(Box::new(map))
            }
        }
    }

    fn entity_from_row(&self, row: &sqlx::sqlite::SqliteRow) -> DbResult<Entity> {
        let entity_id: String = row.get("entity_id");
        let id = Uuid::parse_str(&entity_id).map_err(|_| {
            DbError::Core(CoreError::Invariant {
                message: "invalid entity_id on load".into(),
            })
        })?;
        Ok(self.entities.get_or_register(id))
    }

    async fn load_generic_aspect(
        &self,
        catalog_id: &str,
        entity: &Entity,
        handle: &AspectDefHandle,
    ) -> DbResult<PropertyMapAspect> {
        let def = handle.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let aspect_def_id = def.uuid().to_string();
        let mut aspect = PropertyMapAspect::new(handle.clone());
        for property in def.properties() {
            let rows = sqlx::query(
                "SELECT value_text, value_binary FROM property_value \
                 WHERE entity_id = ? AND aspect_def_id = ? AND catalog_id = ? AND property_name = ? \
                 ORDER BY value_index ASC",
            )
            .bind(entity.global_id().to_string())
            .bind(&aspect_def_id)
            .bind(catalog_id)
            .bind(property.name())
            .fetch_all(&self.pool)
            .await?;
            let value = if rows.is_empty() {
                if property.is_multivalued() {
                    Some(PropertyValue::Multi(Vec::new()))
                } else {
                    None
                }
            } else {
                let mut scalars = Vec::with_capacity(rows.len());
                for row in &rows {
                    scalars.push(self.scalar_from_row(row, property.property_type())?);
                }
                Some(if property.is_multivalued() {
                    PropertyValue::Multi(scalars)
                } else {
                    PropertyValue::Scalar(scalars.into_iter().next().expect("checked non-empty"))
                })
            };
            aspect
                .add(Property::new(property.clone(), value))
                .map_err(DbError::Core)?;
        }
        Ok(aspect)
    }

    async fn load_mapped_aspect(
        &self,
        catalog_id: &str,
        entity: &Entity,
        aspect_def_name: &str,
        handle: &AspectDefHandle,
    ) -> DbResult<ObjectMapAspect> {
        let mappings = self.mappings.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mapping = mappings
            .get(aspect_def_name)
            .ok_or_else(|| DbError::NoSuchMapping {
                name: aspect_def_name.to_string(),
            })?;

        let mut select_sql = format!("SELECT * FROM {} WHERE 1 = 1", mapping.table_name());
        if mapping.has_catalog_id() {
            select_sql.push_str(" AND catalog_id = ?");
        }
        if mapping.has_entity_id() {
            select_sql.push_str(" AND entity_id = ?");
        }
        let mut query = sqlx::query(&select_sql);
        if mapping.has_catalog_id() {
            query = query.bind(catalog_id.to_string());
        }
        if mapping.has_entity_id() {
            query = query.bind(entity.global_id().to_string());
        }
        let row = query.fetch_optional(&self.pool).await?;

        let def = handle.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut aspect = ObjectMapAspect::new(handle.clone());
        if let Some(row) = row {
            for property in def.properties() {
                let Some(column) = mapping.column_for(property.name()) else {
                    continue;
                };
                let text: Option<String> = row.try_get(column).ok();
                let value = match text {
                    Some(text) => Some(
                        PropertyValueAdapter::new()
                            .coerce(CoerceInput::Str(text), property.property_type(), false)
                            .map_err(DbError::Core)?,
                    ),
                    None => None,
                };
                aspect
                    .add(Property::new(property.clone(), value))
                    .map_err(DbError::Core)?;
            }
        } else {
            for property in def.properties() {
                aspect
                    .add(Property::new(property.clone(), None))
                    .map_err(DbError::Core)?;
            }
        }
        Ok(aspect)
    }

    fn scalar_from_row(
        &self,
        row: &sqlx::sqlite::SqliteRow,
        property_type: PropertyType,
    ) -> DbResult<Value> {
        if property_type == PropertyType::Blob {
            let binary: Option<Vec<u8>> = row.try_get("value_binary").ok();
            if let Some(bytes) = binary {
                return Ok(Value::Blob(bytes));
            }
        }
        let text: Option<String> = row.try_get("value_text").ok();
        let text = text.ok_or_else(|| {
            DbError::Core(CoreError::Invariant {
                message: "property_value row missing value_text".into(),
            })
        })?;
        let value = PropertyValueAdapter::new()
            .coerce(CoerceInput::Str(text), property_type, false)
            .map_err(DbError::Core)?;
        match value {
            PropertyValue::Scalar(v) => Ok(v),
            PropertyValue::Multi(_) => unreachable!("coerce with multivalued=false never returns Multi"),
        }
    }

    /// Delete every row belonging to `global_id` across generic and mapped
    /// tables. AspectDefs are not deleted — they are a shared dictionary
    /// that outlives any one catalog.
    #[tracing::instrument(skip(self))]
    pub async fn delete_catalog(&self, global_id: Uuid) -> DbResult<bool> {
        let catalog_id = global_id.to_string();
        let mut tx = self.pool.begin().await?;

        let existed = sqlx::query("SELECT 1 FROM catalog WHERE catalog_id = ?")
            .bind(&catalog_id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !existed {
            tx.rollback().await?;
            return Ok(false);
        }

        for table in [
            "property_value",
            "aspect",
            "hierarchy_entity_list",
            "hierarchy_entity_set",
            "hierarchy_entity_directory",
            "hierarchy_entity_tree_node",
            "hierarchy_aspect_map",
            "hierarchy",
            "catalog_aspect_def",
        ] {
            sqlx::query(&format!("DELETE FROM {table} WHERE catalog_id = ?"))
                .bind(&catalog_id)
                .execute(&mut *tx)
                .await?;
        }
        sqlx::query("DELETE FROM catalog WHERE catalog_id = ?")
            .bind(&catalog_id)
            .execute(&mut *tx)
            .await?;

        // Mapped tables with catalog_id are scoped per catalog and get
        // truncated here. Mappings without catalog_id have no way to tell
        // which rows belong to this catalog, so they are left untouched;
        // see DESIGN.md for the policy this leaves in place.
        let mappings: Vec<AspectTableMapping> = self
            .mappings
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for mapping in mappings {
            if mapping.has_catalog_id() {
                sqlx::query(&format!(
                    "DELETE FROM {} WHERE catalog_id = ?",
                    mapping.table_name()
                ))
                .bind(&catalog_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }
}

/// Content digest over an aspect def's property list, written alongside the
/// def row on every save. Nothing in the load path consults it; it exists so
/// an external tool (or a future migration) can detect a property list that
/// changed shape without diffing the full `property_def` table.
fn aspect_def_hash_version(def: &AspectDef) -> i64 {
    let mut hash = fnv1a_64(def.name().as_bytes());
    for property in def.properties() {
        hash = rolling_fnv1a_64(hash, property.name().as_bytes());
        hash = rolling_fnv1a_64(hash, property.property_type().code().as_bytes());
        hash = rolling_fnv1a_64(hash, &[u8::from(property.is_multivalued())]);
    }
    hash as i64
}

fn species_code(species: Species) -> &'static str {
    match species {
        Species::Sink => "SINK",
        Species::Source => "SOURCE",
        Species::Mirror => "MIRROR",
    }
}

fn species_from_code(code: String) -> DbResult<Species> {
    match code.as_str() {
        "SINK" => Ok(Species::Sink),
        "SOURCE" => Ok(Species::Source),
        "MIRROR" => Ok(Species::Mirror),
        other => Err(DbError::Core(CoreError::Invariant {
            message: format!("unknown species code '{other}' on load"),
        })),
    }
}

fn property_names(aspect: &(dyn Aspect + Send + Sync)) -> Vec<String> {
    // Relies on `Aspect::contains`/`read_obj` only; the concrete
    // representations additionally expose ordered iteration, used here via
    // downcasting since the trait itself intentionally stays narrow.
    if let Some(map) = downcast_ref::<PropertyMapAspect>(aspect) {
        return map.entries().map(|p| p.def().name().to_string()).collect();
    }
    if let Some(map) = downcast_ref::<ObjectMapAspect>(aspect) {
        return map.keys().map(str::to_string).collect();
    }
    Vec::new()
}

fn downcast_entities(hierarchy: &(dyn Hierarchy + Send + Sync)) -> Vec<Entity> {
    if let Some(list) = downcast_ref::<ListHierarchy>(hierarchy) {
        return list.iter().cloned().collect();
    }
    if let Some(set) = downcast_ref::<SetHierarchy>(hierarchy) {
        return set.iter().cloned().collect();
    }
    Vec::new()
}

fn downcast_ref<T: Hierarchy + 'static>(hierarchy: &(dyn Hierarchy + Send + Sync)) -> Option<&T> {
    hierarchy.as_any().downcast_ref::<T>()
}
