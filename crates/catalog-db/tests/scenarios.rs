//! End-to-end scenarios and quantified properties covering the persistence
//! engine: DB round-trip fidelity, idempotent save, transactional atomicity,
//! multivalued storage, and mapped-table routing.

use catalog_core::{
    aspect::PropertyMapAspect,
    catalog::{Catalog, Species},
    entity::Entity,
    hierarchy::{AspectMapHierarchy, TreeHierarchy, TreeNode},
    schema::{new_aspect_def_handle, AspectDef, CatalogDef, Mutability, Property, PropertyDef},
    value::{PropertyValue, Value},
};
use catalog_db::{AspectTableMapping, Dao};
use catalog_primitives::PropertyType;
use indexmap::IndexMap;
use sqlx::sqlite::SqlitePoolOptions;
use uuid::Uuid;

async fn dao() -> Dao {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");
    let dao = Dao::new(pool);
    dao.init_schema().await.expect("generic schema");
    dao
}

#[tokio::test]
async fn s1_simple_catalog_round_trips() {
    let dao = dao().await;
    let global_id = Uuid::parse_str("550e8400-e29b-41d4-a716-444444444444").unwrap();
    let catalog = Catalog::new(global_id, Species::Sink, CatalogDef::new());

    dao.save_catalog(&catalog).await.unwrap();
    let loaded = dao.load_catalog(global_id).await.unwrap().unwrap();

    assert_eq!(loaded.global_id(), global_id);
    assert_eq!(loaded.species(), Species::Sink);
}

#[tokio::test]
async fn s2_person_aspect_def_preserves_property_order() {
    let dao = dao().await;
    let mut catalog = Catalog::new(Uuid::new_v4(), Species::Source, CatalogDef::new());
    catalog
        .extend(
            AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable)
                .with_property(PropertyDef::new("name", PropertyType::String).nullable(false).writable(true))
                .unwrap()
                .with_property(PropertyDef::new("age", PropertyType::Integer).nullable(true))
                .unwrap(),
        )
        .unwrap();

    dao.save_catalog(&catalog).await.unwrap();
    let loaded = dao.load_catalog(catalog.global_id()).await.unwrap().unwrap();

    let handle = loaded.def().aspect_def("person").unwrap();
    let def = handle.read().unwrap();
    let names: Vec<_> = def.properties().map(PropertyDef::name).collect();
    assert_eq!(names, vec!["name", "age"]);
}

fn built_aspect(handle: &catalog_core::schema::AspectDefHandle, values: &[(&str, Option<PropertyValue>)]) -> PropertyMapAspect {
    let mut aspect = PropertyMapAspect::new(handle.clone());
    for (name, value) in values {
        let def = handle.read().unwrap().property(name).unwrap().clone();
        aspect.add(Property::new(def, value.clone())).unwrap();
    }
    aspect
}

#[tokio::test]
async fn s3_multivalued_tags_and_prices_round_trip() {
    let dao = dao().await;
    let mut catalog = Catalog::new(Uuid::new_v4(), Species::Source, CatalogDef::new());
    let handle = new_aspect_def_handle(
        AspectDef::new("product", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("title", PropertyType::String))
            .unwrap()
            .with_property(PropertyDef::new("tags", PropertyType::String).multivalued(true))
            .unwrap()
            .with_property(PropertyDef::new("prices", PropertyType::Float).multivalued(true))
            .unwrap(),
    );
    catalog.register_extension_handle(handle.clone());

    let entity = Entity::new(Uuid::new_v4());
    let aspect = built_aspect(
        &handle,
        &[
            ("title", Some(PropertyValue::Scalar(Value::String("Smart Watch".into())))),
            (
                "tags",
                Some(PropertyValue::Multi(vec![
                    Value::String("electronics".into()),
                    Value::String("gadget".into()),
                    Value::String("popular".into()),
                ])),
            ),
            (
                "prices",
                Some(PropertyValue::Multi(vec![
                    Value::Float(199.99),
                    Value::Float(249.99),
                    Value::Float(299.99),
                ])),
            ),
        ],
    );

    let mut map = AspectMapHierarchy::new("product", handle.clone());
    map.put(entity.clone(), Box::new(aspect)).unwrap();
    catalog.add_hierarchy("product", Box::new(map)).unwrap();

    dao.save_catalog(&catalog).await.unwrap();

    let row_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM property_value WHERE entity_id = ? AND catalog_id = ?",
    )
    .bind(entity.global_id().to_string())
    .bind(catalog.global_id().to_string())
    .fetch_one(dao.pool())
    .await
    .unwrap();
    assert_eq!(row_count, 6);

    let loaded = dao.load_catalog(catalog.global_id()).await.unwrap().unwrap();
    let loaded_map = loaded.hierarchy("product").unwrap();
    let loaded_map = loaded_map.as_any().downcast_ref::<AspectMapHierarchy>().unwrap();
    let loaded_aspect = loaded_map.get(entity.global_id()).unwrap();
    let tags = loaded_aspect.read_obj("tags").unwrap().unwrap();
    assert_eq!(tags.as_slice().len(), 3);
    let prices = loaded_aspect.read_obj("prices").unwrap().unwrap();
    assert_eq!(prices.as_slice().len(), 3);
}

#[tokio::test]
async fn s4_tree_hierarchy_preserves_path_resolution() {
    let dao = dao().await;
    let mut catalog = Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new()).strict(false);
    let e1 = Entity::new(Uuid::new_v4());
    let e2 = Entity::new(Uuid::new_v4());
    let e3 = Entity::new(Uuid::new_v4());
    let e4 = Entity::new(Uuid::new_v4());

    let mut tree = TreeHierarchy::new("fs", e1.clone());
    tree.add_at_path(&[], "documents", TreeNode::new(e2.clone())).unwrap();
    tree.add_at_path(&[], "images", TreeNode::new(e3.clone())).unwrap();
    tree.add_at_path(
        &["documents".to_string()],
        "reports",
        TreeNode::new(e4.clone()),
    )
    .unwrap();
    catalog.add_hierarchy("fs", Box::new(tree)).unwrap();

    dao.save_catalog(&catalog).await.unwrap();
    let loaded = dao.load_catalog(catalog.global_id()).await.unwrap().unwrap();

    let loaded_tree = loaded.hierarchy("fs").unwrap();
    let loaded_tree = loaded_tree.as_any().downcast_ref::<TreeHierarchy>().unwrap();
    let node = loaded_tree
        .node(&["documents".to_string(), "reports".to_string()])
        .unwrap();
    assert_eq!(node.value().global_id(), e4.global_id());
}

#[tokio::test]
async fn s5_mapped_table_with_both_ids_round_trips() {
    let dao = dao().await;
    let aspect_def = new_aspect_def_handle(
        AspectDef::new("both_ids", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("string_col", PropertyType::String))
            .unwrap()
            .with_property(PropertyDef::new("integer_col", PropertyType::Integer))
            .unwrap(),
    );
    let mut columns = IndexMap::new();
    columns.insert("string_col".to_string(), "string_col".to_string());
    columns.insert("integer_col".to_string(), "integer_col".to_string());
    let mapping = AspectTableMapping::new(
        aspect_def.clone(),
        "test_aspect_mapping_with_both_ids",
        columns,
        true,
        true,
    )
    .unwrap();
    dao.create_table(&mapping).await.unwrap();
    dao.add_aspect_table_mapping(mapping);

    let mut catalog = Catalog::new(Uuid::new_v4(), Species::Source, CatalogDef::new());
    catalog.register_extension_handle(aspect_def.clone());

    let e5 = Entity::new(Uuid::new_v4());
    let aspect = built_aspect(
        &aspect_def,
        &[
            ("string_col", Some(PropertyValue::Scalar(Value::String("bothids1".into())))),
            ("integer_col", Some(PropertyValue::Scalar(Value::Integer(400)))),
        ],
    );
    let mut map = AspectMapHierarchy::new("both_ids", aspect_def.clone());
    map.put(e5.clone(), Box::new(aspect)).unwrap();
    catalog.add_hierarchy("both_ids", Box::new(map)).unwrap();

    dao.save_catalog(&catalog).await.unwrap();

    let row: (String, String, i64) = sqlx::query_as(
        "SELECT catalog_id, entity_id, integer_col FROM test_aspect_mapping_with_both_ids",
    )
    .fetch_one(dao.pool())
    .await
    .unwrap();
    assert_eq!(row.0, catalog.global_id().to_string());
    assert_eq!(row.1, e5.global_id().to_string());
    assert_eq!(row.2, 400);

    let loaded = dao.load_catalog(catalog.global_id()).await.unwrap().unwrap();
    let loaded_map = loaded.hierarchy("both_ids").unwrap();
    let loaded_map = loaded_map.as_any().downcast_ref::<AspectMapHierarchy>().unwrap();
    let loaded_aspect = loaded_map.get(e5.global_id()).unwrap();
    let integer_col = loaded_aspect.read_obj("integer_col").unwrap().unwrap();
    assert_eq!(integer_col.as_slice(), &[Value::Integer(400)]);
}

#[tokio::test]
async fn s6_delete_catalog_removes_all_rows() {
    let dao = dao().await;
    let catalog = Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new());
    dao.save_catalog(&catalog).await.unwrap();

    let deleted = dao.delete_catalog(catalog.global_id()).await.unwrap();
    assert!(deleted);
    assert!(dao.load_catalog(catalog.global_id()).await.unwrap().is_none());

    let deleted_again = dao.delete_catalog(catalog.global_id()).await.unwrap();
    assert!(!deleted_again);
}

#[tokio::test]
async fn idempotent_save_does_not_duplicate_rows() {
    let dao = dao().await;
    let mut catalog = Catalog::new(Uuid::new_v4(), Species::Mirror, CatalogDef::new());
    catalog
        .extend(AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable))
        .unwrap();

    dao.save_catalog(&catalog).await.unwrap();
    dao.save_catalog(&catalog).await.unwrap();

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog WHERE catalog_id = ?")
        .bind(catalog.global_id().to_string())
        .fetch_one(dao.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn save_failure_rolls_back_the_whole_transaction() {
    let dao = dao().await;
    let mut catalog = Catalog::new(Uuid::new_v4(), Species::Source, CatalogDef::new());
    catalog
        .extend(AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable))
        .unwrap();

    // A mapping whose backing table was never created via `create_table`:
    // saving an entry under it fails mid-transaction, after the
    // catalog/aspect-def/hierarchy-metadata rows above were already
    // written to the same (still uncommitted) transaction.
    let orphan_def = new_aspect_def_handle(
        AspectDef::new("orphan", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("val", PropertyType::String))
            .unwrap(),
    );
    let mut columns = IndexMap::new();
    columns.insert("val".to_string(), "val".to_string());
    let mapping = AspectTableMapping::new(orphan_def.clone(), "never_created", columns, true, true).unwrap();
    dao.add_aspect_table_mapping(mapping);
    catalog.register_extension_handle(orphan_def.clone());

    let aspect = built_aspect(
        &orphan_def,
        &[("val", Some(PropertyValue::Scalar(Value::String("x".into()))))],
    );
    let mut map = AspectMapHierarchy::new("orphan", orphan_def.clone());
    map.put(Entity::new(Uuid::new_v4()), Box::new(aspect)).unwrap();
    catalog.add_hierarchy("orphan", Box::new(map)).unwrap();

    let result = dao.save_catalog(&catalog).await;
    assert!(result.is_err());

    // Nothing from this save is visible: not the catalog row, not the
    // "person" aspect def that would otherwise have committed fine on its own.
    assert!(dao.load_catalog(catalog.global_id()).await.unwrap().is_none());
}
