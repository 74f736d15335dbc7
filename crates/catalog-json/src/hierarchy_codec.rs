use crate::{
    error::{JsonError, JsonResult},
    factory::JsonFactory,
    value_codec::{get_array, get_field, get_object, get_str, json_kind_name, optional_property_value_to_json, property_value_from_json},
};
use catalog_core::{
    aspect::{Aspect, PropertyMapAspect},
    entity::Entity,
    hierarchy::{
        AspectMapHierarchy, DirectoryHierarchy, Hierarchy, HierarchyKind, ListHierarchy, SetHierarchy,
        TreeHierarchy, TreeNode,
    },
    schema::{AspectDefHandle, Property},
    value::PropertyValue,
};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

///
/// hierarchy_codec
///
/// JSON encoding of the five hierarchy kinds: `contents` is an
/// array of UUID strings for LIST/SET, a string→UUID object for DIR, a
/// recursive `{value, children}` node for TREE, and a UUID→Aspect object for
/// ASPECT_MAP. Decoding resolves every UUID through the factory's
/// `EntityRegistry` and every ASPECT_MAP through its AspectDef dictionary,
/// keyed by the hierarchy's own name (which equals the AspectDef name
/// unless overridden).
///

fn parse_uuid(s: &str, path: &str) -> JsonResult<Uuid> {
    Uuid::parse_str(s).map_err(|_| JsonError::ShapeMismatch {
        path: path.to_string(),
        expected: "UUID string",
        found: "malformed string",
    })
}

fn downcast<'a, T: Hierarchy + 'static>(hierarchy: &'a (dyn Hierarchy + Send + Sync), path: &str) -> JsonResult<&'a T> {
    hierarchy.as_any().downcast_ref::<T>().ok_or_else(|| JsonError::ShapeMismatch {
        path: path.to_string(),
        expected: std::any::type_name::<T>(),
        found: "different hierarchy representation",
    })
}

pub fn hierarchy_to_json(hierarchy: &(dyn Hierarchy + Send + Sync), path: &str) -> JsonResult<Json> {
    let contents = match hierarchy.kind() {
        HierarchyKind::EntityList => {
            let list: &ListHierarchy = downcast(hierarchy, path)?;
            Json::Array(list.iter().map(|e| Json::from(e.global_id().to_string())).collect())
        }
        HierarchyKind::EntitySet => {
            let set: &SetHierarchy = downcast(hierarchy, path)?;
            Json::Array(set.iter().map(|e| Json::from(e.global_id().to_string())).collect())
        }
        HierarchyKind::EntityDir => {
            let dir: &DirectoryHierarchy = downcast(hierarchy, path)?;
            let mut obj = Map::new();
            for key in dir.keys() {
                let entity = dir.get(key).expect("key came from this directory's own iterator");
                obj.insert(key.to_string(), Json::from(entity.global_id().to_string()));
            }
            Json::Object(obj)
        }
        HierarchyKind::EntityTree => {
            let tree: &TreeHierarchy = downcast(hierarchy, path)?;
            tree_node_to_json(tree.root())
        }
        HierarchyKind::AspectMap => {
            let map: &AspectMapHierarchy = downcast(hierarchy, path)?;
            let def = map
                .aspect_def()
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let mut obj = Map::new();
            for global_id in map.keys() {
                let aspect = map.get(global_id).expect("key came from this map's own iterator");
                obj.insert(global_id.to_string(), aspect_to_json(aspect, &def)?);
            }
            Json::Object(obj)
        }
    };
    let mut obj = Map::new();
    obj.insert("type".to_string(), Json::from(hierarchy.kind().type_code()));
    obj.insert("name".to_string(), Json::from(hierarchy.name()));
    obj.insert("contents".to_string(), contents);
    Ok(Json::Object(obj))
}

fn tree_node_to_json(node: &TreeNode) -> Json {
    let mut children = Map::new();
    for (key, child) in node.children() {
        children.insert(key.to_string(), tree_node_to_json(child));
    }
    let mut obj = Map::new();
    obj.insert("value".to_string(), Json::from(node.value().global_id().to_string()));
    obj.insert("children".to_string(), Json::Object(children));
    Json::Object(obj)
}

fn aspect_to_json(aspect: &(dyn Aspect + Send + Sync), def: &catalog_core::schema::AspectDef) -> JsonResult<Json> {
    let mut obj = Map::new();
    for property_def in def.properties() {
        let value = aspect
            .read_obj(property_def.name())
            .map_err(JsonError::Core)?;
        obj.insert(property_def.name().to_string(), optional_property_value_to_json(value));
    }
    Ok(Json::Object(obj))
}

fn aspect_from_json(json: &Json, def_handle: &AspectDefHandle, factory: &JsonFactory, path: &str) -> JsonResult<Box<dyn Aspect + Send + Sync>> {
    let obj = get_object(json, path)?;
    let mut aspect = PropertyMapAspect::new(def_handle.clone());
    let def = def_handle
        .read()
        .unwrap_or_else(std::sync::PoisonError::into_inner);
    for property_def in def.properties() {
        let field_path = format!("{path}.{}", property_def.name());
        let value_json = obj.get(property_def.name()).unwrap_or(&Json::Null);
        let value = property_value_from_json(
            value_json,
            property_def.property_type(),
            property_def.is_multivalued(),
            factory.adapter(),
            &field_path,
        )?;
        aspect
            .add(Property::new(property_def.clone(), value))
            .map_err(JsonError::Core)?;
    }
    Ok(Box::new(aspect))
}

fn decode_tree_children(
    json_node: &Json,
    path: &str,
    parent_path: &[String],
    tree: &mut TreeHierarchy,
    factory: &JsonFactory,
) -> JsonResult<()> {
    let obj = get_object(json_node, path)?;
    let children_path = format!("{path}.children");
    let children = match obj.get("children") {
        Some(children_json) => get_object(children_json, &children_path)?,
        None => return Ok(()),
    };
    for (key, child_json) in children {
        let child_path = format!("{children_path}.{key}");
        let child_obj = get_object(child_json, &child_path)?;
        let value_str = get_str(child_obj, &child_path, "value")?;
        let uuid = parse_uuid(value_str, &format!("{child_path}.value"))?;
        let entity = factory.entities().get_or_register(uuid);
        tree.add_at_path(parent_path, key.clone(), TreeNode::new(entity))
            .map_err(JsonError::Core)?;
        let mut next_path = parent_path.to_vec();
        next_path.push(key.clone());
        decode_tree_children(child_json, &child_path, &next_path, tree, factory)?;
    }
    Ok(())
}

pub fn hierarchy_from_json(json: &Json, factory: &JsonFactory, path: &str) -> JsonResult<Box<dyn Hierarchy + Send + Sync>> {
    let obj = get_object(json, path)?;
    let type_code = get_str(obj, path, "type")?;
    let kind = HierarchyKind::from_type_code(type_code).ok_or_else(|| JsonError::UnknownTypeCode {
        path: format!("{path}.type"),
        code: type_code.to_string(),
    })?;
    let name = get_str(obj, path, "name")?.to_string();
    let contents_path = format!("{path}.contents");
    let contents = get_field(obj, path, "contents")?;

    Ok(match kind {
        HierarchyKind::EntityList => {
            let items = get_array(contents, &contents_path)?;
            let mut list = ListHierarchy::new(name);
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{contents_path}[{index}]");
                let uuid = parse_uuid(expect_str(item, &item_path)?, &item_path)?;
                list.add(factory.entities().get_or_register(uuid))
                    .map_err(JsonError::Core)?;
            }
            Box::new(list)
        }
        HierarchyKind::EntitySet => {
            let items = get_array(contents, &contents_path)?;
            let mut set = SetHierarchy::new(name);
            for (index, item) in items.iter().enumerate() {
                let item_path = format!("{contents_path}[{index}]");
                let uuid = parse_uuid(expect_str(item, &item_path)?, &item_path)?;
                set.add(factory.entities().get_or_register(uuid))
                    .map_err(JsonError::Core)?;
            }
            Box::new(set)
        }
        HierarchyKind::EntityDir => {
            let entries = get_object(contents, &contents_path)?;
            let mut dir = DirectoryHierarchy::new(name);
            for (key, value) in entries {
                let entry_path = format!("{contents_path}.{key}");
                let uuid = parse_uuid(expect_str(value, &entry_path)?, &entry_path)?;
                dir.put(key.clone(), factory.entities().get_or_register(uuid))
                    .map_err(JsonError::Core)?;
            }
            Box::new(dir)
        }
        HierarchyKind::EntityTree => {
            let root_obj = get_object(contents, &contents_path)?;
            let root_value_str = get_str(root_obj, &contents_path, "value")?;
            let root_uuid = parse_uuid(root_value_str, &format!("{contents_path}.value"))?;
            let root_entity = factory.entities().get_or_register(root_uuid);
            let mut tree = TreeHierarchy::new(name, root_entity);
            decode_tree_children(contents, &contents_path, &[], &mut tree, factory)?;
            Box::new(tree)
        }
        HierarchyKind::AspectMap => {
            let def_handle = factory
                .aspect_def(&name)
                .ok_or_else(|| JsonError::Core(catalog_core::error::CoreError::NoSuchAspectDef { name: name.clone() }))?;
            let entries = get_object(contents, &contents_path)?;
            let mut map = AspectMapHierarchy::new(name, def_handle.clone());
            for (key, aspect_json) in entries {
                let entry_path = format!("{contents_path}.{key}");
                let uuid = parse_uuid(key, &entry_path)?;
                let entity = factory.entities().get_or_register(uuid);
                let aspect = aspect_from_json(aspect_json, &def_handle, factory, &entry_path)?;
                map.put(entity, aspect).map_err(JsonError::Core)?;
            }
            Box::new(map)
        }
    })
}

fn expect_str<'a>(json: &'a Json, path: &str) -> JsonResult<&'a str> {
    json.as_str().ok_or_else(|| JsonError::ShapeMismatch {
        path: path.to_string(),
        expected: "string",
        found: json_kind_name(json),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::schema::{AspectDef, Mutability, PropertyDef};
    use catalog_primitives::PropertyType;

    #[test]
    fn list_round_trips_preserving_order_and_duplicates() {
        let factory = JsonFactory::new();
        let a = Entity::new(Uuid::new_v4());
        let mut list = ListHierarchy::new("steps");
        list.add(a.clone()).unwrap();
        list.add(a.clone()).unwrap();
        let json = hierarchy_to_json(&list, "$").unwrap();
        let decoded = hierarchy_from_json(&json, &factory, "$").unwrap();
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.kind(), HierarchyKind::EntityList);
    }

    #[test]
    fn tree_round_trips_nested_paths() {
        let factory = JsonFactory::new();
        let root = Entity::new(Uuid::new_v4());
        let reports = Entity::new(Uuid::new_v4());
        let mut tree = TreeHierarchy::new("org", root);
        tree.add_at_path(&[], "documents", TreeNode::new(Entity::new(Uuid::new_v4())))
            .unwrap();
        tree.add_at_path(&["documents".to_string()], "reports", TreeNode::new(reports.clone()))
            .unwrap();
        let json = hierarchy_to_json(&tree, "$").unwrap();
        let decoded = hierarchy_from_json(&json, &factory, "$").unwrap();
        let decoded_tree: &TreeHierarchy = downcast(decoded.as_ref(), "$").unwrap();
        let node = decoded_tree
            .node(&["documents".to_string(), "reports".to_string()])
            .unwrap();
        assert_eq!(node.value().global_id(), reports.global_id());
    }

    #[test]
    fn aspect_map_round_trips_property_values() {
        let factory = JsonFactory::new();
        let def = AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("name", PropertyType::String))
            .unwrap();
        let handle = catalog_core::schema::new_aspect_def_handle(def);
        factory.register_aspect_def(handle.clone());

        let mut map = AspectMapHierarchy::new("person", handle.clone());
        let entity = Entity::new(Uuid::new_v4());
        let mut aspect = PropertyMapAspect::new(handle.clone());
        aspect
            .add(Property::new(
                PropertyDef::new("name", PropertyType::String),
                Some(PropertyValue::Scalar(catalog_core::value::Value::String("Ada".into()))),
            ))
            .unwrap();
        map.put(entity.clone(), Box::new(aspect)).unwrap();

        let json = hierarchy_to_json(&map, "$").unwrap();
        let decoded = hierarchy_from_json(&json, &factory, "$").unwrap();
        let decoded_map: &AspectMapHierarchy = downcast(decoded.as_ref(), "$").unwrap();
        let decoded_aspect = decoded_map.get(entity.global_id()).unwrap();
        assert_eq!(decoded_aspect.read_obj("name").unwrap().is_some(), true);
    }
}
