use crate::{
    error::{JsonError, JsonResult},
    factory::JsonFactory,
    hierarchy_codec::{hierarchy_from_json, hierarchy_to_json},
    schema_codec::{aspect_def_from_json, aspect_def_to_json},
    value_codec::{get_bool, get_object, get_str},
};
use catalog_core::{
    catalog::{Catalog, Species},
    schema::{CatalogDef, HierarchyDef, HierarchyKind},
};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

///
/// catalog_codec
///
/// Top-level `Catalog` <-> JSON: `globalId`, `uri` (always `null` —
/// the engine does not model a catalog URI beyond the field's presence on
/// the wire), `species`, `strict`, an optional `upstream`, the definition
/// (`def.aspectDefs`, `def.hierarchyDefs`), the extension-only `aspectDefs`
/// (those not already in `def`), and `hierarchies`. Both `pretty` and
/// `compact` forms are the same `serde_json::Value` serialized with
/// `to_string_pretty` or `to_string`; this module only builds the value.
///

const fn species_code(species: Species) -> &'static str {
    match species {
        Species::Sink => "sink",
        Species::Source => "source",
        Species::Mirror => "mirror",
    }
}

fn species_from_code(code: &str) -> Option<Species> {
    match code {
        "sink" => Some(Species::Sink),
        "source" => Some(Species::Source),
        "mirror" => Some(Species::Mirror),
        _ => None,
    }
}

pub fn catalog_to_json(catalog: &Catalog) -> JsonResult<Json> {
    let def = catalog.def();

    let mut def_aspect_defs = Map::new();
    for handle in def.aspect_def_handles() {
        let guard = handle.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        def_aspect_defs.insert(guard.name().to_string(), aspect_def_to_json(&guard));
    }

    let mut hierarchy_defs = Map::new();
    for hierarchy_def in def.hierarchy_defs() {
        let mut hd = Map::new();
        hd.insert("type".to_string(), Json::from(hierarchy_def.kind().type_code()));
        hd.insert("modifiable".to_string(), Json::from(hierarchy_def.is_modifiable()));
        hierarchy_defs.insert(hierarchy_def.name().to_string(), Json::Object(hd));
    }

    let mut extension_defs = Map::new();
    for handle in catalog.extensions() {
        let guard = handle.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        if def.aspect_def(guard.name()).is_none() {
            extension_defs.insert(guard.name().to_string(), aspect_def_to_json(&guard));
        }
    }

    let mut hierarchies = Map::new();
    for name in catalog.hierarchy_names() {
        let hierarchy = catalog
            .hierarchy(name)
            .expect("name was just yielded by this catalog's own hierarchy_names");
        hierarchies.insert(name.to_string(), hierarchy_to_json(hierarchy, &format!("hierarchies.{name}"))?);
    }

    let mut obj = Map::new();
    obj.insert("globalId".to_string(), Json::from(catalog.global_id().to_string()));
    obj.insert("uri".to_string(), Json::Null);
    obj.insert("species".to_string(), Json::from(species_code(catalog.species())));
    obj.insert("strict".to_string(), Json::from(catalog.is_strict()));
    if let Some(upstream) = catalog.upstream_id() {
        obj.insert("upstream".to_string(), Json::from(upstream.to_string()));
    }
    let mut def_obj = Map::new();
    def_obj.insert("aspectDefs".to_string(), Json::Object(def_aspect_defs));
    def_obj.insert("hierarchyDefs".to_string(), Json::Object(hierarchy_defs));
    obj.insert("def".to_string(), Json::Object(def_obj));
    obj.insert("aspectDefs".to_string(), Json::Object(extension_defs));
    obj.insert("hierarchies".to_string(), Json::Object(hierarchies));

    Ok(Json::Object(obj))
}

pub fn catalog_from_json(json: &Json, factory: &JsonFactory) -> JsonResult<Catalog> {
    let path = "$";
    let obj = get_object(json, path)?;

    let global_id_str = get_str(obj, path, "globalId")?;
    let global_id = Uuid::parse_str(global_id_str).map_err(|_| JsonError::ShapeMismatch {
        path: format!("{path}.globalId"),
        expected: "UUID string",
        found: "malformed string",
    })?;
    let species_str = get_str(obj, path, "species")?;
    let species = species_from_code(species_str).ok_or_else(|| JsonError::ShapeMismatch {
        path: format!("{path}.species"),
        expected: "one of sink, source, mirror",
        found: "unrecognized species string",
    })?;
    let strict = get_bool(obj, path, "strict")?;
    let upstream = match obj.get("upstream") {
        Some(Json::String(s)) => Some(Uuid::parse_str(s).map_err(|_| JsonError::ShapeMismatch {
            path: format!("{path}.upstream"),
            expected: "UUID string",
            found: "malformed string",
        })?),
        Some(Json::Null) | None => None,
        Some(other) => {
            return Err(JsonError::ShapeMismatch {
                path: format!("{path}.upstream"),
                expected: "UUID string or null",
                found: crate::value_codec::json_kind_name(other),
            })
        }
    };

    let def_path = format!("{path}.def");
    let def_json = get_object(json.get("def").unwrap_or(&Json::Null), &def_path)?;

    let mut catalog_def = CatalogDef::new();
    let def_aspect_defs_path = format!("{def_path}.aspectDefs");
    let def_aspect_defs = get_object(
        def_json.get("aspectDefs").unwrap_or(&Json::Null),
        &def_aspect_defs_path,
    )?;
    for (name, aspect_def_json) in def_aspect_defs {
        let entry_path = format!("{def_aspect_defs_path}.{name}");
        let handle = aspect_def_from_json(name, aspect_def_json, factory, &entry_path)?;
        catalog_def.insert_aspect_def_handle(handle).map_err(JsonError::Core)?;
    }

    let hierarchy_defs_path = format!("{def_path}.hierarchyDefs");
    let hierarchy_defs = get_object(
        def_json.get("hierarchyDefs").unwrap_or(&Json::Null),
        &hierarchy_defs_path,
    )?;
    for (name, hierarchy_def_json) in hierarchy_defs {
        let entry_path = format!("{hierarchy_defs_path}.{name}");
        let hd_obj = get_object(hierarchy_def_json, &entry_path)?;
        let type_code = get_str(hd_obj, &entry_path, "type")?;
        let kind = HierarchyKind::from_type_code(type_code).ok_or_else(|| JsonError::UnknownTypeCode {
            path: format!("{entry_path}.type"),
            code: type_code.to_string(),
        })?;
        let modifiable = get_bool(hd_obj, &entry_path, "modifiable")?;
        let hierarchy_def = HierarchyDef::new(name.clone(), kind).modifiable(modifiable);
        catalog_def.add_hierarchy_def(hierarchy_def).map_err(JsonError::Core)?;
    }

    let mut catalog = Catalog::new(global_id, species, catalog_def).strict(strict);
    if let Some(upstream) = upstream {
        catalog = catalog.upstream(upstream);
    }

    let extensions_path = format!("{path}.aspectDefs");
    let extensions_json = get_object(json.get("aspectDefs").unwrap_or(&Json::Null), &extensions_path)?;
    for (name, aspect_def_json) in extensions_json {
        let entry_path = format!("{extensions_path}.{name}");
        let handle = aspect_def_from_json(name, aspect_def_json, factory, &entry_path)?;
        catalog.register_extension_handle(handle);
    }

    let hierarchies_path = format!("{path}.hierarchies");
    let hierarchies_json = get_object(json.get("hierarchies").unwrap_or(&Json::Null), &hierarchies_path)?;
    for (name, hierarchy_json) in hierarchies_json {
        let entry_path = format!("{hierarchies_path}.{name}");
        let hierarchy = hierarchy_from_json(hierarchy_json, factory, &entry_path)?;
        catalog.add_hierarchy(name.clone(), hierarchy).map_err(JsonError::Core)?;
    }

    Ok(catalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::{
        hierarchy::ListHierarchy,
        schema::{AspectDef, Mutability, PropertyDef},
    };
    use catalog_primitives::PropertyType;

    #[test]
    fn empty_catalog_round_trips() {
        let global_id = Uuid::new_v4();
        let catalog = Catalog::new(global_id, Species::Sink, CatalogDef::new());
        let json = catalog_to_json(&catalog).unwrap();
        assert_eq!(json["hierarchies"], serde_json::json!({}));
        assert_eq!(json["aspectDefs"], serde_json::json!({}));

        let factory = JsonFactory::new();
        let decoded = catalog_from_json(&json, &factory).unwrap();
        assert_eq!(decoded.global_id(), global_id);
        assert_eq!(decoded.species(), Species::Sink);
    }

    #[test]
    fn extension_aspect_def_round_trips_via_top_level_aspect_defs() {
        let mut catalog = Catalog::new(Uuid::new_v4(), Species::Source, CatalogDef::new()).strict(false);
        catalog
            .extend(
                AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable)
                    .with_property(PropertyDef::new("name", PropertyType::String))
                    .unwrap(),
            )
            .unwrap();
        let json = catalog_to_json(&catalog).unwrap();
        assert!(json["aspectDefs"]["person"].is_object());

        let factory = JsonFactory::new();
        let decoded = catalog_from_json(&json, &factory).unwrap();
        assert_eq!(decoded.extensions().count(), 1);
        assert!(decoded.hierarchy("person").is_some());
    }

    #[test]
    fn non_strict_hierarchy_round_trips() {
        let mut catalog = Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new()).strict(false);
        catalog
            .add_hierarchy("steps", Box::new(ListHierarchy::new("steps")))
            .unwrap();
        let json = catalog_to_json(&catalog).unwrap();

        let factory = JsonFactory::new();
        let decoded = catalog_from_json(&json, &factory).unwrap();
        assert_eq!(decoded.hierarchy_kind("steps"), Some(HierarchyKind::EntityList));
    }
}
