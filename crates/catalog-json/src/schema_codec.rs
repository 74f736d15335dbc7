use crate::{
    error::{JsonError, JsonResult},
    factory::JsonFactory,
    value_codec::{get_bool, get_field, get_object, get_str, scalar_value_from_json, value_to_json},
};
use catalog_core::schema::{AspectDef, AspectDefHandle, Mutability, PropertyDef};
use catalog_primitives::PropertyType;
use serde_json::{Map, Value as Json};
use uuid::Uuid;

///
/// schema_codec
///
/// JSON encoding of `PropertyDef` and `AspectDef`: a PropertyDef
/// emits `name`, `type`, `hasDefaultValue` (+ `defaultValue` iff true), and
/// its five boolean flags; an AspectDef emits `name`, ordered `properties`,
/// and its four mutability/readable/writable flags. Neither form carries a
/// `uuid` — AspectDef identity on the wire is by name, resolved through the
/// [`JsonFactory`] dictionary on decode: resolving by name gives the
/// AspectDef currently bound in the factory.
///

pub fn property_def_to_json(def: &PropertyDef) -> Json {
    let mut obj = Map::new();
    obj.insert("name".to_string(), Json::from(def.name()));
    obj.insert("type".to_string(), Json::from(def.property_type().code()));
    obj.insert("hasDefaultValue".to_string(), Json::from(def.has_default()));
    if let Some(default) = def.default_value() {
        obj.insert("defaultValue".to_string(), value_to_json(default));
    }
    obj.insert("readable".to_string(), Json::from(def.is_readable()));
    obj.insert("writable".to_string(), Json::from(def.is_writable()));
    obj.insert("nullable".to_string(), Json::from(def.is_nullable()));
    obj.insert("removable".to_string(), Json::from(def.is_removable()));
    obj.insert("multivalued".to_string(), Json::from(def.is_multivalued()));
    Json::Object(obj)
}

pub fn property_def_from_json(json: &Json, factory: &JsonFactory, path: &str) -> JsonResult<PropertyDef> {
    let obj = get_object(json, path)?;
    let name = get_str(obj, path, "name")?.to_string();
    let type_code = get_str(obj, path, "type")?;
    let property_type = PropertyType::from_code(type_code).ok_or_else(|| JsonError::UnknownTypeCode {
        path: format!("{path}.type"),
        code: type_code.to_string(),
    })?;
    let has_default = get_bool(obj, path, "hasDefaultValue")?;

    let mut def = PropertyDef::new(&name, property_type)
        .readable(get_bool(obj, path, "readable")?)
        .writable(get_bool(obj, path, "writable")?)
        .nullable(get_bool(obj, path, "nullable")?)
        .removable(get_bool(obj, path, "removable")?)
        .multivalued(get_bool(obj, path, "multivalued")?);

    if has_default {
        let default_path = format!("{path}.defaultValue");
        let default_json = get_field(obj, path, "defaultValue")?;
        let default = scalar_value_from_json(default_json, property_type, factory.adapter(), &default_path)?;
        def = def.with_default(default);
    }

    Ok(def)
}

pub fn aspect_def_to_json(def: &AspectDef) -> Json {
    let properties: Vec<Json> = def.properties().map(property_def_to_json).collect();
    let mut obj = Map::new();
    obj.insert("name".to_string(), Json::from(def.name()));
    obj.insert("properties".to_string(), Json::Array(properties));
    obj.insert(
        "canAddProperties".to_string(),
        Json::from(def.can_add_properties()),
    );
    obj.insert(
        "canRemoveProperties".to_string(),
        Json::from(def.can_remove_properties()),
    );
    obj.insert("readable".to_string(), Json::from(def.is_readable()));
    obj.insert("writable".to_string(), Json::from(def.is_writable()));
    Json::Object(obj)
}

/// Decode one AspectDef entry, resolving it against `factory`'s dictionary
/// by `name` rather than trusting any embedded identifier. A name already
/// bound in the factory returns the live handle unchanged; a new name
/// mints a fresh `AspectDef` with a freshly generated uuid (the wire form
/// carries none).
pub fn aspect_def_from_json(name: &str, json: &Json, factory: &JsonFactory, path: &str) -> JsonResult<AspectDefHandle> {
    if let Some(existing) = factory.aspect_def(name) {
        return Ok(existing);
    }

    let obj = get_object(json, path)?;
    let can_add = get_bool(obj, path, "canAddProperties")?;
    let can_remove = get_bool(obj, path, "canRemoveProperties")?;
    let mutability = match (can_add, can_remove) {
        (false, false) => Mutability::Immutable,
        (true, true) => Mutability::Mutable,
        (can_add, can_remove) => Mutability::Full { can_add, can_remove },
    };
    let readable = get_bool(obj, path, "readable")?;
    let writable = get_bool(obj, path, "writable")?;
    let properties_path = format!("{path}.properties");
    let properties_json = crate::value_codec::get_array(get_field(obj, path, "properties")?, &properties_path)?;

    let mut def = AspectDef::new(name, Uuid::new_v4(), mutability)
        .readable(readable)
        .writable(writable);
    for (index, property_json) in properties_json.iter().enumerate() {
        let property_path = format!("{properties_path}[{index}]");
        let property_def = property_def_from_json(property_json, factory, &property_path)?;
        def = def.with_property(property_def)?;
    }

    let handle = catalog_core::schema::new_aspect_def_handle(def);
    factory.register_aspect_def(handle.clone());
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::value::Value;

    #[test]
    fn property_def_round_trips_with_default() {
        let def = PropertyDef::new("age", PropertyType::Integer)
            .nullable(false)
            .with_default(Value::Integer(18));
        let factory = JsonFactory::new();
        let json = property_def_to_json(&def);
        let decoded = property_def_from_json(&json, &factory, "$").unwrap();
        assert_eq!(decoded, def);
    }

    #[test]
    fn aspect_def_round_trips_properties_in_order() {
        let def = AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("name", PropertyType::String))
            .unwrap()
            .with_property(PropertyDef::new("age", PropertyType::Integer))
            .unwrap();
        let json = aspect_def_to_json(&def);
        let factory = JsonFactory::new();
        let handle = aspect_def_from_json("person", &json, &factory, "$").unwrap();
        let decoded = handle.read().unwrap();
        let names: Vec<_> = decoded.properties().map(PropertyDef::name).collect();
        assert_eq!(names, vec!["name", "age"]);
    }

    #[test]
    fn repeated_name_resolves_to_the_same_handle() {
        let factory = JsonFactory::new();
        let def = AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable);
        let json = aspect_def_to_json(&def);
        let first = aspect_def_from_json("person", &json, &factory, "$").unwrap();
        let second = aspect_def_from_json("person", &json, &factory, "$").unwrap();
        assert!(std::sync::Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        let factory = JsonFactory::new();
        let json = serde_json::json!({
            "name": "bogus",
            "type": "ZZZ",
            "hasDefaultValue": false,
            "readable": true,
            "writable": true,
            "nullable": true,
            "removable": true,
            "multivalued": false,
        });
        let err = property_def_from_json(&json, &factory, "$").unwrap_err();
        assert!(matches!(err, JsonError::UnknownTypeCode { .. }));
    }
}
