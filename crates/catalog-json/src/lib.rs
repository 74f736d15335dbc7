//! Canonical JSON wire codec for the catalog engine.
//!
//! Produces and consumes one canonical form per `Catalog`, in either
//! `pretty` (two-space indent) or `compact` (no whitespace) flavor — both
//! parse back to byte-identical in-memory graphs. Deserialization is
//! factory-mediated: see [`JsonFactory`].

pub mod catalog_codec;
pub mod error;
pub mod factory;
pub mod hierarchy_codec;
pub mod schema_codec;
pub mod value_codec;

pub use catalog_codec::{catalog_from_json, catalog_to_json};
pub use error::{JsonError, JsonResult};
pub use factory::JsonFactory;

use catalog_core::catalog::Catalog;

/// Serialize `catalog` to its canonical pretty-printed JSON string
/// (two-space indent).
pub fn to_string_pretty(catalog: &Catalog) -> JsonResult<String> {
    let value = catalog_to_json(catalog)?;
    serde_json::to_string_pretty(&value).map_err(JsonError::Malformed)
}

/// Serialize `catalog` to its canonical compact JSON string (no
/// insignificant whitespace).
pub fn to_string_compact(catalog: &Catalog) -> JsonResult<String> {
    let value = catalog_to_json(catalog)?;
    serde_json::to_string(&value).map_err(JsonError::Malformed)
}

/// Parse a JSON document (pretty or compact — both are accepted, since the
/// codec is a bijection modulo insignificant whitespace) into a
/// `Catalog`, resolving Entities and AspectDefs through `factory`.
pub fn from_str(json: &str, factory: &JsonFactory) -> JsonResult<Catalog> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    catalog_from_json(&value, factory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::catalog::Species;
    use catalog_core::schema::CatalogDef;
    use uuid::Uuid;

    #[test]
    fn pretty_and_compact_forms_parse_back_to_the_same_catalog() {
        let global_id = Uuid::new_v4();
        let catalog = Catalog::new(global_id, Species::Mirror, CatalogDef::new());

        let pretty = to_string_pretty(&catalog).unwrap();
        let compact = to_string_compact(&catalog).unwrap();
        assert_ne!(pretty, compact);
        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));

        let from_pretty = from_str(&pretty, &JsonFactory::new()).unwrap();
        let from_compact = from_str(&compact, &JsonFactory::new()).unwrap();
        assert_eq!(from_pretty.global_id(), global_id);
        assert_eq!(from_compact.global_id(), global_id);
    }
}
