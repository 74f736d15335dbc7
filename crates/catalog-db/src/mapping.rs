use crate::error::{DbError, DbResult};
use catalog_core::schema::AspectDefHandle;
use indexmap::IndexMap;

///
/// AspectTableMapping
///
/// A registration that routes one AspectDef's persistence to a custom SQL
/// table instead of the generic `property_value` table. `(has_catalog_id,
/// has_entity_id)` select one of the four key-layout patterns. Multivalued
/// PropertyDefs cannot be represented in a mapped table and are rejected at
/// construction.
///

#[derive(Clone, Debug)]
pub struct AspectTableMapping {
    aspect_def: AspectDefHandle,
    table_name: String,
    column_mapping: IndexMap<String, String>,
    has_catalog_id: bool,
    has_entity_id: bool,
}

impl AspectTableMapping {
    pub fn new(
        aspect_def: AspectDefHandle,
        table_name: impl Into<String>,
        column_mapping: IndexMap<String, String>,
        has_catalog_id: bool,
        has_entity_id: bool,
    ) -> DbResult<Self> {
        {
            let def = aspect_def
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            for property_name in column_mapping.keys() {
                let property = def.property(property_name).ok_or_else(|| DbError::MappingRejected {
                    reason: format!(
                        "aspect def '{}' has no property named '{property_name}'",
                        def.name()
                    ),
                })?;
                if property.is_multivalued() {
                    return Err(DbError::MappingRejected {
                        reason: format!(
                            "property '{property_name}' is multivalued and cannot be mapped to a column"
                        ),
                    });
                }
            }
        }
        Ok(Self {
            aspect_def,
            table_name: table_name.into(),
            column_mapping,
            has_catalog_id,
            has_entity_id,
        })
    }

    #[must_use]
    pub fn aspect_def(&self) -> &AspectDefHandle {
        &self.aspect_def
    }

    #[must_use]
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    #[must_use]
    pub fn column_mapping(&self) -> &IndexMap<String, String> {
        &self.column_mapping
    }

    #[must_use]
    pub const fn has_catalog_id(&self) -> bool {
        self.has_catalog_id
    }

    #[must_use]
    pub const fn has_entity_id(&self) -> bool {
        self.has_entity_id
    }

    /// Column name for `property_name`, if this mapping covers it.
    #[must_use]
    pub fn column_for(&self, property_name: &str) -> Option<&str> {
        self.column_mapping.get(property_name).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_core::schema::{new_aspect_def_handle, AspectDef, Mutability, PropertyDef};
    use catalog_primitives::PropertyType;
    use uuid::Uuid;

    #[test]
    fn multivalued_property_cannot_be_mapped() {
        let def = new_aspect_def_handle(
            AspectDef::new("product", Uuid::new_v4(), Mutability::Mutable)
                .with_property(PropertyDef::new("tags", PropertyType::String).multivalued(true))
                .unwrap(),
        );
        let mut columns = IndexMap::new();
        columns.insert("tags".to_string(), "tags_col".to_string());
        let err = AspectTableMapping::new(def, "product_table", columns, true, true).unwrap_err();
        assert!(matches!(err, DbError::MappingRejected { .. }));
    }

    #[test]
    fn unknown_property_is_rejected() {
        let def = new_aspect_def_handle(AspectDef::new(
            "product",
            Uuid::new_v4(),
            Mutability::Mutable,
        ));
        let mut columns = IndexMap::new();
        columns.insert("missing".to_string(), "missing_col".to_string());
        let err = AspectTableMapping::new(def, "product_table", columns, true, true).unwrap_err();
        assert!(matches!(err, DbError::MappingRejected { .. }));
    }
}
