use super::PropertyDef;
use crate::error::CoreError;
use indexmap::IndexMap;
use uuid::Uuid;

///
/// Mutability
///
/// Chooses one of the three `AspectDef` variants:
/// `Immutable` allows neither add nor remove, `Mutable` allows both, `Full`
/// allows an independent combination of the two flags.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mutability {
    Immutable,
    Mutable,
    Full { can_add: bool, can_remove: bool },
}

impl Mutability {
    #[must_use]
    pub const fn can_add(self) -> bool {
        match self {
            Self::Immutable => false,
            Self::Mutable => true,
            Self::Full { can_add, .. } => can_add,
        }
    }

    #[must_use]
    pub const fn can_remove(self) -> bool {
        match self {
            Self::Immutable => false,
            Self::Mutable => true,
            Self::Full { can_remove, .. } => can_remove,
        }
    }
}

///
/// AspectDef
///
/// A named, versioned schema of typed properties. The `name` is
/// the primary key across catalogs; the `uuid` identifies a specific
/// definition version. Property insertion order is semantically meaningful
/// — it is the canonical column order for mapped-table persistence.
///

#[derive(Clone, Debug)]
pub struct AspectDef {
    name: String,
    uuid: Uuid,
    properties: IndexMap<String, PropertyDef>,
    mutability: Mutability,
    readable: bool,
    writable: bool,
}

impl AspectDef {
    #[must_use]
    pub fn new(name: impl Into<String>, uuid: Uuid, mutability: Mutability) -> Self {
        Self {
            name: name.into(),
            uuid,
            properties: IndexMap::new(),
            mutability,
            readable: true,
            writable: true,
        }
    }

    #[must_use]
    pub const fn readable(mut self, readable: bool) -> Self {
        self.readable = readable;
        self
    }

    #[must_use]
    pub const fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    /// Append a `PropertyDef` at construction time, bypassing the
    /// `can_add_properties` check — used while building the definition
    /// before it is considered "live". Duplicate names are rejected
    /// unconditionally (invariant 2).
    pub fn with_property(mut self, property: PropertyDef) -> Result<Self, CoreError> {
        self.insert_property(property)?;
        Ok(self)
    }

    fn insert_property(&mut self, property: PropertyDef) -> Result<(), CoreError> {
        if self.properties.contains_key(property.name()) {
            return Err(CoreError::DuplicateProperty {
                aspect_def: self.name.clone(),
                name: property.name().to_string(),
            });
        }
        self.properties.insert(property.name().to_string(), property);
        Ok(())
    }

    /// Add a property to a *live* aspect def, honoring `can_add_properties`.
    pub fn add_property(&mut self, property: PropertyDef) -> Result<(), CoreError> {
        if !self.mutability.can_add() {
            return Err(CoreError::NotAddable {
                name: self.name.clone(),
            });
        }
        self.insert_property(property)
    }

    /// Remove a property from a *live* aspect def, honoring
    /// `can_remove_properties`.
    pub fn remove_property(&mut self, name: &str) -> Result<PropertyDef, CoreError> {
        if !self.mutability.can_remove() {
            return Err(CoreError::NotRemovable {
                name: self.name.clone(),
            });
        }
        self.properties
            .shift_remove(name)
            .ok_or_else(|| CoreError::NoSuchProperty {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    #[must_use]
    pub const fn mutability(&self) -> Mutability {
        self.mutability
    }

    #[must_use]
    pub const fn can_add_properties(&self) -> bool {
        self.mutability.can_add()
    }

    #[must_use]
    pub const fn can_remove_properties(&self) -> bool {
        self.mutability.can_remove()
    }

    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.readable
    }

    #[must_use]
    pub const fn is_writable(&self) -> bool {
        self.writable
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.get(name)
    }

    /// Iterate properties in insertion order (invariant 2).
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
        self.properties.values()
    }

    #[must_use]
    pub fn property_count(&self) -> usize {
        self.properties.len()
    }
}

impl PartialEq for AspectDef {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}
impl Eq for AspectDef {}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog_primitives::PropertyType;

    #[test]
    fn immutable_aspect_def_refuses_add_and_remove() {
        let def = AspectDef::new("person", Uuid::new_v4(), Mutability::Immutable)
            .with_property(PropertyDef::new("name", PropertyType::String))
            .unwrap();
        let mut def = def;
        let err = def
            .add_property(PropertyDef::new("age", PropertyType::Integer))
            .unwrap_err();
        assert!(matches!(err, CoreError::NotAddable { .. }));
    }

    #[test]
    fn duplicate_property_name_is_rejected() {
        let result = AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("name", PropertyType::String))
            .unwrap()
            .with_property(PropertyDef::new("name", PropertyType::Integer));
        assert!(matches!(
            result.unwrap_err(),
            CoreError::DuplicateProperty { .. }
        ));
    }

    #[test]
    fn properties_iterate_in_insertion_order() {
        let def = AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable)
            .with_property(PropertyDef::new("name", PropertyType::String))
            .unwrap()
            .with_property(PropertyDef::new("age", PropertyType::Integer))
            .unwrap();
        let names: Vec<_> = def.properties().map(PropertyDef::name).collect();
        assert_eq!(names, vec!["name", "age"]);
    }
}
