use super::{check_write_flags, Aspect};
use crate::{
    error::{CoreError, CoreResult},
    schema::{AspectDefHandle, Property},
    value::PropertyValue,
};
use indexmap::IndexMap;

///
/// PropertyMapAspect
///
/// An ordered `name -> Property` map, where each `Property` carries both its
/// `PropertyDef` and current value. Chosen when callers need the def
/// alongside the value without a second lookup — the more common of the two
/// representations.
///

#[derive(Clone, Debug)]
pub struct PropertyMapAspect {
    def: AspectDefHandle,
    entries: IndexMap<String, Property>,
}

impl PropertyMapAspect {
    #[must_use]
    pub fn new(def: AspectDefHandle) -> Self {
        Self {
            def,
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn aspect_def(&self) -> &AspectDefHandle {
        &self.def
    }

    /// Iterate entries as `(PropertyDef, value)` pairs in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &Property> {
        self.entries.values()
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.entries.get(name)
    }
}

impl Aspect for PropertyMapAspect {
    fn read_obj(&self, name: &str) -> CoreResult<Option<&PropertyValue>> {
        self.entries
            .get(name)
            .map(Property::value)
            .ok_or_else(|| CoreError::NoSuchProperty {
                name: name.to_string(),
            })
    }

    fn write(&mut self, name: &str, value: Option<PropertyValue>) -> CoreResult<()> {
        let entry = self
            .entries
            .get_mut(name)
            .ok_or_else(|| CoreError::NoSuchProperty {
                name: name.to_string(),
            })?;
        check_write_flags(entry.def(), &value)?;
        entry.set_value(value);
        Ok(())
    }

    fn add(&mut self, property: Property) -> CoreResult<()> {
        let name = property.def().name().to_string();
        if self.entries.contains_key(&name) {
            return Err(CoreError::DuplicateProperty {
                aspect_def: self
                    .def
                    .read()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .name()
                    .to_string(),
                name,
            });
        }
        {
            let mut def = self
                .def
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if def.property(&name).is_none() {
                def.add_property(property.def().clone())?;
            }
        }
        self.entries.insert(name, property);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> CoreResult<Property> {
        {
            let def = self
                .def
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if !def.can_remove_properties() {
                return Err(CoreError::NotRemovable {
                    name: def.name().to_string(),
                });
            }
        }
        self.entries
            .shift_remove(name)
            .ok_or_else(|| CoreError::NoSuchProperty {
                name: name.to_string(),
            })
    }

    fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{new_aspect_def_handle, AspectDef, Mutability, PropertyDef};
    use catalog_primitives::PropertyType;
    use uuid::Uuid;

    fn handle(mutability: Mutability) -> AspectDefHandle {
        new_aspect_def_handle(AspectDef::new("person", Uuid::new_v4(), mutability))
    }

    #[test]
    fn add_then_read_round_trips() {
        let mut aspect = PropertyMapAspect::new(handle(Mutability::Mutable));
        let def = PropertyDef::new("name", PropertyType::String);
        aspect
            .add(Property::new(
                def,
                Some(PropertyValue::Scalar(crate::value::Value::String(
                    "Ada".into(),
                ))),
            ))
            .unwrap();
        assert!(aspect.contains("name"));
        let value = aspect.read_obj("name").unwrap();
        assert!(value.is_some());
    }

    #[test]
    fn add_is_rejected_when_def_is_immutable() {
        let mut aspect = PropertyMapAspect::new(handle(Mutability::Immutable));
        let def = PropertyDef::new("name", PropertyType::String);
        let err = aspect.add(Property::new(def, None)).unwrap_err();
        assert!(matches!(err, CoreError::NotAddable { .. }));
    }

    #[test]
    fn remove_is_rejected_when_def_disallows_it() {
        let handle = handle(Mutability::Full {
            can_add: true,
            can_remove: false,
        });
        let mut aspect = PropertyMapAspect::new(handle);
        aspect
            .add(Property::new(
                PropertyDef::new("name", PropertyType::String),
                None,
            ))
            .unwrap();
        let err = aspect.remove("name").unwrap_err();
        assert!(matches!(err, CoreError::NotRemovable { .. }));
    }

    #[test]
    fn write_rejects_null_when_not_nullable() {
        let mut aspect = PropertyMapAspect::new(handle(Mutability::Mutable));
        let def = PropertyDef::new("name", PropertyType::String).nullable(false);
        aspect
            .add(Property::new(
                def,
                Some(PropertyValue::Scalar(crate::value::Value::String(
                    "Ada".into(),
                ))),
            ))
            .unwrap();
        let err = aspect.write("name", None).unwrap_err();
        assert!(matches!(err, CoreError::NotNullable { .. }));
    }

    #[test]
    fn entries_preserve_insertion_order() {
        let mut aspect = PropertyMapAspect::new(handle(Mutability::Mutable));
        aspect
            .add(Property::new(
                PropertyDef::new("name", PropertyType::String),
                None,
            ))
            .unwrap();
        aspect
            .add(Property::new(
                PropertyDef::new("age", PropertyType::Integer),
                None,
            ))
            .unwrap();
        let names: Vec<_> = aspect.entries().map(|p| p.def().name().to_string()).collect();
        assert_eq!(names, vec!["name", "age"]);
    }
}
