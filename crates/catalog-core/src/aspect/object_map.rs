use super::{check_write_flags, Aspect};
use crate::{
    error::{CoreError, CoreResult},
    schema::{AspectDefHandle, Property},
    value::PropertyValue,
};
use indexmap::IndexMap;

///
/// ObjectMapAspect
///
/// An ordered `name -> value` map that omits the `PropertyDef` per entry —
/// the def is looked up through the shared `AspectDef` handle
/// instead of being duplicated into every value slot. Preferred for
/// memory-lean aspects with many instances sharing one definition.
///

#[derive(Clone, Debug)]
pub struct ObjectMapAspect {
    def: AspectDefHandle,
    entries: IndexMap<String, Option<PropertyValue>>,
}

impl ObjectMapAspect {
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

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Aspect for ObjectMapAspect {
    fn read_obj(&self, name: &str) -> CoreResult<Option<&PropertyValue>> {
        self.entries
            .get(name)
            .map(Option::as_ref)
            .ok_or_else(|| CoreError::NoSuchProperty {
                name: name.to_string(),
            })
    }

    fn write(&mut self, name: &str, value: Option<PropertyValue>) -> CoreResult<()> {
        if !self.entries.contains_key(name) {
            return Err(CoreError::NoSuchProperty {
                name: name.to_string(),
            });
        }
        {
            let def = self
                .def
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let property_def =
                def.property(name)
                    .ok_or_else(|| CoreError::NoSuchProperty {
                        name: name.to_string(),
                    })?;
            check_write_flags(property_def, &value)?;
        }
        self.entries.insert(name.to_string(), value);
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
        let (_, value) = (property.def().clone(), property.value().cloned());
        self.entries.insert(name, value);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> CoreResult<Property> {
        let property_def = {
            let mut def = self
                .def
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if !def.can_remove_properties() {
                return Err(CoreError::NotRemovable {
                    name: def.name().to_string(),
                });
            }
            def.remove_property(name)?
        };
        let value = self
            .entries
            .shift_remove(name)
            .ok_or_else(|| CoreError::NoSuchProperty {
                name: name.to_string(),
            })?;
        Ok(Property::new(property_def, value))
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
    use crate::value::Value;
    use catalog_primitives::PropertyType;
    use uuid::Uuid;

    fn handle(mutability: Mutability) -> AspectDefHandle {
        new_aspect_def_handle(AspectDef::new("person", Uuid::new_v4(), mutability))
    }

    #[test]
    fn add_then_read_round_trips() {
        let mut aspect = ObjectMapAspect::new(handle(Mutability::Mutable));
        aspect
            .add(Property::new(
                PropertyDef::new("name", PropertyType::String),
                Some(PropertyValue::Scalar(Value::String("Ada".into()))),
            ))
            .unwrap();
        assert!(aspect.contains("name"));
        assert!(aspect.read_obj("name").unwrap().is_some());
    }

    #[test]
    fn remove_reconstructs_the_property_from_the_shared_def() {
        let mut aspect = ObjectMapAspect::new(handle(Mutability::Mutable));
        aspect
            .add(Property::new(
                PropertyDef::new("name", PropertyType::String),
                Some(PropertyValue::Scalar(Value::String("Ada".into()))),
            ))
            .unwrap();
        let removed = aspect.remove("name").unwrap();
        assert_eq!(removed.def().name(), "name");
        assert!(!aspect.contains("name"));
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut aspect = ObjectMapAspect::new(handle(Mutability::Mutable));
        aspect
            .add(Property::new(PropertyDef::new("name", PropertyType::String), None))
            .unwrap();
        let err = aspect
            .add(Property::new(PropertyDef::new("name", PropertyType::Integer), None))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateProperty { .. }));
    }
}
