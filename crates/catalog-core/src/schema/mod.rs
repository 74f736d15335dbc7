mod aspect_def;
mod catalog_def;
mod hierarchy_def;
mod property_def;

pub use aspect_def::{AspectDef, Mutability};
pub use catalog_def::CatalogDef;
pub use hierarchy_def::{HierarchyDef, HierarchyKind};
pub use property_def::PropertyDef;

use crate::value::PropertyValue;
use std::sync::{Arc, RwLock};

/// Shared, mutable handle to one `AspectDef`. AspectDefs are a shared
/// dictionary that outlives any single catalog and may be
/// mutated (an add/remove of a property) through any `Aspect` instance that
/// holds the same handle. Mutation itself still goes through `AspectDef::add_property`/
/// `remove_property`, which enforce the def's `Mutability`.
pub type AspectDefHandle = Arc<RwLock<AspectDef>>;

#[must_use]
pub fn new_aspect_def_handle(def: AspectDef) -> AspectDefHandle {
    Arc::new(RwLock::new(def))
}

///
/// Property
///
/// One `(PropertyDef, value)` pair — the unit exposed by a `PropertyMap`
/// aspect. `ObjectMap` aspects store the same values keyed by name
/// without repeating the def per entry.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Property {
    def: PropertyDef,
    value: Option<PropertyValue>,
}

impl Property {
    #[must_use]
    pub const fn new(def: PropertyDef, value: Option<PropertyValue>) -> Self {
        Self { def, value }
    }

    #[must_use]
    pub const fn def(&self) -> &PropertyDef {
        &self.def
    }

    #[must_use]
    pub const fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Option<PropertyValue>) {
        self.value = value;
    }
}
