use super::{new_aspect_def_handle, AspectDef, AspectDefHandle, HierarchyDef};
use crate::error::CoreError;
use indexmap::IndexMap;

///
/// CatalogDef
///
/// The definition-time schema portion of a Catalog: an ordered collection
/// of `AspectDef`s plus the set of `HierarchyDef`s known at construction
///. Hierarchies not listed here are permitted only when the owning
/// catalog is non-strict.
///
/// `AspectDef`s are held by shared handle, so an `ASPECT_MAP` hierarchy and its `CatalogDef`
/// entry observe the same definition — a property add/remove performed
/// through one is visible through the other.
///

#[derive(Clone, Debug, Default)]
pub struct CatalogDef {
    aspect_defs: IndexMap<String, AspectDefHandle>,
    hierarchy_defs: IndexMap<String, HierarchyDef>,
}

impl CatalogDef {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_aspect_def(mut self, aspect_def: AspectDef) -> Result<Self, CoreError> {
        self.add_aspect_def(aspect_def)?;
        Ok(self)
    }

    pub fn with_hierarchy_def(mut self, hierarchy_def: HierarchyDef) -> Result<Self, CoreError> {
        self.add_hierarchy_def(hierarchy_def)?;
        Ok(self)
    }

    pub fn add_aspect_def(&mut self, aspect_def: AspectDef) -> Result<AspectDefHandle, CoreError> {
        let name = aspect_def.name().to_string();
        if self.aspect_defs.contains_key(&name) {
            return Err(CoreError::DuplicateHierarchy { name });
        }
        let handle = new_aspect_def_handle(aspect_def);
        self.aspect_defs.insert(name, handle.clone());
        Ok(handle)
    }

    /// Register an already-shared handle (used when the same `AspectDef` is
    /// extended onto a second catalog, or reattached after load).
    pub fn insert_aspect_def_handle(&mut self, handle: AspectDefHandle) -> Result<(), CoreError> {
        let name = handle
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .name()
            .to_string();
        if self.aspect_defs.contains_key(&name) {
            return Err(CoreError::DuplicateHierarchy { name });
        }
        self.aspect_defs.insert(name, handle);
        Ok(())
    }

    pub fn add_hierarchy_def(&mut self, hierarchy_def: HierarchyDef) -> Result<(), CoreError> {
        let name = hierarchy_def.name().to_string();
        if self.hierarchy_defs.contains_key(&name) {
            return Err(CoreError::DuplicateHierarchy { name });
        }
        self.hierarchy_defs.insert(name, hierarchy_def);
        Ok(())
    }

    #[must_use]
    pub fn aspect_def(&self, name: &str) -> Option<AspectDefHandle> {
        self.aspect_defs.get(name).cloned()
    }

    pub fn aspect_def_handles(&self) -> impl Iterator<Item = &AspectDefHandle> {
        self.aspect_defs.values()
    }

    #[must_use]
    pub fn hierarchy_def(&self, name: &str) -> Option<&HierarchyDef> {
        self.hierarchy_defs.get(name)
    }

    pub fn hierarchy_defs(&self) -> impl Iterator<Item = &HierarchyDef> {
        self.hierarchy_defs.values()
    }

    #[must_use]
    pub fn declares_hierarchy(&self, name: &str) -> bool {
        self.hierarchy_defs.contains_key(name)
    }
}
