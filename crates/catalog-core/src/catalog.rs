use crate::{
    error::{CoreError, CoreResult},
    hierarchy::{AspectMapHierarchy, Hierarchy, HierarchyKind},
    schema::{new_aspect_def_handle, AspectDef, AspectDefHandle, CatalogDef},
};
use derive_more::Display;
use indexmap::IndexMap;
use uuid::Uuid;

///
/// Species
///
/// A Catalog's role with respect to replication: `Sink` receives data
/// from elsewhere and does not originate it, `Source` originates data for
/// downstream consumers, `Mirror` is a read-only copy of another catalog.
/// `upstream` is informational only — the engine performs no replication;
/// it is not a message bus or a replication system.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Display)]
pub enum Species {
    Sink,
    Source,
    Mirror,
}

///
/// Catalog
///
/// The top-level aggregate: identity, species, an optional
/// upstream pointer, a monotonic version, the definition-time `CatalogDef`,
/// AspectDefs registered after construction ("extensions"), and an ordered
/// map of named `Hierarchy` containers.
///

pub struct Catalog {
    global_id: Uuid,
    species: Species,
    upstream: Option<Uuid>,
    version: u64,
    def: CatalogDef,
    extensions: Vec<AspectDefHandle>,
    hierarchies: IndexMap<String, Box<dyn Hierarchy + Send + Sync>>,
    strict: bool,
}

impl Catalog {
    #[must_use]
    pub fn new(global_id: Uuid, species: Species, def: CatalogDef) -> Self {
        Self {
            global_id,
            species,
            upstream: None,
            version: 0,
            def,
            extensions: Vec::new(),
            hierarchies: IndexMap::new(),
            strict: true,
        }
    }

    #[must_use]
    pub const fn upstream(mut self, upstream: Uuid) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Non-strict catalogs permit hierarchies whose name is not declared in
    /// the `CatalogDef`; strict catalogs reject them.
    #[must_use]
    pub const fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    #[must_use]
    pub const fn global_id(&self) -> Uuid {
        self.global_id
    }

    #[must_use]
    pub const fn species(&self) -> Species {
        self.species
    }

    #[must_use]
    pub const fn upstream_id(&self) -> Option<Uuid> {
        self.upstream
    }

    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    #[must_use]
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    #[must_use]
    pub const fn def(&self) -> &CatalogDef {
        &self.def
    }

    pub fn extensions(&self) -> impl Iterator<Item = &AspectDefHandle> {
        self.extensions.iter()
    }

    /// Advance `version` by one, as a writer commits a new state (invariant
    /// 7: "Catalog.version is monotonic per writer").
    pub fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Register `aspect_def` as an extension and create a default
    /// `ASPECT_MAP` hierarchy of the same name. Returns the shared
    /// handle so the caller can populate it.
    pub fn extend(&mut self, aspect_def: AspectDef) -> CoreResult<AspectDefHandle> {
        let name = aspect_def.name().to_string();
        if self.def.aspect_def(&name).is_some() {
            return Err(CoreError::DuplicateHierarchy { name });
        }
        let handle = new_aspect_def_handle(aspect_def);
        self.extensions.push(handle.clone());
        let map = AspectMapHierarchy::new(name.clone(), handle.clone());
        self.hierarchies.insert(name, Box::new(map));
        Ok(handle)
    }

    /// Register an already-built `AspectDefHandle` as an extension without
    /// creating its default hierarchy (unlike [`Catalog::extend`]). Used by
    /// reconstruction paths (the JSON codec, a future DB loader) that load a
    /// hierarchy's real contents separately and would otherwise collide with
    /// the default hierarchy `extend` inserts under the same name.
    pub fn register_extension_handle(&mut self, handle: AspectDefHandle) {
        self.extensions.push(handle);
    }

    /// Insert `hierarchy` under its own name. *DuplicateHierarchy* if a
    /// hierarchy of that name already exists (invariant 1); if this catalog
    /// is strict, the name must also be declared in the `CatalogDef`.
    pub fn add_hierarchy(
        &mut self,
        name: impl Into<String>,
        hierarchy: Box<dyn Hierarchy + Send + Sync>,
    ) -> CoreResult<()> {
        let name = name.into();
        if self.hierarchies.contains_key(&name) {
            return Err(CoreError::DuplicateHierarchy { name });
        }
        if self.strict && !self.def.declares_hierarchy(&name) {
            return Err(CoreError::NoSuchHierarchy { name });
        }
        self.hierarchies.insert(name, hierarchy);
        Ok(())
    }

    #[must_use]
    pub fn hierarchy(&self, name: &str) -> Option<&(dyn Hierarchy + Send + Sync)> {
        self.hierarchies.get(name).map(AsRef::as_ref)
    }

    pub fn hierarchy_mut(&mut self, name: &str) -> Option<&mut (dyn Hierarchy + Send + Sync)> {
        self.hierarchies.get_mut(name).map(AsMut::as_mut)
    }

    pub fn hierarchy_names(&self) -> impl Iterator<Item = &str> {
        self.hierarchies.keys().map(String::as_str)
    }

    #[must_use]
    pub fn hierarchy_kind(&self, name: &str) -> Option<HierarchyKind> {
        self.hierarchy(name).map(Hierarchy::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Mutability;

    #[test]
    fn extend_registers_def_and_default_aspect_map() {
        let mut catalog = Catalog::new(Uuid::new_v4(), Species::Source, CatalogDef::new());
        catalog
            .extend(AspectDef::new("person", Uuid::new_v4(), Mutability::Mutable))
            .unwrap();
        assert_eq!(
            catalog.hierarchy_kind("person"),
            Some(HierarchyKind::AspectMap)
        );
        assert_eq!(catalog.extensions().count(), 1);
    }

    #[test]
    fn version_is_monotonic() {
        let mut catalog = Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new());
        assert_eq!(catalog.version(), 0);
        assert_eq!(catalog.bump_version(), 1);
        assert_eq!(catalog.bump_version(), 2);
    }

    #[test]
    fn strict_catalog_rejects_undeclared_hierarchy() {
        use crate::hierarchy::ListHierarchy;
        let mut catalog = Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new());
        let err = catalog
            .add_hierarchy("steps", Box::new(ListHierarchy::new("steps")))
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSuchHierarchy { .. }));
    }

    #[test]
    fn non_strict_catalog_allows_undeclared_hierarchy() {
        use crate::hierarchy::ListHierarchy;
        let mut catalog =
            Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new()).strict(false);
        catalog
            .add_hierarchy("steps", Box::new(ListHierarchy::new("steps")))
            .unwrap();
        assert!(catalog.hierarchy("steps").is_some());
    }

    #[test]
    fn duplicate_hierarchy_name_is_rejected() {
        use crate::hierarchy::ListHierarchy;
        let mut catalog =
            Catalog::new(Uuid::new_v4(), Species::Sink, CatalogDef::new()).strict(false);
        catalog
            .add_hierarchy("steps", Box::new(ListHierarchy::new("steps")))
            .unwrap();
        let err = catalog
            .add_hierarchy("steps", Box::new(ListHierarchy::new("steps")))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateHierarchy { .. }));
    }
}
