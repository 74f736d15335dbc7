use catalog_core::{
    entity::EntityRegistry,
    schema::{new_aspect_def_handle, AspectDef, AspectDefHandle},
    value::PropertyValueAdapter,
};
use std::collections::HashMap;
use std::sync::RwLock;

///
/// JsonFactory
///
/// Factory-mediated reconstruction: every Entity UUID
/// decoded from a JSON document passes through one `EntityRegistry`, and
/// every AspectDef name is resolved against one shared dictionary, so two
/// catalogs deserialized through the same factory observe the same Entity
/// and AspectDef instances for shared UUIDs/names. Mirrors the `aspect_defs: RwLock<HashMap<String,
/// AspectDefHandle>>` dictionary `catalog-db`'s `Dao` keeps for the same
/// reason.
///

#[derive(Debug)]
pub struct JsonFactory {
    entities: EntityRegistry,
    aspect_defs: RwLock<HashMap<String, AspectDefHandle>>,
    adapter: PropertyValueAdapter,
}

impl Default for JsonFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl JsonFactory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entities: EntityRegistry::new(),
            aspect_defs: RwLock::new(HashMap::new()),
            adapter: PropertyValueAdapter::new(),
        }
    }

    #[must_use]
    pub const fn with_adapter(adapter: PropertyValueAdapter) -> Self {
        Self {
            entities: EntityRegistry::new(),
            aspect_defs: RwLock::new(HashMap::new()),
            adapter,
        }
    }

    #[must_use]
    pub const fn entities(&self) -> &EntityRegistry {
        &self.entities
    }

    #[must_use]
    pub const fn adapter(&self) -> PropertyValueAdapter {
        self.adapter
    }

    /// The AspectDef handle bound to `name`, if one has already been
    /// registered through this factory (by a prior decode, or by the
    /// caller ahead of time so a decode can share a live definition).
    #[must_use]
    pub fn aspect_def(&self, name: &str) -> Option<AspectDefHandle> {
        self.aspect_defs
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn register_aspect_def(&self, handle: AspectDefHandle) {
        let name = handle
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .name()
            .to_string();
        self.aspect_defs
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(name, handle);
    }

    /// Resolve `name` to its existing handle, or register a freshly built
    /// `AspectDef` under that name. Used while decoding: a name seen for the
    /// first time mints a definition; a name seen again (e.g. the same
    /// AspectDef referenced by two catalogs in one document) reuses the
    /// live handle instead of diverging from it.
    pub fn resolve_or_insert(
        &self,
        name: &str,
        build: impl FnOnce() -> AspectDef,
    ) -> AspectDefHandle {
        if let Some(existing) = self.aspect_def(name) {
            return existing;
        }
        let handle = new_aspect_def_handle(build());
        self.register_aspect_def(handle.clone());
        handle
    }
}
