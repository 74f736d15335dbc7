use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use uuid::Uuid;

///
/// Entity
///
/// An identity-bearing handle: a single 128-bit UUID, nothing else.
/// Entities do not own attributes — Aspects reference them by UUID.
/// Two Entities are equal iff their UUIDs are equal.
///

#[derive(Clone, Debug)]
pub struct Entity {
    global_id: Uuid,
}

impl Entity {
    #[must_use]
    pub const fn new(global_id: Uuid) -> Self {
        Self { global_id }
    }

    #[must_use]
    pub const fn global_id(&self) -> Uuid {
        self.global_id
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.global_id == other.global_id
    }
}
impl Eq for Entity {}

impl std::hash::Hash for Entity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.global_id.hash(state);
    }
}

///
/// EntityRegistry
///
/// Process/factory-lifetime mapping UUID -> Entity. Ensures a given UUID has
/// at most one in-memory `Entity` instance per factory (interning). Lookups
/// are read-mostly but insert-if-absent must be serialized, so mutation is
/// behind an internal mutex.
///

#[derive(Clone, Debug, Default)]
pub struct EntityRegistry {
    entities: Arc<Mutex<HashMap<Uuid, Entity>>>,
}

impl EntityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the interned `Entity` for `global_id`, allocating and
    /// registering a fresh one if this is the first time it is seen.
    pub fn get_or_register(&self, global_id: Uuid) -> Entity {
        let mut entities = self.entities.lock().expect("entity registry mutex poisoned");
        entities
            .entry(global_id)
            .or_insert_with(|| Entity::new(global_id))
            .clone()
    }

    /// Insert `entity`, returning any prior occupant at the same UUID.
    pub fn register(&self, entity: Entity) -> Option<Entity> {
        let mut entities = self.entities.lock().expect("entity registry mutex poisoned");
        entities.insert(entity.global_id(), entity)
    }

    #[must_use]
    pub fn contains(&self, global_id: Uuid) -> bool {
        let entities = self.entities.lock().expect("entity registry mutex poisoned");
        entities.contains_key(&global_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let entities = self.entities.lock().expect("entity registry mutex poisoned");
        entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::EntityRegistry;
    use uuid::Uuid;

    #[test]
    fn interning_returns_same_entity_for_same_uuid() {
        let registry = EntityRegistry::new();
        let id = Uuid::new_v4();
        let a = registry.get_or_register(id);
        let b = registry.get_or_register(id);
        assert_eq!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn distinct_uuids_are_distinct_entities() {
        let registry = EntityRegistry::new();
        let a = registry.get_or_register(Uuid::new_v4());
        let b = registry.get_or_register(Uuid::new_v4());
        assert_ne!(a, b);
    }
}
