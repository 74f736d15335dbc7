use super::{require_modifiable, Hierarchy, HierarchyKind};
use crate::{entity::Entity, error::CoreResult};
use indexmap::IndexMap;
use uuid::Uuid;

///
/// SetHierarchy
///
/// `ENTITY_SET`: an insertion-ordered set keyed by `Entity` UUID.
/// Adding a UUID already present is a no-op (the entry keeps its original
/// position).
///

#[derive(Clone, Debug)]
pub struct SetHierarchy {
    name: String,
    modifiable: bool,
    entities: IndexMap<Uuid, Entity>,
}

impl SetHierarchy {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiable: true,
            entities: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    pub fn add(&mut self, entity: Entity) -> CoreResult<()> {
        require_modifiable(&self.name, self.modifiable)?;
        self.entities.entry(entity.global_id()).or_insert(entity);
        Ok(())
    }

    pub fn remove(&mut self, global_id: Uuid) -> CoreResult<bool> {
        require_modifiable(&self.name, self.modifiable)?;
        Ok(self.entities.shift_remove(&global_id).is_some())
    }

    #[must_use]
    pub fn contains(&self, global_id: Uuid) -> bool {
        self.entities.contains_key(&global_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }
}

impl Hierarchy for SetHierarchy {
    fn kind(&self) -> HierarchyKind {
        HierarchyKind::EntitySet
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn is_modifiable(&self) -> bool {
        self.modifiable
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readding_same_uuid_keeps_original_position() {
        let mut set = SetHierarchy::new("tags");
        let a = Entity::new(Uuid::new_v4());
        let b = Entity::new(Uuid::new_v4());
        set.add(a.clone()).unwrap();
        set.add(b.clone()).unwrap();
        set.add(a.clone()).unwrap();
        let order: Vec<_> = set.iter().map(Entity::global_id).collect();
        assert_eq!(order, vec![a.global_id(), b.global_id()]);
    }

    #[test]
    fn contains_reflects_membership() {
        let mut set = SetHierarchy::new("tags");
        let a = Entity::new(Uuid::new_v4());
        assert!(!set.contains(a.global_id()));
        set.add(a.clone()).unwrap();
        assert!(set.contains(a.global_id()));
        set.remove(a.global_id()).unwrap();
        assert!(!set.contains(a.global_id()));
    }
}
