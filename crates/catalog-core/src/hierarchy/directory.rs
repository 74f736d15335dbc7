use super::{require_modifiable, Hierarchy, HierarchyKind};
use crate::{entity::Entity, error::CoreResult};
use indexmap::IndexMap;
use uuid::Uuid;

///
/// DirectoryHierarchy
///
/// `ENTITY_DIR`: an insertion-ordered `String -> Entity` map.
/// `remove_by_entity` removes every key currently pointing at the given
/// UUID, not just the first.
///

#[derive(Clone, Debug)]
pub struct DirectoryHierarchy {
    name: String,
    modifiable: bool,
    entries: IndexMap<String, Entity>,
}

impl DirectoryHierarchy {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiable: true,
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    pub fn put(&mut self, key: impl Into<String>, entity: Entity) -> CoreResult<()> {
        require_modifiable(&self.name, self.modifiable)?;
        self.entries.insert(key.into(), entity);
        Ok(())
    }

    pub fn remove_by_key(&mut self, key: &str) -> CoreResult<Option<Entity>> {
        require_modifiable(&self.name, self.modifiable)?;
        Ok(self.entries.shift_remove(key))
    }

    /// Remove every key currently pointing at `global_id`; returns how many
    /// entries were dropped.
    pub fn remove_by_entity(&mut self, global_id: Uuid) -> CoreResult<usize> {
        require_modifiable(&self.name, self.modifiable)?;
        let before = self.entries.len();
        self.entries.retain(|_, e| e.global_id() != global_id);
        Ok(before - self.entries.len())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Entity> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl Hierarchy for DirectoryHierarchy {
    fn kind(&self) -> HierarchyKind {
        HierarchyKind::EntityDir
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.entries.len()
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
    fn remove_by_entity_drops_all_aliases() {
        let mut dir = DirectoryHierarchy::new("names");
        let a = Entity::new(Uuid::new_v4());
        dir.put("primary", a.clone()).unwrap();
        dir.put("alias", a.clone()).unwrap();
        let removed = dir.remove_by_entity(a.global_id()).unwrap();
        assert_eq!(removed, 2);
        assert!(dir.get("primary").is_none());
        assert!(dir.get("alias").is_none());
    }

    #[test]
    fn keys_preserve_insertion_order() {
        let mut dir = DirectoryHierarchy::new("names");
        dir.put("b", Entity::new(Uuid::new_v4())).unwrap();
        dir.put("a", Entity::new(Uuid::new_v4())).unwrap();
        let keys: Vec<_> = dir.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
    }
}
