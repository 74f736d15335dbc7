use super::{require_modifiable, Hierarchy, HierarchyKind};
use crate::{entity::Entity, error::CoreResult};

///
/// ListHierarchy
///
/// `ENTITY_LIST`: an ordered sequence of `Entity`, duplicates
/// permitted. `remove` drops the first matching occurrence only.
///

#[derive(Clone, Debug)]
pub struct ListHierarchy {
    name: String,
    modifiable: bool,
    entities: Vec<Entity>,
}

impl ListHierarchy {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiable: true,
            entities: Vec::new(),
        }
    }

    #[must_use]
    pub const fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    pub fn add(&mut self, entity: Entity) -> CoreResult<()> {
        require_modifiable(&self.name, self.modifiable)?;
        self.entities.push(entity);
        Ok(())
    }

    /// Remove the first occurrence of `entity`, returning whether one was
    /// found.
    pub fn remove(&mut self, entity: &Entity) -> CoreResult<bool> {
        require_modifiable(&self.name, self.modifiable)?;
        if let Some(pos) = self.entities.iter().position(|e| e == entity) {
            self.entities.remove(pos);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.entities.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }
}

impl Hierarchy for ListHierarchy {
    fn kind(&self) -> HierarchyKind {
        HierarchyKind::EntityList
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
    use uuid::Uuid;

    #[test]
    fn remove_drops_only_first_occurrence() {
        let mut list = ListHierarchy::new("steps");
        let a = Entity::new(Uuid::new_v4());
        list.add(a.clone()).unwrap();
        list.add(a.clone()).unwrap();
        assert!(list.remove(&a).unwrap());
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn mutation_on_frozen_list_is_rejected() {
        let mut list = ListHierarchy::new("steps").modifiable(false);
        let err = list.add(Entity::new(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, crate::error::CoreError::NotModifiable { .. }));
    }
}
