use super::{require_modifiable, Hierarchy, HierarchyKind};
use crate::{
    aspect::Aspect,
    entity::Entity,
    error::CoreResult,
    schema::AspectDefHandle,
};
use indexmap::IndexMap;
use uuid::Uuid;

///
/// AspectMapHierarchy
///
/// `ASPECT_MAP`: an insertion-ordered `Entity -> Aspect` map, every
/// entry sharing the one `AspectDef` named by this hierarchy (by default
/// the hierarchy's own name, per `Catalog::extend`). The stored aspect may be
/// either representation, so it is held behind `Box<dyn Aspect>`.
///

pub struct AspectMapHierarchy {
    name: String,
    modifiable: bool,
    def: AspectDefHandle,
    entries: IndexMap<Uuid, (Entity, Box<dyn Aspect + Send + Sync>)>,
}

impl std::fmt::Debug for AspectMapHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AspectMapHierarchy")
            .field("name", &self.name)
            .field("modifiable", &self.modifiable)
            .field("len", &self.entries.len())
            .finish()
    }
}

impl AspectMapHierarchy {
    #[must_use]
    pub fn new(name: impl Into<String>, def: AspectDefHandle) -> Self {
        Self {
            name: name.into(),
            modifiable: true,
            def,
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    #[must_use]
    pub const fn aspect_def(&self) -> &AspectDefHandle {
        &self.def
    }

    pub fn put(
        &mut self,
        entity: Entity,
        aspect: Box<dyn Aspect + Send + Sync>,
    ) -> CoreResult<()> {
        require_modifiable(&self.name, self.modifiable)?;
        self.entries
            .insert(entity.global_id(), (entity, aspect));
        Ok(())
    }

    #[must_use]
    pub fn get(&self, global_id: Uuid) -> Option<&(dyn Aspect + Send + Sync)> {
        self.entries.get(&global_id).map(|(_, a)| a.as_ref())
    }

    pub fn get_mut(&mut self, global_id: Uuid) -> Option<&mut (dyn Aspect + Send + Sync)> {
        self.entries
            .get_mut(&global_id)
            .map(|(_, a)| a.as_mut())
    }

    pub fn remove(
        &mut self,
        global_id: Uuid,
    ) -> CoreResult<Option<(Entity, Box<dyn Aspect + Send + Sync>)>> {
        require_modifiable(&self.name, self.modifiable)?;
        Ok(self.entries.shift_remove(&global_id))
    }

    pub fn keys(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.entries.keys().copied()
    }
}

impl Hierarchy for AspectMapHierarchy {
    fn kind(&self) -> HierarchyKind {
        HierarchyKind::AspectMap
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
    use crate::aspect::PropertyMapAspect;
    use crate::schema::{new_aspect_def_handle, AspectDef, Mutability};

    #[test]
    fn put_then_get_round_trips() {
        let def = new_aspect_def_handle(AspectDef::new(
            "person",
            Uuid::new_v4(),
            Mutability::Mutable,
        ));
        let mut map = AspectMapHierarchy::new("person", def.clone());
        let entity = Entity::new(Uuid::new_v4());
        map.put(entity.clone(), Box::new(PropertyMapAspect::new(def)))
            .unwrap();
        assert!(map.get(entity.global_id()).is_some());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn mutation_on_frozen_map_is_rejected() {
        let def = new_aspect_def_handle(AspectDef::new(
            "person",
            Uuid::new_v4(),
            Mutability::Mutable,
        ));
        let mut map = AspectMapHierarchy::new("person", def.clone()).modifiable(false);
        let err = map
            .put(
                Entity::new(Uuid::new_v4()),
                Box::new(PropertyMapAspect::new(def)),
            )
            .unwrap_err();
        assert!(matches!(err, crate::error::CoreError::NotModifiable { .. }));
    }
}
