mod aspect_map;
mod directory;
mod list;
mod set;
mod tree;

pub use aspect_map::AspectMapHierarchy;
pub use directory::DirectoryHierarchy;
pub use list::ListHierarchy;
pub use set::SetHierarchy;
pub use tree::{TreeHierarchy, TreeNode};

pub use crate::schema::HierarchyKind;
use crate::error::CoreResult;

///
/// Hierarchy
///
/// Common contract of the five hierarchy container kinds. Each
/// container additionally exposes a kind-specific API (`ListHierarchy::add`,
/// `TreeHierarchy::root`, and so on); this trait carries only what all five
/// share: identity, cardinality, and the modifiable flag enforced on every
/// mutating operation.
///

pub trait Hierarchy {
    fn kind(&self) -> HierarchyKind;

    fn name(&self) -> &str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_modifiable(&self) -> bool;

    /// Downcasting hook for callers (the persistence layer) that need the
    /// kind-specific API behind a `Box<dyn Hierarchy>`.
    fn as_any(&self) -> &dyn std::any::Any;
}

pub(crate) fn require_modifiable(name: &str, modifiable: bool) -> CoreResult<()> {
    if modifiable {
        Ok(())
    } else {
        Err(crate::error::CoreError::NotModifiable {
            name: name.to_string(),
        })
    }
}
