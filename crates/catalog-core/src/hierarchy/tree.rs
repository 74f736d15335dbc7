use super::{require_modifiable, Hierarchy, HierarchyKind};
use crate::{
    entity::Entity,
    error::{CoreError, CoreResult},
};
use indexmap::IndexMap;

///
/// TreeNode
///
/// One node of an `ENTITY_TREE`: a value `Entity` plus an
/// insertion-ordered map of named children. Removing a node cascades to its
/// whole subtree.
///

#[derive(Clone, Debug)]
pub struct TreeNode {
    value: Entity,
    children: IndexMap<String, TreeNode>,
}

impl TreeNode {
    #[must_use]
    pub fn new(value: Entity) -> Self {
        Self {
            value,
            children: IndexMap::new(),
        }
    }

    #[must_use]
    pub const fn value(&self) -> &Entity {
        &self.value
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TreeNode> {
        self.children.get(key)
    }

    pub fn put(&mut self, key: impl Into<String>, child: TreeNode) {
        self.children.insert(key.into(), child);
    }

    /// Remove the child at `key`, dropping its whole subtree with it.
    pub fn remove(&mut self, key: &str) -> Option<TreeNode> {
        self.children.shift_remove(key)
    }

    /// Depth-first, insertion-order iteration over `(key, node)` pairs,
    /// not including this node itself.
    pub fn children(&self) -> impl Iterator<Item = (&str, &TreeNode)> {
        self.children.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn get_path(&self, path: &[String]) -> Option<&TreeNode> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    fn get_path_mut(&mut self, path: &[String]) -> Option<&mut TreeNode> {
        path.iter()
            .try_fold(self, |node, key| node.children.get_mut(key))
    }
}

///
/// TreeHierarchy
///
/// `ENTITY_TREE`: a single root `TreeNode`. Add-at-path requires the
/// parent path to already exist (*NoSuchNode* otherwise); remove-at-path
/// cascades.
///

#[derive(Clone, Debug)]
pub struct TreeHierarchy {
    name: String,
    modifiable: bool,
    root: TreeNode,
}

impl TreeHierarchy {
    #[must_use]
    pub fn new(name: impl Into<String>, root_value: Entity) -> Self {
        Self {
            name: name.into(),
            modifiable: true,
            root: TreeNode::new(root_value),
        }
    }

    #[must_use]
    pub const fn modifiable(mut self, modifiable: bool) -> Self {
        self.modifiable = modifiable;
        self
    }

    #[must_use]
    pub const fn root(&self) -> &TreeNode {
        &self.root
    }

    pub fn node(&self, path: &[String]) -> CoreResult<&TreeNode> {
        self.root.get_path(path).ok_or_else(|| CoreError::NoSuchNode {
            path: path.to_vec(),
        })
    }

    /// Add `child` under `key` beneath the node at `parent_path`. An absent
    /// parent is *NoSuchNode*.
    pub fn add_at_path(
        &mut self,
        parent_path: &[String],
        key: impl Into<String>,
        child: TreeNode,
    ) -> CoreResult<()> {
        require_modifiable(&self.name, self.modifiable)?;
        let parent = self
            .root
            .get_path_mut(parent_path)
            .ok_or_else(|| CoreError::NoSuchNode {
                path: parent_path.to_vec(),
            })?;
        parent.put(key, child);
        Ok(())
    }

    /// Remove the node at `path`, cascading to its subtree. *NoSuchNode* if
    /// `path` is empty (the root cannot be removed) or does not resolve.
    pub fn remove_at_path(&mut self, path: &[String]) -> CoreResult<TreeNode> {
        require_modifiable(&self.name, self.modifiable)?;
        let (last, parent_path) = path.split_last().ok_or_else(|| CoreError::NoSuchNode {
            path: path.to_vec(),
        })?;
        let parent = self
            .root
            .get_path_mut(parent_path)
            .ok_or_else(|| CoreError::NoSuchNode {
                path: path.to_vec(),
            })?;
        parent.remove(last).ok_or_else(|| CoreError::NoSuchNode {
            path: path.to_vec(),
        })
    }
}

impl Hierarchy for TreeHierarchy {
    fn kind(&self) -> HierarchyKind {
        HierarchyKind::EntityTree
    }

    fn name(&self) -> &str {
        &self.name
    }

    /// Total node count including the root.
    fn len(&self) -> usize {
        fn count(node: &TreeNode) -> usize {
            1 + node.children().map(|(_, c)| count(c)).sum::<usize>()
        }
        count(&self.root)
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

    fn entity() -> Entity {
        Entity::new(Uuid::new_v4())
    }

    #[test]
    fn add_under_missing_parent_is_no_such_node() {
        let mut tree = TreeHierarchy::new("org", entity());
        let err = tree
            .add_at_path(&["missing".to_string()], "child", TreeNode::new(entity()))
            .unwrap_err();
        assert!(matches!(err, CoreError::NoSuchNode { .. }));
    }

    #[test]
    fn remove_cascades_to_descendants() {
        let mut tree = TreeHierarchy::new("org", entity());
        tree.add_at_path(&[], "a", TreeNode::new(entity())).unwrap();
        tree.add_at_path(&["a".to_string()], "b", TreeNode::new(entity()))
            .unwrap();
        assert_eq!(tree.len(), 3);
        tree.remove_at_path(&["a".to_string()]).unwrap();
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn node_resolves_nested_paths() {
        let mut tree = TreeHierarchy::new("org", entity());
        let b = entity();
        tree.add_at_path(&[], "a", TreeNode::new(entity())).unwrap();
        tree.add_at_path(&["a".to_string()], "b", TreeNode::new(b.clone()))
            .unwrap();
        let found = tree
            .node(&["a".to_string(), "b".to_string()])
            .unwrap();
        assert_eq!(found.value(), &b);
    }
}
