//! Transform hierarchy
//!
//! Nodes are stored in a slotmap arena and refer to each other by
//! [`TransformId`]. Parent and child links are plain handles; the arena owns
//! every node. World matrices are cached per node and recomputed lazily:
//! any local write marks the node and its whole subtree dirty, and the next
//! read walks up the parent chain only as far as the first clean ancestor.

use std::ops::Deref;

use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::ecs::components::Transform;
use crate::foundation::math::{utils, Mat4, Point3, Quat, Unit, Vec3};

new_key_type! {
    /// Stable handle to a node in a [`TransformTree`]
    pub struct TransformId;
}

/// Hierarchy mutation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    /// Handle does not refer to a live node
    #[error("Unknown transform node: {0:?}")]
    UnknownNode(TransformId),

    /// Parenting would make a node its own ancestor
    #[error("Parenting {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Node being re-parented
        child: TransformId,
        /// Requested parent
        parent: TransformId,
    },
}

/// Arena of transform nodes forming a forest
#[derive(Debug, Default)]
pub struct TransformTree {
    nodes: SlotMap<TransformId, Transform>,
}

impl TransformTree {
    /// Create an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node as a new root
    pub fn insert(&mut self, mut transform: Transform) -> TransformId {
        transform.parent = None;
        transform.children.clear();
        transform.rebuild_local();
        transform.dirty.set(true);
        self.nodes.insert(transform)
    }

    /// Remove a node
    ///
    /// The node is detached from its parent and its children become roots
    /// that keep their local values. The handle is invalid afterwards.
    pub fn remove(&mut self, id: TransformId) -> Option<Transform> {
        let node = self.nodes.remove(id)?;

        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&child| child != id);
        }
        for &child in &node.children {
            if let Some(child_node) = self.nodes.get_mut(child) {
                child_node.parent = None;
            }
            self.mark_subtree_dirty(child);
        }

        Some(node)
    }

    /// Whether the handle refers to a live node
    pub fn contains(&self, id: TransformId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Read access to a node
    pub fn get(&self, id: TransformId) -> Option<&Transform> {
        self.nodes.get(id)
    }

    /// Write access to a node through an invalidating handle
    pub fn get_mut(&mut self, id: TransformId) -> Option<TransformMut<'_>> {
        if self.nodes.contains_key(id) {
            Some(TransformMut { tree: self, id })
        } else {
            None
        }
    }

    /// Nodes without a parent
    pub fn roots(&self) -> impl Iterator<Item = TransformId> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
    }

    /// Topmost ancestor of a node (the node itself when it is a root)
    pub fn root_of(&self, id: TransformId) -> Option<TransformId> {
        let mut current = id;
        loop {
            match self.nodes.get(current)?.parent {
                Some(parent) => current = parent,
                None => return Some(current),
            }
        }
    }

    /// Whether `ancestor` appears on the parent chain of `node`
    pub fn is_ancestor(&self, ancestor: TransformId, node: TransformId) -> bool {
        let mut current = self.nodes.get(node).and_then(|n| n.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Re-parent a node, or detach it with `None`
    ///
    /// Local values are kept, so the node's world placement follows the new
    /// parent. Setting the current parent again is a no-op.
    pub fn set_parent(
        &mut self,
        child: TransformId,
        parent: Option<TransformId>,
    ) -> Result<(), HierarchyError> {
        let old_parent = self
            .nodes
            .get(child)
            .ok_or(HierarchyError::UnknownNode(child))?
            .parent;

        if let Some(parent) = parent {
            if !self.nodes.contains_key(parent) {
                return Err(HierarchyError::UnknownNode(parent));
            }
            if parent == child || self.is_ancestor(child, parent) {
                return Err(HierarchyError::Cycle { child, parent });
            }
        }

        if old_parent == parent {
            return Ok(());
        }

        if let Some(old) = old_parent.and_then(|p| self.nodes.get_mut(p)) {
            old.children.retain(|&c| c != child);
        }
        if let Some(new) = parent.and_then(|p| self.nodes.get_mut(p)) {
            new.children.push(child);
        }
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = parent;
        }
        self.mark_subtree_dirty(child);

        Ok(())
    }

    /// World matrix of a node, recomputing stale cache entries on the way
    pub fn world_matrix(&self, id: TransformId) -> Option<Mat4> {
        let node = self.nodes.get(id)?;
        if !node.dirty.get() {
            return Some(node.world.get());
        }

        // Collect the stale chain up to the first clean ancestor
        let mut stale = vec![node];
        let mut base = Mat4::identity();
        let mut next = node.parent;
        while let Some(parent) = next.and_then(|p| self.nodes.get(p)) {
            if !parent.dirty.get() {
                base = parent.world.get();
                break;
            }
            stale.push(parent);
            next = parent.parent;
        }

        let mut world = base;
        for node in stale.into_iter().rev() {
            world *= node.local;
            node.world.set(world);
            node.dirty.set(false);
        }
        Some(world)
    }

    /// World-space position of a node
    pub fn world_position(&self, id: TransformId) -> Option<Vec3> {
        self.world_matrix(id).map(|world| utils::translation_of(&world))
    }

    /// Map a point from the node's local space to world space
    pub fn transform_point(&self, id: TransformId, point: Vec3) -> Option<Vec3> {
        let world = self.world_matrix(id)?;
        Some(world.transform_point(&Point3::from(point)).coords)
    }

    /// Map a direction from the node's local space to world space (ignores translation)
    pub fn transform_direction(&self, id: TransformId, direction: Vec3) -> Option<Vec3> {
        let world = self.world_matrix(id)?;
        Some(world.transform_vector(&direction))
    }

    /// Map a world-space point into the node's local space
    ///
    /// Returns `None` for unknown nodes and for degenerate (zero-scale) transforms.
    pub fn inverse_transform_point(&self, id: TransformId, point: Vec3) -> Option<Vec3> {
        let inverse = self.world_matrix(id)?.try_inverse()?;
        Some(inverse.transform_point(&Point3::from(point)).coords)
    }

    /// Mark a node and all its descendants dirty
    pub fn mark_subtree_dirty(&self, id: TransformId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get(current) {
                node.dirty.set(true);
                stack.extend(node.children.iter().copied());
            }
        }
    }

    /// Walk a subtree depth-first, parents before children
    pub fn descendants(&self, id: TransformId) -> Vec<TransformId> {
        let mut result = Vec::new();
        let mut stack: Vec<TransformId> = self
            .nodes
            .get(id)
            .map(|node| node.children.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            result.push(current);
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter().rev().copied());
            }
        }
        result
    }
}

/// Mutable view of one node
///
/// Every setter rebuilds the local matrix and dirties the subtree, so world
/// matrices read afterwards always reflect the change.
pub struct TransformMut<'a> {
    tree: &'a mut TransformTree,
    id: TransformId,
}

impl Deref for TransformMut<'_> {
    type Target = Transform;

    fn deref(&self) -> &Transform {
        &self.tree.nodes[self.id]
    }
}

impl TransformMut<'_> {
    /// Handle of the node being edited
    pub fn id(&self) -> TransformId {
        self.id
    }

    /// Set the local position
    pub fn set_position(&mut self, position: Vec3) {
        self.write(|t| t.position = position);
    }

    /// Set the local rotation (Euler angles, radians)
    pub fn set_rotation(&mut self, rotation: Vec3) {
        self.write(|t| t.rotation = rotation);
    }

    /// Set the local scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.write(|t| t.scale = scale);
    }

    /// Set position, rotation and scale at once
    pub fn set_local(&mut self, position: Vec3, rotation: Vec3, scale: Vec3) {
        self.write(|t| {
            t.position = position;
            t.rotation = rotation;
            t.scale = scale;
        });
    }

    /// Move by an offset in parent space
    pub fn translate(&mut self, translation: Vec3) {
        self.write(|t| t.position += translation);
    }

    /// Add Euler angles (radians) to the local rotation
    pub fn rotate(&mut self, euler: Vec3) {
        self.write(|t| t.rotation += euler);
    }

    /// Orbit around a point in parent space, turning the node with it
    pub fn rotate_around(&mut self, point: Vec3, axis: Vec3, angle: f32) {
        let Some(axis) = Unit::try_new(axis, 1.0e-6) else {
            log::warn!("rotate_around called with a zero-length axis; ignoring");
            return;
        };
        let spin = Quat::from_axis_angle(&axis, angle);
        self.write(|t| {
            t.position = point + spin * (t.position - point);
            t.rotation = utils::quat_to_euler(&(spin * utils::euler_to_quat(&t.rotation)));
        });
    }

    /// Turn so that forward (-Z) points at `target`, given in parent space
    ///
    /// Degenerate requests (target at the node, or `up` parallel to the view
    /// direction) leave the rotation unchanged.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        let away = self.position - target;
        if away.norm_squared() < f32::EPSILON || away.cross(&up).norm_squared() < f32::EPSILON {
            log::warn!("look_at target is degenerate for this transform; rotation unchanged");
            return;
        }
        let rotation = utils::quat_to_euler(&Quat::face_towards(&away, &up));
        self.write(|t| t.rotation = rotation);
    }

    /// Re-parent this node; see [`TransformTree::set_parent`]
    pub fn set_parent(&mut self, parent: Option<TransformId>) -> Result<(), HierarchyError> {
        self.tree.set_parent(self.id, parent)
    }

    /// World matrix of this node
    pub fn world_matrix(&self) -> Mat4 {
        self.tree.world_matrix(self.id).unwrap_or_else(Mat4::identity)
    }

    fn write(&mut self, edit: impl FnOnce(&mut Transform)) {
        if let Some(node) = self.tree.nodes.get_mut(self.id) {
            edit(node);
            node.rebuild_local();
        }
        self.tree.mark_subtree_dirty(self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tree_with_chain() -> (TransformTree, TransformId, TransformId, TransformId) {
        let mut tree = TransformTree::new();
        let root = tree.insert(Transform::default());
        let child = tree.insert(Transform::default());
        let grandchild = tree.insert(Transform::default());
        tree.set_parent(child, Some(root)).unwrap();
        tree.set_parent(grandchild, Some(child)).unwrap();
        (tree, root, child, grandchild)
    }

    fn assert_edges_consistent(tree: &TransformTree) {
        for (id, node) in &tree.nodes {
            if let Some(parent) = node.parent {
                assert!(tree.get(parent).unwrap().children().contains(&id));
            }
            for &child in node.children() {
                assert_eq!(tree.get(child).unwrap().parent(), Some(id));
            }
        }
    }

    #[test]
    fn test_set_parent_links_both_directions() {
        let (tree, root, child, grandchild) = tree_with_chain();
        assert_eq!(tree.get(child).unwrap().parent(), Some(root));
        assert_eq!(tree.get(root).unwrap().children(), &[child]);
        assert_eq!(tree.get(child).unwrap().children(), &[grandchild]);
        assert_edges_consistent(&tree);
    }

    #[test]
    fn test_reparent_and_detach_keep_edges_consistent() {
        let (mut tree, root, child, grandchild) = tree_with_chain();

        tree.set_parent(grandchild, Some(root)).unwrap();
        assert_edges_consistent(&tree);
        assert!(tree.get(child).unwrap().children().is_empty());
        assert_eq!(tree.get(root).unwrap().children(), &[child, grandchild]);

        tree.set_parent(child, None).unwrap();
        assert_edges_consistent(&tree);
        assert_eq!(tree.get(child).unwrap().parent(), None);
        assert_eq!(tree.get(root).unwrap().children(), &[grandchild]);
    }

    #[test]
    fn test_same_parent_is_noop() {
        let (mut tree, root, child, _) = tree_with_chain();
        tree.set_parent(child, Some(root)).unwrap();
        assert_eq!(tree.get(root).unwrap().children(), &[child]);
    }

    #[test]
    fn test_cycles_are_rejected() {
        let (mut tree, root, child, grandchild) = tree_with_chain();

        assert_eq!(
            tree.set_parent(root, Some(grandchild)),
            Err(HierarchyError::Cycle { child: root, parent: grandchild })
        );
        assert_eq!(
            tree.set_parent(child, Some(child)),
            Err(HierarchyError::Cycle { child, parent: child })
        );

        // Rejected calls leave the hierarchy untouched
        assert_eq!(tree.get(root).unwrap().parent(), None);
        assert_eq!(tree.get(child).unwrap().parent(), Some(root));
        assert_edges_consistent(&tree);
    }

    #[test]
    fn test_unknown_nodes_are_reported() {
        let (mut tree, root, _, grandchild) = tree_with_chain();
        tree.remove(grandchild);

        assert_eq!(tree.set_parent(grandchild, Some(root)), Err(HierarchyError::UnknownNode(grandchild)));
        assert_eq!(tree.set_parent(root, Some(grandchild)), Err(HierarchyError::UnknownNode(grandchild)));
        assert!(tree.world_matrix(grandchild).is_none());
    }

    #[test]
    fn test_world_matrix_follows_parent_without_refresh() {
        let (mut tree, root, child, grandchild) = tree_with_chain();
        tree.get_mut(child).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));
        tree.get_mut(grandchild).unwrap().set_position(Vec3::new(0.0, 2.0, 0.0));
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(1.0, 2.0, 0.0));

        tree.get_mut(root).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));
        assert!(tree.get(grandchild).unwrap().is_dirty());
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(6.0, 2.0, 0.0));
        assert!(!tree.get(grandchild).unwrap().is_dirty());
    }

    #[test]
    fn test_world_matrix_of_deep_chain() {
        const DEPTH: usize = 100_000;

        // Linked directly; set_parent's ancestor check would make this quadratic
        let mut tree = TransformTree::new();
        let root = tree.insert(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let mut leaf = root;
        for _ in 1..DEPTH {
            let next = tree.insert(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
            tree.nodes[next].parent = Some(leaf);
            tree.nodes[leaf].children.push(next);
            leaf = next;
        }

        assert_relative_eq!(tree.world_position(leaf).unwrap(), Vec3::new(DEPTH as f32, 0.0, 0.0));
        assert!(!tree.get(root).unwrap().is_dirty());

        tree.get_mut(root).unwrap().set_position(Vec3::new(0.0, 0.0, 0.0));
        assert_relative_eq!(tree.world_position(leaf).unwrap(), Vec3::new((DEPTH - 1) as f32, 0.0, 0.0));
    }

    #[test]
    fn test_clean_ancestor_cache_is_reused() {
        let (mut tree, root, child, grandchild) = tree_with_chain();
        tree.get_mut(root).unwrap().set_position(Vec3::new(2.0, 0.0, 0.0));
        tree.get_mut(child).unwrap().set_position(Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(tree.world_position(child).unwrap(), Vec3::new(2.0, 1.0, 0.0));

        tree.get_mut(grandchild).unwrap().set_position(Vec3::new(0.0, 0.0, 3.0));
        assert!(!tree.get(child).unwrap().is_dirty());
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(2.0, 1.0, 3.0));
    }

    #[test]
    fn test_world_is_parent_world_times_local() {
        let (mut tree, root, child, _) = tree_with_chain();
        {
            let mut root_mut = tree.get_mut(root).unwrap();
            root_mut.set_rotation(Vec3::new(0.0, 0.7, 0.0));
            root_mut.set_scale(Vec3::new(2.0, 2.0, 2.0));
        }
        tree.get_mut(child).unwrap().set_position(Vec3::new(1.0, 0.5, -3.0));

        let expected = tree.get(root).unwrap().local_matrix() * tree.get(child).unwrap().local_matrix();
        assert_relative_eq!(tree.world_matrix(child).unwrap(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_remove_orphans_children() {
        let (mut tree, root, child, grandchild) = tree_with_chain();
        tree.get_mut(root).unwrap().set_position(Vec3::new(10.0, 0.0, 0.0));
        tree.get_mut(grandchild).unwrap().set_position(Vec3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(10.0, 1.0, 0.0));

        let removed = tree.remove(child).unwrap();
        assert_eq!(removed.parent(), Some(root));
        assert!(!tree.contains(child));
        assert!(tree.get(root).unwrap().children().is_empty());
        assert_eq!(tree.get(grandchild).unwrap().parent(), None);
        assert_relative_eq!(tree.world_position(grandchild).unwrap(), Vec3::new(0.0, 1.0, 0.0));
        assert_edges_consistent(&tree);
    }

    #[test]
    fn test_translate_and_rotate_accumulate() {
        let mut tree = TransformTree::new();
        let id = tree.insert(Transform::default());
        let mut node = tree.get_mut(id).unwrap();
        node.translate(Vec3::new(1.0, 0.0, 0.0));
        node.translate(Vec3::new(0.0, 2.0, 0.0));
        node.rotate(Vec3::new(0.0, 0.25, 0.0));
        node.rotate(Vec3::new(0.0, 0.25, 0.0));

        assert_eq!(node.position(), Vec3::new(1.0, 2.0, 0.0));
        assert_relative_eq!(node.rotation(), Vec3::new(0.0, 0.5, 0.0));
    }

    #[test]
    fn test_look_at_points_forward_at_target() {
        let mut tree = TransformTree::new();
        let id = tree.insert(Transform::from_position(Vec3::new(0.0, 0.0, 5.0)));
        let mut node = tree.get_mut(id).unwrap();
        node.look_at(Vec3::new(5.0, 0.0, 0.0), Vec3::y());

        let expected = Vec3::new(1.0, 0.0, -1.0).normalize();
        assert_relative_eq!(node.forward(), expected, epsilon = 1e-5);
        assert_relative_eq!(node.up(), Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_look_at_degenerate_target_is_ignored() {
        let mut tree = TransformTree::new();
        let id = tree.insert(Transform::default());
        let mut node = tree.get_mut(id).unwrap();
        node.set_rotation(Vec3::new(0.1, 0.2, 0.3));
        node.look_at(Vec3::zeros(), Vec3::y());
        assert_eq!(node.rotation(), Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_rotate_around_orbits_position() {
        let mut tree = TransformTree::new();
        let id = tree.insert(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let mut node = tree.get_mut(id).unwrap();
        node.rotate_around(Vec3::zeros(), Vec3::y(), 0.5);

        assert_relative_eq!(node.position(), Vec3::new(0.5_f32.cos(), 0.0, -(0.5_f32.sin())), epsilon = 1e-6);
        assert_relative_eq!(node.rotation(), Vec3::new(0.0, 0.5, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn test_point_mapping_round_trip() {
        let (mut tree, root, child, _) = tree_with_chain();
        tree.get_mut(root).unwrap().set_position(Vec3::new(0.0, 0.0, -4.0));
        tree.get_mut(child).unwrap().set_scale(Vec3::new(2.0, 2.0, 2.0));

        let world = tree.transform_point(child, Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(world, Vec3::new(2.0, 0.0, -4.0), epsilon = 1e-6);
        let local = tree.inverse_transform_point(child, world).unwrap();
        assert_relative_eq!(local, Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);

        let direction = tree.transform_direction(child, Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert_relative_eq!(direction, Vec3::new(0.0, 2.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn test_roots_and_descendants() {
        let (mut tree, root, child, grandchild) = tree_with_chain();
        let other = tree.insert(Transform::default());

        let mut roots: Vec<_> = tree.roots().collect();
        roots.sort();
        let mut expected = vec![root, other];
        expected.sort();
        assert_eq!(roots, expected);

        assert_eq!(tree.descendants(root), vec![child, grandchild]);
        assert_eq!(tree.root_of(grandchild), Some(root));
        assert!(tree.is_ancestor(root, grandchild));
        assert!(!tree.is_ancestor(grandchild, root));
    }
}
