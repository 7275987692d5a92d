//! Transform component
//!
//! Local position, rotation and scale of an entity plus its place in the
//! hierarchy. Nodes live in the scene's [`TransformTree`] arena; mutation goes
//! through [`TransformMut`] so cached matrices are invalidated consistently.
//!
//! [`TransformTree`]: crate::scene::TransformTree
//! [`TransformMut`]: crate::scene::TransformMut

use std::cell::Cell;

use crate::ecs::Component;
use crate::foundation::math::{utils, Mat4, Quat, Vec3};
use crate::scene::TransformId;

/// Spatial state of one entity
///
/// Rotation is stored as Euler angles in radians, applied X then Y then Z.
/// The local matrix is rebuilt eagerly on every write; the world matrix is
/// cached and recomputed lazily when the node is dirty.
#[derive(Debug, Clone)]
pub struct Transform {
    pub(crate) position: Vec3,
    pub(crate) rotation: Vec3,
    pub(crate) scale: Vec3,
    pub(crate) local: Mat4,
    pub(crate) world: Cell<Mat4>,
    pub(crate) dirty: Cell<bool>,
    pub(crate) parent: Option<TransformId>,
    pub(crate) children: Vec<TransformId>,
}

impl Component for Transform {}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Vec3::zeros(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            local: Mat4::identity(),
            world: Cell::new(Mat4::identity()),
            dirty: Cell::new(true),
            parent: None,
            children: Vec::new(),
        }
    }
}

impl Transform {
    /// Create an identity transform at the given local position
    pub fn from_position(position: Vec3) -> Self {
        let mut transform = Self { position, ..Self::default() };
        transform.rebuild_local();
        transform
    }

    /// Local position relative to the parent
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local rotation as Euler angles in radians
    pub fn rotation(&self) -> Vec3 {
        self.rotation
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Local rotation as a quaternion
    pub fn rotation_quat(&self) -> Quat {
        utils::euler_to_quat(&self.rotation)
    }

    /// Cached local matrix (`T * R * S`)
    pub fn local_matrix(&self) -> Mat4 {
        self.local
    }

    /// Whether the cached world matrix is stale
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    /// Parent node, if any
    pub fn parent(&self) -> Option<TransformId> {
        self.parent
    }

    /// Child nodes in attach order
    pub fn children(&self) -> &[TransformId] {
        &self.children
    }

    /// Local forward direction (-Z rotated by the local rotation)
    pub fn forward(&self) -> Vec3 {
        self.rotation_quat() * -Vec3::z()
    }

    /// Local right direction (+X rotated by the local rotation)
    pub fn right(&self) -> Vec3 {
        self.rotation_quat() * Vec3::x()
    }

    /// Local up direction (+Y rotated by the local rotation)
    pub fn up(&self) -> Vec3 {
        self.rotation_quat() * Vec3::y()
    }

    pub(crate) fn rebuild_local(&mut self) {
        self.local = utils::compose_trs(&self.position, &self.rotation, &self.scale);
    }
}
