//! # Camera Component
//!
//! Perspective camera attached to an entity. The camera's position comes from
//! the owning entity's world transform; its orientation is an explicit
//! orthonormal basis (front, right, up) that controllers steer directly.
//!
//! ## Conventions
//! - Right-handed, Y-up world space
//! - The camera looks along `front`, which starts as -Z
//! - Projection follows OpenGL clip space (depth in -1..1)

use crate::ecs::Component;
use crate::foundation::math::{constants, utils, Mat4, Mat4Ext, Vec3};

/// Perspective camera
///
/// Exposes view and projection matrices for renderable components. The first
/// enabled camera on an active live entity is the scene's main camera.
///
/// # Example
/// ```rust
/// use vertex_engine::ecs::components::Camera;
/// use vertex_engine::foundation::math::Vec3;
///
/// let mut camera = Camera::new(60.0, 16.0 / 9.0, 0.1, 500.0);
/// camera.update_vectors(Vec3::new(1.0, 0.0, -1.0));
/// let view = camera.view_matrix(Vec3::new(0.0, 2.0, 5.0));
/// assert!(view.iter().all(|v| v.is_finite()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Vertical field of view in radians
    pub fov: f32,

    /// Aspect ratio (width / height) for projection calculations
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    front: Vec3,
    up: Vec3,
    right: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: constants::HALF_PI,
            aspect: 1.0,
            near: 0.1,
            far: 100.0,
            front: Vec3::new(0.0, 0.0, -1.0),
            up: Vec3::new(0.0, 1.0, 0.0),
            right: Vec3::new(1.0, 0.0, 0.0),
        }
    }
}

/// View and projection state captured from the main camera for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix
    pub projection: Mat4,
    /// Camera position in world space
    pub position: Vec3,
}

impl CameraMatrices {
    /// Combined projection * view matrix
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}

impl Camera {
    /// Create a perspective camera
    ///
    /// # Arguments
    /// * `fov_degrees` - Vertical field of view in degrees (stored in radians)
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    pub fn new(fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            ..Self::default()
        }
    }

    /// Direction the camera looks along
    pub fn front(&self) -> Vec3 {
        self.front
    }

    /// Camera up direction
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Camera right direction
    pub fn right(&self) -> Vec3 {
        self.right
    }

    /// Re-derive the orientation basis from a new view direction
    ///
    /// `front` need not be normalized. Right is `front x world-up` and up is
    /// `right x front`, so the basis stays orthonormal and roll-free. A zero
    /// direction, or one parallel to world up, leaves the basis unchanged.
    pub fn update_vectors(&mut self, front: Vec3) {
        let Some(front) = front.try_normalize(f32::EPSILON) else {
            log::warn!("Camera front vector is zero; orientation unchanged");
            return;
        };
        let Some(right) = front.cross(&Vec3::y()).try_normalize(f32::EPSILON) else {
            log::warn!("Camera front vector is parallel to world up; orientation unchanged");
            return;
        };

        self.front = front;
        self.right = right;
        self.up = right.cross(&front).normalize();
    }

    /// Current aspect ratio
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Update the aspect ratio, typically after a viewport resize
    ///
    /// Non-positive or non-finite values are ignored.
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if !aspect.is_finite() || aspect <= 0.0 {
            log::warn!("Ignoring invalid camera aspect ratio {}", aspect);
            return;
        }
        if (self.aspect - aspect).abs() > 0.01 {
            log::info!("Camera aspect ratio changed from {:.3} to {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// View matrix for a camera placed at `position`
    pub fn view_matrix(&self, position: Vec3) -> Mat4 {
        Mat4::look_at(position, position + self.front, self.up)
    }

    /// Perspective projection matrix
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Capture view and projection for a camera placed at `position`
    pub fn matrices(&self, position: Vec3) -> CameraMatrices {
        CameraMatrices {
            view: self.view_matrix(position),
            projection: self.projection_matrix(),
            position,
        }
    }
}

impl Component for Camera {
    fn as_camera(&self) -> Option<&Camera> {
        Some(self)
    }

    fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        Some(self)
    }
}
