//! Math utilities and types
//!
//! Provides the fundamental math types used by transforms and cameras.
//! All matrices use nalgebra's column-vector convention: a point is
//! transformed as `M * p`, so composed transforms read right to left.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Pi / 2
    pub const HALF_PI: f32 = PI * 0.5;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Mat4, Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Rotation quaternion for Euler angles in radians (X, then Y, then Z)
    pub fn euler_to_quat(euler: &Vec3) -> Quat {
        Quat::from_euler_angles(euler.x, euler.y, euler.z)
    }

    /// Euler angles in radians for a rotation, inverse of [`euler_to_quat`]
    pub fn quat_to_euler(rotation: &Quat) -> Vec3 {
        let (x, y, z) = rotation.euler_angles();
        Vec3::new(x, y, z)
    }

    /// Build a local transformation matrix: scale, then rotate, then translate
    pub fn compose_trs(position: &Vec3, rotation: &Vec3, scale: &Vec3) -> Mat4 {
        Mat4::new_translation(position)
            * euler_to_quat(rotation).to_homogeneous()
            * Mat4::new_nonuniform_scaling(scale)
    }

    /// Translation column of an affine matrix
    pub fn translation_of(matrix: &Mat4) -> Vec3 {
        Vec3::new(matrix.m14, matrix.m24, matrix.m34)
    }
}

/// Extension trait for Mat4 with camera matrix helpers
pub trait Mat4Ext {
    /// Create a right-handed perspective projection matrix (OpenGL clip space)
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;

    /// Create a right-handed look-at view matrix
    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }

    fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Mat4 {
        Mat4::look_at_rh(&Point3::from(eye), &Point3::from(target), &up)
    }
}
