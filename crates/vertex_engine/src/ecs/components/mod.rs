//! Built-in components

pub mod transform;
pub mod camera;
pub mod camera_controller;
pub mod mesh_renderer;

pub use transform::Transform;
pub use camera::{Camera, CameraMatrices};
pub use camera_controller::CameraController;
pub use mesh_renderer::MeshRenderer;
