//! Rendering seam
//!
//! The engine renders through the [`GraphicsBackend`] trait. This module holds
//! that trait, the resource wrappers built on it ([`Mesh`], [`Material`]) and
//! a headless [`RecordingBackend`].

pub mod backend;
pub mod mesh;
pub mod material;
pub mod recording;

pub use backend::{
    BackendError, BackendResult, GraphicsBackend, MeshHandle, ProgramHandle, RenderContext,
    Renderable, TextureHandle, UniformValue,
};
pub use mesh::{cube_vertices, Mesh, MeshError, Vertex, FLOATS_PER_VERTEX};
pub use material::Material;
pub use recording::{BackendCall, RecordingBackend};
