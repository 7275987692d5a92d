//! Mesh representation for 3D models
//!
//! Vertex data is interleaved as position, normal, texture coordinate
//! (eight `f32` per vertex). A [`Mesh`] is only a handle to data the backend
//! already holds, plus the vertex count.

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

use crate::render::{BackendError, GraphicsBackend, MeshHandle};

/// Number of `f32` values per interleaved vertex
pub const FLOATS_PER_VERTEX: usize = 8;

/// 3D vertex data structure for rendering
///
/// `#[repr(C)]` and `Pod` let a vertex slice be viewed as raw bytes for
/// buffer uploads without copying.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default, Pod, Zeroable)]
pub struct Vertex {
    /// 3D position in model space
    pub position: [f32; 3],
    /// Surface normal (unit length)
    pub normal: [f32; 3],
    /// Texture coordinates
    pub uv: [f32; 2],
}

impl Vertex {
    /// Create a vertex
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, normal, uv }
    }
}

/// Mesh creation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    /// No vertices supplied
    #[error("Mesh has no vertices")]
    Empty,

    /// Interleaved data is not a whole number of vertices
    #[error("Interleaved data of {len} floats is not a multiple of 8")]
    InvalidLayout {
        /// Number of floats supplied
        len: usize,
    },

    /// Backend rejected the upload
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Geometry uploaded to a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mesh {
    handle: MeshHandle,
    vertex_count: usize,
}

impl Mesh {
    /// Upload vertices and wrap the resulting handle
    pub fn upload(backend: &mut dyn GraphicsBackend, vertices: &[Vertex]) -> Result<Self, MeshError> {
        if vertices.is_empty() {
            return Err(MeshError::Empty);
        }
        let handle = backend.upload_mesh(vertices)?;
        log::debug!("Uploaded mesh {:?} with {} vertices", handle, vertices.len());
        Ok(Self { handle, vertex_count: vertices.len() })
    }

    /// Upload interleaved `[px, py, pz, nx, ny, nz, u, v]` data
    pub fn from_interleaved(backend: &mut dyn GraphicsBackend, data: &[f32]) -> Result<Self, MeshError> {
        let vertices: &[Vertex] = bytemuck::try_cast_slice(data)
            .map_err(|_| MeshError::InvalidLayout { len: data.len() })?;
        Self::upload(backend, vertices)
    }

    /// Backend handle
    pub fn handle(&self) -> MeshHandle {
        self.handle
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    /// Issue a draw call with the currently bound program
    pub fn draw(&self, backend: &mut dyn GraphicsBackend) -> Result<(), BackendError> {
        backend.draw(self.handle)
    }
}

/// Unit cube centred on the origin, 36 vertices with per-face normals
///
/// Triangles wind counter-clockwise when viewed from outside.
pub fn cube_vertices() -> Vec<Vertex> {
    // (normal, u axis, v axis) with u x v == normal
    const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];
    const CORNERS: [(f32, f32); 6] = [
        (-1.0, -1.0), (1.0, -1.0), (1.0, 1.0),
        (-1.0, -1.0), (1.0, 1.0), (-1.0, 1.0),
    ];

    let mut vertices = Vec::with_capacity(FACES.len() * CORNERS.len());
    for (normal, u, v) in FACES {
        for (s, t) in CORNERS {
            let position = std::array::from_fn(|i| 0.5 * (normal[i] + s * u[i] + t * v[i]));
            let uv = [(s + 1.0) * 0.5, (t + 1.0) * 0.5];
            vertices.push(Vertex::new(position, normal, uv));
        }
    }
    vertices
}
