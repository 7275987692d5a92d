//! Backend abstraction for the rendering system
//!
//! The engine never talks to a graphics API directly. Everything it needs is
//! expressed through [`GraphicsBackend`]; resources are referred to by opaque
//! handles the backend hands out.

use thiserror::Error;

use crate::ecs::components::CameraMatrices;
use crate::foundation::any::AsAny;
use crate::foundation::math::{Mat4, Vec3};
use crate::render::Vertex;

/// Result type for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a mesh resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// Handle to a linked shader program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Handle to a texture resource stored in the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

/// Value assignable to a shader uniform
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    /// Integer (also used for sampler units)
    Int(i32),
    /// Scalar float
    Float(f32),
    /// Three-component vector
    Vec3(Vec3),
    /// 4x4 matrix
    Mat4(Mat4),
}

/// Backend failures
///
/// These are fatal for the frame that hit them: there is no degraded
/// rendering mode, so the frame driver propagates them to the host.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// Shader stage failed to compile
    #[error("Shader compilation failed: {0}")]
    ShaderCompilation(String),

    /// Program failed to link
    #[error("Program link failed: {0}")]
    ProgramLink(String),

    /// Mesh handle not known to the backend
    #[error("Unknown mesh: {0:?}")]
    UnknownMesh(MeshHandle),

    /// Program handle not known to the backend
    #[error("Unknown program: {0:?}")]
    UnknownProgram(ProgramHandle),

    /// Texture handle not known to the backend
    #[error("Unknown texture: {0:?}")]
    UnknownTexture(TextureHandle),

    /// Resource data could not be loaded
    #[error("Resource load failed: {0}")]
    ResourceLoad(String),
}

/// Graphics API seam
///
/// Implementations own every GPU resource; the engine only keeps handles.
pub trait GraphicsBackend: AsAny {
    /// Upload interleaved vertex data and return its handle
    fn upload_mesh(&mut self, vertices: &[Vertex]) -> BackendResult<MeshHandle>;

    /// Compile and link a program from vertex and fragment sources
    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> BackendResult<ProgramHandle>;

    /// Make a program current for subsequent uniform writes and draws
    fn use_program(&mut self, program: ProgramHandle) -> BackendResult<()>;

    /// Assign a uniform on a program
    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) -> BackendResult<()>;

    /// Upload tightly packed RGBA8 pixels and return the texture handle
    fn upload_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle>;

    /// Bind a texture to a sampler unit
    fn bind_texture(&mut self, texture: TextureHandle, unit: u32) -> BackendResult<()>;

    /// Draw a mesh with the current program
    fn draw(&mut self, mesh: MeshHandle) -> BackendResult<()>;

    /// Resize the drawable area
    fn set_viewport(&mut self, width: u32, height: u32);

    /// Colour used by [`GraphicsBackend::clear`]
    fn set_clear_color(&mut self, color: [f32; 4]);

    /// Clear colour and depth buffers
    fn clear(&mut self);

    /// Present the finished frame
    fn swap_buffers(&mut self) -> BackendResult<()>;
}

/// Per-draw state handed to renderable components
pub struct RenderContext<'a> {
    /// Backend receiving draw calls
    pub backend: &'a mut dyn GraphicsBackend,
    /// World matrix of the entity being drawn
    pub model: Mat4,
    /// Main camera matrices, if the scene has a camera
    pub camera: Option<&'a CameraMatrices>,
}

/// Components that issue draw calls
pub trait Renderable {
    /// Draw once for the current frame
    fn render(&self, ctx: &mut RenderContext<'_>) -> BackendResult<()>;
}
