//! Headless backend that records every call
//!
//! Validates handles and inputs the way a real driver would, but draws
//! nothing. Used for tests and for running the engine without a window.

use std::collections::{HashMap, HashSet};

use crate::render::{
    BackendError, BackendResult, GraphicsBackend, MeshHandle, ProgramHandle, TextureHandle,
    UniformValue, Vertex,
};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// Mesh upload
    UploadMesh {
        /// Assigned handle
        mesh: MeshHandle,
        /// Vertices uploaded
        vertex_count: usize,
        /// Size of the vertex buffer in bytes
        byte_len: usize,
    },
    /// Program compile and link
    CompileProgram(ProgramHandle),
    /// Program made current
    UseProgram(ProgramHandle),
    /// Uniform assignment
    SetUniform {
        /// Target program
        program: ProgramHandle,
        /// Uniform name
        name: String,
        /// Assigned value
        value: UniformValue,
    },
    /// Texture upload
    UploadTexture {
        /// Assigned handle
        texture: TextureHandle,
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Texture bound to a unit
    BindTexture {
        /// Bound texture
        texture: TextureHandle,
        /// Sampler unit
        unit: u32,
    },
    /// Draw call
    Draw(MeshHandle),
    /// Viewport change
    SetViewport {
        /// Width in pixels
        width: u32,
        /// Height in pixels
        height: u32,
    },
    /// Clear colour change
    SetClearColor([f32; 4]),
    /// Buffer clear
    Clear,
    /// Frame presented
    SwapBuffers,
}

/// Backend that records calls instead of drawing
#[derive(Debug, Default)]
pub struct RecordingBackend {
    calls: Vec<BackendCall>,
    meshes: HashMap<MeshHandle, usize>,
    programs: HashSet<ProgramHandle>,
    textures: HashSet<TextureHandle>,
    current_program: Option<ProgramHandle>,
    next_handle: u64,
    viewport: (u32, u32),
    clear_color: [f32; 4],
    frames_presented: u64,
}

impl RecordingBackend {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call recorded so far
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Drain the call log
    pub fn take_calls(&mut self) -> Vec<BackendCall> {
        std::mem::take(&mut self.calls)
    }

    /// Meshes drawn, in call order
    pub fn draw_calls(&self) -> Vec<MeshHandle> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Draw(mesh) => Some(*mesh),
                _ => None,
            })
            .collect()
    }

    /// Values assigned to a named uniform, in call order
    pub fn uniform_writes(&self, name: &str) -> Vec<UniformValue> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::SetUniform { name: written, value, .. } if written == name => Some(*value),
                _ => None,
            })
            .collect()
    }

    /// Number of `swap_buffers` calls
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Current viewport size
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Current clear colour
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Vertex count of an uploaded mesh
    pub fn mesh_vertex_count(&self, mesh: MeshHandle) -> Option<usize> {
        self.meshes.get(&mesh).copied()
    }

    /// Program most recently made current
    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    fn next_id(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn check_program(&self, program: ProgramHandle) -> BackendResult<()> {
        if self.programs.contains(&program) {
            Ok(())
        } else {
            Err(BackendError::UnknownProgram(program))
        }
    }
}

impl GraphicsBackend for RecordingBackend {
    fn upload_mesh(&mut self, vertices: &[Vertex]) -> BackendResult<MeshHandle> {
        let byte_len = bytemuck::cast_slice::<Vertex, u8>(vertices).len();
        let mesh = MeshHandle(self.next_id());
        self.meshes.insert(mesh, vertices.len());
        self.calls.push(BackendCall::UploadMesh { mesh, vertex_count: vertices.len(), byte_len });
        Ok(mesh)
    }

    fn compile_program(&mut self, vertex_source: &str, fragment_source: &str) -> BackendResult<ProgramHandle> {
        for (stage, source) in [("vertex", vertex_source), ("fragment", fragment_source)] {
            if source.trim().is_empty() {
                return Err(BackendError::ShaderCompilation(format!("{} shader source is empty", stage)));
            }
            if !source.contains("main") {
                return Err(BackendError::ProgramLink(format!("{} shader has no entry point", stage)));
            }
        }
        let program = ProgramHandle(self.next_id());
        self.programs.insert(program);
        self.calls.push(BackendCall::CompileProgram(program));
        Ok(program)
    }

    fn use_program(&mut self, program: ProgramHandle) -> BackendResult<()> {
        self.check_program(program)?;
        self.current_program = Some(program);
        self.calls.push(BackendCall::UseProgram(program));
        Ok(())
    }

    fn set_uniform(&mut self, program: ProgramHandle, name: &str, value: UniformValue) -> BackendResult<()> {
        self.check_program(program)?;
        self.calls.push(BackendCall::SetUniform { program, name: name.to_string(), value });
        Ok(())
    }

    fn upload_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> BackendResult<TextureHandle> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 || rgba.len() != expected {
            return Err(BackendError::ResourceLoad(format!(
                "texture {}x{} needs {} bytes of RGBA data, got {}",
                width, height, expected, rgba.len()
            )));
        }
        let texture = TextureHandle(self.next_id());
        self.textures.insert(texture);
        self.calls.push(BackendCall::UploadTexture { texture, width, height });
        Ok(texture)
    }

    fn bind_texture(&mut self, texture: TextureHandle, unit: u32) -> BackendResult<()> {
        if !self.textures.contains(&texture) {
            return Err(BackendError::UnknownTexture(texture));
        }
        self.calls.push(BackendCall::BindTexture { texture, unit });
        Ok(())
    }

    fn draw(&mut self, mesh: MeshHandle) -> BackendResult<()> {
        if !self.meshes.contains_key(&mesh) {
            return Err(BackendError::UnknownMesh(mesh));
        }
        self.calls.push(BackendCall::Draw(mesh));
        Ok(())
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.calls.push(BackendCall::SetViewport { width, height });
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        self.clear_color = color;
        self.calls.push(BackendCall::SetClearColor(color));
    }

    fn clear(&mut self) {
        self.calls.push(BackendCall::Clear);
    }

    fn swap_buffers(&mut self) -> BackendResult<()> {
        self.frames_presented += 1;
        self.calls.push(BackendCall::SwapBuffers);
        log::trace!("Presented frame {}", self.frames_presented);
        Ok(())
    }
}
