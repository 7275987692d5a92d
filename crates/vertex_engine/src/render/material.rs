//! Materials: a program plus the uniform values and textures it draws with

use crate::foundation::math::{Mat4, Vec3};
use crate::render::{BackendResult, GraphicsBackend, ProgramHandle, TextureHandle, UniformValue};

/// Shader program with its uniform table and texture bindings
///
/// Uniforms are applied in the order they were first set; setting the same
/// name again replaces the value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    program: ProgramHandle,
    uniforms: Vec<(String, UniformValue)>,
    textures: Vec<(u32, TextureHandle)>,
}

impl Material {
    /// Create a material for a compiled program
    pub fn new(program: ProgramHandle) -> Self {
        Self {
            program,
            uniforms: Vec::new(),
            textures: Vec::new(),
        }
    }

    /// Program this material draws with
    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Set any uniform value
    pub fn set_uniform(&mut self, name: impl Into<String>, value: UniformValue) -> &mut Self {
        let name = name.into();
        match self.uniforms.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.uniforms.push((name, value)),
        }
        self
    }

    /// Set an integer uniform
    pub fn set_int(&mut self, name: impl Into<String>, value: i32) -> &mut Self {
        self.set_uniform(name, UniformValue::Int(value))
    }

    /// Set a float uniform
    pub fn set_float(&mut self, name: impl Into<String>, value: f32) -> &mut Self {
        self.set_uniform(name, UniformValue::Float(value))
    }

    /// Set a vector uniform
    pub fn set_vec3(&mut self, name: impl Into<String>, value: Vec3) -> &mut Self {
        self.set_uniform(name, UniformValue::Vec3(value))
    }

    /// Set a matrix uniform
    pub fn set_mat4(&mut self, name: impl Into<String>, value: Mat4) -> &mut Self {
        self.set_uniform(name, UniformValue::Mat4(value))
    }

    /// Bind a texture to a sampler unit and point the named sampler at it
    pub fn set_texture(&mut self, name: impl Into<String>, texture: TextureHandle, unit: u32) -> &mut Self {
        match self.textures.iter_mut().find(|(existing, _)| *existing == unit) {
            Some((_, slot)) => *slot = texture,
            None => self.textures.push((unit, texture)),
        }
        let sampler = i32::try_from(unit).unwrap_or(i32::MAX);
        self.set_int(name, sampler)
    }

    /// Value currently stored for a uniform
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        self.uniforms
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    /// Texture bound to a unit
    pub fn texture(&self, unit: u32) -> Option<TextureHandle> {
        self.textures
            .iter()
            .find(|(existing, _)| *existing == unit)
            .map(|(_, texture)| *texture)
    }

    /// Make the program current, bind textures and upload every stored uniform
    pub fn apply(&self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        backend.use_program(self.program)?;
        for &(unit, texture) in &self.textures {
            backend.bind_texture(texture, unit)?;
        }
        for (name, value) in &self.uniforms {
            backend.set_uniform(self.program, name, *value)?;
        }
        Ok(())
    }
}
