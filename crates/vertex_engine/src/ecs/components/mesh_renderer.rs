//! Mesh renderer component

use crate::ecs::Component;
use crate::render::{BackendResult, Material, Mesh, RenderContext, Renderable, UniformValue};

/// Draws a mesh with a material at the owning entity's world transform
///
/// Renders nothing until both a mesh and a material are assigned.
#[derive(Debug, Clone, Default)]
pub struct MeshRenderer {
    /// Geometry to draw
    pub mesh: Option<Mesh>,
    /// Program and uniforms to draw with
    pub material: Option<Material>,
}

impl MeshRenderer {
    /// Create a renderer with both mesh and material assigned
    pub fn new(mesh: Mesh, material: Material) -> Self {
        Self {
            mesh: Some(mesh),
            material: Some(material),
        }
    }
}

impl Renderable for MeshRenderer {
    fn render(&self, ctx: &mut RenderContext<'_>) -> BackendResult<()> {
        let (Some(mesh), Some(material)) = (&self.mesh, &self.material) else {
            return Ok(());
        };

        material.apply(ctx.backend)?;
        let program = material.program();
        ctx.backend.set_uniform(program, "model", UniformValue::Mat4(ctx.model))?;
        if let Some(camera) = ctx.camera {
            ctx.backend.set_uniform(program, "view", UniformValue::Mat4(camera.view))?;
            ctx.backend.set_uniform(program, "projection", UniformValue::Mat4(camera.projection))?;
            ctx.backend.set_uniform(program, "viewPos", UniformValue::Vec3(camera.position))?;
        }
        mesh.draw(ctx.backend)
    }
}

impl Component for MeshRenderer {
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }
}
