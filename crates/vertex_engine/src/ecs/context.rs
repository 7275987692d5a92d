//! Context handed to component hooks

use crate::ecs::components::Transform;
use crate::ecs::{Component, EntityId};
use crate::foundation::math::{Mat4, Vec3};
use crate::input::InputState;
use crate::scene::{Scene, SceneError, TransformMut};

/// Access to the owning entity and its scene from inside a hook
///
/// Structural changes requested here follow the scene's deferral rules:
/// entities created or removed take effect at the next sync point.
pub struct ComponentContext<'a> {
    scene: &'a mut Scene,
    entity: EntityId,
    input: Option<&'a InputState>,
}

impl<'a> ComponentContext<'a> {
    pub(crate) fn new(scene: &'a mut Scene, entity: EntityId, input: Option<&'a InputState>) -> Self {
        Self { scene, entity, input }
    }

    /// Entity owning the component
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Name of the owning entity
    pub fn entity_name(&self) -> &str {
        self.scene.entity(self.entity).map_or("", |entity| entity.name())
    }

    /// Input snapshot for this tick; `None` outside of a scene update
    pub fn input(&self) -> Option<&'a InputState> {
        self.input
    }

    /// Read-only view of the scene
    pub fn scene(&self) -> &Scene {
        self.scene
    }

    /// Owning entity's transform
    pub fn transform(&self) -> Option<&Transform> {
        self.scene.transform(self.entity)
    }

    /// Owning entity's transform, for writing
    pub fn transform_mut(&mut self) -> Option<TransformMut<'_>> {
        self.scene.transform_mut(self.entity)
    }

    /// Owning entity's world matrix
    pub fn world_matrix(&self) -> Option<Mat4> {
        self.scene.world_matrix(self.entity)
    }

    /// Owning entity's world-space position
    pub fn world_position(&self) -> Option<Vec3> {
        self.scene.world_position(self.entity)
    }

    /// Sibling component of type `T`
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.scene.get_component::<T>(self.entity)
    }

    /// Mutable sibling component of type `T`
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.scene.get_component_mut::<T>(self.entity)
    }

    /// Attach another component to the owning entity
    pub fn add_component<T: Component>(&mut self, component: T) -> Result<&mut T, SceneError> {
        self.scene.attach(self.entity, component, self.input)
    }

    /// Remove the first component of type `T` from the owning entity
    ///
    /// Removing the calling component itself is allowed; its `on_destroy`
    /// runs as soon as the current hook returns.
    pub fn remove_component<T: Component>(&mut self) -> Result<bool, SceneError> {
        self.scene.detach::<T>(self.entity, self.input)
    }

    /// Enable or disable the first component of type `T` on the owning entity
    pub fn set_component_enabled<T: Component>(&mut self, enabled: bool) -> Result<bool, SceneError> {
        self.scene.toggle_component::<T>(self.entity, enabled, self.input)
    }

    /// Activate or deactivate the owning entity
    pub fn set_active(&mut self, active: bool) -> Result<(), SceneError> {
        self.scene.toggle_entity(self.entity, active, self.input)
    }

    /// Create a new entity; it becomes live at the next sync point
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        self.scene.create_entity(name)
    }

    /// Queue an entity for removal at the next sync point
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.scene.remove_entity(entity)
    }

    /// Attach a component to another entity
    pub fn add_component_to<T: Component>(&mut self, entity: EntityId, component: T) -> Result<&mut T, SceneError> {
        self.scene.attach(entity, component, self.input)
    }

    /// Transform of another entity, for writing
    pub fn transform_of_mut(&mut self, entity: EntityId) -> Option<TransformMut<'_>> {
        self.scene.transform_mut(entity)
    }

    /// Re-parent another entity (or the owning one)
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), SceneError> {
        self.scene.set_parent(child, parent)
    }
}
