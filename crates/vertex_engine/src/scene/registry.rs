//! Scene registry
//!
//! Owns every entity and the transform tree, and drives component lifecycles.
//!
//! Structural changes are deferred: `create_entity` and `remove_entity` only
//! append to pending buffers, and those buffers are drained at the start of
//! the next [`Scene::update`]. The live sequence therefore never changes while
//! it is being traversed, no matter what components do from their hooks.

use std::any::TypeId;

use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;

use crate::ecs::components::{Camera, CameraMatrices, Transform};
use crate::ecs::{Capabilities, Component, ComponentContext, ComponentError, Entity, EntityId, LifecyclePhase};
use crate::foundation::any::AsAny;
use crate::foundation::math::{Mat4, Vec3};
use crate::input::InputState;
use crate::render::{BackendResult, GraphicsBackend, RenderContext};
use crate::scene::{HierarchyError, TransformId, TransformMut, TransformTree};

/// Default scene name
pub const DEFAULT_SCENE_NAME: &str = "Scene";

/// One component update that failed during a tick
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentFailure {
    /// Entity owning the component
    pub entity: EntityId,
    /// Entity name at the time of failure
    pub entity_name: String,
    /// Component type name
    pub component: &'static str,
    /// Rendered error
    pub message: String,
}

/// Scene errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Entity handle is stale or belongs to another scene
    #[error("Unknown entity: {0:?}")]
    UnknownEntity(EntityId),

    /// The transform is structural and cannot be removed
    #[error("The transform component cannot be removed from an entity")]
    TransformRemoval,

    /// Every entity already owns exactly one transform
    #[error("Entities own exactly one transform; attach other components instead")]
    DuplicateTransform,

    /// Hierarchy change rejected
    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    /// Component removed itself before `add_component` returned
    #[error("Component {0} was removed during attach")]
    DetachedDuringAttach(&'static str),

    /// One or more component updates failed; the rest of the tick still ran
    #[error("{} component update(s) failed", .0.len())]
    UpdateFailed(Vec<ComponentFailure>),
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Awake,
    Start,
    Enable,
    Disable,
    Update(f64),
}

/// Container of entities with deferred structural mutation
pub struct Scene {
    name: String,
    active: bool,
    entities: SlotMap<EntityId, Entity>,
    transforms: TransformTree,
    owners: SecondaryMap<TransformId, EntityId>,
    live: Vec<EntityId>,
    // Present for every live entity; the flag records a queued removal
    live_flags: SecondaryMap<EntityId, bool>,
    pending_add: Vec<EntityId>,
    pending_remove: Vec<EntityId>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(DEFAULT_SCENE_NAME)
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("live", &self.live.len())
            .field("pending_add", &self.pending_add.len())
            .field("pending_remove", &self.pending_remove.len())
            .finish()
    }
}

impl Scene {
    /// Create an empty, active scene
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            entities: SlotMap::with_key(),
            transforms: TransformTree::new(),
            owners: SecondaryMap::new(),
            live: Vec::new(),
            live_flags: SecondaryMap::new(),
            pending_add: Vec::new(),
            pending_remove: Vec::new(),
        }
    }

    /// Scene name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the scene
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the scene updates and renders
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Pause or resume the whole scene
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    // ---------------------------------------------------------------------
    // Entity population
    // ---------------------------------------------------------------------

    /// Create an entity with its transform
    ///
    /// The id is usable immediately (components can be attached), but the
    /// entity is only visited by update and render after the next sync point.
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        let transform = self.transforms.insert(Transform::default());
        let entity = self.entities.insert(Entity::new(name, transform));
        self.owners.insert(transform, entity);
        self.pending_add.push(entity);
        log::debug!("Created entity {:?} '{}'", entity, self.entities[entity].name());
        entity
    }

    /// Queue a live entity for removal at the next sync point
    ///
    /// Returns `false` (and does nothing) when the entity is not live or is
    /// already queued.
    pub fn remove_entity(&mut self, entity: EntityId) -> bool {
        match self.live_flags.get_mut(entity) {
            Some(queued) if !*queued => {
                *queued = true;
                self.pending_remove.push(entity);
                true
            }
            _ => {
                log::debug!("Ignoring removal of entity {:?}: not live or already queued", entity);
                false
            }
        }
    }

    /// Whether the entity is in the live sequence
    pub fn is_live(&self, entity: EntityId) -> bool {
        self.live_flags.contains_key(entity)
    }

    /// Whether the entity exists (live or pending)
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    /// Live entities in update order
    pub fn live_entities(&self) -> &[EntityId] {
        &self.live
    }

    /// Number of entities, live or pending
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// First entity with the given name, live entities first
    pub fn find_entity(&self, name: &str) -> Option<EntityId> {
        self.live
            .iter()
            .chain(self.pending_add.iter())
            .copied()
            .find(|&id| self.entities.get(id).is_some_and(|entity| entity.name() == name))
    }

    /// Entity data
    pub fn entity(&self, entity: EntityId) -> Option<&Entity> {
        self.entities.get(entity)
    }

    /// Mutable entity data
    pub fn entity_mut(&mut self, entity: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(entity)
    }

    /// Activate or deactivate an entity, propagating to every component
    pub fn set_entity_active(&mut self, entity: EntityId, active: bool) -> Result<(), SceneError> {
        self.toggle_entity(entity, active, None)
    }

    // ---------------------------------------------------------------------
    // Components
    // ---------------------------------------------------------------------

    /// Attach a component
    ///
    /// Runs `awake`, then, when the entity is active, `on_enable` and
    /// `start`. Returns the attached component for further setup.
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<&mut T, SceneError> {
        self.attach(entity, component, None)
    }

    /// First component of type `T`; the transform is always found
    pub fn get_component<T: Component>(&self, entity: EntityId) -> Option<&T> {
        let owner = self.entities.get(entity)?;
        if TypeId::of::<T>() == TypeId::of::<Transform>() {
            return self.transforms.get(owner.transform_id())?.as_any().downcast_ref::<T>();
        }
        owner.get_component::<T>()
    }

    /// Mutable access to the first component of type `T`
    ///
    /// The transform is not reachable here; use [`Scene::transform_mut`] so
    /// cached matrices stay consistent.
    pub fn get_component_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities.get_mut(entity)?.get_component_mut::<T>()
    }

    /// All components of type `T` in attach order
    pub fn get_components<T: Component>(&self, entity: EntityId) -> Vec<&T> {
        if TypeId::of::<T>() == TypeId::of::<Transform>() {
            return self.get_component::<T>(entity).into_iter().collect();
        }
        self.entities
            .get(entity)
            .map(Entity::get_components::<T>)
            .unwrap_or_default()
    }

    /// Remove the first component of type `T`
    ///
    /// Returns whether a component was found. Its `on_destroy` runs exactly
    /// once; a second request finds nothing.
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<bool, SceneError> {
        self.detach::<T>(entity, None)
    }

    /// Enable or disable the first component of type `T`
    ///
    /// Returns whether a component was found. Setting the current state again
    /// fires no hooks.
    pub fn set_component_enabled<T: Component>(&mut self, entity: EntityId, enabled: bool) -> Result<bool, SceneError> {
        self.toggle_component::<T>(entity, enabled, None)
    }

    /// Enabled flag of the first component of type `T`
    pub fn is_component_enabled<T: Component>(&self, entity: EntityId) -> Option<bool> {
        self.entities
            .get(entity)?
            .lifecycle_phase::<T>()
            .map(|phase| phase == LifecyclePhase::Enabled)
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    /// Entity's transform
    pub fn transform(&self, entity: EntityId) -> Option<&Transform> {
        self.transforms.get(self.entities.get(entity)?.transform_id())
    }

    /// Entity's transform, for writing
    pub fn transform_mut(&mut self, entity: EntityId) -> Option<TransformMut<'_>> {
        let id = self.entities.get(entity)?.transform_id();
        self.transforms.get_mut(id)
    }

    /// Entity's world matrix
    pub fn world_matrix(&self, entity: EntityId) -> Option<Mat4> {
        self.transforms.world_matrix(self.entities.get(entity)?.transform_id())
    }

    /// Entity's world-space position
    pub fn world_position(&self, entity: EntityId) -> Option<Vec3> {
        self.transforms.world_position(self.entities.get(entity)?.transform_id())
    }

    /// The scene's transform tree
    pub fn transforms(&self) -> &TransformTree {
        &self.transforms
    }

    /// Re-parent an entity under another, or detach it with `None`
    pub fn set_parent(&mut self, child: EntityId, parent: Option<EntityId>) -> Result<(), SceneError> {
        let child_node = self.transform_id(child)?;
        let parent_node = parent.map(|p| self.transform_id(p)).transpose()?;
        self.transforms.set_parent(child_node, parent_node)?;
        Ok(())
    }

    /// Entity whose transform is this entity's parent
    pub fn parent_of(&self, entity: EntityId) -> Option<EntityId> {
        let parent = self.transform(entity)?.parent()?;
        self.owners.get(parent).copied()
    }

    /// Entities parented directly under this one, in attach order
    pub fn children_of(&self, entity: EntityId) -> Vec<EntityId> {
        self.transform(entity)
            .map(|transform| {
                transform
                    .children()
                    .iter()
                    .filter_map(|child| self.owners.get(*child).copied())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn transform_id(&self, entity: EntityId) -> Result<TransformId, SceneError> {
        self.entities
            .get(entity)
            .map(Entity::transform_id)
            .ok_or(SceneError::UnknownEntity(entity))
    }

    // ---------------------------------------------------------------------
    // Cameras
    // ---------------------------------------------------------------------

    /// First enabled camera on an active live entity, in live order
    pub fn main_camera(&self) -> Option<&Camera> {
        self.main_camera_entry().map(|(_, camera)| camera)
    }

    /// Entity holding the main camera
    pub fn main_camera_entity(&self) -> Option<EntityId> {
        self.main_camera_entry().map(|(entity, _)| entity)
    }

    /// Mutable access to the main camera
    pub fn main_camera_mut(&mut self) -> Option<&mut Camera> {
        let entity = self.main_camera_entity()?;
        self.entities
            .get_mut(entity)?
            .components
            .iter_mut()
            .filter(|slot| slot.is_reachable() && slot.phase == LifecyclePhase::Enabled)
            .filter(|slot| slot.capabilities.contains(Capabilities::CAMERA))
            .find_map(|slot| slot.body.as_deref_mut()?.as_camera_mut())
    }

    /// View and projection of the main camera, placed at its world position
    pub fn camera_matrices(&self) -> Option<CameraMatrices> {
        let (entity, camera) = self.main_camera_entry()?;
        let position = self.world_position(entity)?;
        Some(camera.matrices(position))
    }

    fn main_camera_entry(&self) -> Option<(EntityId, &Camera)> {
        self.live.iter().find_map(|&id| {
            let entity = self.entities.get(id).filter(|entity| entity.is_active())?;
            entity
                .with_capability(Capabilities::CAMERA)
                .find_map(|component| component.as_camera())
                .map(|camera| (id, camera))
        })
    }

    // ---------------------------------------------------------------------
    // Frame
    // ---------------------------------------------------------------------

    /// Apply pending structural changes, then update every live entity
    ///
    /// Component failures do not stop the traversal: every other component
    /// still updates, each failure is logged, and the call returns
    /// [`SceneError::UpdateFailed`] listing them.
    pub fn update(&mut self, delta_time: f64, input: &InputState) -> Result<(), SceneError> {
        if !self.active {
            log::trace!("Scene '{}' is inactive; skipping update", self.name);
            return Ok(());
        }

        self.sync(Some(input));

        let mut failures = Vec::new();
        for index in 0..self.live.len() {
            let entity = self.live[index];
            let Some(slot_ids) = self.entities.get(entity).filter(|e| e.is_active()).map(Entity::slot_ids) else {
                continue;
            };

            for slot_id in slot_ids {
                let Some(owner) = self.entities.get(entity) else {
                    break;
                };
                // An earlier component may have deactivated the entity
                if !owner.is_active() {
                    break;
                }
                let Some(slot) = owner.slot(slot_id) else {
                    continue;
                };
                if !slot.is_reachable() || slot.phase != LifecyclePhase::Enabled || slot.body.is_none() {
                    continue;
                }
                let component = slot.type_name;

                if let Err(error) = self.run_hook(entity, slot_id, Some(input), Hook::Update(delta_time)) {
                    let entity_name = self.entities.get(entity).map(|e| e.name().to_string()).unwrap_or_default();
                    log::error!("Component {} on '{}' failed to update: {}", component, entity_name, error);
                    failures.push(ComponentFailure {
                        entity,
                        entity_name,
                        component,
                        message: error.to_string(),
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(SceneError::UpdateFailed(failures))
        }
    }

    /// Draw every enabled renderable component of every active live entity
    pub fn render(&self, backend: &mut dyn GraphicsBackend) -> BackendResult<()> {
        if !self.active {
            return Ok(());
        }

        let camera = self.camera_matrices();
        for &id in &self.live {
            let Some(entity) = self.entities.get(id).filter(|entity| entity.is_active()) else {
                continue;
            };
            let model = self.transforms.world_matrix(entity.transform_id()).unwrap_or_else(Mat4::identity);

            for renderable in entity.renderables() {
                let mut ctx = RenderContext { backend: &mut *backend, model, camera: camera.as_ref() };
                renderable.render(&mut ctx)?;
            }
        }
        Ok(())
    }

    /// Drain pending adds (order kept), then pending removes
    fn sync(&mut self, input: Option<&InputState>) {
        if !self.pending_add.is_empty() {
            log::debug!("Scene '{}': {} entities become live", self.name, self.pending_add.len());
            for entity in std::mem::take(&mut self.pending_add) {
                if self.entities.contains_key(entity) {
                    self.live.push(entity);
                    self.live_flags.insert(entity, false);
                }
            }
        }

        if !self.pending_remove.is_empty() {
            log::debug!("Scene '{}': removing {} entities", self.name, self.pending_remove.len());
            let removed = std::mem::take(&mut self.pending_remove);
            for &entity in &removed {
                self.live_flags.remove(entity);
            }
            let live_flags = &self.live_flags;
            self.live.retain(|&id| live_flags.contains_key(id));
            for entity in removed {
                self.destroy_entity(entity, input);
            }
        }
    }

    fn destroy_entity(&mut self, entity: EntityId, input: Option<&InputState>) {
        let Some(slot_ids) = self.entities.get(entity).map(Entity::slot_ids) else {
            return;
        };
        // Components are destroyed in attach order while later siblings are still attached
        for slot_id in slot_ids {
            self.destroy_slot(entity, slot_id, input);
        }

        if let Some(removed) = self.entities.remove(entity) {
            if removed.component_count() > 0 {
                log::warn!(
                    "Entity '{}' gained components while being destroyed; dropping them without on_destroy",
                    removed.name()
                );
            }
            let transform = removed.transform_id();
            self.transforms.remove(transform);
            self.owners.remove(transform);
            log::debug!("Destroyed entity {:?} '{}'", entity, removed.name());
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle driving
    // ---------------------------------------------------------------------

    pub(crate) fn attach<T: Component>(
        &mut self,
        entity: EntityId,
        component: T,
        input: Option<&InputState>,
    ) -> Result<&mut T, SceneError> {
        if TypeId::of::<T>() == TypeId::of::<Transform>() {
            return Err(SceneError::DuplicateTransform);
        }
        let owner = self.entities.get_mut(entity).ok_or(SceneError::UnknownEntity(entity))?;
        let slot_id = owner.push_slot::<T>(Box::new(component));
        log::trace!("Attached {} to '{}'", std::any::type_name::<T>(), owner.name());

        self.set_phase(entity, slot_id, LifecyclePhase::Awake);
        self.invoke(entity, slot_id, input, Hook::Awake);
        self.reconcile(entity, slot_id, input);

        self.entities
            .get_mut(entity)
            .and_then(|owner| owner.downcast_slot_mut::<T>(slot_id))
            .ok_or(SceneError::DetachedDuringAttach(std::any::type_name::<T>()))
    }

    pub(crate) fn detach<T: Component>(&mut self, entity: EntityId, input: Option<&InputState>) -> Result<bool, SceneError> {
        if TypeId::of::<T>() == TypeId::of::<Transform>() {
            return Err(SceneError::TransformRemoval);
        }
        let owner = self.entities.get(entity).ok_or(SceneError::UnknownEntity(entity))?;
        let Some(slot_id) = owner.first_slot_of::<T>() else {
            return Ok(false);
        };
        self.destroy_slot(entity, slot_id, input);
        Ok(true)
    }

    pub(crate) fn toggle_component<T: Component>(
        &mut self,
        entity: EntityId,
        enabled: bool,
        input: Option<&InputState>,
    ) -> Result<bool, SceneError> {
        let owner = self.entities.get_mut(entity).ok_or(SceneError::UnknownEntity(entity))?;
        let Some(slot_id) = owner.first_slot_of::<T>() else {
            return Ok(false);
        };
        if let Some(slot) = owner.slot_mut(slot_id) {
            slot.enabled = enabled;
        }
        self.reconcile(entity, slot_id, input);
        Ok(true)
    }

    pub(crate) fn toggle_entity(&mut self, entity: EntityId, active: bool, input: Option<&InputState>) -> Result<(), SceneError> {
        let owner = self.entities.get_mut(entity).ok_or(SceneError::UnknownEntity(entity))?;
        if owner.active == active {
            return Ok(());
        }
        owner.active = active;
        for slot in &mut owner.components {
            slot.enabled = active;
        }
        log::debug!("Entity '{}' {}", owner.name(), if active { "activated" } else { "deactivated" });

        for slot_id in owner.slot_ids() {
            self.reconcile(entity, slot_id, input);
        }
        Ok(())
    }

    fn set_phase(&mut self, entity: EntityId, slot_id: u32, phase: LifecyclePhase) {
        if let Some(slot) = self.entities.get_mut(entity).and_then(|owner| owner.slot_mut(slot_id)) {
            slot.phase = phase;
        }
    }

    /// Drive a slot's phase towards its enabled flag, firing transition hooks
    ///
    /// A slot whose component is busy in one of its own hooks is skipped; it
    /// is reconciled again when that hook returns.
    fn reconcile(&mut self, entity: EntityId, slot_id: u32, input: Option<&InputState>) {
        let Some(owner) = self.entities.get(entity) else {
            return;
        };
        let Some(slot) = owner.slot(slot_id) else {
            return;
        };
        if !slot.is_reachable() || slot.body.is_none() {
            return;
        }

        let target = slot.enabled && owner.is_active();
        match (slot.phase, target) {
            (LifecyclePhase::Awake | LifecyclePhase::Disabled, true) => {
                self.set_phase(entity, slot_id, LifecyclePhase::Enabled);
                self.invoke(entity, slot_id, input, Hook::Enable);

                // on_enable may have switched the component straight back off
                let first_start = self
                    .entities
                    .get_mut(entity)
                    .and_then(|owner| owner.slot_mut(slot_id))
                    .filter(|slot| slot.phase == LifecyclePhase::Enabled && !slot.started)
                    .map(|slot| slot.started = true)
                    .is_some();
                if first_start {
                    self.invoke(entity, slot_id, input, Hook::Start);
                }
            }
            (LifecyclePhase::Enabled, false) => {
                self.set_phase(entity, slot_id, LifecyclePhase::Disabled);
                self.invoke(entity, slot_id, input, Hook::Disable);
            }
            (LifecyclePhase::Awake, false) => {
                self.set_phase(entity, slot_id, LifecyclePhase::Disabled);
            }
            _ => {}
        }
    }

    /// Run a hook that cannot fail
    fn invoke(&mut self, entity: EntityId, slot_id: u32, input: Option<&InputState>, hook: Hook) {
        if let Err(error) = self.run_hook(entity, slot_id, input, hook) {
            log::error!("Lifecycle hook {:?} failed: {}", hook, error);
        }
    }

    /// Take the component out of its slot, run one hook, and put it back
    fn run_hook(
        &mut self,
        entity: EntityId,
        slot_id: u32,
        input: Option<&InputState>,
        hook: Hook,
    ) -> Result<(), ComponentError> {
        let Some(mut body) = self
            .entities
            .get_mut(entity)
            .and_then(|owner| owner.slot_mut(slot_id))
            .and_then(|slot| slot.body.take())
        else {
            return Ok(());
        };

        let result = {
            let mut ctx = ComponentContext::new(self, entity, input);
            match hook {
                Hook::Awake => {
                    body.awake(&mut ctx);
                    Ok(())
                }
                Hook::Start => {
                    body.start(&mut ctx);
                    Ok(())
                }
                Hook::Enable => {
                    body.on_enable(&mut ctx);
                    Ok(())
                }
                Hook::Disable => {
                    body.on_disable(&mut ctx);
                    Ok(())
                }
                Hook::Update(delta_time) => body.update(&mut ctx, delta_time),
            }
        };

        self.restore(entity, slot_id, body, input);
        result
    }

    fn restore(&mut self, entity: EntityId, slot_id: u32, mut body: Box<dyn Component>, input: Option<&InputState>) {
        let Some(owner) = self.entities.get_mut(entity) else {
            return;
        };
        let Some(index) = owner.slot_index(slot_id) else {
            return;
        };

        if owner.components[index].doomed {
            // Removal was requested from inside the hook; finish it now
            let mut slot = owner.components.remove(index);
            slot.phase = LifecyclePhase::Destroyed;
            log::trace!("Destroying {} after its own hook returned", slot.type_name);
            let mut ctx = ComponentContext::new(self, entity, input);
            body.on_destroy(&mut ctx);
            return;
        }

        owner.components[index].body = Some(body);
        self.reconcile(entity, slot_id, input);
    }

    /// Detach a slot and fire `on_destroy`, or mark it if its component is busy
    fn destroy_slot(&mut self, entity: EntityId, slot_id: u32, input: Option<&InputState>) {
        let Some(owner) = self.entities.get_mut(entity) else {
            return;
        };
        let Some(index) = owner.slot_index(slot_id) else {
            return;
        };

        if owner.components[index].body.is_none() {
            owner.components[index].doomed = true;
            return;
        }

        let mut slot = owner.components.remove(index);
        slot.phase = LifecyclePhase::Destroyed;
        if let Some(mut body) = slot.body.take() {
            log::trace!("Destroying {} on '{}'", slot.type_name, owner.name());
            let mut ctx = ComponentContext::new(self, entity, input);
            body.on_destroy(&mut ctx);
        }
    }
}
