//! Entity implementation

use std::any::TypeId;

use slotmap::new_key_type;

use crate::ecs::components::Transform;
use crate::ecs::{Capabilities, Component, LifecyclePhase};
use crate::render::Renderable;
use crate::scene::TransformId;

new_key_type! {
    /// Entity identifier, stable for the entity's lifetime
    pub struct EntityId;
}

/// Storage for one attached component plus its lifecycle bookkeeping
pub(crate) struct ComponentSlot {
    pub(crate) id: u32,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
    pub(crate) capabilities: Capabilities,
    pub(crate) phase: LifecyclePhase,
    pub(crate) enabled: bool,
    pub(crate) started: bool,
    pub(crate) doomed: bool,
    // Taken out while one of the component's own hooks is running
    pub(crate) body: Option<Box<dyn Component>>,
}

impl ComponentSlot {
    fn new<T: Component>(id: u32, body: Box<dyn Component>) -> Self {
        Self {
            id,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            capabilities: Capabilities::of(body.as_ref()),
            phase: LifecyclePhase::Created,
            enabled: true,
            started: false,
            doomed: false,
            body: Some(body),
        }
    }

    pub(crate) fn is_reachable(&self) -> bool {
        !self.doomed && self.phase != LifecyclePhase::Destroyed
    }

    fn holds<T: Component>(&self) -> bool {
        self.is_reachable() && self.type_id == TypeId::of::<T>()
    }

    fn downcast<T: Component>(&self) -> Option<&T> {
        self.body.as_deref()?.as_any().downcast_ref::<T>()
    }

    fn downcast_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.body.as_deref_mut()?.as_any_mut().downcast_mut::<T>()
    }
}

/// Named container of components
///
/// Always owns exactly one transform node, held by handle in the scene's
/// transform tree. Other components are kept in attach order, which is also
/// their update and query order.
pub struct Entity {
    name: String,
    pub(crate) active: bool,
    transform: TransformId,
    pub(crate) components: Vec<ComponentSlot>,
    next_slot: u32,
}

impl Entity {
    pub(crate) fn new(name: impl Into<String>, transform: TransformId) -> Self {
        Self {
            name: name.into(),
            active: true,
            transform,
            components: Vec::new(),
            next_slot: 0,
        }
    }

    /// Entity name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the entity
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether the entity takes part in update and render
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Handle of the entity's transform node
    pub fn transform_id(&self) -> TransformId {
        self.transform
    }

    /// Number of attached components, not counting the transform
    pub fn component_count(&self) -> usize {
        self.components.iter().filter(|slot| slot.is_reachable()).count()
    }

    /// Type names of attached components in attach order
    pub fn component_names(&self) -> Vec<&'static str> {
        self.components
            .iter()
            .filter(|slot| slot.is_reachable())
            .map(|slot| slot.type_name)
            .collect()
    }

    /// Whether a component of type `T` is attached
    ///
    /// Always `true` for [`Transform`], which every entity owns.
    pub fn has_component<T: Component>(&self) -> bool {
        TypeId::of::<T>() == TypeId::of::<Transform>() || self.components.iter().any(ComponentSlot::holds::<T>)
    }

    /// First available component of type `T` in attach order
    ///
    /// The transform lives in the scene's transform tree, not on the entity,
    /// so `T = Transform` finds nothing here. Use
    /// [`Scene::get_component`](crate::scene::Scene::get_component) or
    /// [`Scene::transform`](crate::scene::Scene::transform) instead.
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.components
            .iter()
            .filter(|slot| slot.holds::<T>())
            .find_map(ComponentSlot::downcast::<T>)
    }

    /// Mutable access to the first available component of type `T`
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components
            .iter_mut()
            .filter(|slot| slot.holds::<T>())
            .find_map(ComponentSlot::downcast_mut::<T>)
    }

    /// All available components of type `T` in attach order
    ///
    /// Like [`Entity::get_component`], this never yields the transform.
    pub fn get_components<T: Component>(&self) -> Vec<&T> {
        self.components
            .iter()
            .filter(|slot| slot.holds::<T>())
            .filter_map(ComponentSlot::downcast::<T>)
            .collect()
    }

    /// Lifecycle phase of the first component of type `T`
    pub fn lifecycle_phase<T: Component>(&self) -> Option<LifecyclePhase> {
        self.components
            .iter()
            .find(|slot| slot.holds::<T>())
            .map(|slot| slot.phase)
    }

    /// Enabled renderable components in attach order
    pub fn renderables(&self) -> Vec<&dyn Renderable> {
        self.with_capability(Capabilities::RENDERABLE)
            .filter_map(|component| component.as_renderable())
            .collect()
    }

    /// Enabled components exposing a capability, in attach order
    pub(crate) fn with_capability(&self, capability: Capabilities) -> impl Iterator<Item = &dyn Component> + '_ {
        self.components
            .iter()
            .filter(move |slot| {
                slot.is_reachable()
                    && slot.phase == LifecyclePhase::Enabled
                    && slot.capabilities.contains(capability)
            })
            .filter_map(|slot| slot.body.as_deref())
    }

    pub(crate) fn push_slot<T: Component>(&mut self, body: Box<dyn Component>) -> u32 {
        let id = self.next_slot;
        self.next_slot += 1;
        self.components.push(ComponentSlot::new::<T>(id, body));
        id
    }

    pub(crate) fn slot_index(&self, id: u32) -> Option<usize> {
        self.components.iter().position(|slot| slot.id == id)
    }

    pub(crate) fn slot(&self, id: u32) -> Option<&ComponentSlot> {
        self.components.iter().find(|slot| slot.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: u32) -> Option<&mut ComponentSlot> {
        self.components.iter_mut().find(|slot| slot.id == id)
    }

    pub(crate) fn first_slot_of<T: Component>(&self) -> Option<u32> {
        self.components
            .iter()
            .find(|slot| slot.holds::<T>())
            .map(|slot| slot.id)
    }

    pub(crate) fn slot_ids(&self) -> Vec<u32> {
        self.components.iter().map(|slot| slot.id).collect()
    }

    pub(crate) fn downcast_slot_mut<T: Component>(&mut self, id: u32) -> Option<&mut T> {
        self.slot_mut(id)?.downcast_mut::<T>()
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("name", &self.name)
            .field("active", &self.active)
            .field("transform", &self.transform)
            .field("components", &self.component_names())
            .finish()
    }
}
