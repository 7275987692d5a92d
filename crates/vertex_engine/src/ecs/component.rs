//! Component trait and lifecycle types

use bitflags::bitflags;
use thiserror::Error;

use crate::ecs::components::Camera;
use crate::ecs::ComponentContext;
use crate::foundation::any::AsAny;
use crate::render::Renderable;
use crate::scene::SceneError;

/// Behaviour unit attached to an entity
///
/// Every hook defaults to a no-op. Hooks receive a [`ComponentContext`] giving
/// access to the owning entity, its siblings and the scene. While a hook runs
/// the component is detached from its slot, so looking up its own type from
/// inside the hook finds only other instances.
pub trait Component: AsAny {
    /// Called once, right after the component is attached
    fn awake(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once, on the first entry into the enabled state
    fn start(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once per tick while enabled on an active, live entity
    fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f64) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called on every transition into the enabled state
    fn on_enable(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called on every transition out of the enabled state
    fn on_disable(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Called once when the component is removed or its entity is destroyed
    fn on_destroy(&mut self, _ctx: &mut ComponentContext<'_>) {}

    /// Renderable view of this component, if it draws
    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    /// Camera view of this component, if it is one
    fn as_camera(&self) -> Option<&Camera> {
        None
    }

    /// Mutable camera view, paired with [`Component::as_camera`]
    fn as_camera_mut(&mut self) -> Option<&mut Camera> {
        None
    }
}

bitflags! {
    /// Optional interfaces a component exposes, resolved once at attach time
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Capabilities: u32 {
        /// Issues draw calls from `render`
        const RENDERABLE = 1 << 0;
        /// Supplies view and projection matrices
        const CAMERA = 1 << 1;
    }
}

impl Capabilities {
    /// Probe a component for the interfaces it exposes
    pub fn of(component: &dyn Component) -> Self {
        let mut capabilities = Self::empty();
        if component.as_renderable().is_some() {
            capabilities |= Self::RENDERABLE;
        }
        if component.as_camera().is_some() {
            capabilities |= Self::CAMERA;
        }
        capabilities
    }
}

/// Lifecycle phase of an attached component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecyclePhase {
    /// Constructed, hooks not yet run
    Created,
    /// `awake` has run; not yet enabled
    Awake,
    /// Receiving updates
    Enabled,
    /// Attached but switched off
    Disabled,
    /// `on_destroy` has run; no further hooks
    Destroyed,
}

/// Errors raised by component hooks
#[derive(Error, Debug)]
pub enum ComponentError {
    /// A sibling component the hook relies on is absent
    #[error("Missing required component: {0}")]
    MissingDependency(&'static str),

    /// Scene operation issued from the hook failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Component-specific failure
    #[error("{0}")]
    Custom(String),
}
