//! # Vertex Engine
//!
//! A minimal scene-graph engine with a component lifecycle and a cached
//! transform hierarchy.
//!
//! ## Features
//!
//! - **Scene graph**: entities with exactly one transform each, parented through
//!   an arena of transform nodes with lazily rebuilt world matrices
//! - **Components**: trait objects with `awake`/`start`/`update`/`on_enable`/
//!   `on_disable`/`on_destroy` hooks driven by the scene
//! - **Deferred mutation**: entities added or removed mid-frame take effect at
//!   the next update
//! - **Backend seam**: rendering goes through the [`render::GraphicsBackend`]
//!   trait; [`render::RecordingBackend`] runs everything headless
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use vertex_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let scene = engine.scene_mut().ok_or_else(|| AppError::Custom("no scene".into()))?;
//!         let camera = scene.create_entity("Camera");
//!         scene.add_component(camera, Camera::default())?;
//!         scene.add_component(camera, CameraController::default())?;
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = MyApp;
//!     let mut engine = Engine::new(RecordingBackend::new());
//!     engine.initialize(EngineConfig::default(), None, &mut app)?;
//!     engine.start()?;
//!     engine.run_frames(&mut app, 60)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod foundation;
pub mod config;
pub mod input;
pub mod ecs;
pub mod scene;
pub mod render;

mod application;
mod engine;

pub use application::{AppError, AppEvent, Application};
pub use engine::{Engine, EngineConfig, EngineError, WindowConfig};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AppError, AppEvent, Application,
        Engine, EngineConfig, EngineError,
        config::Config,
        foundation::{
            math::{Mat4, Quat, Vec2, Vec3},
            time::FrameTime,
        },
        ecs::{Component, ComponentContext, ComponentError, EntityId},
        ecs::components::{Camera, CameraController, MeshRenderer, Transform},
        scene::{Scene, SceneError},
        render::{GraphicsBackend, Material, Mesh, RecordingBackend, Vertex},
        input::{InputState, KeyCode, MouseButton},
    };
}
