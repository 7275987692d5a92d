//! Application trait and lifecycle management

use crate::config::ConfigError;
use crate::engine::{Engine, EngineError};
use crate::render::{BackendError, MeshError};
use crate::scene::SceneError;
use thiserror::Error;

/// Application lifecycle trait
///
/// Implement this trait to host your game or tool on the engine. The engine
/// calls back into it from [`Engine::initialize`], [`Engine::tick`] and
/// [`Engine::request_close`].
pub trait Application {
    /// Initialize the application
    ///
    /// Called once after the engine has configured the backend and installed
    /// the active scene. Build the initial scene content here.
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError>;

    /// Update the application
    ///
    /// Called every tick after the scene update.
    ///
    /// # Arguments
    /// * `engine` - Mutable reference to the engine
    /// * `delta_time` - Scaled time since last frame in seconds
    fn update(&mut self, _engine: &mut Engine, _delta_time: f64) -> Result<(), AppError> {
        Ok(())
    }

    /// Render the application
    ///
    /// Called after the scene has rendered and before the frame is presented.
    /// Use this for drawing that isn't owned by a component.
    fn render(&mut self, _engine: &mut Engine, _delta_time: f64) -> Result<(), AppError> {
        Ok(())
    }

    /// Cleanup the application
    ///
    /// Called when the engine is asked to close, before it stops.
    fn shutdown(&mut self, _engine: &mut Engine) {}
}

/// Application-level errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine error propagated to application level
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Scene operation failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Backend resource creation failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Mesh construction failed
    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Custom application error
    #[error("Application error: {0}")]
    Custom(String),
}

/// Host window and device events
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Window was resized
    WindowResized {
        /// New window width
        width: u32,
        /// New window height
        height: u32,
    },

    /// Window close requested
    WindowCloseRequested,

    /// Window lost focus; held keys and buttons are released
    WindowUnfocused,

    /// Key input event
    KeyInput {
        /// The key that was pressed/released
        key: crate::input::KeyCode,
        /// Whether the key was pressed (true) or released (false)
        pressed: bool,
    },

    /// Mouse button event
    MouseButton {
        /// The mouse button that was pressed/released
        button: crate::input::MouseButton,
        /// Whether the button was pressed (true) or released (false)
        pressed: bool,
    },

    /// Mouse movement
    MouseMoved {
        /// New X coordinate
        x: f64,
        /// New Y coordinate
        y: f64,
    },
}
