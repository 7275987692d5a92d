//! Core engine implementation

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    application::{AppEvent, Application},
    config::{Config, ConfigError},
    foundation::time::FrameTime,
    input::InputState,
    render::{BackendError, GraphicsBackend},
    scene::{Scene, SceneError},
};

/// Main engine struct
///
/// Owns the graphics backend, the active scene, the input snapshot and frame
/// timing. The host drives it one [`Engine::tick`] at a time; each tick runs
/// the scene update, then the scene render, then presents the frame.
pub struct Engine {
    backend: Box<dyn GraphicsBackend>,
    scene: Option<Scene>,
    input: InputState,
    time: FrameTime,
    config: EngineConfig,
    initialized: bool,
    running: bool,
    // Set whenever the viewport changes; applied once a camera is live
    aspect_dirty: bool,
}

impl Engine {
    /// Create an engine around a backend
    pub fn new(backend: impl GraphicsBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            scene: None,
            input: InputState::new(),
            time: FrameTime::new(),
            config: EngineConfig::default(),
            initialized: false,
            running: false,
            aspect_dirty: false,
        }
    }

    /// Configure the backend, install a scene and initialize the application
    ///
    /// Uses `scene` when given, otherwise keeps a scene installed earlier with
    /// [`Engine::set_active_scene`], otherwise creates an empty one named
    /// after `config.scene_name`.
    pub fn initialize<A: Application + ?Sized>(
        &mut self,
        config: EngineConfig,
        scene: Option<Scene>,
        app: &mut A,
    ) -> Result<(), EngineError> {
        if self.initialized {
            return Err(EngineError::AlreadyInitialized);
        }
        config.validate()?;
        log::info!(
            "Initializing engine '{}' ({}x{})",
            config.window.title,
            config.window.width,
            config.window.height
        );

        self.backend.set_viewport(config.window.width, config.window.height);
        self.backend.set_clear_color(config.clear_color);

        let scene = scene
            .or_else(|| self.scene.take())
            .unwrap_or_else(|| Scene::new(config.scene_name.clone()));
        log::info!("Active scene: '{}'", scene.name());
        self.scene = Some(scene);
        self.config = config;
        self.initialized = true;
        self.aspect_dirty = true;
        self.sync_aspect_ratio();

        app.initialize(self)
            .map_err(|e| EngineError::ApplicationError(format!("App initialization: {}", e)))
    }

    /// Begin accepting ticks
    pub fn start(&mut self) -> Result<(), EngineError> {
        if !self.initialized {
            return Err(EngineError::NotInitialized);
        }
        log::info!("Starting main loop...");
        self.running = true;
        Ok(())
    }

    /// Stop accepting ticks
    pub fn stop(&mut self) {
        if self.running {
            log::info!("Engine stopped after {} frames", self.time.frame_count());
        }
        self.running = false;
    }

    /// Shut the application down, then stop
    pub fn request_close<A: Application + ?Sized>(&mut self, app: &mut A) {
        log::info!("Engine shutdown requested");
        app.shutdown(self);
        self.stop();
    }

    /// Whether ticks currently run
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Whether [`Engine::initialize`] has completed
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Advance one frame
    ///
    /// Does nothing unless running. Failed component updates do not stop the
    /// frame: the rest of the tick runs and presents, then the failures are
    /// returned as [`SceneError::UpdateFailed`]. Backend failures are fatal
    /// and propagate immediately.
    pub fn tick<A: Application + ?Sized>(&mut self, app: &mut A, delta_time: f64) -> Result<(), EngineError> {
        if !self.running {
            return Ok(());
        }

        self.time.advance(delta_time);
        let delta_time = self.time.delta_time();

        let scene = self.scene.as_mut().ok_or(EngineError::NoActiveScene)?;
        let update_failures = match scene.update(delta_time, &self.input) {
            Ok(()) => None,
            Err(SceneError::UpdateFailed(failures)) => Some(failures),
            Err(e) => return Err(e.into()),
        };
        self.sync_aspect_ratio();

        app.update(self, delta_time)
            .map_err(|e| EngineError::ApplicationError(format!("App update: {}", e)))?;

        // The application may have asked to close
        if self.running {
            self.backend.clear();
            if let Some(scene) = &self.scene {
                scene.render(self.backend.as_mut())?;
            }
            app.render(self, delta_time)
                .map_err(|e| EngineError::ApplicationError(format!("App render: {}", e)))?;
            self.backend.swap_buffers()?;
        }

        match update_failures {
            Some(failures) => Err(SceneError::UpdateFailed(failures).into()),
            None => Ok(()),
        }
    }

    /// Run up to `frames` ticks at the configured fixed rate
    ///
    /// Failed component updates are logged and the loop keeps going; any
    /// other error stops it.
    pub fn run_frames<A: Application + ?Sized>(&mut self, app: &mut A, frames: u32) -> Result<(), EngineError> {
        let delta_time = 1.0 / self.config.update_frequency;
        for _ in 0..frames {
            if !self.running {
                break;
            }
            match self.tick(app, delta_time) {
                // Already logged per component by the scene
                Err(EngineError::Scene(SceneError::UpdateFailed(failures))) => {
                    log::warn!("Frame {} had {} failed component update(s)", self.time.frame_count(), failures.len());
                }
                result => result?,
            }
        }
        Ok(())
    }

    /// Handle an application event
    pub fn handle_event<A: Application + ?Sized>(&mut self, app: &mut A, event: AppEvent) {
        match event {
            AppEvent::WindowCloseRequested => self.request_close(app),
            AppEvent::WindowResized { width, height } => self.resize(width, height),
            AppEvent::WindowUnfocused => self.input.clear(),
            AppEvent::KeyInput { key, pressed } => self.input.handle_key_input(key, pressed),
            AppEvent::MouseButton { button, pressed } => self.input.handle_mouse_button(button, pressed),
            AppEvent::MouseMoved { x, y } => self.input.handle_mouse_move(x, y),
        }
    }

    /// Update the viewport and the main camera's aspect ratio
    ///
    /// A zero-sized window (minimized) is ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return;
        }
        self.config.window.width = width;
        self.config.window.height = height;
        self.backend.set_viewport(width, height);
        self.aspect_dirty = true;
        self.sync_aspect_ratio();
    }

    /// Replace the active scene, returning the previous one untouched
    pub fn set_active_scene(&mut self, scene: Scene) -> Option<Scene> {
        log::info!("Switching active scene to '{}'", scene.name());
        self.aspect_dirty = true;
        self.scene.replace(scene)
    }

    /// Active scene
    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Active scene, mutable
    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }

    /// Input snapshot read by components
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Input snapshot, for hosts feeding device state
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    /// Frame timing
    pub fn time(&self) -> &FrameTime {
        &self.time
    }

    /// Frame timing, mutable (time scale)
    pub fn time_mut(&mut self) -> &mut FrameTime {
        &mut self.time
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Graphics backend
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// Concrete backend, when it is a `T`
    pub fn backend_as<T: GraphicsBackend>(&self) -> Option<&T> {
        self.backend.as_ref().as_any().downcast_ref::<T>()
    }

    /// Concrete backend, mutable
    pub fn backend_as_mut<T: GraphicsBackend>(&mut self) -> Option<&mut T> {
        self.backend.as_mut().as_any_mut().downcast_mut::<T>()
    }

    fn sync_aspect_ratio(&mut self) {
        if !self.aspect_dirty {
            return;
        }
        let aspect = self.config.window.width as f32 / self.config.window.height as f32;
        if let Some(camera) = self.scene.as_mut().and_then(Scene::main_camera_mut) {
            camera.set_aspect_ratio(aspect);
            self.aspect_dirty = false;
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window configuration
    pub window: WindowConfig,

    /// Fixed tick rate used by [`Engine::run_frames`], in Hz
    pub update_frequency: f64,

    /// RGBA colour the frame is cleared to
    pub clear_color: [f32; 4],

    /// Name of the scene created when none is supplied
    pub scene_name: String,
}

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Window title
    pub title: String,

    /// Window width
    pub width: u32,

    /// Window height
    pub height: u32,

    /// Whether the cursor is captured for free-look
    pub cursor_grabbed: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vertex".to_string(),
            width: 800,
            height: 600,
            cursor_grabbed: true,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            update_frequency: 240.0,
            clear_color: [0.0, 0.3, 0.3, 1.0],
            scene_name: crate::scene::DEFAULT_SCENE_NAME.to_string(),
        }
    }
}

impl Config for EngineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be non-zero, got {}x{}",
                self.window.width, self.window.height
            )));
        }
        if !self.update_frequency.is_finite() || self.update_frequency <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "update_frequency must be positive, got {}",
                self.update_frequency
            )));
        }
        Ok(())
    }
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// `initialize` was called twice
    #[error("Engine is already initialized")]
    AlreadyInitialized,

    /// `start` was called before `initialize`
    #[error("Engine is not initialized")]
    NotInitialized,

    /// No scene is installed
    #[error("No active scene")]
    NoActiveScene,

    /// Scene update failed
    #[error("Scene error: {0}")]
    Scene(#[from] SceneError),

    /// Backend failure; fatal for the frame
    #[error("Rendering error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration rejected
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Application hook failed
    #[error("Application error: {0}")]
    ApplicationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::AppError;
    use crate::ecs::components::Camera;
    use crate::ecs::{Component, ComponentContext, ComponentError};
    use crate::render::{BackendCall, RecordingBackend};

    struct Faulty;

    impl Component for Faulty {
        fn update(&mut self, _ctx: &mut ComponentContext<'_>, _delta_time: f64) -> Result<(), ComponentError> {
            Err(ComponentError::Custom("broken".into()))
        }
    }

    #[derive(Default)]
    struct Recorder {
        calls: Vec<&'static str>,
        close_after: Option<usize>,
    }

    impl Application for Recorder {
        fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
            self.calls.push("initialize");
            let scene = engine.scene_mut().ok_or_else(|| AppError::Custom("no scene".into()))?;
            let camera = scene.create_entity("camera");
            scene.add_component(camera, Camera::default())?;
            Ok(())
        }

        fn update(&mut self, engine: &mut Engine, _delta_time: f64) -> Result<(), AppError> {
            self.calls.push("update");
            let updates = self.calls.iter().filter(|c| **c == "update").count();
            if self.close_after == Some(updates) {
                engine.request_close(self);
            }
            Ok(())
        }

        fn render(&mut self, _engine: &mut Engine, _delta_time: f64) -> Result<(), AppError> {
            self.calls.push("render");
            Ok(())
        }

        fn shutdown(&mut self, _engine: &mut Engine) {
            self.calls.push("shutdown");
        }
    }

    fn started_engine(app: &mut Recorder) -> Engine {
        let mut engine = Engine::new(RecordingBackend::new());
        engine.initialize(EngineConfig::default(), None, app).unwrap();
        engine.start().unwrap();
        engine
    }

    #[test]
    fn test_initialize_twice_fails() {
        let mut app = Recorder::default();
        let mut engine = Engine::new(RecordingBackend::new());
        engine.initialize(EngineConfig::default(), None, &mut app).unwrap();

        let err = engine.initialize(EngineConfig::default(), None, &mut app).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyInitialized));
        assert_eq!(app.calls, ["initialize"]);
    }

    #[test]
    fn test_start_requires_initialize() {
        let mut engine = Engine::new(RecordingBackend::new());
        assert!(matches!(engine.start(), Err(EngineError::NotInitialized)));

        // Ticking a stopped engine is a no-op
        let mut app = Recorder::default();
        engine.tick(&mut app, 0.1).unwrap();
        assert!(app.calls.is_empty());
    }

    #[test]
    fn test_initialize_configures_backend_and_default_scene() {
        let mut app = Recorder::default();
        let mut engine = Engine::new(RecordingBackend::new());
        let mut config = EngineConfig::default();
        config.scene_name = "Level 1".to_string();
        engine.initialize(config, None, &mut app).unwrap();

        assert_eq!(engine.scene().unwrap().name(), "Level 1");
        let backend = engine.backend_as::<RecordingBackend>().unwrap();
        assert_eq!(backend.viewport(), (800, 600));
        assert_eq!(backend.clear_color(), [0.0, 0.3, 0.3, 1.0]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut app = Recorder::default();
        let mut engine = Engine::new(RecordingBackend::new());
        let mut config = EngineConfig::default();
        config.window.width = 0;

        assert!(matches!(
            engine.initialize(config, None, &mut app),
            Err(EngineError::Config(ConfigError::Invalid(_)))
        ));
        assert!(!engine.is_initialized());
    }

    #[test]
    fn test_tick_order_and_presentation() {
        let mut app = Recorder::default();
        let mut engine = started_engine(&mut app);
        engine.backend_as_mut::<RecordingBackend>().unwrap().take_calls();

        engine.tick(&mut app, 0.25).unwrap();

        assert_eq!(app.calls, ["initialize", "update", "render"]);
        let backend = engine.backend_as::<RecordingBackend>().unwrap();
        assert_eq!(backend.calls().first(), Some(&BackendCall::Clear));
        assert_eq!(backend.calls().last(), Some(&BackendCall::SwapBuffers));
        assert_eq!(backend.frames_presented(), 1);
        assert_eq!(engine.time().frame_count(), 1);
    }

    #[test]
    fn test_camera_aspect_follows_window() {
        let mut app = Recorder::default();
        let mut engine = started_engine(&mut app);

        // The camera becomes live on the first tick
        engine.tick(&mut app, 0.01).unwrap();
        let aspect = engine.scene().unwrap().main_camera().unwrap().aspect_ratio();
        assert!((aspect - 800.0 / 600.0).abs() < 1e-6);

        engine.resize(1000, 500);
        let aspect = engine.scene().unwrap().main_camera().unwrap().aspect_ratio();
        assert!((aspect - 2.0).abs() < 1e-6);
        assert_eq!(engine.backend_as::<RecordingBackend>().unwrap().viewport(), (1000, 500));

        engine.resize(0, 0);
        assert_eq!(engine.config().window.width, 1000);
    }

    #[test]
    fn test_request_close_from_update_skips_render() {
        let mut app = Recorder {
            close_after: Some(2),
            ..Recorder::default()
        };
        let mut engine = started_engine(&mut app);

        engine.run_frames(&mut app, 10).unwrap();

        assert!(!engine.is_running());
        assert_eq!(app.calls, ["initialize", "update", "render", "update", "shutdown"]);
        assert_eq!(engine.backend_as::<RecordingBackend>().unwrap().frames_presented(), 1);
    }

    #[test]
    fn test_set_active_scene_returns_previous() {
        let mut app = Recorder::default();
        let mut engine = started_engine(&mut app);

        let previous = engine.set_active_scene(Scene::new("next")).unwrap();
        assert_eq!(previous.name(), "Scene");
        assert_eq!(previous.entity_count(), 1);
        assert_eq!(engine.scene().unwrap().name(), "next");
    }

    #[test]
    fn test_scene_installed_before_initialize_is_kept() {
        let mut app = Recorder::default();
        let mut engine = Engine::new(RecordingBackend::new());
        engine.set_active_scene(Scene::new("preloaded"));
        engine.initialize(EngineConfig::default(), None, &mut app).unwrap();
        assert_eq!(engine.scene().unwrap().name(), "preloaded");
    }

    #[test]
    fn test_time_scale_reaches_scene() {
        let mut app = Recorder::default();
        let mut engine = started_engine(&mut app);
        engine.time_mut().set_time_scale(0.5);

        engine.tick(&mut app, 0.2).unwrap();
        assert!((engine.time().delta_time() - 0.1).abs() < 1e-12);
        assert!((engine.time().unscaled_delta_time() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_failed_component_update_still_presents_frame() {
        let mut app = Recorder::default();
        let mut engine = Engine::new(RecordingBackend::new());
        let mut scene = Scene::new("faulty");
        let broken = scene.create_entity("broken");
        scene.add_component(broken, Faulty).unwrap();
        engine.set_active_scene(scene);
        engine.initialize(EngineConfig::default(), None, &mut app).unwrap();
        engine.start().unwrap();

        let err = engine.tick(&mut app, 0.1).unwrap_err();
        match err {
            EngineError::Scene(SceneError::UpdateFailed(failures)) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].entity, broken);
                assert_eq!(failures[0].message, "broken");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(app.calls, ["initialize", "update", "render"]);
        assert_eq!(engine.backend_as::<RecordingBackend>().unwrap().frames_presented(), 1);

        // The fixed-rate loop keeps running past failed updates
        engine.run_frames(&mut app, 3).unwrap();
        assert!(engine.is_running());
        assert_eq!(engine.backend_as::<RecordingBackend>().unwrap().frames_presented(), 4);
    }

    #[test]
    fn test_events_feed_input_and_close() {
        let mut app = Recorder::default();
        let mut engine = started_engine(&mut app);

        engine.handle_event(&mut app, AppEvent::KeyInput { key: crate::input::KeyCode::W, pressed: true });
        assert!(engine.input().is_key_down(crate::input::KeyCode::W));
        engine.handle_event(&mut app, AppEvent::WindowUnfocused);
        assert!(!engine.input().is_key_down(crate::input::KeyCode::W));

        engine.handle_event(&mut app, AppEvent::WindowCloseRequested);
        assert!(!engine.is_running());
        assert_eq!(app.calls.last(), Some(&"shutdown"));
    }

    #[test]
    fn test_config_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            update_frequency = 60.0

            [window]
            title = "Cube"
            width = 1024
            "#,
        )
        .unwrap();

        assert_eq!(config.window.title, "Cube");
        assert_eq!(config.window.width, 1024);
        assert_eq!(config.window.height, 600);
        assert_eq!(config.update_frequency, 60.0);
        assert_eq!(config.scene_name, "Scene");
    }
}
