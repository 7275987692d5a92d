//! Free-look camera controller
//!
//! WASD moves along the camera's front and right vectors, Space and Left
//! Shift move along its up vector. Mouse motion adjusts yaw and pitch.

use crate::ecs::components::Camera;
use crate::ecs::{Component, ComponentContext, ComponentError};
use crate::foundation::math::{utils, Vec2, Vec3};
use crate::input::KeyCode;

/// Default movement speed in units per second
pub const DEFAULT_SPEED: f32 = 5.5;

/// Default mouse sensitivity in degrees per pixel per second
pub const DEFAULT_SENSITIVITY: f32 = 8.0;

const PITCH_LIMIT: f32 = 89.0;

/// Steers a sibling [`Camera`] from keyboard and mouse input
#[derive(Debug, Clone)]
pub struct CameraController {
    /// Movement speed in units per second
    pub speed: f32,
    /// Look sensitivity in degrees per pixel per second
    pub sensitivity: f32,
    yaw: f32,
    pitch: f32,
    last_mouse: Option<Vec2>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED, DEFAULT_SENSITIVITY)
    }
}

impl CameraController {
    /// Create a controller looking down -Z
    pub fn new(speed: f32, sensitivity: f32) -> Self {
        Self {
            speed,
            sensitivity,
            yaw: -90.0,
            pitch: 0.0,
            last_mouse: None,
        }
    }

    /// Yaw in degrees (-90 looks down -Z)
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees, clamped to +/-89
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// View direction for the current yaw and pitch
    pub fn front(&self) -> Vec3 {
        let yaw = utils::deg_to_rad(self.yaw);
        let pitch = utils::deg_to_rad(self.pitch);
        Vec3::new(pitch.cos() * yaw.cos(), pitch.sin(), pitch.cos() * yaw.sin())
    }

    fn look(&mut self, delta: Vec2, delta_time: f32) {
        self.yaw += delta.x * self.sensitivity * delta_time;
        self.pitch = (self.pitch - delta.y * self.sensitivity * delta_time).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }
}

impl Component for CameraController {
    fn start(&mut self, ctx: &mut ComponentContext<'_>) {
        let front = self.front();
        match ctx.get_component_mut::<Camera>() {
            Some(camera) => camera.update_vectors(front),
            None => log::warn!("CameraController on '{}' has no Camera to steer", ctx.entity_name()),
        }
    }

    fn update(&mut self, ctx: &mut ComponentContext<'_>, delta_time: f64) -> Result<(), ComponentError> {
        let Some(input) = ctx.input() else {
            return Ok(());
        };
        let delta_time = delta_time as f32;

        let (front, right, up) = {
            let camera = ctx
                .get_component::<Camera>()
                .ok_or(ComponentError::MissingDependency("Camera"))?;
            (camera.front(), camera.right(), camera.up())
        };

        let step = self.speed * delta_time;
        let bindings = [
            (KeyCode::W, front),
            (KeyCode::S, -front),
            (KeyCode::D, right),
            (KeyCode::A, -right),
            (KeyCode::Space, up),
            (KeyCode::LeftShift, -up),
        ];
        let movement = bindings
            .into_iter()
            .filter(|(key, _)| input.is_key_down(*key))
            .fold(Vec3::zeros(), |acc, (_, direction)| acc + direction * step);

        if movement != Vec3::zeros() {
            if let Some(mut transform) = ctx.transform_mut() {
                transform.translate(movement);
            }
        }

        // The first sample only seeds the reference position
        if let Some(position) = input.mouse_position() {
            if let Some(last) = self.last_mouse.replace(position) {
                let delta = position - last;
                if delta != Vec2::zeros() {
                    self.look(delta, delta_time);
                    let front = self.front();
                    if let Some(camera) = ctx.get_component_mut::<Camera>() {
                        camera.update_vectors(front);
                    }
                }
            }
        }

        Ok(())
    }
}
