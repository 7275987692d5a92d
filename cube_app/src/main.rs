//! Lit cube demo application
//!
//! Builds a camera with a free-look controller, a textured cube lit by a
//! directional light, point lights and a camera-mounted spot light, plus a
//! small cube orbiting as its child. Runs headless on the recording backend
//! with scripted input and logs what was drawn.

use vertex_engine::foundation::logging;
use vertex_engine::foundation::math::{utils, Vec3};
use vertex_engine::prelude::*;
use vertex_engine::render::TextureHandle;

const CONFIG_PATH: &str = "cube_app.toml";
const FRAMES: u32 = 480;

const VERTEX_SHADER: &str = r#"
#version 330 core
layout (location = 0) in vec3 aPos;
layout (location = 1) in vec3 aNormal;
layout (location = 2) in vec2 aTexCoords;

out vec3 FragPos;
out vec3 Normal;
out vec2 TexCoords;

uniform mat4 model;
uniform mat4 view;
uniform mat4 projection;

void main()
{
    FragPos = vec3(model * vec4(aPos, 1.0));
    Normal = mat3(transpose(inverse(model))) * aNormal;
    TexCoords = aTexCoords;
    gl_Position = projection * view * vec4(FragPos, 1.0);
}
"#;

const FRAGMENT_SHADER: &str = r#"
#version 330 core
struct Material { sampler2D diffuse; sampler2D specular; float shininess; };
struct DirLight { vec3 direction; vec3 ambient; vec3 diffuse; vec3 specular; };

in vec3 FragPos;
in vec3 Normal;
in vec2 TexCoords;
out vec4 FragColor;

uniform vec3 viewPos;
uniform Material material;
uniform DirLight dirLight;

void main()
{
    vec3 norm = normalize(Normal);
    vec3 viewDir = normalize(viewPos - FragPos);
    vec3 lightDir = normalize(-dirLight.direction);
    vec3 reflectDir = reflect(-lightDir, norm);
    float diff = max(dot(norm, lightDir), 0.0);
    float spec = pow(max(dot(viewDir, reflectDir), 0.0), material.shininess);
    vec3 albedo = vec3(texture(material.diffuse, TexCoords));
    vec3 color = dirLight.ambient * albedo
        + dirLight.diffuse * diff * albedo
        + dirLight.specular * spec * vec3(texture(material.specular, TexCoords));
    FragColor = vec4(color, 1.0);
}
"#;

const POINT_LIGHTS: [[f32; 3]; 4] = [
    [0.7, 0.2, 2.0],
    [2.3, -3.3, -4.0],
    [-4.0, 2.0, -12.0],
    [0.0, 0.0, -3.0],
];

/// Spins its entity around the Y axis
struct Spinner {
    degrees_per_second: f32,
}

impl Component for Spinner {
    fn update(&mut self, ctx: &mut ComponentContext<'_>, delta_time: f64) -> Result<(), ComponentError> {
        let angle = utils::deg_to_rad(self.degrees_per_second) * delta_time as f32;
        if let Some(mut transform) = ctx.transform_mut() {
            transform.rotate(Vec3::new(0.0, angle, 0.0));
        }
        Ok(())
    }
}

fn checker_texture(backend: &mut dyn GraphicsBackend, dark: u8, light: u8) -> Result<TextureHandle, AppError> {
    const SIZE: u32 = 8;
    let pixels: Vec<u8> = (0..SIZE * SIZE)
        .flat_map(|i| {
            let value = if (i % SIZE + i / SIZE) % 2 == 0 { light } else { dark };
            [value, value, value, 255]
        })
        .collect();
    Ok(backend.upload_texture(SIZE, SIZE, &pixels)?)
}

fn lit_material(program: vertex_engine::render::ProgramHandle, diffuse: TextureHandle, specular: TextureHandle) -> Material {
    let mut material = Material::new(program);
    material
        .set_texture("material.diffuse", diffuse, 0)
        .set_texture("material.specular", specular, 1)
        .set_float("material.shininess", 32.0)
        .set_vec3("dirLight.direction", Vec3::new(-0.2, -1.0, -0.3))
        .set_vec3("dirLight.ambient", Vec3::new(0.05, 0.05, 0.05))
        .set_vec3("dirLight.diffuse", Vec3::new(0.4, 0.4, 0.4))
        .set_vec3("dirLight.specular", Vec3::new(0.5, 0.5, 0.5));

    for (i, position) in POINT_LIGHTS.iter().enumerate() {
        material
            .set_vec3(format!("pointLights[{}].position", i), Vec3::from(*position))
            .set_vec3(format!("pointLights[{}].ambient", i), Vec3::new(0.05, 0.05, 0.05))
            .set_vec3(format!("pointLights[{}].diffuse", i), Vec3::new(0.8, 0.8, 0.8))
            .set_vec3(format!("pointLights[{}].specular", i), Vec3::new(1.0, 1.0, 1.0))
            .set_float(format!("pointLights[{}].constant", i), 1.0)
            .set_float(format!("pointLights[{}].linear", i), 0.09)
            .set_float(format!("pointLights[{}].quadratic", i), 0.032);
    }

    material
        .set_vec3("spotLight.ambient", Vec3::zeros())
        .set_vec3("spotLight.diffuse", Vec3::new(1.0, 1.0, 1.0))
        .set_vec3("spotLight.specular", Vec3::new(1.0, 1.0, 1.0))
        .set_float("spotLight.constant", 1.0)
        .set_float("spotLight.linear", 0.09)
        .set_float("spotLight.quadratic", 0.032)
        .set_float("spotLight.cutOff", utils::deg_to_rad(12.5).cos())
        .set_float("spotLight.outerCutOff", utils::deg_to_rad(17.5).cos());
    material
}

#[derive(Default)]
struct CubeDemo {
    camera: Option<EntityId>,
    cube: Option<EntityId>,
}

impl CubeDemo {
    /// Feed scripted device input: walk forward, then look around
    fn script_input(engine: &mut Engine) {
        let frame = engine.time().frame_count();
        let input = engine.input_mut();
        input.handle_key_input(KeyCode::W, frame < FRAMES as u64 / 4);
        if frame >= FRAMES as u64 / 2 {
            let t = (frame - FRAMES as u64 / 2) as f64;
            input.handle_mouse_move(400.0 + t * 0.5, 300.0);
        }
    }
}

impl Application for CubeDemo {
    fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
        log::info!("Initializing cube demo...");

        let backend = engine.backend_mut();
        let mesh = Mesh::upload(backend, &vertex_engine::render::cube_vertices())?;
        let program = backend.compile_program(VERTEX_SHADER, FRAGMENT_SHADER)?;
        let diffuse = checker_texture(backend, 60, 200)?;
        let specular = checker_texture(backend, 0, 255)?;
        let material = lit_material(program, diffuse, specular);

        let mut scene = Scene::new("MainScene");

        let camera = scene.create_entity("MainCamera");
        scene.add_component(camera, Camera::default())?;
        scene.add_component(camera, CameraController::default())?;
        if let Some(mut transform) = scene.transform_mut(camera) {
            transform.set_position(Vec3::new(0.0, 0.0, 3.0));
        }

        let cube = scene.create_entity("Cube");
        scene.add_component(cube, MeshRenderer::new(mesh, material.clone()))?;
        scene.add_component(cube, Spinner { degrees_per_second: 20.0 })?;

        let moon = scene.create_entity("Moon");
        scene.add_component(moon, MeshRenderer::new(mesh, material))?;
        scene.set_parent(moon, Some(cube))?;
        if let Some(mut transform) = scene.transform_mut(moon) {
            transform.set_local(Vec3::new(1.5, 0.0, 0.0), Vec3::zeros(), Vec3::new(0.3, 0.3, 0.3));
        }

        if let Some(previous) = engine.set_active_scene(scene) {
            log::debug!("Replaced placeholder scene '{}'", previous.name());
        }
        self.camera = Some(camera);
        self.cube = Some(cube);
        Ok(())
    }

    fn update(&mut self, engine: &mut Engine, _delta_time: f64) -> Result<(), AppError> {
        Self::script_input(engine);

        let (Some(camera), Some(cube)) = (self.camera, self.cube) else {
            return Ok(());
        };
        let scene = engine.scene_mut().ok_or(EngineError::NoActiveScene)?;

        // The spot light rides on the camera
        let Some(position) = scene.world_position(camera) else {
            return Ok(());
        };
        let front = scene.get_component::<Camera>(camera).map_or(Vec3::new(0.0, 0.0, -1.0), Camera::front);
        if let Some(material) = scene
            .get_component_mut::<MeshRenderer>(cube)
            .and_then(|renderer| renderer.material.as_mut())
        {
            material
                .set_vec3("spotLight.position", position)
                .set_vec3("spotLight.direction", front);
        }
        Ok(())
    }

    fn shutdown(&mut self, engine: &mut Engine) {
        let Some(scene) = engine.scene() else {
            return;
        };
        if let Some(camera) = self.camera.and_then(|id| scene.world_position(id)) {
            log::info!("Camera finished at ({:.2}, {:.2}, {:.2})", camera.x, camera.y, camera.z);
        }
        if let Some(cube) = self.cube.and_then(|id| scene.transform(id)) {
            log::info!("Cube spun to {:.1} degrees", utils::rad_to_deg(cube.rotation().y));
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init(log::LevelFilter::Info);
    log::info!("Starting Vertex cube demo");

    let config = EngineConfig::load_or_default(CONFIG_PATH)?;
    let mut app = CubeDemo::default();
    let mut engine = Engine::new(RecordingBackend::new());

    engine.initialize(config, None, &mut app)?;
    engine.start()?;
    engine.run_frames(&mut app, FRAMES)?;

    if let Some(backend) = engine.backend_as::<RecordingBackend>() {
        log::info!(
            "Presented {} frames with {} draw calls",
            backend.frames_presented(),
            backend.draw_calls().len()
        );
    }
    log::info!("Average rate {:.0} frames per simulated second", engine.time().average_fps());

    engine.request_close(&mut app);
    log::info!("Cube demo finished successfully");
    Ok(())
}
