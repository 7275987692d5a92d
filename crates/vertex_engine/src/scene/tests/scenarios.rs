//! End-to-end scene scenarios

use approx::assert_relative_eq;

use super::{entries, hook_log, Probe};
use crate::ecs::components::{Camera, MeshRenderer, Transform};
use crate::ecs::{Component, ComponentContext, ComponentError};
use crate::foundation::math::{utils, Vec3};
use crate::input::InputState;
use crate::render::{cube_vertices, GraphicsBackend, Material, Mesh, RecordingBackend};
use crate::scene::{HierarchyError, Scene, SceneError};

fn tick(scene: &mut Scene) {
    scene.update(1.0 / 60.0, &InputState::new()).unwrap();
}

#[test]
fn test_child_follows_moved_root() {
    let mut scene = Scene::new("hierarchy");
    let root = scene.create_entity("root");
    let child = scene.create_entity("child");
    scene.set_parent(child, Some(root)).unwrap();
    scene.transform_mut(child).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));

    scene.transform_mut(root).unwrap().set_position(Vec3::new(5.0, 0.0, 0.0));

    let world = scene.world_matrix(child).unwrap();
    assert_relative_eq!(utils::translation_of(&world), Vec3::new(6.0, 0.0, 0.0), epsilon = 1e-6);
    assert_eq!(scene.parent_of(child), Some(root));
    assert_eq!(scene.children_of(root), vec![child]);
}

#[test]
fn test_unassigned_mesh_renderer_issues_no_draw() {
    let mut scene = Scene::default();
    let entity = scene.create_entity("empty renderer");
    scene.add_component(entity, MeshRenderer::default()).unwrap();
    tick(&mut scene);

    let mut backend = RecordingBackend::new();
    scene.render(&mut backend).unwrap();
    assert!(backend.draw_calls().is_empty());
}

#[test]
fn test_inactive_entity_receives_no_update() {
    let log = hook_log();
    let mut scene = Scene::default();
    let entity = scene.create_entity("sleeper");
    scene.add_component(entity, Probe::new("p", &log)).unwrap();
    scene.set_entity_active(entity, false).unwrap();

    tick(&mut scene);
    tick(&mut scene);

    assert!(!entries(&log).iter().any(|entry| entry == "p:update"));
}

#[test]
fn test_every_entity_has_a_transform() {
    let mut scene = Scene::default();
    let entity = scene.create_entity("plain");

    assert!(scene.get_component::<Transform>(entity).is_some());
    assert_eq!(scene.get_components::<Transform>(entity).len(), 1);
    assert_eq!(scene.remove_component::<Transform>(entity), Err(SceneError::TransformRemoval));
    assert!(matches!(
        scene.add_component(entity, Transform::default()),
        Err(SceneError::DuplicateTransform)
    ));
    assert!(scene.transform(entity).is_some());

    // The entity view knows it owns a transform but defers lookup to the scene
    let view = scene.entity(entity).unwrap();
    assert!(view.has_component::<Transform>());
    assert!(view.get_component::<Transform>().is_none());
    assert_eq!(view.component_count(), 0);
    assert_eq!(scene.transform(entity).unwrap().position(), Vec3::zeros());
}

#[test]
fn test_entities_become_live_at_next_update() {
    let mut scene = Scene::default();
    let first = scene.create_entity("first");
    assert!(!scene.is_live(first));
    assert!(scene.live_entities().is_empty());
    assert_eq!(scene.find_entity("first"), Some(first));

    tick(&mut scene);
    let second = scene.create_entity("second");
    assert_eq!(scene.live_entities(), &[first]);

    tick(&mut scene);
    assert_eq!(scene.live_entities(), &[first, second]);
}

#[test]
fn test_removal_is_deferred_and_destroys_components() {
    let log = hook_log();
    let mut scene = Scene::default();
    let entity = scene.create_entity("doomed");
    scene.add_component(entity, Probe::new("p", &log)).unwrap();

    // Not live yet, so the request is ignored
    assert!(!scene.remove_entity(entity));
    tick(&mut scene);

    assert!(scene.remove_entity(entity));
    assert!(!scene.remove_entity(entity));
    assert!(scene.is_live(entity));
    assert!(!entries(&log).contains(&"p:destroy".to_string()));

    tick(&mut scene);
    assert!(!scene.contains(entity));
    assert!(scene.live_entities().is_empty());
    assert_eq!(entries(&log).iter().filter(|e| *e == "p:destroy").count(), 1);
    assert_eq!(scene.set_entity_active(entity, false), Err(SceneError::UnknownEntity(entity)));
}

#[test]
fn test_batch_removal_keeps_survivor_order() {
    let mut scene = Scene::default();
    let ids: Vec<_> = (0..1000).map(|i| scene.create_entity(format!("e{i}"))).collect();
    tick(&mut scene);

    for &id in ids.iter().step_by(2) {
        assert!(scene.remove_entity(id));
        assert!(!scene.remove_entity(id));
    }
    assert_eq!(scene.live_entities().len(), 1000);

    tick(&mut scene);
    let survivors: Vec<_> = ids.iter().copied().skip(1).step_by(2).collect();
    assert_eq!(scene.live_entities(), survivors.as_slice());
    assert!(ids.iter().step_by(2).all(|&id| !scene.is_live(id) && !scene.contains(id)));
    assert_eq!(scene.entity_count(), 500);
}

#[test]
fn test_removing_parent_orphans_children() {
    let mut scene = Scene::default();
    let parent = scene.create_entity("parent");
    let child = scene.create_entity("child");
    scene.set_parent(child, Some(parent)).unwrap();
    scene.transform_mut(parent).unwrap().set_position(Vec3::new(0.0, 3.0, 0.0));
    scene.transform_mut(child).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));
    tick(&mut scene);

    scene.remove_entity(parent);
    tick(&mut scene);

    assert_eq!(scene.parent_of(child), None);
    assert_relative_eq!(scene.world_position(child).unwrap(), Vec3::new(1.0, 0.0, 0.0), epsilon = 1e-6);
}

#[test]
fn test_cyclic_parenting_is_rejected() {
    let mut scene = Scene::default();
    let a = scene.create_entity("a");
    let b = scene.create_entity("b");
    scene.set_parent(b, Some(a)).unwrap();

    let err = scene.set_parent(a, Some(b)).unwrap_err();
    assert!(matches!(err, SceneError::Hierarchy(HierarchyError::Cycle { .. })));
    assert!(matches!(
        scene.set_parent(a, Some(a)),
        Err(SceneError::Hierarchy(HierarchyError::Cycle { .. }))
    ));
    assert_eq!(scene.parent_of(a), None);
}

struct Spawner {
    spawned: bool,
}

impl Component for Spawner {
    fn update(&mut self, ctx: &mut ComponentContext<'_>, _delta_time: f64) -> Result<(), ComponentError> {
        if !self.spawned {
            self.spawned = true;
            let id = ctx.create_entity("spawned");
            ctx.add_component_to(id, Camera::default())?;
        }
        Ok(())
    }
}

#[test]
fn test_entity_created_during_update_is_deferred() {
    let mut scene = Scene::default();
    let spawner = scene.create_entity("spawner");
    scene.add_component(spawner, Spawner { spawned: false }).unwrap();

    tick(&mut scene);
    let spawned = scene.find_entity("spawned").unwrap();
    assert!(!scene.is_live(spawned));
    assert!(scene.main_camera().is_none());

    tick(&mut scene);
    assert!(scene.is_live(spawned));
    assert_eq!(scene.main_camera_entity(), Some(spawned));
}

#[test]
fn test_render_draws_enabled_renderers_of_active_entities() {
    let mut backend = RecordingBackend::new();
    let mesh = Mesh::upload(&mut backend, &cube_vertices()).unwrap();
    let program = backend.compile_program("void main() {}", "void main() {}").unwrap();
    let material = Material::new(program);

    let mut scene = Scene::default();
    let camera = scene.create_entity("camera");
    scene.add_component(camera, Camera::default()).unwrap();
    scene.transform_mut(camera).unwrap().set_position(Vec3::new(0.0, 0.0, 4.0));

    let visible = scene.create_entity("visible");
    scene.add_component(visible, MeshRenderer::new(mesh, material.clone())).unwrap();
    scene.transform_mut(visible).unwrap().set_position(Vec3::new(1.0, 0.0, 0.0));

    let hidden = scene.create_entity("hidden");
    scene.add_component(hidden, MeshRenderer::new(mesh, material.clone())).unwrap();
    scene.set_entity_active(hidden, false).unwrap();

    let switched_off = scene.create_entity("switched off");
    scene.add_component(switched_off, MeshRenderer::new(mesh, material)).unwrap();
    scene.set_component_enabled::<MeshRenderer>(switched_off, false).unwrap();

    assert_eq!(scene.entity(visible).unwrap().renderables().len(), 1);
    assert!(scene.entity(switched_off).unwrap().renderables().is_empty());
    assert!(scene.entity(camera).unwrap().renderables().is_empty());

    tick(&mut scene);
    backend.take_calls();
    scene.render(&mut backend).unwrap();

    assert_eq!(backend.draw_calls(), vec![mesh.handle()]);
    let camera_position = backend.uniform_writes("viewPos");
    assert_eq!(camera_position.len(), 1);
    assert_eq!(
        backend.uniform_writes("model"),
        vec![crate::render::UniformValue::Mat4(scene.world_matrix(visible).unwrap())]
    );
}

#[test]
fn test_inactive_scene_skips_update_and_render() {
    let log = hook_log();
    let mut scene = Scene::new("paused");
    let entity = scene.create_entity("e");
    scene.add_component(entity, Probe::new("p", &log)).unwrap();
    scene.set_active(false);

    tick(&mut scene);
    assert!(!scene.is_live(entity));
    assert!(!entries(&log).contains(&"p:update".to_string()));

    let mut backend = RecordingBackend::new();
    scene.render(&mut backend).unwrap();
    assert!(backend.calls().is_empty());
}
