//! Integration tests for ray picking through the [`Scene`] context.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test raycast_integration
//! ```

use glam::{Vec2, Vec3};

use scenecore::Scene;
use scenecore::components::animator::{AnimatorSource, PanAxis};
use scenecore::components::animatorbinding::{AnimatableProperty, AnimatorBinding};
use scenecore::components::position::Position;
use scenecore::components::raycastable::{Aabb, Ray, RayCastable, Triangle};
use scenecore::components::scale::Scale;
use scenecore::systems::raycast::{intersect_aabb, intersect_triangle};

const EPSILON: f32 = 1e-4;
const TOL: f32 = 1e-6;

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

fn unit_cube() -> RayCastable {
    RayCastable::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0))
}

// =============================================================================
// Primitive tests
// =============================================================================

#[test]
fn aabb_hit_distance() {
    let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
    let aabb = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
    let t = intersect_aabb(&ray, &aabb, TOL).unwrap();
    assert!(approx_eq(t, 4.0));
}

#[test]
fn triangle_hit_distance() {
    let ray = Ray::new(Vec3::new(0.25, 0.25, 1.0), -Vec3::Z);
    let tri = Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y);
    let hit = intersect_triangle(&ray, &tri, TOL).unwrap();
    assert!(approx_eq(hit.t, 1.0));
    assert!(approx_eq(ray.at(hit.t).z, 0.0));
}

// =============================================================================
// Scene picking
// =============================================================================

#[test]
fn pick_sees_pending_edits() {
    let mut scene = Scene::new();
    let e = scene.spawn_node();
    scene.make_position(e, Position::new(0.0, 0.0, 0.0)).unwrap();
    scene.set_raycastable(e, unit_cube()).unwrap();
    scene.run_frame(1.0 / 60.0).unwrap();

    // moved but no frame has run since
    scene.update_position(e, Position::new(0.0, 0.0, 10.0)).unwrap();
    let hit = scene
        .ray_cast_scene(&Ray::new(Vec3::new(0.1, 0.2, 0.0), Vec3::Z), TOL)
        .unwrap();
    assert_eq!(hit.entity, e);
    assert!(approx_eq(hit.t, 9.0));
}

#[test]
fn pick_follows_parent_and_scale() {
    let mut scene = Scene::new();
    let root = scene.spawn_node();
    scene.make_position(root, Position::new(0.0, 0.0, 4.0)).unwrap();
    scene.make_scale(root, Scale::Uniform(2.0)).unwrap();
    let child = scene.spawn_node();
    scene.set_parent(child, Some(root)).unwrap();
    scene.make_position(child, Position::new(0.0, 0.0, 1.0)).unwrap();
    scene.set_raycastable(child, unit_cube()).unwrap();

    // child centre at z = 4 + 2, half extent 2
    let hit = scene
        .pick(&Ray::new(Vec3::new(0.3, 0.1, 0.0), Vec3::Z))
        .unwrap();
    assert_eq!(hit.entity, child);
    assert!(approx_eq(hit.t, 4.0));
}

#[test]
fn pick_uses_animated_transform() {
    let mut scene = Scene::new();
    let e = scene.spawn_node();
    scene.make_position(e, Position::new(0.0, 0.0, 0.0)).unwrap();
    scene.set_raycastable(e, unit_cube()).unwrap();
    let pan = scene
        .make_animator(
            "pan",
            AnimatorSource::Pan {
                bottom_left: Vec2::ZERO,
                top_right: Vec2::ONE,
                axis: PanAxis::X,
            },
        )
        .unwrap();
    scene
        .bind_animator(e, AnimatableProperty::PositionZ, AnimatorBinding::new(pan, 0.0, 20.0))
        .unwrap();
    scene.set_pan_location(Vec2::new(0.5, 0.0));
    scene.run_frame(1.0 / 60.0).unwrap();

    let hit = scene
        .pick(&Ray::new(Vec3::new(0.2, 0.1, 0.0), Vec3::Z))
        .unwrap();
    assert!(approx_eq(hit.t, 9.0));
}

#[test]
fn pick_misses_and_skips_non_castables() {
    let mut scene = Scene::new();
    let castable = scene.spawn_node();
    scene.make_position(castable, Position::new(5.0, 0.0, 0.0)).unwrap();
    scene.set_raycastable(castable, unit_cube()).unwrap();
    let plain = scene.spawn_node();
    scene.make_position(plain, Position::new(0.0, 0.0, 3.0)).unwrap();

    let ray = Ray::new(Vec3::new(0.1, 0.1, 0.0), Vec3::Z);
    assert!(scene.pick(&ray).is_none());

    scene.remove_raycastable(castable).unwrap();
    let sideways = Ray::new(Vec3::new(0.0, 0.1, 0.2), Vec3::X);
    assert!(scene.pick(&sideways).is_none());
}

#[test]
fn closest_of_overlapping_entities_wins() {
    let mut scene = Scene::new();
    let far = scene.spawn_node();
    scene.make_position(far, Position::new(0.0, 0.0, 8.0)).unwrap();
    scene.set_raycastable(far, unit_cube()).unwrap();
    let near = scene.spawn_node();
    scene.make_position(near, Position::new(0.0, 0.0, 3.0)).unwrap();
    scene.set_raycastable(near, unit_cube()).unwrap();

    let hit = scene
        .pick(&Ray::new(Vec3::new(0.2, 0.3, 0.0), Vec3::Z))
        .unwrap();
    assert_eq!(hit.entity, near);
    assert!(approx_eq(hit.t, 2.0));
}

#[test]
fn pick_flat_triangle_mesh() {
    let mut scene = Scene::new();
    let e = scene.spawn_node();
    scene.make_position(e, Position::new(0.0, 0.0, 5.0)).unwrap();
    let quad = RayCastable::from_triangles(vec![
        Triangle::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0)),
        Triangle::new(Vec3::new(-1.0, -1.0, 0.0), Vec3::new(1.0, 1.0, 0.0), Vec3::new(-1.0, 1.0, 0.0)),
    ])
    .unwrap();
    scene.set_raycastable(e, quad).unwrap();

    // zero-thickness bounds still admit the ray
    let hit = scene
        .pick(&Ray::new(Vec3::new(-0.5, 0.2, 0.0), Vec3::Z))
        .unwrap();
    assert_eq!(hit.entity, e);
    assert!(approx_eq(hit.t, 5.0));
    assert!(scene.pick(&Ray::new(Vec3::new(1.5, 0.0, 0.0), Vec3::Z)).is_none());
}
