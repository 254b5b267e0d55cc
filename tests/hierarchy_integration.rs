//! Integration tests for the transformation tree and dirty propagation.
//!
//! Tests are organized by concern.
//!
//! # Usage
//!
//! ```sh
//! cargo test --test hierarchy_integration
//! ```

use bevy_ecs::prelude::*;
use glam::{Mat4, Vec3};

use scenecore::components::orientation::{EulerOrder, Orientation};
use scenecore::components::position::Position;
use scenecore::components::scale::Scale;
use scenecore::components::transformation::{DirtyFlag, Transformation};
use scenecore::systems::hierarchy::{global_matrix, set_parent};
use scenecore::systems::propagate_transforms::propagate_dirty_transforms;
use scenecore::{Scene, SceneError};

const EPSILON: f32 = 1e-4;

fn vec_approx_eq(a: Vec3, b: Vec3) -> bool {
    (a - b).length() < EPSILON
}

fn tick_propagate(world: &mut World) {
    let mut schedule = Schedule::default();
    schedule.add_systems(propagate_dirty_transforms);
    schedule.run(world);
}

fn spawn_at(world: &mut World, x: f32, y: f32, z: f32) -> Entity {
    world
        .spawn((Transformation::default(), Position::new(x, y, z), DirtyFlag))
        .id()
}

/// Every node's global equals its parent's global times its local.
fn assert_tree_consistent(world: &mut World) {
    let mut query = world.query::<(Entity, &Transformation)>();
    let nodes: Vec<(Entity, Transformation)> =
        query.iter(world).map(|(e, t)| (e, *t)).collect();
    for (entity, t) in nodes {
        let expected = match t.node.parent {
            Some(parent) => world.get::<Transformation>(parent).unwrap().global * t.local,
            None => t.local,
        };
        assert!(
            t.global.abs_diff_eq(expected, EPSILON),
            "{entity:?}: global out of sync"
        );
        let expected_level = t
            .node
            .parent
            .map_or(0, |p| world.get::<Transformation>(p).unwrap().node.level + 1);
        assert_eq!(t.node.level, expected_level, "{entity:?}: level out of sync");
    }
}

// =============================================================================
// Propagation
// =============================================================================

#[test]
fn root_child_grandchild_scenario() {
    let mut world = World::new();
    let r = spawn_at(&mut world, 0.0, 0.0, 0.0);
    let c = spawn_at(&mut world, 0.0, 0.0, 0.0);
    let g = spawn_at(&mut world, 0.0, 0.0, 0.0);
    set_parent(&mut world, c, Some(r)).unwrap();
    set_parent(&mut world, g, Some(c)).unwrap();
    tick_propagate(&mut world);

    world
        .entity_mut(c)
        .insert((Position::new(1.0, 0.0, 0.0), DirtyFlag));
    tick_propagate(&mut world);

    let expected = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
    let gc = world.get::<Transformation>(c).unwrap().global;
    let gg = world.get::<Transformation>(g).unwrap().global;
    assert!(gc.abs_diff_eq(expected, EPSILON));
    assert!(gg.abs_diff_eq(expected, EPSILON));
    assert!(world.query::<&DirtyFlag>().iter(&world).next().is_none());
}

#[test]
fn deep_chain_with_rotation_and_scale() {
    let mut world = World::new();
    let root = spawn_at(&mut world, 0.0, 0.0, 0.0);
    world.entity_mut(root).insert((
        Orientation::euler(0.0, 0.0, std::f32::consts::FRAC_PI_2, EulerOrder::Xyz),
        Scale::Uniform(2.0),
    ));
    let mut parent = root;
    let mut chain = vec![root];
    for _ in 0..5 {
        let e = spawn_at(&mut world, 1.0, 0.0, 0.0);
        set_parent(&mut world, e, Some(parent)).unwrap();
        chain.push(e);
        parent = e;
    }
    tick_propagate(&mut world);
    assert_tree_consistent(&mut world);

    // root rotates +X onto +Y and doubles; each link adds 1 along local X
    let tip = world.get::<Transformation>(*chain.last().unwrap()).unwrap();
    assert!(vec_approx_eq(tip.world_position(), Vec3::new(0.0, 10.0, 0.0)));
}

#[test]
fn sibling_subtrees_update_independently() {
    let mut world = World::new();
    let root = spawn_at(&mut world, 0.0, 0.0, 0.0);
    let left = spawn_at(&mut world, -1.0, 0.0, 0.0);
    let right = spawn_at(&mut world, 1.0, 0.0, 0.0);
    let leaf = spawn_at(&mut world, 0.0, 1.0, 0.0);
    set_parent(&mut world, left, Some(root)).unwrap();
    set_parent(&mut world, right, Some(root)).unwrap();
    set_parent(&mut world, leaf, Some(right)).unwrap();
    tick_propagate(&mut world);

    world
        .entity_mut(right)
        .insert((Position::new(3.0, 0.0, 0.0), DirtyFlag));
    world
        .entity_mut(root)
        .insert((Position::new(0.0, 0.0, 2.0), DirtyFlag));
    tick_propagate(&mut world);
    assert_tree_consistent(&mut world);

    let leaf_t = world.get::<Transformation>(leaf).unwrap();
    assert!(vec_approx_eq(leaf_t.world_position(), Vec3::new(3.0, 1.0, 2.0)));
    let left_t = world.get::<Transformation>(left).unwrap();
    assert!(vec_approx_eq(left_t.world_position(), Vec3::new(-1.0, 0.0, 2.0)));
}

#[test]
fn reparent_moves_subtree_and_levels() {
    let mut world = World::new();
    let a = spawn_at(&mut world, 10.0, 0.0, 0.0);
    let b = spawn_at(&mut world, 0.0, 0.0, 0.0);
    let c = spawn_at(&mut world, 0.0, 1.0, 0.0);
    set_parent(&mut world, c, Some(b)).unwrap();
    tick_propagate(&mut world);

    set_parent(&mut world, b, Some(a)).unwrap();
    tick_propagate(&mut world);
    assert_tree_consistent(&mut world);
    let ct = world.get::<Transformation>(c).unwrap();
    assert_eq!(ct.node.level, 2);
    assert!(vec_approx_eq(ct.world_position(), Vec3::new(10.0, 1.0, 0.0)));

    set_parent(&mut world, b, None).unwrap();
    tick_propagate(&mut world);
    assert_tree_consistent(&mut world);
    assert!(vec_approx_eq(
        world.get::<Transformation>(c).unwrap().world_position(),
        Vec3::new(0.0, 1.0, 0.0)
    ));
}

#[test]
fn mirroring_follows_negative_scale() {
    let mut world = World::new();
    let parent = spawn_at(&mut world, 0.0, 0.0, 0.0);
    world.entity_mut(parent).insert(Scale::new(-1.0, 1.0, 1.0));
    let child = spawn_at(&mut world, 0.0, 0.0, 0.0);
    set_parent(&mut world, child, Some(parent)).unwrap();
    tick_propagate(&mut world);
    assert!(world.get::<Transformation>(parent).unwrap().is_mirroring);
    assert!(world.get::<Transformation>(child).unwrap().is_mirroring);

    world.entity_mut(child).insert((Scale::new(1.0, 1.0, -1.0), DirtyFlag));
    tick_propagate(&mut world);
    assert!(!world.get::<Transformation>(child).unwrap().is_mirroring);
}

// =============================================================================
// Lazy global query
// =============================================================================

#[test]
fn lazy_global_matches_pass_result() {
    let mut world = World::new();
    let r = spawn_at(&mut world, 1.0, 2.0, 3.0);
    let c = spawn_at(&mut world, 0.0, 1.0, 0.0);
    world
        .entity_mut(c)
        .insert(Orientation::euler(0.3, 0.2, 0.1, EulerOrder::Zyx));
    set_parent(&mut world, c, Some(r)).unwrap();

    let lazy = global_matrix(&world, c).unwrap();
    assert!(world.get::<DirtyFlag>(c).is_some(), "lazy query keeps flags");
    tick_propagate(&mut world);
    let stored = world.get::<Transformation>(c).unwrap().global;
    assert!(lazy.abs_diff_eq(stored, EPSILON));
}

// =============================================================================
// Scene-level tree operations
// =============================================================================

#[test]
fn scene_rejects_cycles_and_keeps_tree() {
    let mut scene = Scene::new();
    let a = scene.spawn_node();
    let b = scene.spawn_node();
    let c = scene.spawn_node();
    scene.set_parent(b, Some(a)).unwrap();
    scene.set_parent(c, Some(b)).unwrap();

    assert_eq!(
        scene.set_parent(a, Some(c)),
        Err(SceneError::CyclicReparent { entity: a, parent: c })
    );
    assert_eq!(scene.parent(a), None);
    assert!(scene.is_ancestor(a, c));
    assert_eq!(scene.children(a).as_slice(), &[b]);
}

#[test]
fn scene_destroy_object_removes_subtree() {
    let mut scene = Scene::new();
    let root = scene.spawn_node();
    let keep = scene.spawn_node();
    let gone = scene.spawn_node();
    let gone_child = scene.spawn_node();
    scene.set_parent(keep, Some(root)).unwrap();
    scene.set_parent(gone, Some(root)).unwrap();
    scene.set_parent(gone_child, Some(gone)).unwrap();

    scene.destroy_object(gone).unwrap();
    assert!(!scene.is_node(gone));
    assert!(!scene.is_node(gone_child));
    assert_eq!(scene.children(root).as_slice(), &[keep]);
    assert_eq!(
        scene.transformation(root).unwrap().node.children_count,
        1
    );
    assert_eq!(
        scene.destroy_object(gone),
        Err(SceneError::UnknownEntity(gone))
    );
}
