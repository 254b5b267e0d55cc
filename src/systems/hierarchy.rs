//! Tree maintenance over the intrusive links in
//! [`TransformationNode`](crate::components::transformation::TransformationNode).
//!
//! Every function here works on a `World` directly. The links are only ever
//! mutated through [`set_parent`] and [`detach`], which keep `first_child`,
//! sibling links, `children_count` and `level` consistent.
//!
//! [`global_matrix`] is the lazy point query: it answers with an up-to-date
//! world matrix even when ancestors are dirty, without writing anything.

use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use glam::Mat4;
use log::debug;
use smallvec::SmallVec;

use crate::components::orientation::Orientation;
use crate::components::position::Position;
use crate::components::scale::Scale;
use crate::components::transformation::{DirtyFlag, Transformation, local_from_components};
use crate::error::{Result, SceneError};

/// Parent of `entity`, if it is a scene node with a parent.
pub fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    world.get::<Transformation>(entity)?.node.parent
}

/// Direct children of `entity`, most recently attached first.
pub fn children_of(world: &World, entity: Entity) -> SmallVec<[Entity; 8]> {
    let mut children = SmallVec::new();
    let mut cursor = world
        .get::<Transformation>(entity)
        .and_then(|t| t.node.first_child);
    while let Some(child) = cursor {
        children.push(child);
        cursor = world
            .get::<Transformation>(child)
            .and_then(|t| t.node.next_sibling);
    }
    children
}

/// Whether `ancestor` is a strict ancestor of `entity`.
pub fn is_ancestor(world: &World, ancestor: Entity, entity: Entity) -> bool {
    let mut cursor = parent_of(world, entity);
    while let Some(current) = cursor {
        if current == ancestor {
            return true;
        }
        cursor = parent_of(world, current);
    }
    false
}

/// `root` and all its descendants, breadth-first.
pub fn subtree(world: &World, root: Entity) -> Vec<Entity> {
    let mut out = Vec::new();
    let mut queue = VecDeque::from([root]);
    while let Some(entity) = queue.pop_front() {
        out.push(entity);
        queue.extend(children_of(world, entity));
    }
    out
}

/// Move `entity` under `new_parent`, or make it a root with `None`.
///
/// The entity is prepended to the new parent's child list. Levels of the
/// whole moved subtree are rewritten, and the entity is marked dirty.
pub fn set_parent(world: &mut World, entity: Entity, new_parent: Option<Entity>) -> Result<()> {
    let current = world
        .get::<Transformation>(entity)
        .ok_or(SceneError::UnknownEntity(entity))?
        .node
        .parent;

    if let Some(parent) = new_parent {
        if world.get::<Transformation>(parent).is_none() {
            return Err(SceneError::UnknownEntity(parent));
        }
        if parent == entity || is_ancestor(world, entity, parent) {
            return Err(SceneError::CyclicReparent { entity, parent });
        }
    }

    if current == new_parent {
        return Ok(());
    }

    detach(world, entity);

    let level = match new_parent {
        Some(parent) => {
            let (old_first, level) = {
                let mut p = world
                    .get_mut::<Transformation>(parent)
                    .ok_or(SceneError::UnknownEntity(parent))?;
                p.node.children_count += 1;
                (p.node.first_child.replace(entity), p.node.level + 1)
            };
            if let Some(first) = old_first
                && let Some(mut sibling) = world.get_mut::<Transformation>(first)
            {
                sibling.node.prev_sibling = Some(entity);
            }
            if let Some(mut t) = world.get_mut::<Transformation>(entity) {
                t.node.parent = Some(parent);
                t.node.next_sibling = old_first;
            }
            level
        }
        None => 0,
    };

    relevel(world, entity, level);
    world.entity_mut(entity).insert(DirtyFlag);
    debug!("reparented {:?}: {:?} -> {:?}", entity, current, new_parent);
    Ok(())
}

/// Unlink `entity` from its parent's child list, leaving it a root.
///
/// Levels are not touched; callers either relink or despawn right after.
pub fn detach(world: &mut World, entity: Entity) {
    let Some(node) = world.get::<Transformation>(entity).map(|t| t.node) else {
        return;
    };
    let Some(parent) = node.parent else {
        return;
    };

    match node.prev_sibling {
        Some(prev) => {
            if let Some(mut t) = world.get_mut::<Transformation>(prev) {
                t.node.next_sibling = node.next_sibling;
            }
        }
        None => {
            if let Some(mut t) = world.get_mut::<Transformation>(parent) {
                t.node.first_child = node.next_sibling;
            }
        }
    }
    if let Some(next) = node.next_sibling
        && let Some(mut t) = world.get_mut::<Transformation>(next)
    {
        t.node.prev_sibling = node.prev_sibling;
    }
    if let Some(mut t) = world.get_mut::<Transformation>(parent) {
        t.node.children_count = t.node.children_count.saturating_sub(1);
    }
    if let Some(mut t) = world.get_mut::<Transformation>(entity) {
        t.node.parent = None;
        t.node.prev_sibling = None;
        t.node.next_sibling = None;
    }
}

/// Rewrite levels of `root`'s subtree, `root` getting `level`.
fn relevel(world: &mut World, root: Entity, level: u32) {
    let mut queue = VecDeque::from([(root, level)]);
    while let Some((entity, level)) = queue.pop_front() {
        let Some(mut cursor) = world.get_mut::<Transformation>(entity).map(|mut t| {
            t.node.level = level;
            t.node.first_child
        }) else {
            continue;
        };
        while let Some(child) = cursor {
            debug_assert_ne!(child, root, "cycle in transformation tree");
            queue.push_back((child, level + 1));
            cursor = world
                .get::<Transformation>(child)
                .and_then(|c| c.node.next_sibling);
        }
    }
}

/// Up-to-date world matrix of `entity` without running a pass.
///
/// Dirty nodes on the path to the root have their local matrix recomputed
/// from their components on the fly. Nothing is stored and no dirty flag is
/// cleared.
pub fn global_matrix(world: &World, entity: Entity) -> Result<Mat4> {
    let mut chain: SmallVec<[Entity; 16]> = SmallVec::new();
    let mut any_dirty = false;
    let mut cursor = Some(entity);
    while let Some(current) = cursor {
        let t = world
            .get::<Transformation>(current)
            .ok_or(SceneError::UnknownEntity(current))?;
        debug_assert!(!chain.contains(&current), "cycle in transformation tree");
        any_dirty |= world.get::<DirtyFlag>(current).is_some();
        chain.push(current);
        cursor = t.node.parent;
    }

    if !any_dirty {
        return Ok(world
            .get::<Transformation>(entity)
            .map_or(Mat4::IDENTITY, |t| t.global));
    }

    let mut global = Mat4::IDENTITY;
    for &current in chain.iter().rev() {
        let local = if world.get::<DirtyFlag>(current).is_some() {
            local_from_components(
                world.get::<Position>(current),
                world.get::<Orientation>(current),
                world.get::<Scale>(current),
            )
        } else {
            world
                .get::<Transformation>(current)
                .map_or(Mat4::IDENTITY, |t| t.local)
        };
        global *= local;
    }
    Ok(global)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn spawn_node(world: &mut World) -> Entity {
        world.spawn(Transformation::default()).id()
    }

    fn level(world: &World, e: Entity) -> u32 {
        world.get::<Transformation>(e).unwrap().node.level
    }

    // ==================== LINKS ====================

    #[test]
    fn test_set_parent_prepends_children() {
        let mut world = World::new();
        let root = spawn_node(&mut world);
        let a = spawn_node(&mut world);
        let b = spawn_node(&mut world);
        set_parent(&mut world, a, Some(root)).unwrap();
        set_parent(&mut world, b, Some(root)).unwrap();

        assert_eq!(children_of(&world, root).as_slice(), &[b, a]);
        let node = world.get::<Transformation>(root).unwrap().node;
        assert_eq!(node.children_count, 2);
        assert_eq!(parent_of(&world, a), Some(root));
        assert_eq!(level(&world, a), 1);
        assert!(world.get::<DirtyFlag>(a).is_some());
    }

    #[test]
    fn test_detach_middle_sibling() {
        let mut world = World::new();
        let root = spawn_node(&mut world);
        let kids: Vec<Entity> = (0..3).map(|_| spawn_node(&mut world)).collect();
        for &k in &kids {
            set_parent(&mut world, k, Some(root)).unwrap();
        }
        // list is kids[2], kids[1], kids[0]
        set_parent(&mut world, kids[1], None).unwrap();
        assert_eq!(children_of(&world, root).as_slice(), &[kids[2], kids[0]]);
        let n0 = world.get::<Transformation>(kids[0]).unwrap().node;
        assert_eq!(n0.prev_sibling, Some(kids[2]));
        assert_eq!(level(&world, kids[1]), 0);
        assert_eq!(world.get::<Transformation>(root).unwrap().node.children_count, 2);

        // removing the head moves first_child
        set_parent(&mut world, kids[2], None).unwrap();
        assert_eq!(
            world.get::<Transformation>(root).unwrap().node.first_child,
            Some(kids[0])
        );
        assert_eq!(
            world.get::<Transformation>(kids[0]).unwrap().node.prev_sibling,
            None
        );
    }

    #[test]
    fn test_reparent_rewrites_subtree_levels() {
        let mut world = World::new();
        let a = spawn_node(&mut world);
        let b = spawn_node(&mut world);
        let c = spawn_node(&mut world);
        let d = spawn_node(&mut world);
        set_parent(&mut world, c, Some(b)).unwrap();
        set_parent(&mut world, d, Some(c)).unwrap();
        assert_eq!(level(&world, d), 2);

        set_parent(&mut world, b, Some(a)).unwrap();
        assert_eq!(level(&world, b), 1);
        assert_eq!(level(&world, c), 2);
        assert_eq!(level(&world, d), 3);
        assert_eq!(subtree(&world, a), vec![a, b, c, d]);
    }

    // ==================== CYCLES ====================

    #[test]
    fn test_rejects_cycles() {
        let mut world = World::new();
        let a = spawn_node(&mut world);
        let b = spawn_node(&mut world);
        set_parent(&mut world, b, Some(a)).unwrap();

        assert_eq!(
            set_parent(&mut world, a, Some(a)),
            Err(SceneError::CyclicReparent { entity: a, parent: a })
        );
        assert_eq!(
            set_parent(&mut world, a, Some(b)),
            Err(SceneError::CyclicReparent { entity: a, parent: b })
        );
        assert!(is_ancestor(&world, a, b));
        assert!(!is_ancestor(&world, b, a));
        assert!(!is_ancestor(&world, a, a));
    }

    #[test]
    fn test_unknown_entities() {
        let mut world = World::new();
        let a = spawn_node(&mut world);
        let plain = world.spawn_empty().id();
        assert_eq!(
            set_parent(&mut world, a, Some(plain)),
            Err(SceneError::UnknownEntity(plain))
        );
        assert_eq!(
            set_parent(&mut world, plain, None),
            Err(SceneError::UnknownEntity(plain))
        );
    }

    // ==================== LAZY QUERY ====================

    #[test]
    fn test_global_matrix_sees_dirty_ancestors() {
        let mut world = World::new();
        let root = spawn_node(&mut world);
        let child = spawn_node(&mut world);
        set_parent(&mut world, child, Some(root)).unwrap();
        world
            .entity_mut(root)
            .insert((Position::new(1.0, 0.0, 0.0), DirtyFlag));
        world.entity_mut(child).insert(Position::new(0.0, 2.0, 0.0));

        let m = global_matrix(&world, child).unwrap();
        assert!((m.w_axis.truncate() - Vec3::new(1.0, 2.0, 0.0)).length() < 1e-6);
        // nothing was written back
        assert!(world.get::<DirtyFlag>(root).is_some());
        assert_eq!(world.get::<Transformation>(root).unwrap().global, Mat4::IDENTITY);
    }
}
