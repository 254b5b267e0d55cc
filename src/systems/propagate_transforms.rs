//! Dirty-driven transform propagation.
//!
//! Recomputes [`Transformation`] for every entity carrying a [`DirtyFlag`]
//! and for everything below it, shallowest first.
//!
//! # Schedule position
//!
//! Should run **after** all editing of Position/Orientation/Scale and
//! reparenting, and **before**
//! [`update_animators_only`](crate::systems::animatorbinding::update_animators_only)
//! so the fast path starts from fresh matrices.

use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use glam::Mat4;
use log::debug;
use rustc_hash::FxHashSet;

use crate::components::animatorbinding::AnimatorRecord;
use crate::components::orientation::Orientation;
use crate::components::position::Position;
use crate::components::scale::Scale;
use crate::components::tint::Tint;
use crate::components::transformation::{DirtyFlag, Transformation, local_from_components};

/// Push `root`'s world matrix down its subtree, breadth-first.
///
/// Children in `skip` are left alone together with their subtrees; the
/// caller processes them later in level order. Returns the number of
/// descendants updated.
pub(crate) fn cascade(
    transforms: &mut Query<&mut Transformation>,
    root: Entity,
    skip: &FxHashSet<Entity>,
    queue: &mut VecDeque<Entity>,
) -> usize {
    queue.clear();
    queue.push_back(root);
    let mut updated = 0;
    while let Some(parent) = queue.pop_front() {
        let Ok(p) = transforms.get(parent) else {
            continue;
        };
        let parent_global = p.global;
        let parent_level = p.node.level;
        let mut cursor = p.node.first_child;
        while let Some(child) = cursor {
            let Ok(mut t) = transforms.get_mut(child) else {
                break;
            };
            cursor = t.node.next_sibling;
            debug_assert_eq!(
                t.node.level,
                parent_level + 1,
                "transformation tree levels out of sync"
            );
            if skip.contains(&child) {
                continue;
            }
            let local = t.local;
            t.set_local(local, Some(parent_global));
            updated += 1;
            queue.push_back(child);
        }
    }
    updated
}

/// World matrix of `entity`'s parent as currently stored.
pub(crate) fn parent_global(transforms: &Query<&mut Transformation>, entity: Entity) -> Option<Mat4> {
    let parent = transforms.get(entity).ok()?.node.parent?;
    transforms.get(parent).ok().map(|p| p.global)
}

/// Recompute local and world matrices of all dirty entities and their
/// subtrees, then clear the dirty flags.
///
/// 1. Sort the dirty set by tree level.
/// 2. For each dirty entity rebuild its local matrix from its components,
///    compose with the parent's world matrix and cascade to the subtree,
///    skipping children that are dirty themselves.
/// 3. Refresh the base values of an [`AnimatorRecord`] on the way so the
///    fast path animates from the edited state.
pub fn propagate_dirty_transforms(
    dirty: Query<Entity, With<DirtyFlag>>,
    sources: Query<(
        Option<&Position>,
        Option<&Orientation>,
        Option<&Scale>,
        Option<&Tint>,
    )>,
    mut transforms: Query<&mut Transformation>,
    mut records: Query<&mut AnimatorRecord>,
    mut commands: Commands,
) {
    let mut order: Vec<(u32, Entity)> = Vec::new();
    for entity in dirty.iter() {
        match transforms.get(entity) {
            Ok(t) => order.push((t.node.level, entity)),
            Err(_) => {
                // not a scene node; just drop the flag
                commands.entity(entity).remove::<DirtyFlag>();
            }
        }
    }
    if order.is_empty() {
        return;
    }
    order.sort_unstable();
    let dirty_set: FxHashSet<Entity> = order.iter().map(|&(_, e)| e).collect();

    let mut queue = VecDeque::new();
    let mut cascaded = 0;
    for &(_, entity) in &order {
        let Ok((position, orientation, scale, tint)) = sources.get(entity) else {
            continue;
        };
        let local = local_from_components(position, orientation, scale);

        if let Ok(mut record) = records.get_mut(entity) {
            record.base_position = position.copied().unwrap_or_default();
            record.base_orientation = orientation.copied().unwrap_or_default();
            record.base_scale = scale.copied().unwrap_or_default();
            record.base_tint = tint.map(|t| t.color);
        }

        let parent = parent_global(&transforms, entity);
        if let Ok(mut t) = transforms.get_mut(entity) {
            t.set_local(local, parent);
        }
        cascaded += cascade(&mut transforms, entity, &dirty_set, &mut queue);
        commands.entity(entity).remove::<DirtyFlag>();
    }

    debug!(
        "propagate_dirty_transforms: {} dirty, {} descendants cascaded",
        order.len(),
        cascaded
    );
}
