//! Animator-driven fast update path.
//!
//! [`update_animators_only`] rebuilds the matrices of every animated object
//! from its [`AnimatorRecord`] and the current [`AnimatorValues`], then
//! cascades to the subtree the same way the dirty pass does. It never writes
//! Position/Orientation/Scale, never sets dirty flags and fires no
//! observers.
//!
//! [`rebuild_record`] keeps the record in sync with the authoritative
//! [`AnimatorBindings`] whenever a binding is added, removed or its animator
//! changes slot.

use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use log::debug;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::components::animatorbinding::{AnimatorBindings, AnimatorRecord, BoundChannel};
use crate::components::orientation::Orientation;
use crate::components::position::Position;
use crate::components::scale::Scale;
use crate::components::tint::{EffectiveTint, Tint};
use crate::components::transformation::{Transformation, local_from_components};
use crate::resources::animatorregistry::{AnimatorRegistry, AnimatorValues};
use crate::systems::propagate_transforms::{cascade, parent_global};

/// Recompute animated objects from animator outputs, shallowest first.
pub fn update_animators_only(
    records: Query<(Entity, &AnimatorRecord)>,
    values: Res<AnimatorValues>,
    mut transforms: Query<&mut Transformation>,
    mut tints: Query<&mut EffectiveTint>,
) {
    let values = values.as_slice();
    let mut order: Vec<(u32, Entity)> = Vec::new();
    for (entity, record) in records.iter() {
        if let Some(color) = record.animated(values).3
            && let Ok(mut tint) = tints.get_mut(entity)
        {
            tint.0 = color;
        }
        if record.animates_transform()
            && let Ok(t) = transforms.get(entity)
        {
            order.push((t.node.level, entity));
        }
    }
    if order.is_empty() {
        return;
    }
    order.sort_unstable();
    let group: FxHashSet<Entity> = order.iter().map(|&(_, e)| e).collect();

    let mut queue = VecDeque::new();
    let mut cascaded = 0;
    for &(_, entity) in &order {
        let Ok((_, record)) = records.get(entity) else {
            continue;
        };
        let (position, orientation, scale, _) = record.animated(values);
        let local = local_from_components(Some(&position), Some(&orientation), Some(&scale));
        let parent = parent_global(&transforms, entity);
        if let Ok(mut t) = transforms.get_mut(entity) {
            t.set_local(local, parent);
        }
        cascaded += cascade(&mut transforms, entity, &group, &mut queue);
    }

    debug!(
        "update_animators_only: {} animated, {} descendants cascaded",
        order.len(),
        cascaded
    );
}

/// Rebuild `entity`'s [`AnimatorRecord`] from its bindings and current
/// components, or remove it when nothing is bound. The effective tint is
/// reset to the authoritative tint; the next fast pass re-applies colour
/// channels.
pub fn rebuild_record(world: &mut World, entity: Entity) {
    let Ok(entity_ref) = world.get_entity(entity) else {
        return;
    };
    let tint = entity_ref.get::<Tint>().map(|t| t.color);
    let channels: SmallVec<[BoundChannel; 4]> = match entity_ref.get::<AnimatorBindings>() {
        Some(bindings) => {
            let registry = world.resource::<AnimatorRegistry>();
            bindings
                .iter()
                .filter_map(|(property, binding)| {
                    let entry = registry.get(binding.animator)?;
                    Some(BoundChannel {
                        property: *property,
                        animator: binding.animator,
                        slot: entry.slot,
                        binding: *binding,
                    })
                })
                .collect()
        }
        None => SmallVec::new(),
    };

    if channels.is_empty() {
        let mut entity_mut = world.entity_mut(entity);
        entity_mut.remove::<AnimatorRecord>();
        if let Some(color) = tint {
            entity_mut.insert(EffectiveTint(color));
        }
        return;
    }

    let record = AnimatorRecord {
        base_position: entity_ref.get::<Position>().copied().unwrap_or_default(),
        base_orientation: entity_ref.get::<Orientation>().copied().unwrap_or_default(),
        base_scale: entity_ref.get::<Scale>().copied().unwrap_or_default(),
        base_tint: tint,
        channels,
    };
    let mut entity_mut = world.entity_mut(entity);
    entity_mut.insert(record);
    if let Some(color) = tint {
        entity_mut.insert(EffectiveTint(color));
    }
}
