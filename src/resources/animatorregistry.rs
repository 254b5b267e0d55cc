//! Animator bookkeeping resources.
//!
//! - [`AnimatorRegistry`] – id allocation, id → entity lookup, names, and the
//!   value slot assigned to each animator
//! - [`AnimatorValues`] – last evaluated output of every animator, indexed by
//!   slot; written by [`evaluate_animators`](crate::systems::animator::evaluate_animators)
//!   and read by the fast update path
//! - [`AnimatorBindingIndex`] – reverse map from animator to the
//!   `(object, property)` pairs bound to it, so an animator is never destroyed
//!   while something still references its id
//!
//! Slots are reused after an animator is destroyed. A slot index stays valid
//! for as long as its animator lives.

use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::components::animator::AnimatorId;
use crate::components::animatorbinding::AnimatableProperty;

/// Where an animator lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AnimatorEntry {
    pub entity: Entity,
    pub slot: usize,
}

#[derive(Resource, Debug, Default)]
pub struct AnimatorRegistry {
    next_id: u32,
    entries: FxHashMap<AnimatorId, AnimatorEntry>,
    names: FxHashMap<String, AnimatorId>,
    slots: Vec<Option<AnimatorId>>,
}

impl AnimatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh id and value slot for an animator about to be spawned.
    pub fn allocate(&mut self) -> (AnimatorId, usize) {
        let id = AnimatorId(self.next_id);
        self.next_id += 1;
        let slot = match self.slots.iter().position(Option::is_none) {
            Some(free) => {
                self.slots[free] = Some(id);
                free
            }
            None => {
                self.slots.push(Some(id));
                self.slots.len() - 1
            }
        };
        (id, slot)
    }

    /// Record the entity and name of an allocated animator.
    pub fn register(&mut self, id: AnimatorId, slot: usize, entity: Entity, name: &str) {
        self.entries.insert(id, AnimatorEntry { entity, slot });
        if !name.is_empty() {
            self.names.insert(name.to_string(), id);
        }
    }

    /// Forget an animator and free its slot.
    pub fn unregister(&mut self, id: AnimatorId) -> Option<AnimatorEntry> {
        let entry = self.entries.remove(&id)?;
        if let Some(slot) = self.slots.get_mut(entry.slot) {
            *slot = None;
        }
        self.names.retain(|_, v| *v != id);
        Some(entry)
    }

    pub fn rename(&mut self, id: AnimatorId, name: &str) {
        self.names.retain(|_, v| *v != id);
        if !name.is_empty() {
            self.names.insert(name.to_string(), id);
        }
    }

    pub fn get(&self, id: AnimatorId) -> Option<AnimatorEntry> {
        self.entries.get(&id).copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<AnimatorId> {
        self.names.get(name).copied()
    }

    pub fn contains(&self, id: AnimatorId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Animator outputs by slot.
#[derive(Resource, Debug, Default, Clone)]
pub struct AnimatorValues {
    pub values: Vec<f32>,
}

impl AnimatorValues {
    pub fn get(&self, slot: usize) -> f32 {
        self.values.get(slot).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, slot: usize, value: f32) {
        if slot >= self.values.len() {
            self.values.resize(slot + 1, 0.0);
        }
        self.values[slot] = value;
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }
}

/// Dependents of one animator.
pub type Dependents = SmallVec<[(Entity, AnimatableProperty); 4]>;

/// Reverse map from animator id to bound `(object, property)` pairs.
#[derive(Resource, Debug, Default)]
pub struct AnimatorBindingIndex {
    map: FxHashMap<AnimatorId, Dependents>,
}

impl AnimatorBindingIndex {
    pub fn add(&mut self, animator: AnimatorId, entity: Entity, property: AnimatableProperty) {
        let deps = self.map.entry(animator).or_default();
        if !deps.contains(&(entity, property)) {
            deps.push((entity, property));
        }
    }

    pub fn remove(&mut self, animator: AnimatorId, entity: Entity, property: AnimatableProperty) {
        if let Some(deps) = self.map.get_mut(&animator) {
            deps.retain(|d| *d != (entity, property));
            if deps.is_empty() {
                self.map.remove(&animator);
            }
        }
    }

    /// Copy of the dependents, safe to iterate while unbinding.
    pub fn dependents(&self, animator: AnimatorId) -> Dependents {
        self.map.get(&animator).cloned().unwrap_or_default()
    }

    pub fn count(&self, animator: AnimatorId) -> usize {
        self.map.get(&animator).map_or(0, SmallVec::len)
    }

    /// Total number of indexed bindings.
    pub fn total(&self) -> usize {
        self.map.values().map(SmallVec::len).sum()
    }
}
