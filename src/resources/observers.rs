//! Fixed-capacity observer slots for component lifecycle events.
//!
//! Observers themselves are ordinary bevy observer entities listening for
//! [`DidEmerge`](crate::events::change::DidEmerge),
//! [`WillChange`](crate::events::change::WillChange) or
//! [`WillPerish`](crate::events::change::WillPerish). This resource only
//! bounds how many may be attached per (component, phase) and hands out the
//! tokens used to detach them again.

use arrayvec::ArrayVec;
use bevy_ecs::prelude::*;
use rustc_hash::FxHashMap;

use crate::error::{Result, SceneError};
use crate::events::change::{ChangePhase, TrackedComponent};

/// Observers allowed per (component, phase).
pub const OBSERVER_SLOTS: usize = 8;

/// Handle returned when an observer is registered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObserverToken {
    pub component: TrackedComponent,
    pub phase: ChangePhase,
    /// The bevy observer entity.
    pub observer: Entity,
}

#[derive(Resource, Debug, Default)]
pub struct ChangeObservers {
    slots: FxHashMap<(TrackedComponent, ChangePhase), ArrayVec<Entity, OBSERVER_SLOTS>>,
}

impl ChangeObservers {
    /// Fail early if no slot is left, before the observer is spawned.
    pub fn ensure_free(&self, component: TrackedComponent, phase: ChangePhase) -> Result<()> {
        match self.slots.get(&(component, phase)) {
            Some(slots) if slots.is_full() => {
                Err(SceneError::ObserverSlotsFull { component, phase })
            }
            _ => Ok(()),
        }
    }

    /// Occupy a slot with an already spawned observer.
    pub fn insert(
        &mut self,
        component: TrackedComponent,
        phase: ChangePhase,
        observer: Entity,
    ) -> Result<ObserverToken> {
        self.slots
            .entry((component, phase))
            .or_default()
            .try_push(observer)
            .map_err(|_| SceneError::ObserverSlotsFull { component, phase })?;
        Ok(ObserverToken {
            component,
            phase,
            observer,
        })
    }

    /// Free the token's slot. Returns `false` if it was not registered.
    pub fn remove(&mut self, token: ObserverToken) -> bool {
        let Some(slots) = self.slots.get_mut(&(token.component, token.phase)) else {
            return false;
        };
        match slots.iter().position(|e| *e == token.observer) {
            Some(i) => {
                slots.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn count(&self, component: TrackedComponent, phase: ChangePhase) -> usize {
        self.slots.get(&(component, phase)).map_or(0, ArrayVec::len)
    }
}
