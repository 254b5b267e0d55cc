//! Component lifecycle notifications.
//!
//! The scene editing API triggers one of these events around every Make,
//! Update and Destroy call:
//!
//! - [`DidEmerge`] – after a component was attached
//! - [`WillChange`] – before a new value is applied
//! - [`WillPerish`] – before a component is removed
//!
//! # Example
//!
//! ```ignore
//! let token = scene.observe_will_change(TrackedComponent::Position, |event| {
//!     log::info!("{:?} is about to move", event.entity);
//! })?;
//! // ...
//! scene.remove_observer(token);
//! ```
//!
//! Observers run synchronously inside the editing call and must not rely on
//! the new value being visible yet for `WillChange`.

use bevy_ecs::prelude::*;

use crate::components::animatorbinding::AnimatableProperty;

/// Component kinds with lifecycle notifications.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TrackedComponent {
    Position,
    Orientation,
    Scale,
    Animator,
    AnimatorBinding,
}

/// Point in the lifecycle an observer is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ChangePhase {
    WillChange,
    DidEmerge,
    WillPerish,
}

/// A tracked component was attached to `entity`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct DidEmerge {
    pub entity: Entity,
    pub component: TrackedComponent,
    /// Set for [`TrackedComponent::AnimatorBinding`].
    pub property: Option<AnimatableProperty>,
}

/// A tracked component of `entity` is about to receive a new value.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WillChange {
    pub entity: Entity,
    pub component: TrackedComponent,
    pub property: Option<AnimatableProperty>,
}

/// A tracked component is about to be removed from `entity`.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WillPerish {
    pub entity: Entity,
    pub component: TrackedComponent,
    pub property: Option<AnimatableProperty>,
}

/// Shared view of the three lifecycle events, so observers can be
/// registered generically.
pub trait ChangeEvent: Event {
    /// Phase observers of this event occupy slots in.
    const PHASE: ChangePhase;

    fn component(&self) -> TrackedComponent;
}

impl ChangeEvent for DidEmerge {
    const PHASE: ChangePhase = ChangePhase::DidEmerge;

    fn component(&self) -> TrackedComponent {
        self.component
    }
}

impl ChangeEvent for WillChange {
    const PHASE: ChangePhase = ChangePhase::WillChange;

    fn component(&self) -> TrackedComponent {
        self.component
    }
}

impl ChangeEvent for WillPerish {
    const PHASE: ChangePhase = ChangePhase::WillPerish;

    fn component(&self) -> TrackedComponent {
        self.component
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_report_phase_and_component() {
        let entity = Entity::PLACEHOLDER;
        let emerge = DidEmerge {
            entity,
            component: TrackedComponent::Scale,
            property: None,
        };
        let perish = WillPerish {
            entity,
            component: TrackedComponent::AnimatorBinding,
            property: Some(AnimatableProperty::ColorR),
        };
        assert_eq!(emerge.component(), TrackedComponent::Scale);
        assert_eq!(perish.component(), TrackedComponent::AnimatorBinding);
        assert_eq!(DidEmerge::PHASE, ChangePhase::DidEmerge);
        assert_eq!(WillChange::PHASE, ChangePhase::WillChange);
        assert_eq!(WillPerish::PHASE, ChangePhase::WillPerish);
    }
}
