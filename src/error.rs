//! Error type returned at every Make/Update boundary of the scene.
//!
//! Degenerate geometry (poles, parallel rays) never produces an error; it is
//! clamped or rejected locally. Errors are reserved for caller mistakes that
//! would otherwise corrupt the tree or leave dangling animator ids.

use bevy_ecs::prelude::Entity;
use thiserror::Error;

use crate::components::animator::AnimatorId;
use crate::components::animatorbinding::AnimatableProperty;
use crate::events::change::{ChangePhase, TrackedComponent};

/// Errors reported by the scene editing API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    /// A numeric parameter is out of range or not finite.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Reparenting would make `entity` its own ancestor.
    #[error("cannot parent {entity:?} under {parent:?}: it would create a cycle")]
    CyclicReparent { entity: Entity, parent: Entity },
    /// The property does not exist on the object's current representation,
    /// or no binding exists for it.
    #[error("no animatable property {property:?} on {entity:?}")]
    UnknownBinding {
        entity: Entity,
        property: AnimatableProperty,
    },
    /// The entity does not exist or is not a scene node.
    #[error("unknown scene entity {0:?}")]
    UnknownEntity(Entity),
    /// No animator with this id is registered.
    #[error("unknown animator {0:?}")]
    UnknownAnimator(AnimatorId),
    /// The entity exists but lacks the component the operation needs.
    #[error("{entity:?} has no {component:?} component")]
    MissingComponent {
        entity: Entity,
        component: TrackedComponent,
    },
    /// Every observer slot for this component and phase is taken.
    #[error("no free observer slot for {component:?} {phase:?}")]
    ObserverSlotsFull {
        component: TrackedComponent,
        phase: ChangePhase,
    },
    /// Configuration file could not be read, parsed or written.
    #[error("config error: {0}")]
    Config(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SceneError>;

/// Fail with [`SceneError::InvalidParameter`] unless every value is finite.
pub(crate) fn ensure_finite(what: &str, values: &[f32]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SceneError::InvalidParameter(format!("{what} must be finite")))
    }
}
