//! Animator bindings and the per-object animation record.
//!
//! A binding remaps an animator's normalized output onto one property of an
//! object: `value = lerp(value_at_0, value_at_1, output)`.
//!
//! # Storage
//!
//! - [`AnimatorBindings`] – the authoritative bindings of an object, one per
//!   [`AnimatableProperty`]
//! - [`AnimatorRecord`] – cache read by the fast update path: the base
//!   (un-animated) component values plus one [`BoundChannel`] per binding
//!
//! # Related
//!
//! - [`crate::resources::animatorregistry::AnimatorBindingIndex`] – reverse map
//!   from animator to bound objects
//! - [`crate::systems::animatorbinding::update_animators_only`] – the fast path

use bevy_ecs::prelude::Component;
use glam::Vec4;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::animator::AnimatorId;
use super::orientation::Orientation;
use super::position::Position;
use super::scale::Scale;

/// Component an [`AnimatableProperty`] lives in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PropertyOwner {
    Position,
    Orientation,
    Scale,
    Tint,
}

/// A single animatable scalar of an object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnimatableProperty {
    /// Cartesian position components.
    PositionX,
    PositionY,
    PositionZ,
    /// Distance along a linear position.
    PositionOffset,
    /// Radius of a spherical or cylindrical position.
    PositionRadius,
    /// Longitude of a spherical or cylindrical position.
    PositionLongitude,
    /// Latitude of a spherical position.
    PositionLatitude,
    /// Height of a cylindrical position.
    PositionHeight,
    /// Euler angles.
    EulerX,
    EulerY,
    EulerZ,
    /// Per-axis scale components.
    ScaleX,
    ScaleY,
    ScaleZ,
    /// Uniform scale factor.
    ScaleUniform,
    /// Tint channels.
    ColorR,
    ColorG,
    ColorB,
    ColorA,
}

impl AnimatableProperty {
    /// Component the property reads from and writes to.
    pub fn owner(self) -> PropertyOwner {
        use AnimatableProperty as P;
        match self {
            P::PositionX
            | P::PositionY
            | P::PositionZ
            | P::PositionOffset
            | P::PositionRadius
            | P::PositionLongitude
            | P::PositionLatitude
            | P::PositionHeight => PropertyOwner::Position,
            P::EulerX | P::EulerY | P::EulerZ => PropertyOwner::Orientation,
            P::ScaleX | P::ScaleY | P::ScaleZ | P::ScaleUniform => PropertyOwner::Scale,
            P::ColorR | P::ColorG | P::ColorB | P::ColorA => PropertyOwner::Tint,
        }
    }

    /// Whether the property feeds the local matrix (as opposed to the tint).
    pub fn affects_transform(self) -> bool {
        self.owner() != PropertyOwner::Tint
    }

    /// Current value of this property on `position`, if the representation
    /// has it.
    pub fn read_position(self, position: &Position) -> Option<f32> {
        use AnimatableProperty as P;
        match (self, position) {
            (P::PositionX, Position::Cartesian(p)) => Some(p.x),
            (P::PositionY, Position::Cartesian(p)) => Some(p.y),
            (P::PositionZ, Position::Cartesian(p)) => Some(p.z),
            (P::PositionOffset, Position::Linear { offset, .. }) => Some(*offset),
            (P::PositionRadius, Position::Spherical { radius, .. })
            | (P::PositionRadius, Position::Cylindrical { radius, .. }) => Some(*radius),
            (P::PositionLongitude, Position::Spherical { longitude, .. })
            | (P::PositionLongitude, Position::Cylindrical { longitude, .. }) => Some(*longitude),
            (P::PositionLatitude, Position::Spherical { latitude, .. }) => Some(*latitude),
            (P::PositionHeight, Position::Cylindrical { height, .. }) => Some(*height),
            _ => None,
        }
    }

    /// Overwrite this property on `position`. Returns `false` when the
    /// representation has no such property.
    pub fn write_position(self, position: &mut Position, value: f32) -> bool {
        use AnimatableProperty as P;
        let slot = match position {
            Position::Cartesian(p) => match self {
                P::PositionX => &mut p.x,
                P::PositionY => &mut p.y,
                P::PositionZ => &mut p.z,
                _ => return false,
            },
            Position::Linear { offset, .. } => match self {
                P::PositionOffset => offset,
                _ => return false,
            },
            Position::Spherical {
                radius,
                longitude,
                latitude,
                ..
            } => match self {
                P::PositionRadius => radius,
                P::PositionLongitude => longitude,
                P::PositionLatitude => latitude,
                _ => return false,
            },
            Position::Cylindrical {
                radius,
                longitude,
                height,
                ..
            } => match self {
                P::PositionRadius => radius,
                P::PositionLongitude => longitude,
                P::PositionHeight => height,
                _ => return false,
            },
        };
        *slot = value;
        true
    }

    pub fn read_orientation(self, orientation: &Orientation) -> Option<f32> {
        match (self, orientation) {
            (AnimatableProperty::EulerX, Orientation::Euler { rotation, .. }) => Some(rotation.x),
            (AnimatableProperty::EulerY, Orientation::Euler { rotation, .. }) => Some(rotation.y),
            (AnimatableProperty::EulerZ, Orientation::Euler { rotation, .. }) => Some(rotation.z),
            _ => None,
        }
    }

    pub fn write_orientation(self, orientation: &mut Orientation, value: f32) -> bool {
        let Orientation::Euler { rotation, .. } = orientation else {
            return false;
        };
        match self {
            AnimatableProperty::EulerX => rotation.x = value,
            AnimatableProperty::EulerY => rotation.y = value,
            AnimatableProperty::EulerZ => rotation.z = value,
            _ => return false,
        }
        true
    }

    pub fn read_scale(self, scale: &Scale) -> Option<f32> {
        match (self, scale) {
            (AnimatableProperty::ScaleX, Scale::Vector(v)) => Some(v.x),
            (AnimatableProperty::ScaleY, Scale::Vector(v)) => Some(v.y),
            (AnimatableProperty::ScaleZ, Scale::Vector(v)) => Some(v.z),
            (AnimatableProperty::ScaleUniform, Scale::Uniform(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn write_scale(self, scale: &mut Scale, value: f32) -> bool {
        match (self, scale) {
            (AnimatableProperty::ScaleX, Scale::Vector(v)) => v.x = value,
            (AnimatableProperty::ScaleY, Scale::Vector(v)) => v.y = value,
            (AnimatableProperty::ScaleZ, Scale::Vector(v)) => v.z = value,
            (AnimatableProperty::ScaleUniform, Scale::Uniform(s)) => *s = value,
            _ => return false,
        }
        true
    }

    /// Index into an RGBA vector for colour channels.
    pub fn color_channel(self) -> Option<usize> {
        match self {
            AnimatableProperty::ColorR => Some(0),
            AnimatableProperty::ColorG => Some(1),
            AnimatableProperty::ColorB => Some(2),
            AnimatableProperty::ColorA => Some(3),
            _ => None,
        }
    }
}

/// Linear remap of an animator's output onto a property range.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimatorBinding {
    pub animator: AnimatorId,
    pub value_at_0: f32,
    pub value_at_1: f32,
}

impl AnimatorBinding {
    pub fn new(animator: AnimatorId, value_at_0: f32, value_at_1: f32) -> Self {
        Self {
            animator,
            value_at_0,
            value_at_1,
        }
    }

    /// Property value for the animator output `t`.
    ///
    /// Exact at both ends: `evaluate(0.0) == value_at_0` and
    /// `evaluate(1.0) == value_at_1`.
    pub fn evaluate(&self, t: f32) -> f32 {
        self.value_at_0 * (1.0 - t) + self.value_at_1 * t
    }
}

/// Bindings of an object, at most one per property.
#[derive(Component, Clone, Debug, Default)]
pub struct AnimatorBindings {
    entries: SmallVec<[(AnimatableProperty, AnimatorBinding); 4]>,
}

impl AnimatorBindings {
    pub fn get(&self, property: AnimatableProperty) -> Option<&AnimatorBinding> {
        self.entries
            .iter()
            .find(|(p, _)| *p == property)
            .map(|(_, b)| b)
    }

    /// Insert or replace; returns the previous binding for the property.
    pub fn insert(
        &mut self,
        property: AnimatableProperty,
        binding: AnimatorBinding,
    ) -> Option<AnimatorBinding> {
        if let Some((_, existing)) = self.entries.iter_mut().find(|(p, _)| *p == property) {
            return Some(std::mem::replace(existing, binding));
        }
        self.entries.push((property, binding));
        None
    }

    pub fn remove(&mut self, property: AnimatableProperty) -> Option<AnimatorBinding> {
        let index = self.entries.iter().position(|(p, _)| *p == property)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(AnimatableProperty, AnimatorBinding)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One bound property as seen by the fast path.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoundChannel {
    pub property: AnimatableProperty,
    pub animator: AnimatorId,
    /// Index of the animator's output in
    /// [`AnimatorValues`](crate::resources::animatorregistry::AnimatorValues).
    pub slot: usize,
    pub binding: AnimatorBinding,
}

/// Base values and bound channels of an animated object.
///
/// Only the fast path reads this; the authoritative `Position`,
/// `Orientation` and `Scale` components are never written by animation.
#[derive(Component, Clone, Debug)]
pub struct AnimatorRecord {
    pub base_position: Position,
    pub base_orientation: Orientation,
    pub base_scale: Scale,
    pub base_tint: Option<Vec4>,
    pub channels: SmallVec<[BoundChannel; 4]>,
}

impl AnimatorRecord {
    /// Whether any channel drives the local matrix.
    pub fn animates_transform(&self) -> bool {
        self.channels.iter().any(|c| c.property.affects_transform())
    }

    /// Base values with every bound channel applied for `values`.
    pub fn animated(&self, values: &[f32]) -> (Position, Orientation, Scale, Option<Vec4>) {
        let mut position = self.base_position;
        let mut orientation = self.base_orientation;
        let mut scale = self.base_scale;
        let mut tint = self.base_tint;
        for channel in &self.channels {
            let t = values.get(channel.slot).copied().unwrap_or(0.0);
            let value = channel.binding.evaluate(t);
            let property = channel.property;
            match property.owner() {
                PropertyOwner::Position => {
                    property.write_position(&mut position, value);
                }
                PropertyOwner::Orientation => {
                    property.write_orientation(&mut orientation, value);
                }
                PropertyOwner::Scale => {
                    property.write_scale(&mut scale, value);
                }
                PropertyOwner::Tint => {
                    if let (Some(i), Some(color)) = (property.color_channel(), tint.as_mut()) {
                        color[i] = value;
                    }
                }
            }
        }
        (position, orientation, scale, tint)
    }
}
