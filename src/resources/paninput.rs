//! Pointer pan location fed to pan animators.
//!
//! The host writes the latest pan (pointer, touch or gamepad stick) location
//! here before running a frame; [`AnimatorSource::Pan`] animators map it into
//! their rectangle.
//!
//! [`AnimatorSource::Pan`]: crate::components::animator::AnimatorSource::Pan

use bevy_ecs::prelude::Resource;
use glam::Vec2;

#[derive(Resource, Clone, Copy, Debug, Default, PartialEq)]
pub struct PanInput {
    pub location: Vec2,
}
