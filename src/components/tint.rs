//! Color tint components.
//!
//! - [`Tint`] – the authoritative RGBA colour set by the editing API
//! - [`EffectiveTint`] – what the renderer should use this frame; equal to
//!   `Tint` unless a colour channel is bound to an animator

use bevy_ecs::prelude::Component;
use glam::Vec4;

/// Color tint in linear RGBA, each channel in `[0, 1]`.
#[derive(Component, Clone, Debug, Copy, PartialEq)]
pub struct Tint {
    pub color: Vec4,
}

impl Tint {
    /// Create a new Tint with the specified RGBA values.
    pub fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            color: Vec4::new(r, g, b, a),
        }
    }
}

impl Default for Tint {
    fn default() -> Self {
        Self { color: Vec4::ONE }
    }
}

/// Tint after animation, written by the fast update path.
#[derive(Component, Clone, Debug, Copy, PartialEq)]
pub struct EffectiveTint(pub Vec4);
