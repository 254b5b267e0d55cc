use bevy_ecs::prelude::Component;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ensure_finite};

/// Local scale of a scene node, per axis or uniform.
#[derive(Component, Clone, Debug, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scale {
    Vector(Vec3),
    Uniform(f32),
}

impl Scale {
    pub fn new(sx: f32, sy: f32, sz: f32) -> Self {
        Scale::Vector(Vec3::new(sx, sy, sz))
    }

    /// Diagonal of the scale matrix.
    pub fn to_vec3(&self) -> Vec3 {
        match *self {
            Scale::Vector(v) => v,
            Scale::Uniform(s) => Vec3::splat(s),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            Scale::Vector(v) => ensure_finite("scale", &v.to_array()),
            Scale::Uniform(s) => ensure_finite("uniform scale", &[s]),
        }
    }
}

impl Default for Scale {
    fn default() -> Self {
        Scale::Uniform(1.0)
    }
}
