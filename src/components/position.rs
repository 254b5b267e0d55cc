//! Position component and coordinate conversions.
//!
//! A [`Position`] is stored in one of four representations. Every
//! representation reduces to a cartesian point through
//! [`Position::to_cartesian`], which is what the transform passes consume.
//!
//! Angles are radians. Longitude is measured around the +Y axis starting at
//! +Z (towards +X); latitude is measured down from the +Y pole.

use bevy_ecs::prelude::Component;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError, ensure_finite};

/// Below this length a direction or radius is treated as degenerate.
const DEGENERATE: f32 = 1e-6;

/// Local position of a scene node relative to its parent.
#[derive(Component, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Position {
    /// Plain `(x, y, z)` point.
    Cartesian(Vec3),
    /// A point `offset` units along `direction` from `origin`.
    Linear {
        origin: Vec3,
        direction: Vec3,
        offset: f32,
    },
    /// Spherical coordinates around `origin`.
    Spherical {
        origin: Vec3,
        radius: f32,
        longitude: f32,
        latitude: f32,
    },
    /// Cylindrical coordinates around the vertical axis through `origin`.
    Cylindrical {
        origin: Vec3,
        radius: f32,
        longitude: f32,
        height: f32,
    },
}

impl Default for Position {
    fn default() -> Self {
        Position::Cartesian(Vec3::ZERO)
    }
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Position::Cartesian(Vec3::new(x, y, z))
    }

    /// Resolve the representation to a cartesian point.
    pub fn to_cartesian(&self) -> Vec3 {
        match *self {
            Position::Cartesian(p) => p,
            Position::Linear {
                origin,
                direction,
                offset,
            } => origin + direction.normalize_or_zero() * offset,
            Position::Spherical {
                origin,
                radius,
                longitude,
                latitude,
            } => {
                let (sin_lon, cos_lon) = longitude.sin_cos();
                let (sin_lat, cos_lat) = latitude.sin_cos();
                origin + radius * Vec3::new(sin_lon * sin_lat, cos_lat, cos_lon * sin_lat)
            }
            Position::Cylindrical {
                origin,
                radius,
                longitude,
                height,
            } => {
                let (sin_lon, cos_lon) = longitude.sin_cos();
                origin + Vec3::new(radius * sin_lon, height, radius * cos_lon)
            }
        }
    }

    /// Express `point` in spherical coordinates around `origin`.
    ///
    /// At the origin or on the poles the undefined angles are returned as 0.
    pub fn spherical_from_cartesian(origin: Vec3, point: Vec3) -> Self {
        let d = point - origin;
        let radius = d.length();
        if radius <= DEGENERATE {
            return Position::Spherical {
                origin,
                radius: 0.0,
                longitude: 0.0,
                latitude: 0.0,
            };
        }
        let latitude = (d.y / radius).clamp(-1.0, 1.0).acos();
        let ring = radius * latitude.sin();
        let longitude = if ring.abs() <= DEGENERATE {
            0.0
        } else {
            signed_longitude(d.x, d.z, ring)
        };
        Position::Spherical {
            origin,
            radius,
            longitude,
            latitude,
        }
    }

    /// Express `point` in cylindrical coordinates around `origin`.
    pub fn cylindrical_from_cartesian(origin: Vec3, point: Vec3) -> Self {
        let d = point - origin;
        let radius = (d.x * d.x + d.z * d.z).sqrt();
        let longitude = if radius <= DEGENERATE {
            0.0
        } else {
            signed_longitude(d.x, d.z, radius)
        };
        Position::Cylindrical {
            origin,
            radius,
            longitude,
            height: d.y,
        }
    }

    /// Express `point` as a distance along the ray from `origin` through it.
    pub fn linear_from_cartesian(origin: Vec3, point: Vec3) -> Self {
        let d = point - origin;
        let offset = d.length();
        let direction = if offset <= DEGENERATE {
            Vec3::Z
        } else {
            d / offset
        };
        Position::Linear {
            origin,
            direction,
            offset,
        }
    }

    /// Re-express this position in spherical form around `origin`.
    pub fn to_spherical(&self, origin: Vec3) -> Self {
        Self::spherical_from_cartesian(origin, self.to_cartesian())
    }

    /// Re-express this position in cylindrical form around `origin`.
    pub fn to_cylindrical(&self, origin: Vec3) -> Self {
        Self::cylindrical_from_cartesian(origin, self.to_cartesian())
    }

    /// Re-express this position in linear form from `origin`.
    pub fn to_linear(&self, origin: Vec3) -> Self {
        Self::linear_from_cartesian(origin, self.to_cartesian())
    }

    /// Check the payload before it is stored on an entity.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Position::Cartesian(p) => ensure_finite("cartesian position", &p.to_array()),
            Position::Linear {
                origin,
                direction,
                offset,
            } => {
                ensure_finite("linear origin", &origin.to_array())?;
                ensure_finite("linear direction", &direction.to_array())?;
                ensure_finite("linear offset", &[offset])?;
                if direction.length() <= DEGENERATE {
                    return Err(SceneError::InvalidParameter(
                        "linear direction must be non-zero".into(),
                    ));
                }
                Ok(())
            }
            Position::Spherical {
                origin,
                radius,
                longitude,
                latitude,
            } => {
                ensure_finite("spherical origin", &origin.to_array())?;
                ensure_finite("spherical coordinates", &[radius, longitude, latitude])?;
                ensure_non_negative_radius(radius)
            }
            Position::Cylindrical {
                origin,
                radius,
                longitude,
                height,
            } => {
                ensure_finite("cylindrical origin", &origin.to_array())?;
                ensure_finite("cylindrical coordinates", &[radius, longitude, height])?;
                ensure_non_negative_radius(radius)
            }
        }
    }
}

/// Longitude of `(x, z)` on a circle of radius `ring`, in `(-PI, PI]`.
fn signed_longitude(x: f32, z: f32, ring: f32) -> f32 {
    let lon = (z / ring).clamp(-1.0, 1.0).acos();
    if x < 0.0 { -lon } else { lon }
}

fn ensure_non_negative_radius(radius: f32) -> Result<()> {
    if radius < 0.0 {
        Err(SceneError::InvalidParameter(format!(
            "radius must be non-negative, got {radius}"
        )))
    } else {
        Ok(())
    }
}
