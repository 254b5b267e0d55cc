//! Orientation component and rotation-matrix builders.
//!
//! Six representations are supported. All of them reduce to a 3×3 rotation
//! matrix through [`Orientation::to_matrix`]; the look-at variants also need
//! the node's own cartesian position.

use bevy_ecs::prelude::Component;
use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SceneError, ensure_finite};

const DEGENERATE: f32 = 1e-6;

/// Order in which the three elementary rotations of an euler triple are
/// applied. `Xyz` rotates about X first, then Y, then Z (`Rz · Ry · Rx`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    Xyz,
    Xzy,
    Yxz,
    Yzx,
    Zxy,
    Zyx,
}

/// A basis axis. Used to say which matrix column a look-at direction fills.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

/// Whether the look-at direction is used as is or flipped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AxisSign {
    #[default]
    Positive,
    Negative,
}

impl AxisSign {
    pub fn as_f32(self) -> f32 {
        match self {
            AxisSign::Positive => 1.0,
            AxisSign::Negative => -1.0,
        }
    }
}

/// Local orientation of a scene node relative to its parent.
#[derive(Component, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Orientation {
    /// Euler angles in radians, applied in `order`.
    Euler { rotation: Vec3, order: EulerOrder },
    /// Point `axis` at `target` (in parent space).
    LookAtPoint {
        target: Vec3,
        up: Vec3,
        axis: Axis,
        sign: AxisSign,
    },
    /// Point `axis` along `direction`.
    LookAtDirection {
        direction: Vec3,
        up: Vec3,
        axis: Axis,
        sign: AxisSign,
    },
    /// Basis given by its X axis and a vector in the XY plane.
    AxisPairXY { x: Vec3, y: Vec3 },
    /// Basis given by its Y axis and a vector in the YZ plane.
    AxisPairYZ { y: Vec3, z: Vec3 },
    /// Basis given by its Z axis and a vector in the ZX plane.
    AxisPairZX { z: Vec3, x: Vec3 },
}

impl Default for Orientation {
    fn default() -> Self {
        Orientation::Euler {
            rotation: Vec3::ZERO,
            order: EulerOrder::Xyz,
        }
    }
}

impl Orientation {
    pub fn euler(x: f32, y: f32, z: f32, order: EulerOrder) -> Self {
        Orientation::Euler {
            rotation: Vec3::new(x, y, z),
            order,
        }
    }

    /// Build the rotation matrix. `position` is the node's cartesian local
    /// position, only read by [`Orientation::LookAtPoint`].
    pub fn to_matrix(&self, position: Vec3) -> Mat3 {
        match *self {
            Orientation::Euler { rotation, order } => euler_matrix(rotation, order),
            Orientation::LookAtPoint {
                target,
                up,
                axis,
                sign,
            } => look_at_matrix(target - position, up, axis, sign),
            Orientation::LookAtDirection {
                direction,
                up,
                axis,
                sign,
            } => look_at_matrix(direction, up, axis, sign),
            Orientation::AxisPairXY { x, y } => {
                let x = x.normalize_or_zero();
                let z = x.cross(y).normalize_or_zero();
                orthonormal_or_identity(Mat3::from_cols(x, z.cross(x), z))
            }
            Orientation::AxisPairYZ { y, z } => {
                let y = y.normalize_or_zero();
                let x = y.cross(z).normalize_or_zero();
                orthonormal_or_identity(Mat3::from_cols(x, y, x.cross(y)))
            }
            Orientation::AxisPairZX { z, x } => {
                let z = z.normalize_or_zero();
                let y = z.cross(x).normalize_or_zero();
                orthonormal_or_identity(Mat3::from_cols(y.cross(z), y, z))
            }
        }
    }

    /// Check the payload before it is stored on an entity.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Orientation::Euler { rotation, .. } => {
                ensure_finite("euler rotation", &rotation.to_array())
            }
            Orientation::LookAtPoint { target, up, .. } => {
                ensure_finite("look-at target", &target.to_array())?;
                ensure_non_zero("look-at up", up)
            }
            Orientation::LookAtDirection { direction, up, .. } => {
                ensure_non_zero("look-at direction", direction)?;
                ensure_non_zero("look-at up", up)
            }
            Orientation::AxisPairXY { x, y } => ensure_pair("xy", x, y),
            Orientation::AxisPairYZ { y, z } => ensure_pair("yz", y, z),
            Orientation::AxisPairZX { z, x } => ensure_pair("zx", z, x),
        }
    }
}

/// Compose the elementary rotations of an euler triple in the given order.
pub fn euler_matrix(rotation: Vec3, order: EulerOrder) -> Mat3 {
    let rx = Mat3::from_rotation_x(rotation.x);
    let ry = Mat3::from_rotation_y(rotation.y);
    let rz = Mat3::from_rotation_z(rotation.z);
    match order {
        EulerOrder::Xyz => rz * ry * rx,
        EulerOrder::Xzy => ry * rz * rx,
        EulerOrder::Yxz => rz * rx * ry,
        EulerOrder::Yzx => rx * rz * ry,
        EulerOrder::Zxy => ry * rx * rz,
        EulerOrder::Zyx => rx * ry * rz,
    }
}

/// Orthonormal basis whose `axis` column is `sign * normalize(forward)`.
///
/// `up` hints the Y column for X and Z primaries and the Z column for a Y
/// primary. When it is zero or parallel to `forward` an arbitrary orthogonal
/// vector replaces it. A zero `forward` yields the identity.
pub fn look_at_matrix(forward: Vec3, up: Vec3, axis: Axis, sign: AxisSign) -> Mat3 {
    let primary = forward.normalize_or_zero() * sign.as_f32();
    if primary == Vec3::ZERO {
        return Mat3::IDENTITY;
    }
    let mut up = up.normalize_or_zero();
    if up == Vec3::ZERO || primary.cross(up).length() <= DEGENERATE {
        up = primary.any_orthonormal_vector();
    }
    match axis {
        Axis::Z => {
            let x = up.cross(primary).normalize();
            Mat3::from_cols(x, primary.cross(x), primary)
        }
        Axis::X => {
            let z = primary.cross(up).normalize();
            Mat3::from_cols(primary, z.cross(primary), z)
        }
        Axis::Y => {
            let x = primary.cross(up).normalize();
            Mat3::from_cols(x, primary, x.cross(primary))
        }
    }
}

fn orthonormal_or_identity(m: Mat3) -> Mat3 {
    if m.determinant().abs() <= DEGENERATE {
        Mat3::IDENTITY
    } else {
        m
    }
}

fn ensure_non_zero(what: &str, v: Vec3) -> Result<()> {
    ensure_finite(what, &v.to_array())?;
    if v.length() <= DEGENERATE {
        return Err(SceneError::InvalidParameter(format!("{what} must be non-zero")));
    }
    Ok(())
}

fn ensure_pair(name: &str, a: Vec3, b: Vec3) -> Result<()> {
    ensure_non_zero(name, a)?;
    ensure_non_zero(name, b)?;
    if a.normalize().cross(b.normalize()).length() <= DEGENERATE {
        return Err(SceneError::InvalidParameter(format!(
            "axis pair {name} must not be parallel"
        )));
    }
    Ok(())
}
