//! Local and world matrices of a scene node, plus its tree links.
//!
//! Every scene node carries a [`Transformation`]. Its [`Position`],
//! [`Orientation`] and [`Scale`] components are interpreted relative to the
//! parent named in [`TransformationNode::parent`]. The
//! [`propagate_dirty_transforms`](crate::systems::propagate_transforms::propagate_dirty_transforms)
//! system keeps `local` and `global` up to date; the renderer only reads them.

use bevy_ecs::prelude::{Component, Entity};
use glam::{Mat3, Mat4, Vec3};

use super::orientation::Orientation;
use super::position::Position;
use super::scale::Scale;

/// Intrusive tree links. Siblings form a doubly linked list headed by the
/// parent's `first_child`. Links are plain entity handles and never own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformationNode {
    pub parent: Option<Entity>,
    pub first_child: Option<Entity>,
    pub prev_sibling: Option<Entity>,
    pub next_sibling: Option<Entity>,
    pub children_count: u32,
    /// Depth in the tree; roots are 0.
    pub level: u32,
}

/// Computed matrices for a scene node.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transformation {
    /// Transform relative to the parent.
    pub local: Mat4,
    /// Transform relative to the world root.
    pub global: Mat4,
    /// `global` flips handedness; the renderer swaps winding order.
    pub is_mirroring: bool,
    pub node: TransformationNode,
}

impl Default for Transformation {
    fn default() -> Self {
        Self {
            local: Mat4::IDENTITY,
            global: Mat4::IDENTITY,
            is_mirroring: false,
            node: TransformationNode::default(),
        }
    }
}

impl Transformation {
    /// Store a new global matrix and refresh the mirroring flag.
    pub fn set_global(&mut self, global: Mat4) {
        self.global = global;
        self.is_mirroring = is_mirroring(&global);
    }

    /// Store `local` and derive `global` from the parent's world matrix.
    pub fn set_local(&mut self, local: Mat4, parent_global: Option<Mat4>) {
        self.local = local;
        self.set_global(match parent_global {
            Some(parent) => parent * local,
            None => local,
        });
    }

    /// World-space translation.
    pub fn world_position(&self) -> Vec3 {
        self.global.w_axis.truncate()
    }
}

/// Marker: local/global must be recomputed before the next read.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct DirtyFlag;

/// Negative determinant of the upper-left 3×3 block.
pub fn is_mirroring(m: &Mat4) -> bool {
    Mat3::from_mat4(*m).determinant() < 0.0
}

/// `translation(position) · rotation · scale` as a single matrix.
pub fn compose_local(position: Vec3, rotation: Mat3, scale: Vec3) -> Mat4 {
    Mat4::from_cols(
        (rotation.x_axis * scale.x).extend(0.0),
        (rotation.y_axis * scale.y).extend(0.0),
        (rotation.z_axis * scale.z).extend(0.0),
        position.extend(1.0),
    )
}

/// Local matrix for the given (possibly absent) components. Missing
/// components fall back to the origin, identity rotation and unit scale.
pub fn local_from_components(
    position: Option<&Position>,
    orientation: Option<&Orientation>,
    scale: Option<&Scale>,
) -> Mat4 {
    let p = position.map(Position::to_cartesian).unwrap_or(Vec3::ZERO);
    let r = orientation
        .map(|o| o.to_matrix(p))
        .unwrap_or(Mat3::IDENTITY);
    let s = scale.map(Scale::to_vec3).unwrap_or(Vec3::ONE);
    compose_local(p, r, s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::orientation::EulerOrder;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 1e-5;

    fn mat_approx_eq(a: Mat4, b: Mat4) -> bool {
        a.abs_diff_eq(b, EPSILON)
    }

    #[test]
    fn test_default_is_identity_root() {
        let t = Transformation::default();
        assert_eq!(t.local, Mat4::IDENTITY);
        assert_eq!(t.global, Mat4::IDENTITY);
        assert!(!t.is_mirroring);
        assert_eq!(t.node.level, 0);
        assert!(t.node.parent.is_none());
    }

    #[test]
    fn test_compose_matches_trs() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        let r = Mat3::from_rotation_y(0.7);
        let s = Vec3::new(2.0, 0.5, 1.5);
        let expected = Mat4::from_translation(p) * Mat4::from_mat3(r) * Mat4::from_scale(s);
        assert!(mat_approx_eq(compose_local(p, r, s), expected));
    }

    #[test]
    fn test_local_from_missing_components_is_identity() {
        assert_eq!(local_from_components(None, None, None), Mat4::IDENTITY);
    }

    #[test]
    fn test_local_from_components() {
        let pos = Position::new(0.0, 1.0, 0.0);
        let ori = Orientation::euler(0.0, 0.0, FRAC_PI_2, EulerOrder::Xyz);
        let scale = Scale::Uniform(2.0);
        let m = local_from_components(Some(&pos), Some(&ori), Some(&scale));
        // X axis scaled by 2 then rotated onto +Y, then translated by (0, 1, 0)
        let p = m.transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 3.0, 0.0)).length() < EPSILON);
    }

    #[test]
    fn test_mirroring_from_negative_scale() {
        let mut t = Transformation::default();
        t.set_local(compose_local(Vec3::ZERO, Mat3::IDENTITY, Vec3::new(-1.0, 1.0, 1.0)), None);
        assert!(t.is_mirroring);
        // two flips cancel out
        let parent = t.global;
        t.set_local(compose_local(Vec3::ZERO, Mat3::IDENTITY, Vec3::new(1.0, -1.0, 1.0)), Some(parent));
        assert!(!t.is_mirroring);
    }

    #[test]
    fn test_set_local_composes_with_parent() {
        let mut t = Transformation::default();
        let parent = Mat4::from_translation(Vec3::new(5.0, 0.0, 0.0));
        t.set_local(Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0)), Some(parent));
        assert!((t.world_position() - Vec3::new(5.0, 1.0, 0.0)).length() < EPSILON);
    }
}
