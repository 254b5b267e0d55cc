//! Pickable geometry and the ray types used by
//! [`crate::systems::raycast`].

use std::sync::Arc;

use bevy_ecs::prelude::{Component, Entity};
use glam::{Mat4, Vec3};
use serde::Serialize;

/// Half-line `origin + t * direction`, `t >= 0`. The direction need not be
/// normalized; hit distances are in units of its length.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Map the ray through an affine matrix. The parameter `t` of any point
    /// is preserved, so distances stay comparable across spaces.
    pub fn transformed(&self, m: &Mat4) -> Ray {
        Ray {
            origin: m.transform_point3(self.origin),
            direction: m.transform_vector3(self.direction),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Smallest box holding all points; `None` for no points.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }
}

/// Geometry for picking, in the entity's local space.
///
/// Triangles are shared so several nodes can pick against one mesh.
#[derive(Component, Clone, Debug)]
pub struct RayCastable {
    pub bounds: Aabb,
    pub triangles: Arc<[Triangle]>,
}

impl RayCastable {
    /// Build from triangles, deriving the bounds. `None` for an empty mesh.
    pub fn from_triangles(triangles: Vec<Triangle>) -> Option<Self> {
        let bounds = Aabb::from_points(triangles.iter().flat_map(|t| [t.a, t.b, t.c]))?;
        Some(Self {
            bounds,
            triangles: triangles.into(),
        })
    }

    /// Closed box of twelve triangles.
    pub fn cuboid(min: Vec3, max: Vec3) -> Self {
        let corner = |x: bool, y: bool, z: bool| {
            Vec3::new(
                if x { max.x } else { min.x },
                if y { max.y } else { min.y },
                if z { max.z } else { min.z },
            )
        };
        let quads = [
            // -x, +x
            [(false, false, false), (false, false, true), (false, true, true), (false, true, false)],
            [(true, false, false), (true, true, false), (true, true, true), (true, false, true)],
            // -y, +y
            [(false, false, false), (true, false, false), (true, false, true), (false, false, true)],
            [(false, true, false), (false, true, true), (true, true, true), (true, true, false)],
            // -z, +z
            [(false, false, false), (false, true, false), (true, true, false), (true, false, false)],
            [(false, false, true), (true, false, true), (true, true, true), (false, true, true)],
        ];
        let mut triangles = Vec::with_capacity(12);
        for q in quads {
            let [p0, p1, p2, p3] = q.map(|(x, y, z)| corner(x, y, z));
            triangles.push(Triangle::new(p0, p1, p2));
            triangles.push(Triangle::new(p0, p2, p3));
        }
        Self {
            bounds: Aabb::new(min, max),
            triangles: triangles.into(),
        }
    }
}

/// Barycentric hit on a triangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TriangleHit {
    pub t: f32,
    pub u: f32,
    pub v: f32,
}

/// Closest hit of a scene ray cast.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct RayHit {
    #[serde(serialize_with = "serialize_entity")]
    pub entity: Entity,
    pub t: f32,
}

fn serialize_entity<S: serde::Serializer>(entity: &Entity, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(entity.to_bits())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aabb_from_points() {
        let aabb = Aabb::from_points([Vec3::new(1.0, -2.0, 0.0), Vec3::new(-1.0, 3.0, 0.5)]).unwrap();
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 3.0, 0.5));
        assert!(aabb.contains(Vec3::ZERO));
        assert!(Aabb::from_points(std::iter::empty()).is_none());
    }

    #[test]
    fn test_cuboid_has_twelve_triangles_inside_bounds() {
        let c = RayCastable::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(c.triangles.len(), 12);
        for t in c.triangles.iter() {
            assert!(c.bounds.contains(t.a) && c.bounds.contains(t.b) && c.bounds.contains(t.c));
        }
    }

    #[test]
    fn test_from_triangles_derives_bounds() {
        let mesh = RayCastable::from_triangles(vec![
            Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y),
            Triangle::new(Vec3::new(0.0, 0.0, -2.0), Vec3::new(3.0, 0.0, 0.0), Vec3::ONE),
        ])
        .unwrap();
        assert_eq!(mesh.triangles.len(), 2);
        assert_eq!(mesh.bounds.min, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(mesh.bounds.max, Vec3::new(3.0, 1.0, 1.0));
        assert!(RayCastable::from_triangles(Vec::new()).is_none());
    }

    #[test]
    fn test_ray_transform_preserves_parameter() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            glam::Quat::from_rotation_z(0.3),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let moved = ray.transformed(&m);
        assert!((moved.at(1.5) - m.transform_point3(ray.at(1.5))).length() < 1e-5);
    }
}
