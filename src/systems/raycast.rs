//! Ray picking against [`RayCastable`] geometry.
//!
//! - [`intersect_aabb`] – slab test
//! - [`intersect_triangle`] – Möller–Trumbore, both faces
//! - [`ray_cast`] – closest hit over every ray-castable entity
//!
//! Rays are carried into each entity's local space with the inverse of its
//! world matrix. The direction is not renormalized, so a hit parameter `t`
//! means the same world point in every space and hits of different entities
//! compare directly.
//!
//! [`ray_cast`] reads the stored world matrices; use
//! [`Scene::ray_cast_scene`](crate::scene::Scene::ray_cast_scene) to refresh
//! them first.

use bevy_ecs::prelude::*;
use log::trace;

use crate::components::raycastable::{Aabb, Ray, RayCastable, RayHit, Triangle, TriangleHit};
use crate::components::transformation::Transformation;

/// World matrices with a determinant this small are treated as collapsed.
const MIN_DETERMINANT: f32 = 1e-12;

/// Nearest non-negative `t` where `ray` meets `aabb`.
///
/// Direction components within `tolerance` of zero are treated as parallel
/// to that slab: the ray misses unless its origin lies inside the slab. A ray
/// starting inside the box reports where it leaves.
pub fn intersect_aabb(ray: &Ray, aabb: &Aabb, tolerance: f32) -> Option<f32> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;
    for axis in 0..3 {
        let origin = ray.origin[axis];
        let direction = ray.direction[axis];
        let (lo, hi) = (aabb.min[axis], aabb.max[axis]);
        if direction.abs() <= tolerance {
            if origin < lo || origin > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction;
        let (mut t0, mut t1) = ((lo - origin) * inv, (hi - origin) * inv);
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        t_enter = t_enter.max(t0);
        t_exit = t_exit.min(t1);
        if t_enter > t_exit {
            return None;
        }
    }
    if t_exit < 0.0 {
        return None;
    }
    if t_enter >= 0.0 {
        Some(t_enter)
    } else if t_exit.is_finite() {
        Some(t_exit)
    } else {
        // zero direction from inside the box
        Some(0.0)
    }
}

/// Ray/triangle intersection with barycentric coordinates.
///
/// Rejects near-parallel rays (`|det| <= tolerance`), hits outside the
/// triangle and hits at or behind the origin. Both faces count.
pub fn intersect_triangle(ray: &Ray, triangle: &Triangle, tolerance: f32) -> Option<TriangleHit> {
    let edge1 = triangle.b - triangle.a;
    let edge2 = triangle.c - triangle.a;
    let p = ray.direction.cross(edge2);
    let det = edge1.dot(p);
    if det.abs() <= tolerance {
        return None;
    }
    let inv_det = 1.0 / det;
    let s = ray.origin - triangle.a;
    let u = s.dot(p) * inv_det;
    if !(0.0..=1.0).contains(&u) {
        return None;
    }
    let q = s.cross(edge1);
    let v = ray.direction.dot(q) * inv_det;
    if v < 0.0 || u + v > 1.0 {
        return None;
    }
    let t = edge2.dot(q) * inv_det;
    if t <= 0.0 {
        return None;
    }
    Some(TriangleHit { t, u, v })
}

/// Closest triangle hit of `ray` in local space.
pub fn intersect_mesh(ray: &Ray, castable: &RayCastable, tolerance: f32) -> Option<TriangleHit> {
    intersect_aabb(ray, &castable.bounds, tolerance)?;
    castable
        .triangles
        .iter()
        .filter_map(|tri| intersect_triangle(ray, tri, tolerance))
        .min_by(|a, b| a.t.total_cmp(&b.t))
}

/// Closest hit over all ray-castable entities, using stored world matrices.
pub fn ray_cast(world: &mut World, ray: &Ray, tolerance: f32) -> Option<RayHit> {
    let mut query = world.query::<(Entity, &Transformation, &RayCastable)>();
    let mut best: Option<RayHit> = None;
    for (entity, transformation, castable) in query.iter(world) {
        let det = transformation.global.determinant();
        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            trace!("ray_cast: skipping collapsed {:?}", entity);
            continue;
        }
        let local = ray.transformed(&transformation.global.inverse());
        if let Some(hit) = intersect_mesh(&local, castable, tolerance)
            && best.is_none_or(|b| hit.t < b.t)
        {
            best = Some(RayHit { entity, t: hit.t });
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Mat4, Vec3};

    const EPSILON: f32 = 1e-5;
    const TOL: f32 = 1e-6;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    // ==================== AABB ====================

    #[test]
    fn test_aabb_front_hit() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z);
        let t = intersect_aabb(&ray, &unit_box(), TOL).unwrap();
        assert!((t - 4.0).abs() < EPSILON);
    }

    #[test]
    fn test_aabb_parallel_outside_misses() {
        let ray = Ray::new(Vec3::new(2.0, 0.0, -5.0), Vec3::Z);
        assert!(intersect_aabb(&ray, &unit_box(), TOL).is_none());
    }

    #[test]
    fn test_aabb_behind_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z);
        assert!(intersect_aabb(&ray, &unit_box(), TOL).is_none());
    }

    #[test]
    fn test_aabb_inside_reports_exit() {
        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 2.0));
        let t = intersect_aabb(&ray, &unit_box(), TOL).unwrap();
        assert!((t - 0.5).abs() < EPSILON);
    }

    // ==================== TRIANGLE ====================

    fn tri() -> Triangle {
        Triangle::new(Vec3::ZERO, Vec3::X, Vec3::Y)
    }

    #[test]
    fn test_triangle_hit() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::Z);
        let hit = intersect_triangle(&ray, &tri(), TOL).unwrap();
        assert!((hit.t - 1.0).abs() < EPSILON);
        assert!((hit.u - 0.2).abs() < EPSILON);
        assert!((hit.v - 0.2).abs() < EPSILON);
    }

    #[test]
    fn test_triangle_backface_counts() {
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), -Vec3::Z);
        assert!(intersect_triangle(&ray, &tri(), TOL).is_some());
    }

    #[test]
    fn test_triangle_misses() {
        // outside the edge u + v > 1
        let ray = Ray::new(Vec3::new(0.8, 0.8, -1.0), Vec3::Z);
        assert!(intersect_triangle(&ray, &tri(), TOL).is_none());
        // parallel to the plane
        let ray = Ray::new(Vec3::new(0.2, 0.2, -1.0), Vec3::X);
        assert!(intersect_triangle(&ray, &tri(), TOL).is_none());
        // triangle behind the origin
        let ray = Ray::new(Vec3::new(0.2, 0.2, 1.0), Vec3::Z);
        assert!(intersect_triangle(&ray, &tri(), TOL).is_none());
    }

    // ==================== SCENE ====================

    #[test]
    fn test_ray_cast_picks_closest() {
        let mut world = World::new();
        let mut near = Transformation::default();
        near.set_global(Mat4::from_translation(Vec3::new(0.0, 0.0, 2.0)));
        let mut far = Transformation::default();
        far.set_global(Mat4::from_translation(Vec3::new(0.0, 0.0, 6.0)));
        let cube = RayCastable::cuboid(Vec3::splat(-0.5), Vec3::splat(0.5));
        world.spawn((far, cube.clone()));
        let near_e = world.spawn((near, cube.clone())).id();

        let hit = ray_cast(&mut world, &Ray::new(Vec3::new(0.1, 0.2, 0.0), Vec3::Z), TOL).unwrap();
        assert_eq!(hit.entity, near_e);
        assert!((hit.t - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_ray_cast_skips_collapsed() {
        let mut world = World::new();
        let mut flat = Transformation::default();
        flat.set_global(Mat4::from_scale(Vec3::new(1.0, 1.0, 0.0)));
        world.spawn((flat, RayCastable::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0))));
        assert!(ray_cast(&mut world, &Ray::new(Vec3::new(0.0, 0.0, -5.0), Vec3::Z), TOL).is_none());
    }

    #[test]
    fn test_ray_cast_scaled_entity_keeps_world_distance() {
        let mut world = World::new();
        let mut t = Transformation::default();
        t.set_global(Mat4::from_scale(Vec3::splat(2.0)));
        world.spawn((t, RayCastable::cuboid(Vec3::splat(-1.0), Vec3::splat(1.0))));
        let hit = ray_cast(&mut world, &Ray::new(Vec3::new(0.3, 0.1, -5.0), Vec3::Z), TOL).unwrap();
        // box face at world z = -2
        assert!((hit.t - 3.0).abs() < EPSILON);
    }
}
