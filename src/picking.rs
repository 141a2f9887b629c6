//! Click-to-select in the viewport.
//!
//! - [`Ray`]: a world-space ray built from a pointer position in the viewport
//! - [`RayHit`]: the entity a ray hit and how far along the ray
//! - [`pick_all`] / [`pick`]: raycast every selectable entity in a [`Scene`]
//!
//! Meshes are tested against the world-space box around their transformed
//! local bounds; lights have no geometry and are tested as small spheres the
//! size of their viewport marker.

use glam::{Mat4, Vec2, Vec3, Vec4};
use hecs::Entity;

use crate::light::Light;
use crate::scene::{MeshComponent, Scene};
use crate::transform::Transform;

/// Radius of the pick sphere around a light marker.
pub const LIGHT_PICK_RADIUS: f32 = 0.35;

/// A ray in 3D space, used for raycasting and picking.
///
/// # Example
///
/// ```
/// use vantage::picking::Ray;
/// use vantage::Vec3;
///
/// let ray = Ray::new(Vec3::new(0.0, 1.0, 5.0), Vec3::new(0.0, 0.0, -2.0));
/// assert_eq!(ray.point_at(10.0), Vec3::new(0.0, 1.0, -5.0));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Ray {
    pub origin: Vec3,
    /// Always normalized.
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Unproject a pointer position through the camera.
    ///
    /// `pointer` is in pixels relative to the top-left of the viewport, and
    /// `viewport` its size in pixels. Clip depth runs `0..1` as in wgpu.
    pub fn from_viewport(pointer: Vec2, viewport: Vec2, view: Mat4, projection: Mat4) -> Self {
        let ndc_x = 2.0 * pointer.x / viewport.x - 1.0;
        let ndc_y = 1.0 - 2.0 * pointer.y / viewport.y;

        let inv_view_proj = (projection * view).inverse();
        let near = inv_view_proj * Vec4::new(ndc_x, ndc_y, 0.0, 1.0);
        let far = inv_view_proj * Vec4::new(ndc_x, ndc_y, 1.0, 1.0);

        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;
        Self::new(near, far - near)
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Slab test against an axis-aligned box.
    ///
    /// Returns the distance to the nearest intersection in front of the
    /// origin, or the exit distance when the origin is inside the box.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];

            if dir.abs() < f32::EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let (t1, t2) = {
                let a = (min[axis] - origin) * inv;
                let b = (max[axis] - origin) * inv;
                if a > b { (b, a) } else { (a, b) }
            };
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        if t_min > 0.0 {
            Some(t_min)
        } else if t_max > 0.0 {
            Some(t_max)
        } else {
            None
        }
    }

    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let b = oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }

        let root = discriminant.sqrt();
        [-b - root, -b + root].into_iter().find(|&t| t > 0.0)
    }
}

#[derive(Clone, Copy, Debug)]
pub struct RayHit {
    pub entity: Entity,
    pub distance: f32,
    pub point: Vec3,
}

/// World-space box around local bounds moved by `model`.
pub fn world_bounds(local: (Vec3, Vec3), model: Mat4) -> (Vec3, Vec3) {
    let (lo, hi) = local;
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    for i in 0..8 {
        let corner = Vec3::new(
            if i & 1 == 0 { lo.x } else { hi.x },
            if i & 2 == 0 { lo.y } else { hi.y },
            if i & 4 == 0 { lo.z } else { hi.z },
        );
        let p = model.transform_point3(corner);
        min = min.min(p);
        max = max.max(p);
    }
    (min, max)
}

/// Every entity the ray hits, nearest first.
pub fn pick_all(scene: &Scene, ray: &Ray) -> Vec<RayHit> {
    let mut hits: Vec<RayHit> = scene
        .entities()
        .filter_map(|entity| {
            let transform = scene.try_component::<Transform>(entity).ok()?;
            let distance = if let Ok(mesh) = scene.try_component::<MeshComponent>(entity) {
                let (min, max) = world_bounds(mesh.geometry.bounds(), transform.model_matrix());
                ray.intersect_aabb(min, max)
            } else if scene.has_component::<Light>(entity) {
                ray.intersect_sphere(transform.location, LIGHT_PICK_RADIUS)
            } else {
                None
            }?;
            Some(RayHit {
                entity,
                distance,
                point: ray.point_at(distance),
            })
        })
        .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// The nearest entity under the ray.
pub fn pick(scene: &Scene, ray: &Ray) -> Option<RayHit> {
    pick_all(scene, ray).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::BaseEntityKind;

    #[test]
    fn aabb_hit_from_outside() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        let t = ray.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0));
        assert_eq!(t, Some(4.0));
    }

    #[test]
    fn aabb_miss_when_parallel_outside() {
        let ray = Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(ray.intersect_aabb(Vec3::splat(-1.0), Vec3::splat(1.0)).is_none());
    }

    #[test]
    fn sphere_behind_origin_is_ignored() {
        let ray = Ray::new(Vec3::ZERO, Vec3::Z);
        assert!(ray.intersect_sphere(Vec3::new(0.0, 0.0, -5.0), 1.0).is_none());
        assert_eq!(ray.intersect_sphere(Vec3::new(0.0, 0.0, 5.0), 1.0), Some(4.0));
    }

    #[test]
    fn center_of_viewport_points_forward() {
        let view = Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);
        let projection = Mat4::perspective_rh(60f32.to_radians(), 1.0, 0.1, 100.0);
        let ray = Ray::from_viewport(Vec2::splat(50.0), Vec2::splat(100.0), view, projection);
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn rotated_bounds_grow() {
        let model = Transform::new()
            .rotation(Vec3::new(0.0, 45.0, 0.0))
            .model_matrix();
        let (min, max) = world_bounds((Vec3::splat(-0.5), Vec3::splat(0.5)), model);
        assert!(max.x > 0.7 && min.x < -0.7);
        assert!((max.y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn pick_returns_nearest_entity() {
        let mut scene = Scene::new();
        let near = scene.create_base_entity(BaseEntityKind::Cube);
        let far = scene.create_base_entity(BaseEntityKind::Cube);
        scene
            .add_component(far, Transform::from_location(Vec3::new(0.0, 0.5, -5.0)))
            .unwrap();

        let ray = Ray::new(Vec3::new(0.0, 0.5, 10.0), Vec3::NEG_Z);
        let hits = pick_all(&scene, &ray);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].entity, near);
        assert_eq!(pick(&scene, &ray).map(|h| h.entity), Some(near));
    }

    #[test]
    fn lights_are_pickable() {
        let mut scene = Scene::new();
        let lamp = scene.create_base_entity(BaseEntityKind::PointLight);
        let ray = Ray::new(Vec3::new(0.0, 3.0, 10.0), Vec3::NEG_Z);
        assert_eq!(pick(&scene, &ray).map(|h| h.entity), Some(lamp));
    }
}
