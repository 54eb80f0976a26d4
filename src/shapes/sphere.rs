//! Full sphere: ray intersection, surface area, and area-uniform point
//! sampling, all worked out in object space and mapped back through
//! the shape's transform.

use crate::core::geometry::{coordinate_system, Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::{quadratic, Float, PI};
use crate::core::sampling::sample_sphere_uniform;
use crate::core::transform::Transform;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Sphere {
    pub radius: Float,
    pub object_to_world: Transform,
}

impl Sphere {
    pub fn new(radius: Float, object_to_world: Transform) -> Self {
        Sphere {
            radius,
            object_to_world,
        }
    }

    pub fn area(&self) -> Float {
        4.0 * PI * self.radius * self.radius
    }

    /// Nearest forward intersection, if any, expressed as a world-space
    /// hit distance and a partially filled [`SurfacePoint`] (entity and
    /// material annotations are added by the scene, not the shape).
    pub fn intersect(&self, ray: &Ray) -> Option<(Float, SurfacePoint)> {
        let o = self.object_to_world.inverse_transform_point(ray.o);
        let d = self.object_to_world.inverse_transform_vector(ray.d);

        let a = d.length_squared();
        let b = 2.0 * (d.x * o.x + d.y * o.y + d.z * o.z);
        let c = o.x * o.x + o.y * o.y + o.z * o.z - self.radius * self.radius;
        let (t0, t1) = quadratic(a, b, c)?;
        if t0 > ray.t_max || t1 <= 1e-7 {
            return None;
        }
        let mut t_hit = t0;
        if t_hit <= 1e-7 {
            t_hit = t1;
            if t_hit > ray.t_max {
                return None;
            }
        }

        let hit = Point3f::new(o.x + d.x * t_hit, o.y + d.y * t_hit, o.z + d.z * t_hit);
        let r = Vector3f::from(hit).length().max(1e-12);
        let p_object = Point3f::new(
            hit.x * self.radius / r,
            hit.y * self.radius / r,
            hit.z * self.radius / r,
        );
        let n_object = Normal3f::from(Vector3f::from(p_object).normalize());

        let p = self.object_to_world.transform_point(p_object);
        let n = self.object_to_world.transform_normal(n_object);
        let (tangent, _) = coordinate_system(&Vector3f::from(n));

        let phi = p_object.z.atan2(p_object.x);
        let theta = (p_object.y / self.radius).clamp(-1.0, 1.0).acos();
        let uv = Point2f::new(phi / (2.0 * PI) + 0.5, theta / PI);

        let sp = SurfacePoint {
            p,
            n,
            ns: n,
            dpdu: tangent,
            ns_tangent: tangent,
            uv,
            ..SurfacePoint::default()
        };
        Some((t_hit, sp))
    }

    /// Area-uniform point on the sphere's world-space surface.
    pub fn sample_point(&self, u: Point2f) -> (SurfacePoint, Float) {
        let n_object = Normal3f::from(sample_sphere_uniform(u));
        let p_object = Point3f::from(Vector3f::from(n_object) * self.radius);
        let p = self.object_to_world.transform_point(p_object);
        let n = self.object_to_world.transform_normal(n_object);
        let (tangent, _) = coordinate_system(&Vector3f::from(n));
        let sp = SurfacePoint {
            p,
            n,
            ns: n,
            dpdu: tangent,
            ns_tangent: tangent,
            ..SurfacePoint::default()
        };
        let pdf_area = 1.0 / self.area();
        (sp, pdf_area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_sphere_at_origin_hits_at_distance_one_short_of_center() {
        let sphere = Sphere::new(1.0, Transform::default());
        let ray = Ray {
            o: Point3f::new(0.0, 0.0, 5.0),
            d: Vector3f::new(0.0, 0.0, -1.0),
            t_max: Float::INFINITY,
        };
        let (t, sp) = sphere.intersect(&ray).expect("should hit");
        assert!((t - 4.0).abs() < 1e-6);
        assert!((sp.p.z - 1.0).abs() < 1e-6);
    }

    #[test]
    fn ray_missing_sphere_returns_none() {
        let sphere = Sphere::new(1.0, Transform::default());
        let ray = Ray {
            o: Point3f::new(5.0, 5.0, 5.0),
            d: Vector3f::new(0.0, 0.0, -1.0),
            t_max: Float::INFINITY,
        };
        assert!(sphere.intersect(&ray).is_none());
    }
}
