//! Axis-aligned finite rectangle, lying in the object-space XZ plane
//! with its geometric normal along +Y, sized `size.x` by `size.y` and
//! centered at the object-space origin.

use crate::core::geometry::{Normal3f, Point2f, Point3f, Ray, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;
use crate::core::transform::Transform;

#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Plane {
    pub size: (Float, Float),
    pub object_to_world: Transform,
}

impl Plane {
    pub fn new(size: (Float, Float), object_to_world: Transform) -> Self {
        Plane {
            size,
            object_to_world,
        }
    }

    pub fn area(&self) -> Float {
        self.size.0 * self.size.1
    }

    pub fn intersect(&self, ray: &Ray) -> Option<(Float, SurfacePoint)> {
        let o = self.object_to_world.inverse_transform_point(ray.o);
        let d = self.object_to_world.inverse_transform_vector(ray.d);
        if d.y.abs() < 1e-12 {
            return None;
        }
        let t = -o.y / d.y;
        if t <= 1e-7 || t > ray.t_max {
            return None;
        }
        let p_object = Point3f::new(o.x + d.x * t, 0.0, o.z + d.z * t);
        let hx = self.size.0 * 0.5;
        let hz = self.size.1 * 0.5;
        if p_object.x < -hx || p_object.x > hx || p_object.z < -hz || p_object.z > hz {
            return None;
        }

        let p = self.object_to_world.transform_point(p_object);
        let n = self
            .object_to_world
            .transform_normal(Normal3f::new(0.0, 1.0, 0.0));
        let tangent = self
            .object_to_world
            .transform_vector(Vector3f::new(1.0, 0.0, 0.0))
            .normalize();
        let uv = Point2f::new(
            (p_object.x + hx) / self.size.0,
            (p_object.z + hz) / self.size.1,
        );

        let sp = SurfacePoint {
            p,
            n,
            ns: n,
            dpdu: tangent,
            ns_tangent: tangent,
            uv,
            ..SurfacePoint::default()
        };
        Some((t, sp))
    }

    pub fn sample_point(&self, u: Point2f) -> (SurfacePoint, Float) {
        let p_object = Point3f::new(
            (u.x - 0.5) * self.size.0,
            0.0,
            (u.y - 0.5) * self.size.1,
        );
        let p = self.object_to_world.transform_point(p_object);
        let n = self
            .object_to_world
            .transform_normal(Normal3f::new(0.0, 1.0, 0.0));
        let tangent = self
            .object_to_world
            .transform_vector(Vector3f::new(1.0, 0.0, 0.0))
            .normalize();
        let sp = SurfacePoint {
            p,
            n,
            ns: n,
            dpdu: tangent,
            ns_tangent: tangent,
            ..SurfacePoint::default()
        };
        (sp, 1.0 / self.area().max(1e-12))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ray_straight_down_hits_plane_center() {
        let plane = Plane::new((2.0, 2.0), Transform::default());
        let ray = Ray {
            o: Point3f::new(0.0, 1.0, 0.0),
            d: Vector3f::new(0.0, -1.0, 0.0),
            t_max: Float::INFINITY,
        };
        let (t, sp) = plane.intersect(&ray).expect("should hit");
        assert!((t - 1.0).abs() < 1e-9);
        assert!((sp.n.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn ray_outside_extent_misses() {
        let plane = Plane::new((2.0, 2.0), Transform::default());
        let ray = Ray {
            o: Point3f::new(5.0, 1.0, 0.0),
            d: Vector3f::new(0.0, -1.0, 0.0),
            t_max: Float::INFINITY,
        };
        assert!(plane.intersect(&ray).is_none());
    }
}
