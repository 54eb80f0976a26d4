//! Value-type bundle filled by intersection and carried through the
//! integrators.

use crate::core::geometry::{vec3_cross_vec3f, Normal3f, Point2f, Point3f, Vector3f};
use crate::core::pbrt::Float;

/// A point on a scene surface, the camera lens, or a light, with the
/// shading frame and back-references needed by the integrators.
///
/// Back-references are carried as indices into the owning [`Scene`]
/// (`crate::core::scene::Scene`) rather than raw pointers, so a
/// `SurfacePoint` has no lifetime tied to the scene it came from.
#[derive(Debug, Copy, Clone)]
pub struct SurfacePoint {
    pub p: Point3f,
    pub n: Normal3f,
    pub ns: Normal3f,
    pub dpdu: Vector3f,
    pub ns_tangent: Vector3f,
    pub uv: Point2f,
    /// Index into `Scene::entities`, if this point lies on a scene
    /// surface.
    pub entity: Option<usize>,
    /// Set when this point lies on a light's surface (duplicates
    /// `entity`'s emission presence, kept separate so callers can check
    /// it without re-deriving it from the entity table).
    pub on_light: bool,
    /// Set when this point is a sampled camera-lens point.
    pub on_camera: bool,
    pub priority: i32,
    pub ior: Float,
}

impl Default for SurfacePoint {
    fn default() -> Self {
        SurfacePoint {
            p: Point3f::default(),
            n: Normal3f::new(0.0, 0.0, 1.0),
            ns: Normal3f::new(0.0, 0.0, 1.0),
            dpdu: Vector3f::new(1.0, 0.0, 0.0),
            ns_tangent: Vector3f::new(1.0, 0.0, 0.0),
            uv: Point2f::default(),
            entity: None,
            on_light: false,
            on_camera: false,
            priority: 0,
            ior: 1.0,
        }
    }
}

impl SurfacePoint {
    /// Shading bitangent completing the right-handed
    /// `(shading_tangent, shading_bitangent, shading_normal)` basis.
    pub fn shading_bitangent(&self) -> Vector3f {
        vec3_cross_vec3f(&Vector3f::from(self.ns), &self.ns_tangent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_point_has_orthonormal_shading_frame() {
        let p = SurfacePoint::default();
        let t = p.ns_tangent.normalize();
        let n = Vector3f::from(p.ns).normalize();
        let b = p.shading_bitangent();
        assert!((crate::core::geometry::vec3_dot_vec3f(&t, &n)).abs() < 1e-9);
        assert!((crate::core::geometry::vec3_dot_vec3f(&b, &n)).abs() < 1e-9);
        assert!((b.length() - 1.0).abs() < 1e-9);
    }
}
