//! Diffuse area lights: each wraps the entity index of the emissive
//! surface it is attached to, so it can ask the scene to sample a point
//! on that surface rather than duplicating shape sampling logic.

use crate::core::geometry::{vec3_dot_nrmf, Point2f, Point3f, Vector3f};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::{Float, INV_PI};
use crate::core::sampling::sample_hemisphere_cosine;
use crate::core::spectrum::Spectrum;

#[derive(Debug, Clone, Copy)]
pub struct DiffuseAreaLight {
    pub entity: usize,
    pub color: Spectrum,
    pub strength: Float,
}

impl DiffuseAreaLight {
    /// Area-uniform point on the light's surface, with `on_light` set.
    /// `sample_point_fn` defers the actual shape sampling to the scene,
    /// which owns the entity table this light indexes into.
    pub fn sample_point(
        &self,
        sample_point_fn: impl FnOnce(usize, Point2f) -> (SurfacePoint, Float),
        u: Point2f,
    ) -> (SurfacePoint, Float) {
        let (mut p, pdf_p) = sample_point_fn(self.entity, u);
        p.on_light = true;
        (p, pdf_p)
    }

    /// Cosine-weighted direction about the light surface's normal.
    pub fn sample_direction(&self, p: &SurfacePoint, u: Point2f) -> (Vector3f, Float) {
        let (local, pdf) = sample_hemisphere_cosine(u);
        let n = Vector3f::from(p.n);
        let (t, b) = crate::core::geometry::coordinate_system(&n);
        let w = t * local.x + b * local.y + n * local.z;
        (w, pdf)
    }

    pub fn pdf_direction(&self, p: &SurfacePoint, w: &Vector3f) -> Float {
        let cos_theta = vec3_dot_nrmf(w, &p.n).max(0.0);
        cos_theta * INV_PI
    }

    /// Area-measure pdf of landing on a given point of this light via
    /// [`DiffuseAreaLight::sample_point`]'s area-uniform strategy:
    /// `1/area` of the entity the light is attached to. Callers
    /// combining this with a light-selection probability (e.g. uniform
    /// pick among `N` lights) still divide by that factor themselves —
    /// this is the light's own contribution, not the full path pdf.
    pub fn probability_point(&self, area: Float) -> Float {
        1.0 / area.max(1e-12)
    }

    /// Emitted radiance toward `w` from point `p` on this light: zero on
    /// the back side of the emitting surface.
    pub fn emitted_radiance(&self, p: &SurfacePoint, w: &Vector3f) -> Spectrum {
        if vec3_dot_nrmf(w, &p.n) > 0.0 {
            self.color * self.strength
        } else {
            Spectrum::new(0.0)
        }
    }

    pub fn power(&self, area: Float) -> Float {
        self.color.max_component() * self.strength * area * std::f64::consts::PI as Float
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Normal3f;

    #[test]
    fn emission_is_zero_on_back_side() {
        let light = DiffuseAreaLight {
            entity: 0,
            color: Spectrum::new(1.0),
            strength: 1.0,
        };
        let mut p = SurfacePoint::default();
        p.n = Normal3f::new(0.0, 1.0, 0.0);
        let w_front = Vector3f::new(0.0, 1.0, 0.0);
        let w_back = Vector3f::new(0.0, -1.0, 0.0);
        assert!(light.emitted_radiance(&p, &w_front).max_component() > 0.0);
        assert_eq!(light.emitted_radiance(&p, &w_back).max_component(), 0.0);
    }
}
