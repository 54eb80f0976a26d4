//! Sampling warps: disk and hemisphere remappings used to turn uniform
//! `[0,1)^2` samples into the directions and positions path tracing needs.

use crate::core::geometry::{Point2f, Vector3f};
use crate::core::pbrt::{Float, PI, PI_OVER_2, PI_OVER_4};

/// Shirley's concentric disk map: maps a uniform square sample to a
/// uniform unit disk with better stratification preservation than
/// polar mapping.
pub fn sample_disk_concentric(u: Point2f) -> Point2f {
    let offset = Point2f::new(2.0 * u.x - 1.0, 2.0 * u.y - 1.0);
    if offset.x == 0.0 && offset.y == 0.0 {
        return Point2f::new(0.0, 0.0);
    }
    let (r, theta) = if offset.x.abs() > offset.y.abs() {
        (offset.x, PI_OVER_4 * (offset.y / offset.x))
    } else {
        (offset.y, PI_OVER_2 - PI_OVER_4 * (offset.x / offset.y))
    };
    Point2f::new(r * theta.cos(), r * theta.sin())
}

/// Malley's method: cosine-weighted hemisphere sample in a z-up local
/// frame (`z` is the shading normal axis, matching `Bsdf::local_to_world`),
/// returning the sampled direction and its pdf `|z|/pi`.
pub fn sample_hemisphere_cosine(u: Point2f) -> (Vector3f, Float) {
    let d = sample_disk_concentric(u);
    let z = (1.0 - d.x * d.x - d.y * d.y).max(0.0).sqrt();
    let pdf = z * crate::core::pbrt::INV_PI;
    (Vector3f::new(d.x, d.y, z), pdf)
}

pub fn cosine_hemisphere_pdf(cos_theta: Float) -> Float {
    cos_theta * crate::core::pbrt::INV_PI
}

pub fn sample_sphere_uniform(u: Point2f) -> Vector3f {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vector3f::new(r * phi.cos(), z, r * phi.sin())
}

pub const UNIFORM_SPHERE_PDF: Float = 1.0 / (4.0 * PI);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_hemisphere_returns_unit_upper_hemisphere() {
        let (w, pdf) = sample_hemisphere_cosine(Point2f::new(0.3, 0.7));
        assert!(w.z >= 0.0);
        assert!((w.length() - 1.0).abs() < 1e-9);
        assert!(pdf > 0.0);
    }

    #[test]
    fn uniform_sphere_is_unit_length() {
        let w = sample_sphere_uniform(Point2f::new(0.2, 0.9));
        assert!((w.length() - 1.0).abs() < 1e-9);
    }
}
