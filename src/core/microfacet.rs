//! Trowbridge-Reitz (GGX) microfacet distribution used by the glossy
//! reflection lobe.

use crate::core::geometry::{Point2f, Vector3f};
use crate::core::pbrt::{Float, PI};

#[derive(Debug, Copy, Clone, serde::Serialize, serde::Deserialize)]
pub struct TrowbridgeReitzDistribution {
    pub alpha_x: Float,
    pub alpha_y: Float,
}

impl TrowbridgeReitzDistribution {
    pub fn new(alpha_x: Float, alpha_y: Float) -> Self {
        TrowbridgeReitzDistribution {
            alpha_x: alpha_x.max(1e-3),
            alpha_y: alpha_y.max(1e-3),
        }
    }

    /// Walter et al.'s empirical roughness-to-alpha remap, used when a
    /// scene file specifies a `[0,1]` roughness rather than a raw alpha.
    pub fn roughness_to_alpha(roughness: Float) -> Float {
        let roughness = roughness.max(1e-3);
        let x = roughness.ln();
        1.621_42
            + 0.819_955 * x
            + 0.177_439 * x * x
            + 0.017_120_1 * x * x * x
            + 0.000_640_711 * x * x * x * x
    }

    fn lambda(&self, w: &Vector3f) -> Float {
        let abs_tan_theta = tan_theta(w).abs();
        if abs_tan_theta.is_infinite() {
            return 0.0;
        }
        let alpha =
            (cos_phi(w).powi(2) * self.alpha_x.powi(2) + sin_phi(w).powi(2) * self.alpha_y.powi(2))
                .sqrt();
        let alpha2_tan2_theta = (alpha * abs_tan_theta).powi(2);
        (-1.0 + (1.0 + alpha2_tan2_theta).sqrt()) / 2.0
    }

    pub fn g1(&self, w: &Vector3f) -> Float {
        1.0 / (1.0 + self.lambda(w))
    }

    pub fn g(&self, wo: &Vector3f, wi: &Vector3f) -> Float {
        1.0 / (1.0 + self.lambda(wo) + self.lambda(wi))
    }

    pub fn d(&self, wh: &Vector3f) -> Float {
        let tan2_theta = tan_2_theta(wh);
        if tan2_theta.is_infinite() {
            return 0.0;
        }
        let cos4_theta = cos_2_theta(wh).powi(2);
        let e = tan2_theta
            * (cos_phi(wh).powi(2) / self.alpha_x.powi(2)
                + sin_phi(wh).powi(2) / self.alpha_y.powi(2));
        1.0 / (PI * self.alpha_x * self.alpha_y * cos4_theta * (1.0 + e).powi(2))
    }

    /// Draws a half-vector distributed according to `D`, visible-normal
    /// sampling omitted in favor of the simpler distribution-only
    /// sampling used by the original renderer.
    pub fn sample_wh(&self, wo: &Vector3f, u: Point2f) -> Vector3f {
        let phi = if (self.alpha_x - self.alpha_y).abs() < 1e-6 {
            2.0 * PI * u.y
        } else {
            let mut phi = (self.alpha_y / self.alpha_x * (2.0 * PI * u.y + PI / 2.0).tan()).atan();
            if u.y > 0.5 {
                phi += PI;
            }
            phi
        };
        let (sin_phi, cos_phi) = phi.sin_cos();
        let alpha2 =
            1.0 / (cos_phi.powi(2) / self.alpha_x.powi(2) + sin_phi.powi(2) / self.alpha_y.powi(2));
        let tan_theta2 = alpha2 * u.x / (1.0 - u.x).max(1e-12);
        let cos_theta = 1.0 / (1.0 + tan_theta2).sqrt();
        let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
        let mut wh = Vector3f::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
        if wo.z < 0.0 {
            wh = -wh;
        }
        wh
    }

    pub fn pdf(&self, wo: &Vector3f, wh: &Vector3f) -> Float {
        self.d(wh) * self.g1(wo) * crate::core::geometry::vec3_dot_vec3f(wo, wh).abs()
            / wo.z.abs().max(1e-7)
    }
}

fn cos_theta(w: &Vector3f) -> Float {
    w.z
}

fn cos_2_theta(w: &Vector3f) -> Float {
    w.z * w.z
}

fn sin_2_theta(w: &Vector3f) -> Float {
    (1.0 - cos_2_theta(w)).max(0.0)
}

fn tan_2_theta(w: &Vector3f) -> Float {
    sin_2_theta(w) / cos_2_theta(w)
}

fn tan_theta(w: &Vector3f) -> Float {
    tan_2_theta(w).sqrt() * cos_theta(w).signum()
}

fn sin_theta(w: &Vector3f) -> Float {
    sin_2_theta(w).sqrt()
}

fn cos_phi(w: &Vector3f) -> Float {
    let st = sin_theta(w);
    if st == 0.0 {
        1.0
    } else {
        crate::core::pbrt::clamp_t(w.x / st, -1.0, 1.0)
    }
}

fn sin_phi(w: &Vector3f) -> Float {
    let st = sin_theta(w);
    if st == 0.0 {
        0.0
    } else {
        crate::core::pbrt::clamp_t(w.y / st, -1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_incidence_g1_is_one() {
        let d = TrowbridgeReitzDistribution::new(0.2, 0.2);
        let w = Vector3f::new(0.0, 0.0, 1.0);
        assert!((d.g1(&w) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn roughness_to_alpha_is_monotonic() {
        let a = TrowbridgeReitzDistribution::roughness_to_alpha(0.1);
        let b = TrowbridgeReitzDistribution::roughness_to_alpha(0.9);
        assert!(a < b);
    }
}
