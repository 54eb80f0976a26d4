//! RGB radiance/color triple. Radiance is carried as a fixed 3-channel
//! triple rather than a full spectral representation.

use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Sub};

use serde::{Deserialize, Serialize};

use crate::core::geometry::Vector3f;
use crate::core::pbrt::Float;

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    pub r: Float,
    pub g: Float,
    pub b: Float,
}

impl Spectrum {
    pub const fn new(v: Float) -> Self {
        Spectrum { r: v, g: v, b: v }
    }

    pub const fn rgb(r: Float, g: Float, b: Float) -> Self {
        Spectrum { r, g, b }
    }

    pub fn is_black(&self) -> bool {
        self.r == 0.0 && self.g == 0.0 && self.b == 0.0
    }

    pub fn max_component(&self) -> Float {
        self.r.max(self.g).max(self.b)
    }

    pub fn sqrt(&self) -> Spectrum {
        Spectrum::rgb(self.r.sqrt(), self.g.sqrt(), self.b.sqrt())
    }

    pub fn clamp(&self, low: Float, high: Float) -> Spectrum {
        Spectrum::rgb(
            crate::core::pbrt::clamp_t(self.r, low, high),
            crate::core::pbrt::clamp_t(self.g, low, high),
            crate::core::pbrt::clamp_t(self.b, low, high),
        )
    }

    pub fn to_vector3f(self) -> Vector3f {
        Vector3f::new(self.r, self.g, self.b)
    }
}

impl From<Float> for Spectrum {
    fn from(v: Float) -> Self {
        Spectrum::new(v)
    }
}

impl Add for Spectrum {
    type Output = Spectrum;
    fn add(self, rhs: Spectrum) -> Spectrum {
        Spectrum::rgb(self.r + rhs.r, self.g + rhs.g, self.b + rhs.b)
    }
}

impl AddAssign for Spectrum {
    fn add_assign(&mut self, rhs: Spectrum) {
        self.r += rhs.r;
        self.g += rhs.g;
        self.b += rhs.b;
    }
}

impl Sub for Spectrum {
    type Output = Spectrum;
    fn sub(self, rhs: Spectrum) -> Spectrum {
        Spectrum::rgb(self.r - rhs.r, self.g - rhs.g, self.b - rhs.b)
    }
}

impl Mul for Spectrum {
    type Output = Spectrum;
    fn mul(self, rhs: Spectrum) -> Spectrum {
        Spectrum::rgb(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b)
    }
}

impl Mul<Float> for Spectrum {
    type Output = Spectrum;
    fn mul(self, s: Float) -> Spectrum {
        Spectrum::rgb(self.r * s, self.g * s, self.b * s)
    }
}

impl MulAssign<Float> for Spectrum {
    fn mul_assign(&mut self, s: Float) {
        self.r *= s;
        self.g *= s;
        self.b *= s;
    }
}

impl Div<Float> for Spectrum {
    type Output = Spectrum;
    fn div(self, s: Float) -> Spectrum {
        self * (1.0 / s)
    }
}

/// Piecewise sRGB gamma encode, quantized to 8 bits.
pub fn rgb_to_srgb_u8(c: Float) -> u8 {
    let encoded = if c <= 0.0031308 {
        12.92 * c
    } else {
        1.055 * c.max(0.0).powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_encode_is_monotonic_and_bounded() {
        let mut prev = 0u8;
        for i in 0..=20 {
            let c = i as Float / 20.0;
            let encoded = rgb_to_srgb_u8(c);
            assert!(encoded >= prev);
            prev = encoded;
        }
        assert_eq!(rgb_to_srgb_u8(0.0), 0);
        assert_eq!(rgb_to_srgb_u8(1.0), 255);
    }
}
