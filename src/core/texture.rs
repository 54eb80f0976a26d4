//! Scene-file texture kinds: a constant color, a 3D checkerboard
//! evaluated directly in world space, or an image sampled by UV.

use std::sync::Arc;

use image::GenericImageView;

use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;
use crate::core::spectrum::Spectrum;

#[derive(Clone)]
pub enum Texture {
    Constant(Spectrum),
    Checkerboard3D { a: Spectrum, b: Spectrum },
    Image { pixels: Arc<image::RgbImage> },
}

impl Texture {
    pub fn evaluate(&self, p: &SurfacePoint) -> Spectrum {
        match self {
            Texture::Constant(c) => *c,
            Texture::Checkerboard3D { a, b } => {
                let parity = (p.p.x.floor() as i64 + p.p.y.floor() as i64 + p.p.z.floor() as i64)
                    & 1;
                if parity == 0 {
                    *a
                } else {
                    *b
                }
            }
            Texture::Image { pixels } => {
                let (w, h) = pixels.dimensions();
                let x = ((p.uv.x.rem_euclid(1.0)) * w as Float) as u32;
                let y = ((1.0 - p.uv.y.rem_euclid(1.0)) * h as Float) as u32;
                let x = x.min(w.saturating_sub(1));
                let y = y.min(h.saturating_sub(1));
                let px = pixels.get_pixel(x, y);
                Spectrum::rgb(
                    px.0[0] as Float / 255.0,
                    px.0[1] as Float / 255.0,
                    px.0[2] as Float / 255.0,
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point3f;

    #[test]
    fn checkerboard_alternates_by_integer_cell() {
        let tex = Texture::Checkerboard3D {
            a: Spectrum::new(1.0),
            b: Spectrum::new(0.0),
        };
        let mut p0 = SurfacePoint::default();
        p0.p = Point3f::new(0.5, 0.0, 0.0);
        let mut p1 = SurfacePoint::default();
        p1.p = Point3f::new(1.5, 0.0, 0.0);
        assert_ne!(tex.evaluate(&p0).r, tex.evaluate(&p1).r);
    }
}
