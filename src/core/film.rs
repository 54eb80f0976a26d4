//! Pixel accumulator and export. Each pixel holds two independent
//! sub-records: a non-atomic `{sum, count}` pair for camera-subpath
//! samples, and an atomic `{r, g, b}` triple for light-subpath splats
//! (a bidirectional or backward integrator may splat any pixel from any
//! worker thread, so that side has to tolerate concurrent writers).
//!
//! Camera-path writes stay non-atomic by construction: [`Film::bands_mut`]
//! hands out disjoint, non-overlapping row bands, one per tile worker, so
//! two workers never touch the same `CameraPixel`.

use std::io::{self, BufWriter, Write};
use std::path::Path;

use atomic::{Atomic, Ordering};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::core::error::RenderError;
use crate::core::spectrum::{rgb_to_srgb_u8, Spectrum};

#[derive(Debug, Default, Copy, Clone)]
pub struct CameraPixel {
    pub sum: Spectrum,
    pub count: u32,
}

struct LightPixel {
    r: Atomic<f64>,
    g: Atomic<f64>,
    b: Atomic<f64>,
}

impl Default for LightPixel {
    fn default() -> Self {
        LightPixel {
            r: Atomic::new(0.0),
            g: Atomic::new(0.0),
            b: Atomic::new(0.0),
        }
    }
}

fn atomic_add_f64(slot: &Atomic<f64>, delta: f64) {
    let mut current = slot.load(Ordering::Relaxed);
    loop {
        let desired = current + delta;
        match slot.compare_exchange_weak(current, desired, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return,
            Err(actual) => current = actual,
        }
    }
}

fn splat(pixel: &LightPixel, value: Spectrum) {
    atomic_add_f64(&pixel.r, value.r as f64);
    atomic_add_f64(&pixel.g, value.g as f64);
    atomic_add_f64(&pixel.b, value.b as f64);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Ppm,
    Raw32,
}

pub struct Film {
    resolution: (u32, u32),
    camera_pixels: Vec<CameraPixel>,
    light_pixels: Vec<LightPixel>,
    light_samples: Atomic<u64>,
}

impl Film {
    pub fn new(resolution: (u32, u32)) -> Self {
        let count = resolution.0 as usize * resolution.1 as usize;
        let mut light_pixels = Vec::with_capacity(count);
        light_pixels.resize_with(count, LightPixel::default);
        Film {
            resolution,
            camera_pixels: vec![CameraPixel::default(); count],
            light_pixels,
            light_samples: Atomic::new(0),
        }
    }

    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn index(&self, pixel: (u32, u32)) -> usize {
        pixel.1 as usize * self.resolution.0 as usize + pixel.0 as usize
    }

    /// Splits the camera-sample buffer into horizontal, non-overlapping
    /// bands of at most `band_height` rows each, one per tile worker.
    /// Each band borrows a disjoint slice of `camera_pixels`, so workers
    /// need no synchronization to write their own pixels.
    pub fn bands_mut(&mut self, band_height: u32) -> Vec<FilmBand<'_>> {
        let width = self.resolution.0 as usize;
        let rows_per_band = band_height.max(1) as usize;
        let mut bands = Vec::new();
        let mut y = 0u32;
        for chunk in self.camera_pixels.chunks_mut(width * rows_per_band) {
            let rows = (chunk.len() / width) as u32;
            bands.push(FilmBand {
                y_start: y,
                width: self.resolution.0,
                pixels: chunk,
            });
            y += rows;
        }
        bands
    }

    /// Atomic fetch-add-compare-exchange splat: any worker may target
    /// any pixel, since light subpaths connect to arbitrary camera
    /// points rather than the tile's own pixels.
    pub fn add_light_sample(&self, pixel: (u32, u32), value: Spectrum) {
        let idx = self.index(pixel);
        splat(&self.light_pixels[idx], value);
    }

    /// Records that `n` more light-subpath samples were attempted
    /// (whether or not they produced a splat); used as the denominator
    /// normalizing the light image on export.
    pub fn add_light_sample_count(&self, n: u64) {
        self.light_samples.fetch_add(n, Ordering::Relaxed);
    }

    /// Splits the film into disjoint camera-sample bands (exclusive,
    /// `&mut`) and a [`LightSplatter`] onto the atomic light buffer
    /// (shared, `&`), both borrowed from the same `&mut self` call so
    /// the borrow checker sees them as non-overlapping from the start.
    /// Bidirectional transport needs both at once: one tile worker's
    /// own camera-subpath hits, plus light-subpath connections landing
    /// anywhere in the image from any worker.
    pub fn bands_and_splatter_mut(&mut self, band_height: u32) -> (Vec<FilmBand<'_>>, LightSplatter<'_>) {
        let width = self.resolution.0 as usize;
        let rows_per_band = band_height.max(1) as usize;
        let mut bands = Vec::new();
        let mut y = 0u32;
        for chunk in self.camera_pixels.chunks_mut(width * rows_per_band) {
            let rows = (chunk.len() / width) as u32;
            bands.push(FilmBand {
                y_start: y,
                width: self.resolution.0,
                pixels: chunk,
            });
            y += rows;
        }
        let splatter = LightSplatter {
            resolution: self.resolution,
            light_pixels: &self.light_pixels,
            light_samples: &self.light_samples,
        };
        (bands, splatter)
    }

    fn resolved_pixel(&self, pixel: (u32, u32)) -> Spectrum {
        let idx = self.index(pixel);
        let camera = self.camera_pixels[idx];
        let mut color = if camera.count > 0 {
            camera.sum * (1.0 / camera.count as crate::core::pbrt::Float)
        } else {
            Spectrum::new(0.0)
        };

        let light_samples = self.light_samples.load(Ordering::Relaxed);
        if light_samples > 0 {
            let lp = &self.light_pixels[idx];
            let inv = 1.0 / light_samples as f64;
            color.r += (lp.r.load(Ordering::Relaxed) * inv) as crate::core::pbrt::Float;
            color.g += (lp.g.load(Ordering::Relaxed) * inv) as crate::core::pbrt::Float;
            color.b += (lp.b.load(Ordering::Relaxed) * inv) as crate::core::pbrt::Float;
        }
        color
    }

    pub fn export(&self, path: &Path, format: ImageFormat) -> Result<(), RenderError> {
        let file = std::fs::File::create(path).map_err(|source| RenderError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })?;
        let mut out = BufWriter::new(file);
        let result = match format {
            ImageFormat::Ppm => self.write_ppm(&mut out),
            ImageFormat::Raw32 => self.write_raw32(&mut out),
        };
        result.map_err(|source| RenderError::ImageWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    fn write_ppm(&self, out: &mut impl Write) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.resolution.0, self.resolution.1)?;
        for y in 0..self.resolution.1 {
            for x in 0..self.resolution.0 {
                let color = self.resolved_pixel((x, y));
                out.write_all(&[
                    rgb_to_srgb_u8(color.r),
                    rgb_to_srgb_u8(color.g),
                    rgb_to_srgb_u8(color.b),
                ])?;
            }
        }
        Ok(())
    }

    /// Test-only accessor for the resolved (camera + light) pixel value,
    /// used by integrator tests that splat into the film from outside
    /// this module.
    #[cfg(test)]
    pub fn export_pixel_for_test(&self, pixel: (u32, u32)) -> Spectrum {
        self.resolved_pixel(pixel)
    }

    fn write_raw32(&self, out: &mut impl Write) -> io::Result<()> {
        for y in 0..self.resolution.1 {
            for x in 0..self.resolution.0 {
                let color = self.resolved_pixel((x, y));
                out.write_f32::<LittleEndian>(color.r as f32)?;
                out.write_f32::<LittleEndian>(color.g as f32)?;
                out.write_f32::<LittleEndian>(color.b as f32)?;
            }
        }
        Ok(())
    }
}

/// A shareable handle onto the film's atomic light-splat buffer,
/// borrowed independently of the camera-pixel bands so a bidirectional
/// tile worker can hold both at once. `Copy` since it's only references
/// to `Sync` atomics.
#[derive(Clone, Copy)]
pub struct LightSplatter<'a> {
    resolution: (u32, u32),
    light_pixels: &'a [LightPixel],
    light_samples: &'a Atomic<u64>,
}

impl<'a> LightSplatter<'a> {
    pub fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    pub fn add_light_sample(&self, pixel: (u32, u32), value: Spectrum) {
        let idx = pixel.1 as usize * self.resolution.0 as usize + pixel.0 as usize;
        splat(&self.light_pixels[idx], value);
    }

    pub fn add_light_sample_count(&self, n: u64) {
        self.light_samples.fetch_add(n, Ordering::Relaxed);
    }
}

/// A tile worker's exclusive, non-atomic view onto one horizontal band
/// of camera pixels.
pub struct FilmBand<'a> {
    y_start: u32,
    width: u32,
    pixels: &'a mut [CameraPixel],
}

impl<'a> FilmBand<'a> {
    pub fn y_start(&self) -> u32 {
        self.y_start
    }

    pub fn rows(&self) -> u32 {
        self.pixels.len() as u32 / self.width
    }

    pub fn add_camera_sample(&mut self, pixel: (u32, u32), value: Spectrum) {
        let local_y = pixel.1 - self.y_start;
        let idx = local_y as usize * self.width as usize + pixel.0 as usize;
        let p = &mut self.pixels[idx];
        p.sum += value;
        p.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_film_exports_all_black() {
        let film = Film::new((4, 4));
        let color = film.resolved_pixel((0, 0));
        assert_eq!(color, Spectrum::new(0.0));
    }

    #[test]
    fn camera_sample_is_averaged_by_count() {
        let mut film = Film::new((2, 2));
        {
            let mut bands = film.bands_mut(2);
            bands[0].add_camera_sample((0, 0), Spectrum::rgb(1.0, 0.0, 0.0));
            bands[0].add_camera_sample((0, 0), Spectrum::rgb(0.0, 1.0, 0.0));
        }
        let color = film.resolved_pixel((0, 0));
        assert!((color.r - 0.5).abs() < 1e-9);
        assert!((color.g - 0.5).abs() < 1e-9);
    }

    #[test]
    fn light_splat_is_normalized_by_total_light_samples() {
        let film = Film::new((2, 2));
        film.add_light_sample((1, 1), Spectrum::rgb(1.0, 1.0, 1.0));
        film.add_light_sample_count(4);
        let color = film.resolved_pixel((1, 1));
        assert!((color.r - 0.25).abs() < 1e-9);
    }

    #[test]
    fn bands_cover_every_row_exactly_once() {
        let mut film = Film::new((3, 5));
        let bands = film.bands_mut(2);
        let total_rows: u32 = bands.iter().map(|b| b.rows()).sum();
        assert_eq!(total_rows, 5);
    }

    #[test]
    fn split_bands_and_splatter_write_independent_buffers() {
        let mut film = Film::new((2, 2));
        {
            let (mut bands, splatter) = film.bands_and_splatter_mut(2);
            bands[0].add_camera_sample((0, 0), Spectrum::rgb(1.0, 0.0, 0.0));
            splatter.add_light_sample((1, 1), Spectrum::rgb(0.0, 0.0, 1.0));
            splatter.add_light_sample_count(1);
        }
        assert!((film.resolved_pixel((0, 0)).r - 1.0).abs() < 1e-9);
        assert!((film.resolved_pixel((1, 1)).b - 1.0).abs() < 1e-9);
    }
}
