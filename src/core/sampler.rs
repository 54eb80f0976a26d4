//! Per-pixel sample sequences: an independent RNG-only sampler and a
//! stratified sampler that pre-shuffles jittered strata per declared
//! dimension, falling back to raw RNG draws past the declared count.

use crate::core::geometry::Point2f;
use crate::core::pbrt::{Float, FLOAT_ONE_MINUS_EPSILON};
use crate::core::rng::Rng;

/// Contract shared by every sampler variant. `begin_pixel` declares how
/// many 1D and 2D dimensions the caller intends to draw per sample
/// inside this pixel, `begin_sample`/`end_sample` bracket one sample's
/// draws, and `get_1d`/`get_2d` hand out the next value along each
/// dimension in declaration order.
pub trait Sampler {
    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler>;
    fn begin_pixel(&mut self, sample_count_x: i32, sample_count_y: i32, dims_1d: i32, dims_2d: i32);
    fn begin_sample(&mut self);
    fn get_1d(&mut self) -> Float;
    fn get_2d(&mut self) -> Point2f;
    fn end_sample(&mut self);
    fn end_pixel(&mut self);
}

/// Draws every dimension straight from the RNG; no stratification.
#[derive(Debug, Clone)]
pub struct RandomSampler {
    rng: Rng,
}

impl RandomSampler {
    pub fn new(seed: u64) -> Self {
        RandomSampler {
            rng: Rng::new(seed),
        }
    }
}

impl Sampler for RandomSampler {
    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(RandomSampler::new(seed))
    }

    fn begin_pixel(&mut self, _sx: i32, _sy: i32, _dims_1d: i32, _dims_2d: i32) {}

    fn begin_sample(&mut self) {}

    fn get_1d(&mut self) -> Float {
        self.rng.uniform_float()
    }

    fn get_2d(&mut self) -> Point2f {
        Point2f::new(self.rng.uniform_float(), self.rng.uniform_float())
    }

    fn end_sample(&mut self) {}

    fn end_pixel(&mut self) {}
}

/// Stratifies each declared dimension across the pixel's sample grid
/// and independently Fisher-Yates shuffles each dimension's strata, so
/// that correlations between dimensions (which would otherwise show up
/// as structured noise) are broken up while keeping the low-discrepancy
/// benefit of stratification within each dimension.
#[derive(Debug, Clone)]
pub struct StratifiedSampler {
    rng: Rng,
    jitter: bool,
    samples_1d: Vec<Vec<Float>>,
    samples_2d: Vec<Vec<Point2f>>,
    current_sample: usize,
    current_1d_dim: usize,
    current_2d_dim: usize,
}

impl StratifiedSampler {
    pub fn new(seed: u64, jitter: bool) -> Self {
        StratifiedSampler {
            rng: Rng::new(seed),
            jitter,
            samples_1d: Vec::new(),
            samples_2d: Vec::new(),
            current_sample: 0,
            current_1d_dim: 0,
            current_2d_dim: 0,
        }
    }

    fn shuffle_1d(&mut self, v: &mut [Float]) {
        let mut k = v.len();
        while k >= 2 {
            let j = self.rng.uniform_u32_bounded(k as u32) as usize;
            v.swap(k - 1, j);
            k -= 1;
        }
    }

    fn shuffle_2d(&mut self, v: &mut [Point2f]) {
        let mut k = v.len();
        while k >= 2 {
            let j = self.rng.uniform_u32_bounded(k as u32) as usize;
            v.swap(k - 1, j);
            k -= 1;
        }
    }
}

impl Sampler for StratifiedSampler {
    fn clone_with_seed(&self, seed: u64) -> Box<dyn Sampler> {
        Box::new(StratifiedSampler::new(seed, self.jitter))
    }

    fn begin_pixel(&mut self, sample_count_x: i32, sample_count_y: i32, dims_1d: i32, dims_2d: i32) {
        let sample_count = (sample_count_x * sample_count_y).max(1) as usize;

        self.samples_1d = Vec::with_capacity(dims_1d.max(0) as usize);
        for _ in 0..dims_1d.max(0) {
            let mut v = Vec::with_capacity(sample_count);
            for j in 0..sample_count {
                let delta = if self.jitter { self.rng.uniform_float() } else { 0.5 };
                v.push(((j as Float + delta) / sample_count as Float).min(FLOAT_ONE_MINUS_EPSILON));
            }
            self.shuffle_1d(&mut v);
            self.samples_1d.push(v);
        }

        self.samples_2d = Vec::with_capacity(dims_2d.max(0) as usize);
        let (sx, sy) = (sample_count_x.max(1), sample_count_y.max(1));
        for _ in 0..dims_2d.max(0) {
            let mut v = Vec::with_capacity(sample_count);
            for y in 0..sy {
                for x in 0..sx {
                    let dx = if self.jitter { self.rng.uniform_float() } else { 0.5 };
                    let dy = if self.jitter { self.rng.uniform_float() } else { 0.5 };
                    v.push(Point2f::new(
                        ((x as Float + dx) / sx as Float).min(FLOAT_ONE_MINUS_EPSILON),
                        ((y as Float + dy) / sy as Float).min(FLOAT_ONE_MINUS_EPSILON),
                    ));
                }
            }
            self.shuffle_2d(&mut v);
            self.samples_2d.push(v);
        }

        self.current_sample = 0;
        self.current_1d_dim = 0;
        self.current_2d_dim = 0;
    }

    fn begin_sample(&mut self) {}

    fn get_1d(&mut self) -> Float {
        if self.current_1d_dim < self.samples_1d.len() {
            let v = self.samples_1d[self.current_1d_dim][self.current_sample];
            self.current_1d_dim += 1;
            v
        } else {
            self.rng.uniform_float()
        }
    }

    fn get_2d(&mut self) -> Point2f {
        if self.current_2d_dim < self.samples_2d.len() {
            let v = self.samples_2d[self.current_2d_dim][self.current_sample];
            self.current_2d_dim += 1;
            v
        } else {
            Point2f::new(self.rng.uniform_float(), self.rng.uniform_float())
        }
    }

    fn end_sample(&mut self) {
        self.current_sample += 1;
        self.current_1d_dim = 0;
        self.current_2d_dim = 0;
    }

    fn end_pixel(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stratified_samples_cover_each_stratum() {
        let mut s = StratifiedSampler::new(1, true);
        s.begin_pixel(4, 1, 1, 0);
        let mut seen = vec![false; 4];
        for i in 0..4 {
            s.begin_sample();
            let v = s.get_1d();
            let stratum = (v * 4.0).floor() as usize;
            seen[stratum.min(3)] = true;
            s.end_sample();
            let _ = i;
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn unjittered_stratified_sampler_is_deterministic() {
        let mut a = StratifiedSampler::new(7, false);
        let mut b = StratifiedSampler::new(7, false);
        a.begin_pixel(2, 2, 0, 1);
        b.begin_pixel(2, 2, 0, 1);
        for _ in 0..4 {
            a.begin_sample();
            b.begin_sample();
            assert_eq!(a.get_2d().x, b.get_2d().x);
            a.end_sample();
            b.end_sample();
        }
    }

    #[test]
    fn random_sampler_draws_are_in_unit_interval() {
        let mut s = RandomSampler::new(3);
        for _ in 0..10 {
            let v = s.get_1d();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
