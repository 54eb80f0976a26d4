//! Tile- and sample-scheduled dispatch shared by the three transport
//! algorithms.
//!
//! The source's tile scheduler pops indices off a bare atomic counter
//! because its tiles are plain index ranges. Here a tile (a
//! [`crate::core::film::FilmBand`]) *owns* an exclusive, non-`Copy`
//! `&mut` slice of the film's pixel buffer, so handing one to a worker
//! means moving it out of a shared collection, not just reading an
//! index — a `Mutex`-guarded queue is the safe-Rust equivalent of the
//! atomic counter for that shape of work. The sample scheduler has no
//! such ownership to protect, so it keeps the bare atomic counter the
//! source uses.

pub mod backward;
pub mod bdpt;
pub mod forward;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::core::film::{Film, FilmBand, LightSplatter};

fn report_progress(done: &AtomicUsize, total: usize, unit: &str) {
    let start = Instant::now();
    loop {
        let n = done.load(Ordering::Relaxed);
        if n >= total {
            break;
        }
        std::thread::sleep(Duration::from_secs(1));
        log::info!(
            "{}/{} {} ({:.1}s elapsed)",
            n,
            total,
            unit,
            start.elapsed().as_secs_f64()
        );
    }
    log::info!("render finished in {:.1}s", start.elapsed().as_secs_f64());
}

/// Splits `film` into horizontal bands of `tile_height` rows and runs
/// `work` across `worker_count` threads, each pulling bands off a
/// shared queue until it's empty.
pub fn run_tiled<F>(film: &mut Film, tile_height: u32, worker_count: usize, work: F)
where
    F: Fn(&mut FilmBand) + Send + Sync,
{
    let bands: VecDeque<FilmBand> = film.bands_mut(tile_height).into();
    let total = bands.len();
    let queue = Mutex::new(bands);
    let done = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        scope.spawn(|| report_progress(&done, total, "tiles"));
        for _ in 0..worker_count.max(1) {
            scope.spawn(|| loop {
                let mut band = match queue.lock().unwrap().pop_front() {
                    Some(b) => b,
                    None => break,
                };
                work(&mut band);
                done.fetch_add(1, Ordering::Relaxed);
            });
        }
    });
}

/// Like [`run_tiled`], but also hands each worker a [`LightSplatter`]
/// borrowed from the same split as the bands, for transport algorithms
/// that both accumulate their own tile's camera hits and splat light
/// subpath connections into arbitrary pixels elsewhere in the image.
pub fn run_tiled_with_splat<F>(film: &mut Film, tile_height: u32, worker_count: usize, work: F)
where
    F: Fn(&mut FilmBand, LightSplatter) + Send + Sync,
{
    let (bands, splatter) = film.bands_and_splatter_mut(tile_height);
    let bands: VecDeque<FilmBand> = bands.into();
    let total = bands.len();
    let queue = Mutex::new(bands);
    let done = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        scope.spawn(|| report_progress(&done, total, "tiles"));
        for _ in 0..worker_count.max(1) {
            scope.spawn(|| loop {
                let mut band = match queue.lock().unwrap().pop_front() {
                    Some(b) => b,
                    None => break,
                };
                work(&mut band, splatter);
                done.fetch_add(1, Ordering::Relaxed);
            });
        }
    });
}

/// Dispatches `sample_count` light-tracing samples in fixed-size
/// batches across `worker_count` threads via a shared atomic counter.
pub fn run_sampled<F>(sample_count: u64, batch_size: u64, worker_count: usize, work: F)
where
    F: Fn(u64, u64) + Send + Sync,
{
    let batch_size = batch_size.max(1);
    let next = AtomicU64::new(0);
    let done = AtomicUsize::new(0);
    let total_batches = ((sample_count + batch_size - 1) / batch_size) as usize;

    std::thread::scope(|scope| {
        scope.spawn(|| report_progress(&done, total_batches, "batches"));
        for _ in 0..worker_count.max(1) {
            scope.spawn(|| loop {
                let start = next.fetch_add(batch_size, Ordering::Relaxed);
                if start >= sample_count {
                    break;
                }
                let n = batch_size.min(sample_count - start);
                work(start, n);
                done.fetch_add(1, Ordering::Relaxed);
            });
        }
    });
}
