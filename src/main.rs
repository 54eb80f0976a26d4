//! Command-line entry point: reads `<scene>.json` from a directory,
//! dispatches to the configured integrator, and writes the resolved
//! image. Mirrors the source renderer's batch driver, minus the
//! Fastly/WASM request handlers this workspace has no use for.

use std::path::PathBuf;
use std::process::ExitCode;

use structopt::StructOpt;

use pathforge::core::error::RenderError;
use pathforge::core::film::Film;
use pathforge::core::scenefile::{read_scene_file, IntegratorKind, RenderConfig};
use pathforge::integrators::{backward, bdpt, forward, run_sampled, run_tiled, run_tiled_with_splat};

#[derive(StructOpt)]
#[structopt(name = "pathforge", about = "Offline Monte Carlo path tracer")]
struct Opt {
    /// Directory containing `<scene>.json` (and any referenced meshes/images).
    #[structopt(parse(from_os_str))]
    scene_dir: PathBuf,

    /// Base name of the scene file, without the `.json` extension.
    scene_name: String,

    /// Overrides the scene file's `integrator.workerCount`.
    #[structopt(long)]
    threads: Option<usize>,

    /// Raises the log level; repeatable (`-v`, `-vv`).
    #[structopt(short, long, parse(from_occurrences))]
    verbose: u8,
}

fn render(config: &RenderConfig, worker_count: usize) -> Film {
    let mut film = Film::new(config.resolution);
    let base_sampler = config.sampler;
    let worker_count = worker_count.max(1);

    match config.integrator.kind {
        IntegratorKind::Forward { strategy, samples_x, samples_y, max_vertices } => {
            run_tiled(&mut film, config.integrator.tile_size.1, worker_count, |band| {
                let mut sampler = base_sampler.make(band.y_start() as u64 + 1);
                forward::render_band(
                    band,
                    &config.scene,
                    &config.camera,
                    config.resolution,
                    sampler.as_mut(),
                    samples_x,
                    samples_y,
                    max_vertices,
                    strategy,
                    config.integrator.scissor,
                );
            });
        }
        IntegratorKind::Backward { sample_count, max_vertices } => {
            let batch_size = 4096.min(sample_count.max(1));
            run_sampled(sample_count, batch_size, worker_count, |start, n| {
                let mut sampler = base_sampler.make(start + 1);
                backward::render_batch(
                    &config.scene,
                    &config.camera,
                    config.resolution,
                    &film,
                    sampler.as_mut(),
                    n,
                    max_vertices,
                );
            });
        }
        IntegratorKind::Bidirectional { samples_x, samples_y, max_vertices } => {
            run_tiled_with_splat(&mut film, config.integrator.tile_size.1, worker_count, |band, splat| {
                let mut sampler = base_sampler.make(band.y_start() as u64 + 1);
                bdpt::render_band(
                    band,
                    splat,
                    &config.scene,
                    &config.camera,
                    config.resolution,
                    sampler.as_mut(),
                    samples_x,
                    samples_y,
                    max_vertices,
                    config.integrator.scissor,
                );
            });
        }
    }

    film
}

fn run(opt: &Opt) -> Result<(), RenderError> {
    let config = read_scene_file(&opt.scene_dir, &opt.scene_name)?;
    let worker_count = opt.threads.unwrap_or(config.integrator.worker_count);

    log::info!(
        "rendering {}x{} via {:?} with {} worker(s) into {}",
        config.resolution.0,
        config.resolution.1,
        config.integrator.kind,
        worker_count,
        config.output_name
    );

    let film = render(&config, worker_count);

    let output_path = opt.scene_dir.join(&config.output_name).with_extension(match config.output_format {
        pathforge::core::film::ImageFormat::Ppm => "ppm",
        pathforge::core::film::ImageFormat::Raw32 => "raw32",
    });
    film.export(&output_path, config.output_format)?;
    log::info!("wrote {}", output_path.display());
    Ok(())
}

fn main() -> ExitCode {
    let opt = Opt::from_args();

    let default_level = match opt.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(&opt) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{}", err);
            ExitCode::FAILURE
        }
    }
}
