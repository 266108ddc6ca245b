//! marga-node pipeline runner
//!
//! Loads a YAML pipeline configuration, applies command-line overrides
//! and runs the enabled stages over a recorded drive.
//!
//! # Usage
//!
//! ```bash
//! # Inputs in the default locations (frames/, gps.json, poses.json)
//! cargo run --bin marga_node
//!
//! # With a config file
//! cargo run --bin marga_node -- --config pipeline.yaml
//!
//! # With command line overrides
//! cargo run --bin marga_node -- --frames rec/frames --output /tmp/run1 --format pcd
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use marga_map::config::{MapFormat, PipelineConfig};
use marga_map::pipeline;

/// Command-line arguments; every option overrides the config file.
#[derive(Parser, Debug)]
#[command(
    name = "marga_node",
    version,
    about = "Lidar map assembly, georeferencing and lane-marker extraction"
)]
struct CliArgs {
    /// YAML pipeline configuration file.
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory of per-frame point-cloud files.
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    /// GPS series JSON file.
    #[arg(long, value_name = "FILE")]
    gps: Option<PathBuf>,

    /// Trajectory pose JSON file.
    #[arg(long, value_name = "FILE")]
    poses: Option<PathBuf>,

    /// Output directory.
    #[arg(long, short = 'o', value_name = "DIR")]
    output: Option<PathBuf>,

    /// On-disk format for assembled maps.
    #[arg(long, value_enum)]
    format: Option<MapFormatArg>,

    /// Manual heading in degrees, skipping heading recovery.
    #[arg(long, value_name = "DEGREES")]
    heading: Option<f64>,

    /// Fixed seed for ground segmentation.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapFormatArg {
    Ply,
    Pcd,
}

impl From<MapFormatArg> for MapFormat {
    fn from(arg: MapFormatArg) -> Self {
        match arg {
            MapFormatArg::Ply => MapFormat::Ply,
            MapFormatArg::Pcd => MapFormat::Pcd,
        }
    }
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = CliArgs::parse();

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            log::error!("configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    apply_overrides(&mut config, &args);

    log::info!("marga_node starting");
    log::info!("  frames: {}", config.paths.frames_dir.display());
    log::info!("  gps:    {}", config.paths.gps_file.display());
    log::info!("  poses:  {}", config.paths.poses_file.display());
    log::info!("  output: {}", config.paths.output_dir.display());

    match pipeline::run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("pipeline failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &CliArgs) -> marga_map::Result<PipelineConfig> {
    match &args.config {
        Some(path) => {
            let config = PipelineConfig::load(path)?;
            log::info!("loaded config from {}", path.display());
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn apply_overrides(config: &mut PipelineConfig, args: &CliArgs) {
    if let Some(frames) = &args.frames {
        config.paths.frames_dir = frames.clone();
    }
    if let Some(gps) = &args.gps {
        config.paths.gps_file = gps.clone();
    }
    if let Some(poses) = &args.poses {
        config.paths.poses_file = poses.clone();
    }
    if let Some(output) = &args.output {
        config.paths.output_dir = output.clone();
    }
    if let Some(format) = args.format {
        config.paths.map_format = format.into();
    }
    if let Some(heading) = args.heading {
        config.georeference.manual_heading = Some(heading);
    }
    if let Some(seed) = args.seed {
        config.ground.seed = Some(seed);
    }
}
