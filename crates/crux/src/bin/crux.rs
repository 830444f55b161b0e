//! crux CLI: marker calibration, route generation and marker printing.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use crux::aruco::{builtins, draw_marker};
use crux::io::{MarkerSummary, RouteConfig};
use crux::{imageio, GeneratorParams, MarkerSpec, RouteGenerator, WORKING_WIDTH};
use log::LevelFilter;

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "crux")]
#[command(about = "Generate boulder routes from a photo of a climbing wall")]
#[command(version)]
struct Cli {
    /// Log level for the crux crates; `RUST_LOG` overrides it under `tracing`.
    #[arg(long, global = true, default_value = "info")]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Find the reference marker and print its scale as JSON.
    Calibrate {
        /// Path to the wall photo.
        #[arg(long)]
        image: PathBuf,

        /// Builtin marker dictionary.
        #[arg(long, default_value = "DICT_4X4_50")]
        dictionary: String,

        /// Printed marker perimeter in centimetres.
        #[arg(long, default_value_t = 28.0)]
        perimeter_cm: f32,

        /// Use the photo at its original size.
        #[arg(long)]
        no_resize: bool,
    },

    /// Run the whole pipeline from a JSON config and write a report.
    Generate {
        /// Path to the run config (JSON).
        #[arg(long)]
        config: PathBuf,

        /// Report path; overrides `output_path` from the config.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Render a printable marker as PNG.
    DrawMarker {
        #[arg(long)]
        id: u32,

        /// Image side in pixels, quiet zone not included.
        #[arg(long, default_value_t = 400)]
        side_px: usize,

        #[arg(long, default_value = "DICT_4X4_50")]
        dictionary: String,

        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    crux::core::init_with_level(cli.log_level)?;
    #[cfg(feature = "tracing")]
    crux::init_tracing(cli.log_level, false);

    match cli.command {
        Commands::Calibrate {
            image,
            dictionary,
            perimeter_cm,
            no_resize,
        } => run_calibrate(&image, dictionary, perimeter_cm, no_resize),
        Commands::Generate { config, output } => run_generate(&config, output),
        Commands::DrawMarker {
            id,
            side_px,
            dictionary,
            output,
        } => run_draw_marker(id, side_px, &dictionary, &output),
    }
}

fn run_calibrate(
    image: &Path,
    dictionary: String,
    perimeter_cm: f32,
    no_resize: bool,
) -> CliResult<()> {
    let width = (!no_resize).then_some(WORKING_WIDTH);
    let photo = imageio::load_working_image(image, width)?;
    log::info!("image {}x{}", photo.width(), photo.height());

    let params = GeneratorParams {
        marker: MarkerSpec {
            dictionary,
            perimeter_cm,
        },
        ..GeneratorParams::default()
    };
    let marker = RouteGenerator::new(params).calibrate(&imageio::rgb_view(&photo))?;

    let summary = MarkerSummary::from(&marker);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn run_generate(config_path: &Path, output: Option<PathBuf>) -> CliResult<()> {
    let config = RouteConfig::load_json(config_path)?;
    let report = config.run()?;
    let out = output.unwrap_or_else(|| config.output_path());
    report.write_json(&out)?;
    log::info!("report written to {}", out.display());

    match (&report.route, &report.error) {
        (Some(route), _) => {
            println!("{} moves ({:?})", route.steps(), route.outcome);
            Ok(())
        }
        (None, Some(err)) => Err(format!("{:?}: {}", err.kind, err.message).into()),
        (None, None) => Err("route generation produced no result".into()),
    }
}

fn run_draw_marker(id: u32, side_px: usize, dictionary: &str, output: &Path) -> CliResult<()> {
    let dict = builtins::builtin_dictionary(dictionary)
        .ok_or_else(|| -> CliError { format!("unknown dictionary `{dictionary}`").into() })?;
    let marker = draw_marker(&dict, id, side_px, 1).ok_or_else(|| -> CliError {
        format!(
            "cannot draw id {id} of {} at {side_px} px (ids 0..{})",
            dict.name,
            dict.len()
        )
        .into()
    })?;
    let png = imageio::to_image_gray(marker).ok_or("marker buffer size mismatch")?;
    png.save(output)?;
    log::info!("marker {id} written to {}", output.display());
    Ok(())
}
