//! High-level facade crate for the `crux-*` workspace.
//!
//! This crate provides:
//! - stable re-exports of the marker, route and image crates
//! - the [`HoldDetector`] seam and an end-to-end [`RouteGenerator`]
//! - JSON config/report helpers in [`io`]
//! - (feature `image`) adapters from `image` crate buffers in [`imageio`]
//!
//! ## Quickstart
//!
//! ```no_run
//! use crux::{imageio, PrecomputedDetections, RouteGenerator, WORKING_WIDTH};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let photo = imageio::load_working_image("wall.jpg", Some(WORKING_WIDTH))?;
//! let holds = PrecomputedDetections::load_json("holds.json")?;
//!
//! let generated = RouteGenerator::default().generate(&imageio::rgb_view(&photo), &holds)?;
//! println!(
//!     "{} moves at {:.2} px/cm",
//!     generated.route.steps(),
//!     generated.marker.pixels_per_cm()
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `crux::core`: raster views, blur, padding, homography, logger.
//! - `crux::aruco`: dictionaries, marker decoding and synthesis.
//! - `crux::marker`: marker calibration and the `Marker` value.
//! - `crux::route`: hold registry, reach bounds, route search.

pub use crux_aruco as aruco;
pub use crux_core as core;
pub use crux_marker as marker;
pub use crux_route as route;

pub use crux_core::RasterView;
pub use crux_marker::{Marker, MarkerSpec};
pub use crux_route::{RawDetection, Route, RouteOutcome};

mod detector;
mod generate;
pub mod io;

#[cfg(feature = "image")]
pub mod imageio;

pub use detector::{HoldDetector, PrecomputedDetections};
pub use generate::{
    ClimberParams, FailureKind, GenerateError, GeneratedRoute, GeneratorParams, GroundReference,
    RouteGenerator,
};

/// Width every photo is normalized to before calibration and detection.
pub const WORKING_WIDTH: u32 = 1216;

/// Install a `tracing` subscriber and forward `log` records into it.
///
/// Library crates log through `log`; without the bridge those records never
/// reach the subscriber. `level` applies when `RUST_LOG` is unset. Repeated
/// calls are ignored.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: log::LevelFilter, json: bool) {
    crux_core::init_tracing(level, json);
    let _ = tracing_log::LogTracer::init();
}
