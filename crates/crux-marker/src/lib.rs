//! Physical scale calibration from a square fiducial marker.
//!
//! [`MarkerCalibrator`] finds the reference ArUco marker in a photo and
//! returns a [`Marker`]: its corner quad plus the printed perimeter, from
//! which pixel/centimetre conversions are derived.
//!
//! ```no_run
//! use crux_core::RasterView;
//! use crux_marker::{MarkerCalibrator, MarkerSpec};
//!
//! # fn main() -> Result<(), crux_marker::CalibrateError> {
//! # let (width, height, pixels) = (1216usize, 800usize, vec![255u8; 1216 * 800]);
//! let image = RasterView::gray(width, height, &pixels);
//! let marker = MarkerCalibrator::default().calibrate(&image, &MarkerSpec::default())?;
//! println!("{:.2} px/cm", marker.pixels_per_cm());
//! # Ok(())
//! # }
//! ```

mod calibrator;
mod marker;
mod types;

pub use calibrator::{CalibrateError, MarkerCalibrator};
pub use marker::{Marker, MarkerError};
pub use types::{CalibratorParams, MarkerSpec};
