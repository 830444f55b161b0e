use crux_aruco::ArucoDetectParams;
use serde::{Deserialize, Serialize};

/// Which marker to look for and how big it is in the real world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerSpec {
    /// Builtin dictionary name, e.g. `DICT_4X4_50`.
    pub dictionary: String,
    /// Physical perimeter of the printed marker (outer black frame), cm.
    pub perimeter_cm: f32,
}

impl Default for MarkerSpec {
    /// A 7 cm × 7 cm `DICT_4X4_50` marker.
    fn default() -> Self {
        Self {
            dictionary: "DICT_4X4_50".to_string(),
            perimeter_cm: 28.0,
        }
    }
}

/// Preprocessing and detection settings for [`crate::MarkerCalibrator`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibratorParams {
    /// Odd Gaussian kernel size applied before detection; `0` or `1` disables blur.
    pub blur_kernel: usize,
    /// Border added on every side for the second detection attempt.
    pub pad_border: usize,
    /// Gray value of that border.
    pub pad_value: u8,
    pub detect: ArucoDetectParams,
}

impl Default for CalibratorParams {
    fn default() -> Self {
        Self {
            blur_kernel: 7,
            pad_border: 10,
            pad_value: 255,
            detect: ArucoDetectParams::default(),
        }
    }
}
