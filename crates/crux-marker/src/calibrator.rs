use crux_aruco::{builtins, detect_markers, ArucoMarkerDetection, Dictionary};
use crux_core::{gaussian_blur, pad_constant, GrayImage, GrayImageView, ImageError, RasterView};
use nalgebra::Vector2;

use crate::{CalibratorParams, Marker, MarkerError, MarkerSpec};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Calibration failures.
#[derive(thiserror::Error, Debug)]
pub enum CalibrateError {
    #[error("invalid input image: {0}")]
    InvalidImage(#[from] ImageError),

    #[error("marker perimeter must be positive and finite (got {0} cm)")]
    InvalidPerimeter(f32),

    #[error("unknown marker dictionary `{0}`")]
    UnknownDictionary(String),

    #[error("no marker of dictionary {dictionary} found in the image")]
    MarkerNotFound { dictionary: &'static str },

    #[error(transparent)]
    Marker(#[from] MarkerError),
}

/// Finds the reference marker in a photo and turns it into a [`Marker`].
#[derive(Clone, Debug, Default)]
pub struct MarkerCalibrator {
    params: CalibratorParams,
}

impl MarkerCalibrator {
    pub fn new(params: CalibratorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CalibratorParams {
        &self.params
    }

    /// Locate the largest marker of `spec.dictionary` in `image`.
    ///
    /// The image is converted to gray and blurred once. When the first pass
    /// finds nothing, a second pass runs on a copy with a constant border so
    /// markers touching the image edge can still close their outline.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image, spec), fields(width = image.width, height = image.height, dict = %spec.dictionary))
    )]
    pub fn calibrate(&self, image: &RasterView<'_>, spec: &MarkerSpec) -> Result<Marker, CalibrateError> {
        image.validate()?;
        let dict = resolve(spec)?;
        let gray = image.to_gray()?;
        self.locate(&gray.view(), &dict, spec.perimeter_cm)
    }

    /// Same as [`Self::calibrate`] for an already grayscale image.
    pub fn calibrate_gray(
        &self,
        gray: &GrayImageView<'_>,
        spec: &MarkerSpec,
    ) -> Result<Marker, CalibrateError> {
        RasterView::gray(gray.width, gray.height, gray.data).validate()?;
        let dict = resolve(spec)?;
        self.locate(gray, &dict, spec.perimeter_cm)
    }

    fn locate(
        &self,
        gray: &GrayImageView<'_>,
        dict: &Dictionary,
        perimeter_cm: f32,
    ) -> Result<Marker, CalibrateError> {
        let blurred: GrayImage = if self.params.blur_kernel > 1 {
            gaussian_blur(gray, self.params.blur_kernel)
        } else {
            GrayImage {
                width: gray.width,
                height: gray.height,
                data: gray.data.to_vec(),
            }
        };

        let mut found = detect_markers(&blurred.view(), dict, &self.params.detect);
        if found.is_empty() && self.params.pad_border > 0 {
            let border = self.params.pad_border;
            log::debug!("no marker on first pass, retrying with a {border} px border");
            let padded = pad_constant(&blurred.view(), border, self.params.pad_value);
            let offset = Vector2::new(border as f32, border as f32);
            found = detect_markers(&padded.view(), dict, &self.params.detect);
            for det in &mut found {
                for c in &mut det.corners {
                    *c -= offset;
                }
            }
        }

        let best = select_largest(&found).ok_or(CalibrateError::MarkerNotFound {
            dictionary: dict.name,
        })?;
        log::debug!(
            "{} marker(s) found, using id {} with perimeter {:.1} px",
            found.len(),
            best.id,
            best.perimeter
        );
        Ok(Marker::from_corners(best.corners, Some(best.id), perimeter_cm)?)
    }
}

fn resolve(spec: &MarkerSpec) -> Result<Dictionary, CalibrateError> {
    if !spec.perimeter_cm.is_finite() || spec.perimeter_cm <= 0.0 {
        return Err(CalibrateError::InvalidPerimeter(spec.perimeter_cm));
    }
    builtins::builtin_dictionary(&spec.dictionary)
        .ok_or_else(|| CalibrateError::UnknownDictionary(spec.dictionary.clone()))
}

/// Largest perimeter wins; the earliest detection keeps ties.
fn select_largest(found: &[ArucoMarkerDetection]) -> Option<&ArucoMarkerDetection> {
    let mut best: Option<&ArucoMarkerDetection> = None;
    for det in found {
        if best.is_none_or(|b| det.perimeter > b.perimeter) {
            best = Some(det);
        }
    }
    best
}
