//! Hold detection seam.

use std::convert::Infallible;

use crux_core::RasterView;
use crux_route::RawDetection;
use serde::{Deserialize, Serialize};

/// Anything that turns an image into hold boxes in the same pixel space.
///
/// The engine never looks at how detections are produced; a learned model,
/// a remote service or a file on disk all fit behind this trait.
pub trait HoldDetector {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&self, image: &RasterView<'_>) -> Result<Vec<RawDetection>, Self::Error>;
}

/// Detections produced out of process, e.g. loaded from JSON.
///
/// Serializes as a bare array of detections.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecomputedDetections {
    pub detections: Vec<RawDetection>,
}

impl PrecomputedDetections {
    pub fn new(detections: Vec<RawDetection>) -> Self {
        Self { detections }
    }
}

impl From<Vec<RawDetection>> for PrecomputedDetections {
    fn from(detections: Vec<RawDetection>) -> Self {
        Self::new(detections)
    }
}

impl HoldDetector for PrecomputedDetections {
    type Error = Infallible;

    fn detect(&self, _image: &RasterView<'_>) -> Result<Vec<RawDetection>, Self::Error> {
        Ok(self.detections.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precomputed_detections_ignore_the_image() {
        let det = RawDetection {
            x: 10.0,
            y: 20.0,
            width: 5.0,
            height: 5.0,
            class_id: 1,
            confidence: 0.5,
        };
        let source = PrecomputedDetections::from(vec![det]);
        let pixels = [0u8; 4];
        let out = source
            .detect(&RasterView::gray(2, 2, &pixels))
            .expect("infallible");
        assert_eq!(out, vec![det]);
    }

    #[test]
    fn json_is_a_bare_array() {
        let parsed: PrecomputedDetections = serde_json::from_str(
            r#"[{"x": 1, "y": 2, "width": 3, "height": 4, "class_id": 0, "confidence": 0.9}]"#,
        )
        .expect("parse");
        assert_eq!(parsed.detections.len(), 1);
        assert_eq!(parsed.detections[0].y, 2.0);
    }
}
