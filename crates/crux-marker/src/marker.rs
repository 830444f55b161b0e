use crux_core::{distance, is_simple_quad, polygon_perimeter};
use nalgebra::Point2;
use serde::Serialize;

/// Reasons a set of corners cannot become a [`Marker`].
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum MarkerError {
    #[error("marker corners do not form a simple quadrilateral")]
    NotSimpleQuad,

    #[error("marker perimeter must be positive and finite (got {perimeter_cm} cm)")]
    InvalidPerimeter { perimeter_cm: f32 },

    #[error("marker has a degenerate pixel scale ({pixels_per_cm} px/cm)")]
    DegenerateScale { pixels_per_cm: f32 },
}

/// A located square marker with a known physical perimeter.
///
/// Corners are ordered top-left, top-right, bottom-right, bottom-left in the
/// marker's own printed frame. The value is immutable; every derived
/// quantity is computed from the corners and `perimeter_cm`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Marker {
    corners: [Point2<f32>; 4],
    marker_id: Option<u32>,
    perimeter_cm: f32,
    perimeter_px: f32,
}

impl Marker {
    pub fn from_corners(
        corners: [Point2<f32>; 4],
        marker_id: Option<u32>,
        perimeter_cm: f32,
    ) -> Result<Self, MarkerError> {
        if !perimeter_cm.is_finite() || perimeter_cm <= 0.0 {
            return Err(MarkerError::InvalidPerimeter { perimeter_cm });
        }
        if !is_simple_quad(&corners) {
            return Err(MarkerError::NotSimpleQuad);
        }
        let perimeter_px = polygon_perimeter(&corners);
        let pixels_per_cm = perimeter_px / perimeter_cm;
        if !pixels_per_cm.is_finite() || pixels_per_cm <= 0.0 {
            return Err(MarkerError::DegenerateScale { pixels_per_cm });
        }
        Ok(Self {
            corners,
            marker_id,
            perimeter_cm,
            perimeter_px,
        })
    }

    #[inline]
    pub fn corners(&self) -> &[Point2<f32>; 4] {
        &self.corners
    }

    /// Corners truncated to integer pixels, ready for drawing.
    pub fn corners_px_i32(&self) -> [[i32; 2]; 4] {
        self.corners.map(|p| [p.x as i32, p.y as i32])
    }

    #[inline]
    pub fn marker_id(&self) -> Option<u32> {
        self.marker_id
    }

    #[inline]
    pub fn perimeter_cm(&self) -> f32 {
        self.perimeter_cm
    }

    /// Closed-contour length of the corner quad.
    #[inline]
    pub fn perimeter_px(&self) -> f32 {
        self.perimeter_px
    }

    #[inline]
    pub fn pixels_per_cm(&self) -> f32 {
        self.perimeter_px / self.perimeter_cm
    }

    #[inline]
    pub fn pixels_per_meter(&self) -> f32 {
        self.pixels_per_cm() * 100.0
    }

    /// Length of the top edge.
    pub fn width_px(&self) -> f32 {
        distance(self.corners[0], self.corners[1])
    }

    /// Length of the right edge.
    pub fn height_px(&self) -> f32 {
        distance(self.corners[1], self.corners[2])
    }

    pub fn width_cm(&self) -> f32 {
        self.width_px() / self.pixels_per_cm()
    }

    pub fn height_cm(&self) -> f32 {
        self.height_px() / self.pixels_per_cm()
    }

    /// Midpoint of the top-left / bottom-right diagonal.
    pub fn center_px(&self) -> Point2<f32> {
        nalgebra::center(&self.corners[0], &self.corners[2])
    }

    /// Angle of the top edge (top-left towards top-right), radians, image
    /// y axis pointing down.
    pub fn orientation_rad(&self) -> f32 {
        let d = self.corners[1] - self.corners[0];
        d.y.atan2(d.x)
    }

    /// Largest image y over the corners, i.e. where the marker meets the floor side.
    pub fn bottom_px(&self) -> f32 {
        self.corners
            .iter()
            .map(|p| p.y)
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Centimetres to whole pixels, truncating toward zero.
    pub fn cm_to_px(&self, cm: f32) -> i32 {
        (cm * self.pixels_per_cm()) as i32
    }

    pub fn px_to_cm(&self, px: f32) -> f32 {
        px / self.pixels_per_cm()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x0: f32, y0: f32, side: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0, y0),
            Point2::new(x0 + side, y0),
            Point2::new(x0 + side, y0 + side),
            Point2::new(x0, y0 + side),
        ]
    }

    #[test]
    fn derived_measurements_of_a_square() {
        let m = Marker::from_corners(square(100.0, 100.0, 200.0), Some(4), 28.0).expect("marker");
        assert_relative_eq!(m.perimeter_px(), 800.0);
        assert_relative_eq!(m.pixels_per_cm(), 800.0 / 28.0);
        assert_relative_eq!(m.pixels_per_meter(), 80000.0 / 28.0, max_relative = 1e-6);
        assert_relative_eq!(m.width_cm(), 7.0, max_relative = 1e-6);
        assert_relative_eq!(m.height_cm(), 7.0, max_relative = 1e-6);
        assert_eq!(m.center_px(), Point2::new(200.0, 200.0));
        assert_relative_eq!(m.orientation_rad(), 0.0);
        assert_eq!(m.marker_id(), Some(4));
        assert_relative_eq!(m.bottom_px(), 300.0);
    }

    #[test]
    fn cm_to_px_truncates() {
        let m = Marker::from_corners(square(0.0, 0.0, 70.0), None, 28.0).expect("marker");
        // 10 px per cm
        assert_eq!(m.cm_to_px(1.29), 12);
        assert_eq!(m.cm_to_px(50.0), 500);
        assert_relative_eq!(m.px_to_cm(125.0), 12.5);
    }

    #[test]
    fn conversion_round_trip_within_one_pixel() {
        let m = Marker::from_corners(square(3.0, 5.0, 187.3), None, 28.0).expect("marker");
        let tol = 1.0 / m.pixels_per_cm();
        for cm in [0.5f32, 7.0, 50.0, 183.0] {
            let back = m.px_to_cm(m.cm_to_px(cm) as f32);
            assert!((back - cm).abs() <= tol, "cm={cm} back={back}");
        }
    }

    #[test]
    fn invalid_inputs_are_rejected() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(matches!(
            Marker::from_corners(sq, None, 0.0),
            Err(MarkerError::InvalidPerimeter { .. })
        ));
        assert!(matches!(
            Marker::from_corners(sq, None, f32::NAN),
            Err(MarkerError::InvalidPerimeter { .. })
        ));
        let bowtie = [sq[0], sq[2], sq[1], sq[3]];
        assert_eq!(
            Marker::from_corners(bowtie, None, 28.0),
            Err(MarkerError::NotSimpleQuad)
        );
    }

    #[test]
    fn integer_corners_truncate() {
        let m = Marker::from_corners(square(10.7, 20.2, 50.0), None, 28.0).expect("marker");
        assert_eq!(m.corners_px_i32()[0], [10, 20]);
        assert_eq!(m.corners_px_i32()[2], [60, 70]);
    }
}
