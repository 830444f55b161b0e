//! End-to-end pipeline: calibrate, register holds, bound reach, search.

use crux_core::RasterView;
use crux_marker::{CalibrateError, CalibratorParams, Marker, MarkerCalibrator, MarkerSpec};
use crux_route::{
    compute_bounds, GroundLine, HoldFilter, HoldRegistry, RawDetection, ReachBounds, ReachParams,
    Route, RouteError, RouteSearch, RouteSearchParams,
};
use serde::{Deserialize, Serialize};

use crate::HoldDetector;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the end-to-end pipeline.
#[derive(thiserror::Error, Debug)]
pub enum GenerateError {
    #[error(transparent)]
    Calibrate(#[from] CalibrateError),

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("hold detector failed: {0}")]
    Detector(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse failure category, stable across error message wording.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidInput,
    MarkerNotFound,
    InvalidCalibration,
    NoStartingStance,
    NoFeasibleRoute,
    Detector,
}

impl GenerateError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GenerateError::Calibrate(err) => match err {
                CalibrateError::MarkerNotFound { .. } => FailureKind::MarkerNotFound,
                CalibrateError::Marker(_) => FailureKind::InvalidCalibration,
                CalibrateError::InvalidImage(_)
                | CalibrateError::InvalidPerimeter(_)
                | CalibrateError::UnknownDictionary(_) => FailureKind::InvalidInput,
            },
            GenerateError::Route(err) => match err {
                RouteError::InvalidCalibration { .. } => FailureKind::InvalidCalibration,
                RouteError::NoStartingStance { .. } => FailureKind::NoStartingStance,
                RouteError::NoFeasibleRoute => FailureKind::NoFeasibleRoute,
                RouteError::InvalidClimberHeight { .. }
                | RouteError::InvalidStartingDistance { .. }
                | RouteError::InvalidReachRatio { .. }
                | RouteError::InvalidImageSize { .. } => FailureKind::InvalidInput,
            },
            GenerateError::Detector(_) => FailureKind::Detector,
        }
    }
}

/// The climber a route is generated for.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimberParams {
    pub height_cm: f32,
    /// Starting holds must sit at most this far above the ground line.
    pub starting_max_distance_from_ground_cm: f32,
}

impl Default for ClimberParams {
    fn default() -> Self {
        Self {
            height_cm: 170.0,
            starting_max_distance_from_ground_cm: 50.0,
        }
    }
}

/// Where the pipeline puts the floor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundReference {
    /// Use [`RouteSearchParams::ground`] as configured.
    #[default]
    Search,
    /// The lowest corner of the calibration marker, for markers placed on the floor.
    MarkerBottom,
}

/// Every knob of the pipeline in one serde-friendly struct.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorParams {
    pub marker: MarkerSpec,
    pub calibrator: CalibratorParams,
    pub climber: ClimberParams,
    pub reach: ReachParams,
    pub holds: HoldFilter,
    pub search: RouteSearchParams,
    pub ground: GroundReference,
}

/// Result of a successful run.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedRoute {
    pub marker: Marker,
    pub bounds: ReachBounds,
    pub holds: HoldRegistry,
    pub route: Route,
}

/// Runs the whole pipeline for one configuration.
#[derive(Clone, Debug, Default)]
pub struct RouteGenerator {
    params: GeneratorParams,
}

impl RouteGenerator {
    pub fn new(params: GeneratorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &GeneratorParams {
        &self.params
    }

    /// Find the reference marker only.
    pub fn calibrate(&self, image: &RasterView<'_>) -> Result<Marker, GenerateError> {
        let calibrator = MarkerCalibrator::new(self.params.calibrator.clone());
        Ok(calibrator.calibrate(image, &self.params.marker)?)
    }

    /// Calibrate on `image`, ask `detector` for holds, then search.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image, detector), fields(width = image.width, height = image.height))
    )]
    pub fn generate<D: HoldDetector>(
        &self,
        image: &RasterView<'_>,
        detector: &D,
    ) -> Result<GeneratedRoute, GenerateError> {
        let marker = self.calibrate(image)?;
        log::debug!(
            "marker {:?}: {:.3} px/cm",
            marker.marker_id(),
            marker.pixels_per_cm()
        );
        let detections = detector
            .detect(image)
            .map_err(|e| GenerateError::Detector(Box::new(e)))?;
        self.generate_with_marker(marker, &detections, image.width, image.height)
    }

    /// Search with an already calibrated marker and precomputed detections.
    pub fn generate_with_marker(
        &self,
        marker: Marker,
        detections: &[RawDetection],
        image_width: usize,
        image_height: usize,
    ) -> Result<GeneratedRoute, GenerateError> {
        let p = &self.params;
        let holds = HoldRegistry::from_detections(detections, &p.holds);
        let bounds = compute_bounds(
            p.climber.height_cm,
            marker.pixels_per_cm(),
            p.climber.starting_max_distance_from_ground_cm,
            &p.reach,
        )?;

        let mut search = p.search.clone();
        if p.ground == GroundReference::MarkerBottom {
            search.ground = GroundLine::Baseline(marker.bottom_px());
        }
        let route =
            RouteSearch::new(search).generate_route(&holds, &bounds, image_width, image_height)?;
        log::info!(
            "{} holds, {} moves, {:?}",
            holds.len(),
            route.steps(),
            route.outcome
        );

        Ok(GeneratedRoute {
            marker,
            bounds,
            holds,
            route,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crux_marker::MarkerError;
    use nalgebra::Point2;

    fn square_marker(side: f32) -> Marker {
        let c = [
            Point2::new(100.0, 700.0),
            Point2::new(100.0 + side, 700.0),
            Point2::new(100.0 + side, 700.0 + side),
            Point2::new(100.0, 700.0 + side),
        ];
        Marker::from_corners(c, Some(0), 4.0 * side).expect("marker")
    }

    fn det(x: f32, y: f32) -> RawDetection {
        RawDetection {
            x,
            y,
            width: 20.0,
            height: 20.0,
            class_id: 0,
            confidence: 0.9,
        }
    }

    #[test]
    fn kinds_separate_calibration_from_search() {
        let not_found = GenerateError::from(CalibrateError::MarkerNotFound {
            dictionary: "DICT_4X4_50",
        });
        assert_eq!(not_found.kind(), FailureKind::MarkerNotFound);
        let bad_marker = GenerateError::from(CalibrateError::Marker(MarkerError::NotSimpleQuad));
        assert_eq!(bad_marker.kind(), FailureKind::InvalidCalibration);
        assert_eq!(
            GenerateError::from(RouteError::NoFeasibleRoute).kind(),
            FailureKind::NoFeasibleRoute
        );
        assert_eq!(
            GenerateError::from(RouteError::InvalidClimberHeight { height_cm: 0.0 }).kind(),
            FailureKind::InvalidInput
        );
    }

    #[test]
    fn empty_detections_fail_without_a_stance() {
        let gen = RouteGenerator::default();
        let err = gen
            .generate_with_marker(square_marker(50.0), &[], 640, 800)
            .expect_err("no holds");
        assert_eq!(err.kind(), FailureKind::NoStartingStance);
    }

    #[test]
    fn marker_bottom_sets_the_ground_line() {
        // 1 px/cm; holds sit 60 px above the image bottom but right at the marker
        let dets = [det(300.0, 740.0), det(340.0, 740.0)];
        let params = GeneratorParams {
            climber: ClimberParams {
                height_cm: 170.0,
                starting_max_distance_from_ground_cm: 30.0,
            },
            ..GeneratorParams::default()
        };
        let gen = RouteGenerator::new(params.clone());
        let err = gen
            .generate_with_marker(square_marker(50.0), &dets, 640, 800)
            .expect_err("holds too high above the image bottom");
        assert_eq!(err.kind(), FailureKind::NoStartingStance);

        let gen = RouteGenerator::new(GeneratorParams {
            ground: GroundReference::MarkerBottom,
            ..params
        });
        let err = gen
            .generate_with_marker(square_marker(50.0), &dets, 640, 800)
            .expect_err("stance but nothing to climb");
        assert_eq!(err.kind(), FailureKind::NoFeasibleRoute);
    }

    #[test]
    fn params_round_trip_through_partial_json() {
        let params: GeneratorParams =
            serde_json::from_str(r#"{"climber": {"height_cm": 182}, "ground": "marker_bottom"}"#)
                .expect("parse");
        assert_eq!(params.climber.height_cm, 182.0);
        assert_eq!(params.climber.starting_max_distance_from_ground_cm, 50.0);
        assert_eq!(params.ground, GroundReference::MarkerBottom);
        assert_eq!(params.marker.perimeter_cm, 28.0);
    }
}
