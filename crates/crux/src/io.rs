//! JSON run configuration and report helpers.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crux_marker::Marker;
use crux_route::{Hold, ReachBounds, Route};
use serde::{Deserialize, Serialize};

use crate::{
    FailureKind, GenerateError, GeneratedRoute, GeneratorParams, PrecomputedDetections,
    RouteGenerator,
};

#[derive(thiserror::Error, Debug)]
pub enum CruxIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "image")]
    #[error(transparent)]
    Image(#[from] ::image::ImageError),
}

fn default_resize_width() -> Option<u32> {
    Some(crate::WORKING_WIDTH)
}

/// One route generation run, loaded from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    pub image_path: String,
    /// JSON array of hold detections in working-image pixels.
    pub detections_path: String,
    #[serde(default)]
    pub output_path: Option<String>,
    /// Width the photo is resized to before anything else; `null` keeps it.
    #[serde(default = "default_resize_width")]
    pub resize_width: Option<u32>,
    #[serde(default)]
    pub generator: GeneratorParams,
}

impl RouteConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CruxIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CruxIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the output report path.
    pub fn output_path(&self) -> PathBuf {
        self.output_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("route_report.json"))
    }

    pub fn build_generator(&self) -> RouteGenerator {
        RouteGenerator::new(self.generator.clone())
    }

    pub fn load_detections(&self) -> Result<PrecomputedDetections, CruxIoError> {
        PrecomputedDetections::load_json(&self.detections_path)
    }

    /// Load the image and detections, run the pipeline and build a report.
    ///
    /// Pipeline failures end up in the report; only I/O problems are errors.
    #[cfg(feature = "image")]
    pub fn run(&self) -> Result<RouteReport, CruxIoError> {
        let img = crate::imageio::load_working_image(&self.image_path, self.resize_width)?;
        let detections = self.load_detections()?;
        let view = crate::imageio::rgb_view(&img);
        let (w, h) = (view.width, view.height);

        let report = match self.build_generator().generate(&view, &detections) {
            Ok(generated) => RouteReport::success(&self.image_path, w, h, &generated),
            Err(err) => {
                log::warn!("route generation failed: {err}");
                RouteReport::failure(&self.image_path, w, h, &err)
            }
        };
        Ok(report)
    }
}

impl PrecomputedDetections {
    /// Load a JSON array of detections.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CruxIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Marker fields the annotator needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerSummary {
    pub id: Option<u32>,
    /// TL, TR, BR, BL in the marker's own frame, rounded to pixels.
    pub corners: [[i32; 2]; 4],
    pub pixels_per_cm: f32,
    pub width_cm: f32,
    pub height_cm: f32,
    pub orientation_rad: f32,
}

impl From<&Marker> for MarkerSummary {
    fn from(m: &Marker) -> Self {
        Self {
            id: m.marker_id(),
            corners: m.corners_px_i32(),
            pixels_per_cm: m.pixels_per_cm(),
            width_cm: m.width_cm(),
            height_cm: m.height_cm(),
            orientation_rad: m.orientation_rad(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportError {
    pub kind: FailureKind,
    pub message: String,
}

/// Outcome of one run, ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    pub image_path: String,
    pub image_width: usize,
    pub image_height: usize,
    #[serde(default)]
    pub marker: Option<MarkerSummary>,
    #[serde(default)]
    pub bounds: Option<ReachBounds>,
    #[serde(default)]
    pub holds: Vec<Hold>,
    #[serde(default)]
    pub route: Option<Route>,
    #[serde(default)]
    pub error: Option<ReportError>,
}

impl RouteReport {
    pub fn success(
        image_path: &str,
        image_width: usize,
        image_height: usize,
        generated: &GeneratedRoute,
    ) -> Self {
        Self {
            image_path: image_path.to_string(),
            image_width,
            image_height,
            marker: Some(MarkerSummary::from(&generated.marker)),
            bounds: Some(generated.bounds),
            holds: generated.holds.holds().to_vec(),
            route: Some(generated.route.clone()),
            error: None,
        }
    }

    pub fn failure(
        image_path: &str,
        image_width: usize,
        image_height: usize,
        err: &GenerateError,
    ) -> Self {
        Self {
            image_path: image_path.to_string(),
            image_width,
            image_height,
            marker: None,
            bounds: None,
            holds: Vec::new(),
            route: None,
            error: Some(ReportError {
                kind: err.kind(),
                message: err.to_string(),
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.route.is_some()
    }

    /// Load a JSON report from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, CruxIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CruxIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
