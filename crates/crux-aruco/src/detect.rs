//! Full-image marker detection: candidates, then per-quad decoding.

use crux_core::GrayImageView;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{decode_quad, find_square_candidates, CandidateParams, DecodeConfig, Dictionary, Matcher};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Parameters for [`detect_markers`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArucoDetectParams {
    pub candidates: CandidateParams,
    pub decode: DecodeConfig,
    /// Bit errors to tolerate; defaults to the dictionary's correction capability.
    pub max_hamming: Option<u8>,
}

/// One decoded marker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArucoMarkerDetection {
    pub id: u32,
    /// Marker corners in its own frame: top-left, top-right, bottom-right,
    /// bottom-left of the printed marker, in image pixels.
    pub corners: [Point2<f32>; 4],
    /// Quarter turns between the printed marker and the image.
    pub rotation: u8,
    pub hamming: u8,
    /// Perimeter of the corner quad in pixels.
    pub perimeter: f32,
    pub score: f32,
}

/// Detect every decodable marker of `dict` in `img`, in raster order of the
/// markers' dark outlines.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(img, dict, params), fields(width = img.width, height = img.height, dict = dict.name))
)]
pub fn detect_markers(
    img: &GrayImageView<'_>,
    dict: &Dictionary,
    params: &ArucoDetectParams,
) -> Vec<ArucoMarkerDetection> {
    let matcher = Matcher::new(
        *dict,
        params.max_hamming.unwrap_or(dict.max_correction_bits),
    );
    let candidates = find_square_candidates(img, &params.candidates);

    let out: Vec<ArucoMarkerDetection> = candidates
        .iter()
        .filter_map(|cand| {
            let dec = decode_quad(img, &cand.corners, &params.decode, &matcher)?;
            Some(ArucoMarkerDetection {
                id: dec.id,
                corners: dec.as_match().canonical_corners(cand.corners),
                rotation: dec.rotation,
                hamming: dec.hamming,
                perimeter: cand.perimeter,
                score: dec.score,
            })
        })
        .collect();

    log::debug!(
        "{}: decoded {} of {} candidates",
        dict.name,
        out.len(),
        candidates.len()
    );
    out
}
