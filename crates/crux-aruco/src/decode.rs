//! Bit sampling and decoding of a single image quad.

use crate::threshold::otsu_threshold_from_samples;
use crate::{Match, Matcher};
use crux_core::{distance, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Sampling configuration for reading marker bits inside a quad.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    /// Marker border width in cells (OpenCV uses 1).
    pub border_bits: usize,
    /// Fraction of the quad side ignored near its edges.
    pub inset_frac: f32,
    /// Required fraction of border cells reading black.
    pub min_border_score: f32,
    /// Also try reading the quad with swapped polarity.
    pub allow_inverted: bool,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            border_bits: 1,
            inset_frac: 0.0,
            min_border_score: 0.85,
            allow_inverted: false,
        }
    }
}

/// Result of decoding one quad.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QuadDecode {
    pub id: u32,
    pub rotation: u8,
    pub hamming: u8,
    /// `border_score` scaled down by the Hamming penalty, in `[0, 1]`.
    pub score: f32,
    pub border_score: f32,
    /// Observed inner bits (row-major, black=1).
    pub code: u64,
    pub inverted: bool,
}

impl QuadDecode {
    #[inline]
    pub fn as_match(&self) -> Match {
        Match {
            id: self.id,
            rotation: self.rotation,
            hamming: self.hamming,
        }
    }
}

const MIN_SIDE_PX: f32 = 12.0;
const THRESH_SUBDIV: usize = 3;

/// Read the bit grid inside `quad` (image-ordered TL, TR, BR, BL) and match it.
///
/// Returns `None` when the quad is too small, a sample falls outside the
/// image, the border is not black enough, or no dictionary code is close.
pub fn decode_quad(
    img: &GrayImageView<'_>,
    quad: &[Point2<f32>; 4],
    cfg: &DecodeConfig,
    matcher: &Matcher,
) -> Option<QuadDecode> {
    let bits = matcher.dictionary().marker_size;
    let side = mean_side(quad);
    let grid = SampleGrid::new(cfg, bits, side)?;
    let h = Homography::square_to_quad(side, quad)?;

    let mut samples = Vec::with_capacity(grid.points.len());
    for p in &grid.points {
        let q = h.apply(*p);
        samples.push(sample_mean_3x3(img, q.x, q.y)?);
    }

    let thr_samples: Vec<u8> = grid
        .threshold_points
        .iter()
        .filter_map(|p| {
            let q = h.apply(*p);
            sample_mean_3x3(img, q.x, q.y)
        })
        .collect();

    let obs = read_bits(&samples, &thr_samples, grid.cells, bits, cfg)?;
    let m = matcher.match_code(obs.code)?;

    let bit_count = matcher.dictionary().bit_count().max(1) as f32;
    let ham_pen = 1.0 - (m.hamming as f32 / bit_count);
    Some(QuadDecode {
        id: m.id,
        rotation: m.rotation,
        hamming: m.hamming,
        score: (obs.border_score * ham_pen).clamp(0.0, 1.0),
        border_score: obs.border_score,
        code: obs.code,
        inverted: obs.inverted,
    })
}

#[derive(Clone, Copy, Debug)]
struct BitObservation {
    code: u64,
    border_score: f32,
    inverted: bool,
}

/// Cell-centre sample points and a denser threshold grid in the
/// `[0, side]²` reference square.
struct SampleGrid {
    cells: usize,
    points: Vec<Point2<f32>>, // row-major: cy * cells + cx
    threshold_points: Vec<Point2<f32>>,
}

impl SampleGrid {
    fn new(cfg: &DecodeConfig, bits: usize, side: f32) -> Option<Self> {
        if bits * bits > 64 {
            return None;
        }
        let cells = bits + 2 * cfg.border_bits;
        if cells == 0 || !side.is_finite() {
            return None;
        }

        let inset = (cfg.inset_frac * side).max(0.0);
        let inner = side - 2.0 * inset;
        if inner < MIN_SIDE_PX {
            return None;
        }

        let points = centred_grid(inset, inner, cells);
        let threshold_points = centred_grid(inset, inner, cells * THRESH_SUBDIV);
        Some(Self {
            cells,
            points,
            threshold_points,
        })
    }
}

fn centred_grid(start: f32, side: f32, n: usize) -> Vec<Point2<f32>> {
    let step = side / n as f32;
    let mut points = Vec::with_capacity(n * n);
    for ty in 0..n {
        for tx in 0..n {
            points.push(Point2::new(
                start + (tx as f32 + 0.5) * step,
                start + (ty as f32 + 0.5) * step,
            ));
        }
    }
    points
}

fn read_bits(
    samples: &[u8],
    thr_samples: &[u8],
    cells: usize,
    bits: usize,
    cfg: &DecodeConfig,
) -> Option<BitObservation> {
    if samples.len() != cells * cells {
        return None;
    }

    // a quad of one uniform shade carries no bits
    let thr = if thr_samples.is_empty() {
        otsu_threshold_from_samples(samples)?
    } else {
        otsu_threshold_from_samples(thr_samples)?
    };

    let border = cfg.border_bits;
    let use_border = border > 0;
    let polarities: &[bool] = if cfg.allow_inverted {
        &[false, true]
    } else {
        &[false]
    };

    let mut best: Option<BitObservation> = None;
    for &inverted in polarities {
        let mut border_ok = 0u32;
        let mut border_total = 0u32;
        let mut code = 0u64;

        for cy in 0..cells {
            for cx in 0..cells {
                let is_black = (samples[cy * cells + cx] <= thr) != inverted;
                let on_border = cx < border
                    || cy < border
                    || cx + border >= cells
                    || cy + border >= cells;
                if use_border && on_border {
                    border_total += 1;
                    if is_black {
                        border_ok += 1;
                    }
                } else if is_black {
                    code |= 1u64 << ((cy - border) * bits + (cx - border));
                }
            }
        }

        let border_score = if use_border {
            border_ok as f32 / border_total.max(1) as f32
        } else {
            1.0
        };
        if border_score < cfg.min_border_score {
            continue;
        }
        if best.is_none_or(|b| border_score > b.border_score) {
            best = Some(BitObservation {
                code,
                border_score,
                inverted,
            });
        }
    }

    best
}

fn mean_side(quad: &[Point2<f32>; 4]) -> f32 {
    (0..4)
        .map(|i| distance(quad[i], quad[(i + 1) % 4]))
        .sum::<f32>()
        / 4.0
}

fn sample_mean_3x3(img: &GrayImageView<'_>, x: f32, y: f32) -> Option<u8> {
    if !x.is_finite() || !y.is_finite() {
        return None;
    }
    let ix = x.round() as i32;
    let iy = y.round() as i32;
    if ix < 1 || iy < 1 || ix + 1 >= img.width as i32 || iy + 1 >= img.height as i32 {
        return None;
    }

    let mut sum = 0u32;
    for dy in -1..=1 {
        for dx in -1..=1 {
            sum += img.get_or_black(ix + dx, iy + dy) as u32;
        }
    }
    Some((sum / 9) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{builtins, draw_marker};
    use crux_core::GrayImage;

    fn marker_on_canvas(id: u32, side: usize, pad: usize) -> GrayImage {
        let marker = draw_marker(&builtins::DICT_4X4_50, id, side, 1).expect("draw");
        let mut canvas = GrayImage::filled(side + 2 * pad, side + 2 * pad, 255);
        canvas.blit(&marker.view(), pad, pad);
        canvas
    }

    fn quad(x0: f32, y0: f32, side: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(x0, y0),
            Point2::new(x0 + side, y0),
            Point2::new(x0 + side, y0 + side),
            Point2::new(x0, y0 + side),
        ]
    }

    #[test]
    fn decodes_axis_aligned_marker() {
        let img = marker_on_canvas(12, 120, 20);
        let matcher = Matcher::for_dictionary(builtins::DICT_4X4_50);
        let det = decode_quad(
            &img.view(),
            &quad(20.0, 20.0, 119.0),
            &DecodeConfig::default(),
            &matcher,
        )
        .expect("decode");
        assert_eq!(det.id, 12);
        assert_eq!(det.rotation, 0);
        assert_eq!(det.hamming, 0);
        assert!(det.border_score > 0.99);
    }

    #[test]
    fn rotated_corner_order_reports_rotation() {
        let img = marker_on_canvas(5, 120, 20);
        let matcher = Matcher::for_dictionary(builtins::DICT_4X4_50);
        let mut q = quad(20.0, 20.0, 119.0);
        // start reading from the marker's top-right corner
        q.rotate_left(1);
        let det = decode_quad(&img.view(), &q, &DecodeConfig::default(), &matcher)
            .expect("decode");
        assert_eq!(det.id, 5);
        assert_ne!(det.rotation, 0);
    }

    #[test]
    fn blank_quad_is_rejected() {
        let img = GrayImage::filled(100, 100, 255);
        let matcher = Matcher::for_dictionary(builtins::DICT_4X4_50);
        let res = decode_quad(
            &img.view(),
            &quad(10.0, 10.0, 60.0),
            &DecodeConfig::default(),
            &matcher,
        );
        assert!(res.is_none());
    }

    #[test]
    fn tiny_quad_is_rejected() {
        let img = marker_on_canvas(0, 120, 20);
        let matcher = Matcher::for_dictionary(builtins::DICT_4X4_50);
        let res = decode_quad(
            &img.view(),
            &quad(20.0, 20.0, 8.0),
            &DecodeConfig::default(),
            &matcher,
        );
        assert!(res.is_none());
    }
}
