//! Dark square-candidate extraction.
//!
//! Pixels darker than their local mean are grouped into 4-connected
//! components, and each component is reduced to the quad spanned by its four
//! extreme points. A marker shows up as the band along its black border, so
//! uneven lighting across the photo does not merge it with the background.
//! Candidates come out in raster order of the first pixel of their component.

use std::collections::VecDeque;

use crux_core::{is_simple_quad, polygon_perimeter, GrayImageView};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::threshold::local_mean_dark_mask;

/// Geometric filters applied to every dark component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateParams {
    /// Radius of the local-mean window as a fraction of `max(width, height)`.
    pub threshold_window_rate: f32,
    /// How far below its local mean a pixel must be to count as dark.
    pub threshold_offset: u8,
    /// Minimum quad perimeter as a fraction of `max(width, height)`.
    pub min_perimeter_rate: f32,
    /// Maximum quad perimeter as a fraction of `max(width, height)`.
    pub max_perimeter_rate: f32,
    /// Components touching this many pixels from the image edge are dropped.
    pub min_distance_to_border: usize,
    /// Shortest quad side as a fraction of the perimeter.
    pub min_corner_distance_rate: f32,
    /// Minimum ratio of dark pixels to quad area.
    pub min_fill_ratio: f32,
}

impl Default for CandidateParams {
    fn default() -> Self {
        Self {
            threshold_window_rate: 0.05,
            threshold_offset: 7,
            min_perimeter_rate: 0.03,
            max_perimeter_rate: 4.0,
            min_distance_to_border: 3,
            min_corner_distance_rate: 0.05,
            min_fill_ratio: 0.25,
        }
    }
}

/// A dark convex quad that may contain a marker.
#[derive(Clone, Debug, PartialEq)]
pub struct QuadCandidate {
    /// Image-ordered corners: top-left, top-right, bottom-right, bottom-left.
    pub corners: [Point2<f32>; 4],
    pub perimeter: f32,
    pub pixel_count: usize,
}

/// Find dark quads in `img`.
///
/// A constant image has no dark pixels and yields no candidates.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(level = "debug", skip(img, params), fields(width = img.width, height = img.height))
)]
pub fn find_square_candidates(
    img: &GrayImageView<'_>,
    params: &CandidateParams,
) -> Vec<QuadCandidate> {
    let (w, h) = (img.width, img.height);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let longest = w.max(h) as f32;
    let radius = ((params.threshold_window_rate * longest).round() as u32).max(2);
    let mask = local_mean_dark_mask(img, radius, params.threshold_offset);
    let min_perimeter = params.min_perimeter_rate * longest;
    let max_perimeter = params.max_perimeter_rate * longest;
    let margin = params.min_distance_to_border;

    let dark = |idx: usize| mask[idx];
    let mut visited = vec![false; w * h];
    let mut queue = VecDeque::new();
    let mut pixels: Vec<(usize, usize)> = Vec::new();
    let mut out = Vec::new();
    let mut components = 0usize;

    for y0 in 0..h {
        for x0 in 0..w {
            let idx0 = y0 * w + x0;
            if visited[idx0] || !dark(idx0) {
                continue;
            }
            components += 1;
            visited[idx0] = true;
            queue.push_back((x0, y0));
            pixels.clear();

            let (mut min_x, mut min_y, mut max_x, mut max_y) = (x0, y0, x0, y0);
            while let Some((x, y)) = queue.pop_front() {
                pixels.push((x, y));
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);

                let neighbours = [
                    (x.wrapping_sub(1), y),
                    (x + 1, y),
                    (x, y.wrapping_sub(1)),
                    (x, y + 1),
                ];
                for (nx, ny) in neighbours {
                    if nx >= w || ny >= h {
                        continue;
                    }
                    let nidx = ny * w + nx;
                    if visited[nidx] || !dark(nidx) {
                        continue;
                    }
                    visited[nidx] = true;
                    queue.push_back((nx, ny));
                }
            }

            if min_x < margin || min_y < margin || max_x + margin >= w || max_y + margin >= h {
                continue;
            }
            // cheap reject before corner extraction
            let bbox_perimeter = 2.0 * ((max_x - min_x + 1) + (max_y - min_y + 1)) as f32;
            if bbox_perimeter < min_perimeter {
                continue;
            }

            let Some(corners) = extreme_corners(&pixels) else {
                continue;
            };
            if let Some(cand) = accept_quad(corners, pixels.len(), params, min_perimeter, max_perimeter)
            {
                out.push(cand);
            }
        }
    }

    log::debug!(
        "window radius {radius}: {components} dark components, {} square candidates",
        out.len()
    );
    out
}

fn accept_quad(
    corners: [Point2<f32>; 4],
    pixel_count: usize,
    params: &CandidateParams,
    min_perimeter: f32,
    max_perimeter: f32,
) -> Option<QuadCandidate> {
    if !is_simple_quad(&corners) || !is_convex(&corners) {
        return None;
    }
    let perimeter = polygon_perimeter(&corners);
    if perimeter < min_perimeter || perimeter > max_perimeter {
        return None;
    }
    let min_side = (0..4)
        .map(|i| (corners[(i + 1) % 4] - corners[i]).norm())
        .fold(f32::INFINITY, f32::min);
    if min_side < params.min_corner_distance_rate * perimeter {
        return None;
    }
    let area = quad_area(&corners);
    if area <= 0.0 || (pixel_count as f32) < params.min_fill_ratio * area {
        return None;
    }
    Some(QuadCandidate {
        corners,
        perimeter,
        pixel_count,
    })
}

/// Four corners of a blob: the pixel farthest from the centroid, the pixel
/// farthest from that one, and the farthest pixel on each side of the
/// diagonal they span. Returned as TL, TR, BR, BL.
fn extreme_corners(pixels: &[(usize, usize)]) -> Option<[Point2<f32>; 4]> {
    if pixels.len() < 4 {
        return None;
    }
    let n = pixels.len() as f32;
    let (sx, sy) = pixels
        .iter()
        .fold((0f32, 0f32), |(ax, ay), &(x, y)| (ax + x as f32, ay + y as f32));
    let centroid = Point2::new(sx / n, sy / n);
    let pts = pixels.iter().map(|&(x, y)| Point2::new(x as f32, y as f32));

    let a = farthest_by(pts.clone(), |p| (p - centroid).norm_squared())?;
    let c = farthest_by(pts.clone(), |p| (p - a).norm_squared())?;
    let diag = c - a;
    let side = |p: Point2<f32>| diag.x * (p.y - a.y) - diag.y * (p.x - a.x);
    let b = farthest_by(pts.clone(), side)?;
    let d = farthest_by(pts, |p| -side(p))?;
    if side(b) <= 0.0 || side(d) >= 0.0 {
        return None;
    }

    let mut quad = [a, b, c, d];
    quad.sort_by(|p, q| {
        let ap = (p.y - centroid.y).atan2(p.x - centroid.x);
        let aq = (q.y - centroid.y).atan2(q.x - centroid.x);
        ap.total_cmp(&aq)
    });
    let start = (0..4)
        .min_by(|&i, &j| (quad[i].x + quad[i].y).total_cmp(&(quad[j].x + quad[j].y)))
        .unwrap_or(0);
    quad.rotate_left(start);
    Some(quad)
}

/// First point maximizing `key`.
fn farthest_by<I, F>(pts: I, key: F) -> Option<Point2<f32>>
where
    I: Iterator<Item = Point2<f32>>,
    F: Fn(Point2<f32>) -> f32,
{
    let mut best: Option<(Point2<f32>, f32)> = None;
    for p in pts {
        let k = key(p);
        if best.is_none_or(|(_, bk)| k > bk) {
            best = Some((p, k));
        }
    }
    best.map(|(p, _)| p)
}

fn quad_area(q: &[Point2<f32>; 4]) -> f32 {
    let mut acc = 0.0;
    for i in 0..4 {
        let (p, n) = (q[i], q[(i + 1) % 4]);
        acc += p.x * n.y - n.x * p.y;
    }
    0.5 * acc.abs()
}

fn is_convex(q: &[Point2<f32>; 4]) -> bool {
    let mut sign = 0f32;
    for i in 0..4 {
        let (p0, p1, p2) = (q[i], q[(i + 1) % 4], q[(i + 2) % 4]);
        let cross = (p1 - p0).perp(&(p2 - p1));
        if cross == 0.0 {
            return false;
        }
        if sign == 0.0 {
            sign = cross.signum();
        } else if cross.signum() != sign {
            return false;
        }
    }
    true
}
