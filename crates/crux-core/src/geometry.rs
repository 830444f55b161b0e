//! Planar helpers on pixel-space points.

use nalgebra::Point2;

#[inline]
pub fn distance(a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a - b).norm()
}

/// Arc length of the closed polygon through `pts` (last point joins the first).
pub fn polygon_perimeter(pts: &[Point2<f32>]) -> f32 {
    if pts.len() < 2 {
        return 0.0;
    }
    pts.iter()
        .zip(pts.iter().cycle().skip(1))
        .map(|(&a, &b)| distance(a, b))
        .sum()
}

/// Arithmetic mean of the points, `None` for an empty iterator.
pub fn mean_point<I>(pts: I) -> Option<Point2<f32>>
where
    I: IntoIterator<Item = Point2<f32>>,
{
    let mut n = 0usize;
    let mut sx = 0f64;
    let mut sy = 0f64;
    for p in pts {
        sx += p.x as f64;
        sy += p.y as f64;
        n += 1;
    }
    (n > 0).then(|| Point2::new((sx / n as f64) as f32, (sy / n as f64) as f32))
}

#[inline]
fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn segments_cross(p1: Point2<f32>, p2: Point2<f32>, q1: Point2<f32>, q2: Point2<f32>) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);
    (d1 > 0.0) != (d2 > 0.0) && (d3 > 0.0) != (d4 > 0.0) && d1 != 0.0 && d3 != 0.0
}

/// True when the quad `[a, b, c, d]` has non-zero area and its opposite edges
/// do not intersect.
pub fn is_simple_quad(q: &[Point2<f32>; 4]) -> bool {
    if q.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return false;
    }
    let twice_area = cross(q[0], q[1], q[2]) + cross(q[0], q[2], q[3]);
    if twice_area.abs() < 1e-6 {
        return false;
    }
    !segments_cross(q[0], q[1], q[2], q[3]) && !segments_cross(q[1], q[2], q[3], q[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(s: f32) -> [Point2<f32>; 4] {
        [
            Point2::new(0.0, 0.0),
            Point2::new(s, 0.0),
            Point2::new(s, s),
            Point2::new(0.0, s),
        ]
    }

    #[test]
    fn perimeter_of_square() {
        assert_relative_eq!(polygon_perimeter(&square(10.0)), 40.0);
        assert_eq!(polygon_perimeter(&[Point2::new(1.0, 1.0)]), 0.0);
    }

    #[test]
    fn mean_of_points() {
        let m = mean_point(square(10.0)).expect("mean");
        assert_relative_eq!(m.x, 5.0);
        assert_relative_eq!(m.y, 5.0);
        assert!(mean_point(std::iter::empty()).is_none());
    }

    #[test]
    fn simple_quad_detection() {
        assert!(is_simple_quad(&square(10.0)));

        let bow_tie = [
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 10.0),
        ];
        assert!(!is_simple_quad(&bow_tie));

        let collapsed = [Point2::new(3.0, 3.0); 4];
        assert!(!is_simple_quad(&collapsed));
    }
}
