//! Distance helpers for hit-testing stroke paths.

use kurbo::Point;

/// Distance from a point to a line segment (a→b).
///
/// Degenerate (zero-length) segments collapse to point distance.
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline.
///
/// A single-point polyline is treated as a dot.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => {
            let dx = point.x - only.x;
            let dy = point.y - only.y;
            (dx * dx + dy * dy).sqrt()
        }
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_dist() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((point_to_segment_dist(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-12);
        // Beyond the endpoint, distance is to the endpoint itself
        assert!((point_to_segment_dist(Point::new(14.0, 3.0), a, b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_length_segment() {
        let p = Point::new(3.0, 4.0);
        let o = Point::new(0.0, 0.0);
        assert!((point_to_segment_dist(p, o, o) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_dist_single_point() {
        let d = point_to_polyline_dist(Point::new(0.0, 2.0), &[Point::new(0.0, 0.0)]);
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_polyline_dist_empty() {
        assert!(point_to_polyline_dist(Point::ZERO, &[]).is_infinite());
    }
}
