//! Freehand ink stroke, the atomic unit of annotation and replication.

use crate::color::Color;
use crate::geometry::point_to_polyline_dist;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Identity of the peer that created a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl PeerId {
    /// Generate a fresh peer identity for this session.
    pub fn random() -> Self {
        let (hi, _) = Uuid::new_v4().as_u64_pair();
        Self(hi)
    }
}

/// Globally unique stroke identity: creating peer plus a per-peer counter.
///
/// Carried through replication so a remote delete removes exactly the stroke
/// it names, even when two peers draw value-identical strokes concurrently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeId {
    pub peer: PeerId,
    pub seq: u64,
}

/// Allocates stroke identities for one peer.
///
/// Cloneable; clones share the counter, so every controller in a process
/// draws from the same sequence.
#[derive(Debug, Clone)]
pub struct StrokeIdGen {
    peer: PeerId,
    next: Arc<AtomicU64>,
}

impl StrokeIdGen {
    pub fn new(peer: PeerId) -> Self {
        Self {
            peer,
            next: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn peer(&self) -> PeerId {
        self.peer
    }

    pub fn next_id(&self) -> StrokeId {
        StrokeId {
            peer: self.peer,
            seq: self.next.fetch_add(1, Ordering::Relaxed),
        }
    }
}

/// A committed freehand stroke.
///
/// Coordinates are in page space, so the same stroke renders identically at
/// every zoom level. Immutable once constructed: edits are modeled as
/// delete + add, which keeps concurrent replication conflict-free. The wire
/// form is the serde form of this struct; page/layer addressing travels in
/// the event envelope, not here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    id: StrokeId,
    color: Color,
    width: f64,
    points: Vec<Point>,
}

impl Stroke {
    /// Build a committed stroke. `points` must hold at least one coordinate
    /// and `width` must be positive; tools guarantee both at gesture end.
    pub fn new(id: StrokeId, color: Color, width: f64, points: Vec<Point>) -> Self {
        debug_assert!(!points.is_empty());
        debug_assert!(width > 0.0);
        Self {
            id,
            color,
            width,
            points,
        }
    }

    pub fn id(&self) -> StrokeId {
        self.id
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Whether the wire form decoded into something drawable.
    pub fn is_well_formed(&self) -> bool {
        !self.points.is_empty() && self.width > 0.0 && self.width.is_finite()
    }

    /// Page-space bounding box of the path (ink width not included).
    ///
    /// Deterministic and independent of any render target. A single-point
    /// stroke yields a zero-area rect at that point.
    pub fn bounds(&self) -> Rect {
        let mut min_x = f64::MAX;
        let mut min_y = f64::MAX;
        let mut max_x = f64::MIN;
        let mut max_y = f64::MIN;
        for point in &self.points {
            min_x = min_x.min(point.x);
            min_y = min_y.min(point.y);
            max_x = max_x.max(point.x);
            max_y = max_y.max(point.y);
        }
        Rect::new(min_x, min_y, max_x, max_y)
    }

    /// Page-space bounding box of the painted ink (path inflated by half the
    /// pen width). Never empty for a well-formed stroke.
    pub fn ink_bounds(&self) -> Rect {
        self.bounds().inflate(self.width / 2.0, self.width / 2.0)
    }

    /// Check whether a page-space point lies on the stroke within `tolerance`.
    ///
    /// Tolerant of zero-length and single-point paths.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        point_to_polyline_dist(point, &self.points) <= tolerance + self.width / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_gen() -> StrokeIdGen {
        StrokeIdGen::new(PeerId(7))
    }

    fn stroke(points: Vec<Point>) -> Stroke {
        Stroke::new(test_gen().next_id(), Color::black(), 2.0, points)
    }

    #[test]
    fn test_id_gen_monotonic() {
        let ids = test_gen();
        let a = ids.next_id();
        let b = ids.next_id();
        assert_eq!(a.peer, b.peer);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_id_gen_clones_share_counter() {
        let ids = test_gen();
        let clone = ids.clone();
        let a = ids.next_id();
        let b = clone.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_bounds() {
        let s = stroke(vec![
            Point::new(10.0, 10.0),
            Point::new(20.0, 10.0),
            Point::new(20.0, 20.0),
        ]);
        assert_eq!(s.bounds(), Rect::new(10.0, 10.0, 20.0, 20.0));
    }

    #[test]
    fn test_single_point_ink_bounds_nonempty() {
        let s = stroke(vec![Point::new(5.0, 5.0)]);
        assert_eq!(s.bounds(), Rect::new(5.0, 5.0, 5.0, 5.0));
        assert!(s.ink_bounds().area() > 0.0);
    }

    #[test]
    fn test_hit_test_segment() {
        let s = stroke(vec![Point::new(0.0, 0.0), Point::new(100.0, 0.0)]);
        assert!(s.hit_test(Point::new(50.0, 0.0), 5.0));
        assert!(s.hit_test(Point::new(50.0, 5.5), 5.0)); // within tolerance + width/2
        assert!(!s.hit_test(Point::new(50.0, 20.0), 5.0));
    }

    #[test]
    fn test_hit_test_single_point() {
        let s = stroke(vec![Point::new(10.0, 10.0)]);
        assert!(s.hit_test(Point::new(12.0, 10.0), 3.0));
        assert!(!s.hit_test(Point::new(20.0, 10.0), 3.0));
    }

    #[test]
    fn test_wire_roundtrip() {
        let s = Stroke::new(
            test_gen().next_id(),
            Color::new(0, 0, 128, 255),
            1.5,
            vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)],
        );
        let json = serde_json::to_string(&s).unwrap();
        let back: Stroke = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
        assert_eq!(s.bounds(), back.bounds());
    }
}
