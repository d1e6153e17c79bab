//! Geometry kernel: segment intersection, containment and distances.
//!
//! All predicates use exact floating-point comparisons. Segments that share
//! an endpoint are treated as non-intersecting so that routes can pass
//! through obstacle vertices and run along obstacle edges.

use crate::models::{Point, Polygon};

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Straight line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Point,
    pub b: Point,
}

impl Segment {
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn midpoint(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2.0, (self.a.y + self.b.y) / 2.0)
    }
}

/// Planar Euclidean distance. Used for every edge weight and heuristic.
pub fn distance(p: Point, q: Point) -> f64 {
    let dx = p.x - q.x;
    let dy = p.y - q.y;
    (dx * dx + dy * dy).sqrt()
}

/// Great-circle distance in meters between two `(lon, lat)` points.
pub fn haversine_distance(p: Point, q: Point) -> f64 {
    let phi1 = p.y.to_radians();
    let phi2 = q.y.to_radians();
    let dphi = (q.y - p.y).to_radians();
    let dlambda = (q.x - p.x).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Sum of Haversine leg lengths along a path, in meters.
pub fn path_length_meters(path: &[Point]) -> f64 {
    path.windows(2).map(|w| haversine_distance(w[0], w[1])).sum()
}

/// Sum of planar leg lengths along a path.
pub fn path_length(path: &[Point]) -> f64 {
    path.windows(2).map(|w| distance(w[0], w[1])).sum()
}

/// True when the point could be a `(lon, lat)` pair in degrees.
pub fn looks_geographic(p: Point) -> bool {
    (-180.0..=180.0).contains(&p.x) && (-90.0..=90.0).contains(&p.y)
}

/// Signed orientation of `r` relative to the directed line `p -> q`.
fn orient(p: Point, q: Point, r: Point) -> f64 {
    (r.x - p.x) * (q.y - p.y) - (q.x - p.x) * (r.y - p.y)
}

/// `r` lies within the bounding box of segment `p q`.
fn on_segment(p: Point, q: Point, r: Point) -> bool {
    r.x <= p.x.max(q.x) && r.x >= p.x.min(q.x) && r.y <= p.y.max(q.y) && r.y >= p.y.min(q.y)
}

/// Orientation test between two segments, including collinear overlap.
///
/// Identical or reversed segments, and segments sharing an endpoint, never
/// intersect.
pub fn segments_intersect(s1: Segment, s2: Segment) -> bool {
    let (p1, p2) = (s1.a, s1.b);
    let (p3, p4) = (s2.a, s2.b);

    if p1 == p3 || p1 == p4 || p2 == p3 || p2 == p4 {
        return false;
    }

    let d1 = orient(p3, p4, p1);
    let d2 = orient(p3, p4, p2);
    let d3 = orient(p1, p2, p3);
    let d4 = orient(p1, p2, p4);

    let s2_straddles = (d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0);
    let s1_straddles = (d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0);
    if s1_straddles && s2_straddles {
        return true;
    }

    (d1 == 0.0 && on_segment(p3, p4, p1))
        || (d2 == 0.0 && on_segment(p3, p4, p2))
        || (d3 == 0.0 && on_segment(p1, p2, p3))
        || (d4 == 0.0 && on_segment(p1, p2, p4))
}

/// Ray-casting containment with a half-open edge rule.
///
/// An edge is counted only when its endpoints straddle the point's Y (one
/// strictly above, the other at or below), and only when it lies on the
/// counting side as decided by the edge direction. Points on the lower or
/// left boundary therefore report inside, points on the upper or right
/// boundary outside. Degenerate polygons are always outside.
pub fn point_in_polygon(point: Point, polygon: &Polygon) -> bool {
    if polygon.is_degenerate() {
        return false;
    }

    let mut crossings = 0usize;
    for (v1, v2) in polygon.edges() {
        if (v1.y > point.y) == (v2.y > point.y) {
            continue;
        }
        let side = (point.x - v1.x) * (v2.y - v1.y) - (v2.x - v1.x) * (point.y - v1.y);
        let counts = if v2.y > v1.y { side > 0.0 } else { side < 0.0 };
        if counts {
            crossings += 1;
        }
    }
    crossings % 2 == 1
}

/// True if `segment` intersects any edge of `polygon`.
pub fn segment_intersects_polygon(segment: Segment, polygon: &Polygon) -> bool {
    polygon
        .edges()
        .any(|(a, b)| segments_intersect(segment, Segment::new(a, b)))
}

/// Line-of-sight test for one segment against one polygon.
///
/// Blocked when the segment crosses an edge, when either endpoint is inside,
/// or when the midpoint is inside. The midpoint probe catches segments that
/// sit wholly inside the polygon without touching its boundary. It is not a
/// full interior test: a segment whose interior dips into a concave polygon
/// only at points that none of the three checks visit passes as clear.
pub fn segment_clear_of_polygon(segment: Segment, polygon: &Polygon) -> bool {
    if segment_intersects_polygon(segment, polygon) {
        return false;
    }
    if point_in_polygon(segment.a, polygon) || point_in_polygon(segment.b, polygon) {
        return false;
    }
    !point_in_polygon(segment.midpoint(), polygon)
}

/// Line-of-sight test for `p1 -> p2` against every obstacle.
pub fn is_path_clear<'a, I>(p1: Point, p2: Point, obstacles: I) -> bool
where
    I: IntoIterator<Item = &'a Polygon>,
{
    let segment = Segment::new(p1, p2);
    obstacles
        .into_iter()
        .all(|polygon| segment_clear_of_polygon(segment, polygon))
}

/// True if `point` lies inside any obstacle.
pub fn inside_any<'a, I>(point: Point, obstacles: I) -> bool
where
    I: IntoIterator<Item = &'a Polygon>,
{
    obstacles
        .into_iter()
        .any(|polygon| point_in_polygon(point, polygon))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn square() -> Polygon {
        Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
    }

    #[test]
    fn crossing_segments_intersect() {
        let s1 = Segment::new(p(0.0, 0.0), p(10.0, 10.0));
        let s2 = Segment::new(p(0.0, 10.0), p(10.0, 0.0));
        assert!(segments_intersect(s1, s2));
    }

    #[test]
    fn shared_endpoint_is_not_an_intersection() {
        let s1 = Segment::new(p(0.0, 0.0), p(5.0, 5.0));
        let s2 = Segment::new(p(5.0, 5.0), p(10.0, 0.0));
        assert!(!segments_intersect(s1, s2));
        assert!(!segments_intersect(s1, s1));
        assert!(!segments_intersect(s1, Segment::new(s1.b, s1.a)));
    }

    #[test]
    fn collinear_overlap_intersects() {
        let s1 = Segment::new(p(0.0, 0.0), p(10.0, 0.0));
        let s2 = Segment::new(p(5.0, 0.0), p(15.0, 0.0));
        assert!(segments_intersect(s1, s2));

        let disjoint = Segment::new(p(11.0, 0.0), p(15.0, 0.0));
        assert!(!segments_intersect(s1, disjoint));
    }

    #[test]
    fn touching_at_interior_point_intersects() {
        let s1 = Segment::new(p(0.0, 0.0), p(10.0, 0.0));
        let s2 = Segment::new(p(5.0, 0.0), p(5.0, 5.0));
        assert!(segments_intersect(s1, s2));
    }

    #[test]
    fn point_in_polygon_basic() {
        let sq = square();
        assert!(point_in_polygon(p(5.0, 5.0), &sq));
        assert!(!point_in_polygon(p(15.0, 5.0), &sq));
        assert!(!point_in_polygon(p(-1.0, 5.0), &sq));
    }

    #[test]
    fn point_in_polygon_half_open_boundary() {
        let sq = square();
        // Lower boundary counts as inside, upper boundary as outside.
        assert!(point_in_polygon(p(5.0, 0.0), &sq));
        assert!(!point_in_polygon(p(5.0, 10.0), &sq));
    }

    #[test]
    fn degenerate_polygon_is_always_outside() {
        let line = Polygon::from_coords(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!(!point_in_polygon(p(5.0, 5.0), &line));
        assert!(!point_in_polygon(p(0.0, 0.0), &Polygon::default()));
    }

    #[test]
    fn explicit_closure_does_not_change_containment() {
        let mut closed = square();
        closed.vertices.push(p(0.0, 0.0));
        assert!(point_in_polygon(p(5.0, 5.0), &closed));
        assert!(!point_in_polygon(p(15.0, 5.0), &closed));
    }

    #[test]
    fn path_through_square_is_blocked() {
        let zones = [square()];
        assert!(!is_path_clear(p(-5.0, 5.0), p(15.0, 5.0), &zones));
        assert!(is_path_clear(p(-5.0, 15.0), p(15.0, 15.0), &zones));
    }

    #[test]
    fn inside_endpoint_is_blocked() {
        let zones = [square()];
        assert!(!is_path_clear(p(5.0, 5.0), p(-20.0, -20.0), &zones));
        assert!(!is_path_clear(p(-20.0, 40.0), p(3.0, 7.0), &zones));
    }

    #[test]
    fn midpoint_probe_blocks_enclosed_chord() {
        // Both endpoints are vertices, so no edge test and no endpoint test
        // fires; only the midpoint probe sees the diagonal is inside.
        let zones = [square()];
        assert!(!is_path_clear(p(0.0, 0.0), p(10.0, 10.0), &zones));
    }

    #[test]
    fn path_along_upper_edge_is_clear() {
        let zones = [square()];
        assert!(is_path_clear(p(0.0, 10.0), p(10.0, 10.0), &zones));
    }

    #[test]
    fn haversine_known_distance() {
        // ~111km between these points (1 degree latitude)
        let dist = haversine_distance(p(0.0, 0.0), p(0.0, 1.0));
        assert!((dist - 111_194.0).abs() < 100.0);
    }

    #[test]
    fn haversine_same_point() {
        let here = p(-117.8265, 33.6846);
        assert!(haversine_distance(here, here) < 0.001);
    }

    #[test]
    fn geographic_heuristic() {
        assert!(looks_geographic(p(4.9, 52.3)));
        assert!(!looks_geographic(p(120_000.0, 487_000.0)));
    }
}
