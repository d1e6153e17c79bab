//! Douglas-Peucker polygon simplification and tolerance selection.

use crate::geometry::looks_geographic;
use crate::models::{total_vertices, Point, Polygon};

/// First and last vertex closer than this on both axes means the polygon
/// repeats its first vertex as an explicit closure.
pub const CLOSURE_TOLERANCE: f64 = 1e-9;

/// Base tolerance for geographic coordinates: 0.00002 degrees, about 2.2 m.
pub const GEOGRAPHIC_BASE_EPSILON: f64 = 0.00002;

/// Vertex-count thresholds, paired with the geographic multiplier and the
/// planar tolerance that apply above each threshold. Checked top-down.
const EPSILON_STEPS: [(usize, f64, f64); 7] = [
    (50_000, 10.0, 20.0),
    (30_000, 7.0, 15.0),
    (20_000, 5.0, 10.0),
    (10_000, 4.0, 7.0),
    (5_000, 3.0, 5.0),
    (2_000, 2.0, 3.0),
    (1_000, 1.5, 2.0),
];

/// Perpendicular distance from `point` to the infinite line through
/// `line_start` and `line_end`. Falls back to the distance from `line_start`
/// when the two line points coincide.
pub fn perpendicular_distance(point: Point, line_start: Point, line_end: Point) -> f64 {
    let mut dx = line_end.x - line_start.x;
    let mut dy = line_end.y - line_start.y;

    let mag = (dx * dx + dy * dy).sqrt();
    if mag > 0.0 {
        dx /= mag;
        dy /= mag;
    }

    let pvx = point.x - line_start.x;
    let pvy = point.y - line_start.y;
    let pvdot = dx * pvx + dy * pvy;

    let ax = pvx - pvdot * dx;
    let ay = pvy - pvdot * dy;
    (ax * ax + ay * ay).sqrt()
}

/// Douglas-Peucker over an open chain. The first and last points are always
/// kept. Runs on an explicit work stack, so chain length is not bounded by
/// recursion depth.
pub fn douglas_peucker(points: &[Point], epsilon: f64) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[last] = true;

    let mut stack = vec![(0usize, last)];
    while let Some((first, end)) = stack.pop() {
        if end <= first + 1 {
            continue;
        }

        let mut dmax = 0.0;
        let mut index = first;
        for (i, point) in points.iter().enumerate().take(end).skip(first + 1) {
            let d = perpendicular_distance(*point, points[first], points[end]);
            if d > dmax {
                index = i;
                dmax = d;
            }
        }

        if dmax > epsilon {
            keep[index] = true;
            stack.push((index, end));
            stack.push((first, index));
        }
    }

    points
        .iter()
        .zip(keep)
        .filter_map(|(point, kept)| kept.then_some(*point))
        .collect()
}

/// Simplify one polygon at tolerance `epsilon`.
///
/// The ring is simplified as a chain that starts and ends at the first
/// vertex, so the first vertex always survives. An explicit closing vertex is
/// stripped beforehand and restored afterwards. If fewer than three distinct
/// vertices would remain, the original polygon is returned untouched.
pub fn simplify_polygon(polygon: &Polygon, epsilon: f64) -> Polygon {
    if polygon.len() <= 3 || !epsilon.is_finite() || epsilon < 0.0 {
        return polygon.clone();
    }

    let closed = polygon.is_explicitly_closed(CLOSURE_TOLERANCE);
    let ring = if closed {
        &polygon.vertices[..polygon.len() - 1]
    } else {
        &polygon.vertices[..]
    };
    if ring.len() < 3 {
        return polygon.clone();
    }

    let mut chain = Vec::with_capacity(ring.len() + 1);
    chain.extend_from_slice(ring);
    chain.push(ring[0]);

    let mut simplified = douglas_peucker(&chain, epsilon);
    simplified.pop();
    if simplified.len() < 3 {
        return polygon.clone();
    }
    if closed {
        simplified.push(simplified[0]);
    }
    Polygon::new(simplified)
}

pub fn simplify_polygons(polygons: &[Polygon], epsilon: f64) -> Vec<Polygon> {
    polygons
        .iter()
        .map(|polygon| simplify_polygon(polygon, epsilon))
        .collect()
}

/// Suggest a tolerance from the coordinate system and the current vertex
/// count. Coarser tolerances kick in as the obstacle set grows.
pub fn estimate_epsilon(polygons: &[Polygon], vertex_count: usize) -> f64 {
    let Some(sample) = polygons.iter().find_map(|polygon| polygon.vertices.first()) else {
        return 0.0001;
    };

    let step = EPSILON_STEPS
        .iter()
        .find(|(threshold, _, _)| vertex_count > *threshold);

    if looks_geographic(*sample) {
        let multiplier = step.map_or(1.0, |(_, geo, _)| *geo);
        GEOGRAPHIC_BASE_EPSILON * multiplier
    } else {
        step.map_or(1.0, |(_, _, planar)| *planar)
    }
}

/// Where a query's simplification tolerance comes from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EpsilonPolicy {
    /// Caller-supplied tolerance.
    Explicit(f64),
    /// Derived from the candidate set with [`estimate_epsilon`].
    Estimated,
    /// No simplification.
    Disabled,
}

impl EpsilonPolicy {
    /// A positive requested value wins; otherwise estimate when `auto` is set.
    pub fn from_request(requested: Option<f64>, auto: bool) -> Self {
        match requested {
            Some(eps) if eps.is_finite() && eps > 0.0 => Self::Explicit(eps),
            _ if auto => Self::Estimated,
            _ => Self::Disabled,
        }
    }

    pub fn resolve(&self, polygons: &[Polygon]) -> Option<f64> {
        match *self {
            Self::Explicit(eps) => Some(eps),
            Self::Estimated => Some(estimate_epsilon(polygons, total_vertices(polygons))),
            Self::Disabled => None,
        }
    }
}
