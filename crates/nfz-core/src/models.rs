//! Core data models for the route planner.
//!
//! Field names serialize in camelCase to match the wire shapes the planner
//! exchanges with its callers (`minX`, `connectionRadius`, ...).

use serde::{Deserialize, Serialize};

/// Planar coordinate. Depending on the deployment this is either a projected
/// planar unit or a geographic `(longitude, latitude)` pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// No-fly zone outline. Outer ring only; holes are not represented.
///
/// The edge set is every consecutive vertex pair plus the implicit closing
/// edge from the last vertex back to the first. Sources that repeat the first
/// vertex at the end are accepted as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Build a polygon from `(x, y)` tuples.
    pub fn from_coords(coords: &[(f64, f64)]) -> Self {
        Self {
            vertices: coords.iter().copied().map(Point::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Polygons with fewer than three vertices have no interior.
    pub fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3
    }

    /// Iterate over edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// True when the last vertex repeats the first within `tolerance`.
    pub fn is_explicitly_closed(&self, tolerance: f64) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) if self.vertices.len() > 1 => {
                (first.x - last.x).abs() < tolerance && (first.y - last.y).abs() < tolerance
            }
            _ => false,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.vertices)
    }
}

/// Total vertex count over a polygon set.
pub fn total_vertices(polygons: &[Polygon]) -> usize {
    polygons.iter().map(Polygon::len).sum()
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub const fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Smallest box enclosing `points`, or `None` for an empty slice.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first.x, first.y, first.x, first.y);
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p.x);
            bbox.min_y = bbox.min_y.min(p.y);
            bbox.max_x = bbox.max_x.max(p.x);
            bbox.max_y = bbox.max_y.max(p.y);
        }
        Some(bbox)
    }

    /// Finite corners with min <= max on both axes.
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// Closed-interval overlap test; touching boxes intersect.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    /// True if `other` lies entirely within `self`.
    pub fn contains_box(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }
}

/// Geographic sampling region for the roadmap, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl GeoBounds {
    /// Approximate bounding box of the Netherlands.
    pub const NETHERLANDS: GeoBounds = GeoBounds {
        min_lat: 50.75,
        max_lat: 53.55,
        min_lon: 3.36,
        max_lon: 7.23,
    };

    pub fn is_valid(&self) -> bool {
        self.as_bbox().is_valid()
    }

    /// Planar view of the region (x = longitude, y = latitude).
    pub fn as_bbox(&self) -> BoundingBox {
        BoundingBox::new(self.min_lon, self.min_lat, self.max_lon, self.max_lat)
    }
}

impl Default for GeoBounds {
    fn default() -> Self {
        Self::NETHERLANDS
    }
}

// ========== ROUTE QUERIES ==========

/// Graph construction strategy for a route query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStrategy {
    /// Build a visibility graph over the obstacles near the route.
    #[default]
    Visibility,
    /// Search the precomputed probabilistic roadmap.
    Roadmap,
}

/// Route query input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    pub start: Point,
    pub end: Point,
    /// Additive margin around the start/end box. Zero or absent means default.
    #[serde(default)]
    pub margin: Option<f64>,
    /// Multiplicative inflation of the start/end box. Zero or absent means default.
    #[serde(default)]
    pub expansion_factor: Option<f64>,
    /// Explicit query rectangle; overrides margin and expansion factor.
    #[serde(default, rename = "customBBox")]
    pub custom_bbox: Option<BoundingBox>,
    /// Douglas-Peucker tolerance in coordinate units (degrees for
    /// geographic input, not meters). Used when present and positive.
    #[serde(default)]
    pub simplification_epsilon: Option<f64>,
    #[serde(default)]
    pub strategy: RouteStrategy,
}

/// Route query output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResponse {
    pub path: Vec<Point>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polygons_queried: Option<usize>,
    #[serde(
        default,
        rename = "verticesBeforeSimplification",
        skip_serializing_if = "Option::is_none"
    )]
    pub vertices_before: Option<usize>,
    #[serde(
        default,
        rename = "verticesAfterSimplification",
        skip_serializing_if = "Option::is_none"
    )]
    pub vertices_after: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simplified_polygons: Option<Vec<Polygon>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodes_explored: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub graph_nodes: Option<usize>,
}

// ========== INDEX / ROADMAP BUILDS ==========

/// Request to (re)build the obstacle index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexBuildRequest {
    pub polygons: Vec<Polygon>,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexBuildSummary {
    pub success: bool,
    pub indexed_count: usize,
    pub total_vertices: usize,
    pub received_count: usize,
}

/// Request to (re)build the probabilistic roadmap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapBuildRequest {
    pub num_samples: usize,
    pub connection_radius: f64,
    #[serde(default)]
    pub save_to_file: bool,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub no_fly_zones: Vec<Polygon>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapBuildSummary {
    pub success: bool,
    pub num_nodes: usize,
    pub num_edges: usize,
    pub requested_samples: usize,
    pub bounding_box: GeoBounds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
}
