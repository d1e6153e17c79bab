//! Bounding-box index over obstacle polygons.
//!
//! The engine talks to the index through [`RangeIndex`]; the R-tree backed
//! [`RTreeIndex`] is the implementation used everywhere. Queries return a
//! conservative superset of the polygons whose geometry touches the query
//! rectangle; exact filtering happens in the geometry kernel.

use rstar::{RStarInsertionStrategy, RTree, RTreeObject, RTreeParams, AABB};

use crate::models::{BoundingBox, Point, Polygon, RouteRequest};

/// Minimal range-query contract the planner depends on.
pub trait RangeIndex<T> {
    fn insert(&mut self, bbox: BoundingBox, item: T);

    /// Every item whose bounding box intersects `rect`.
    fn query(&self, rect: &BoundingBox) -> Vec<&T>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Node fanout for the obstacle tree: 25..=50 children per node.
pub struct ZoneTreeParams;

impl RTreeParams for ZoneTreeParams {
    const MIN_SIZE: usize = 25;
    const MAX_SIZE: usize = 50;
    const REINSERTION_COUNT: usize = 10;
    type DefaultInsertionStrategy = RStarInsertionStrategy;
}

#[derive(Debug, Clone)]
struct Entry<T> {
    bbox: BoundingBox,
    item: T,
}

impl<T> RTreeObject for Entry<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        to_aabb(&self.bbox)
    }
}

fn to_aabb(bbox: &BoundingBox) -> AABB<[f64; 2]> {
    AABB::from_corners([bbox.min_x, bbox.min_y], [bbox.max_x, bbox.max_y])
}

/// R-tree implementation of [`RangeIndex`]. Fanout is chosen through the
/// `P` parameter type.
pub struct RTreeIndex<T, P = ZoneTreeParams>
where
    P: RTreeParams,
{
    tree: RTree<Entry<T>, P>,
}

impl<T, P> RTreeIndex<T, P>
where
    P: RTreeParams,
{
    pub fn new() -> Self {
        Self {
            tree: RTree::new_with_params(),
        }
    }

    /// Bulk-load a balanced tree in one pass.
    pub fn bulk_load(items: Vec<(BoundingBox, T)>) -> Self {
        let entries = items
            .into_iter()
            .map(|(bbox, item)| Entry { bbox, item })
            .collect();
        Self {
            tree: RTree::bulk_load_with_params(entries),
        }
    }
}

impl<T, P> Default for RTreeIndex<T, P>
where
    P: RTreeParams,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, P> RangeIndex<T> for RTreeIndex<T, P>
where
    P: RTreeParams,
{
    fn insert(&mut self, bbox: BoundingBox, item: T) {
        self.tree.insert(Entry { bbox, item });
    }

    fn query(&self, rect: &BoundingBox) -> Vec<&T> {
        if !rect.is_valid() {
            return Vec::new();
        }
        self.tree
            .locate_in_envelope_intersecting(&to_aabb(rect))
            .map(|entry| &entry.item)
            .collect()
    }

    fn len(&self) -> usize {
        self.tree.size()
    }
}

/// Obstacle index: every no-fly zone keyed by its bounding box.
pub struct ZoneIndex {
    index: RTreeIndex<Polygon>,
    total_vertices: usize,
}

impl ZoneIndex {
    /// Index `polygons`. Polygons without vertices have no bounding box and
    /// are skipped.
    pub fn build(polygons: Vec<Polygon>) -> Self {
        let received = polygons.len();
        let entries: Vec<(BoundingBox, Polygon)> = polygons
            .into_iter()
            .filter_map(|polygon| polygon.bbox().map(|bbox| (bbox, polygon)))
            .collect();
        if entries.len() < received {
            tracing::warn!(
                "Skipped {} polygons without vertices while building zone index",
                received - entries.len()
            );
        }
        let total_vertices = entries.iter().map(|(_, polygon)| polygon.len()).sum();
        Self {
            index: RTreeIndex::bulk_load(entries),
            total_vertices,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn total_vertices(&self) -> usize {
        self.total_vertices
    }

    /// Polygons whose bounding box intersects `rect`, borrowed from the index.
    pub fn candidates(&self, rect: &BoundingBox) -> Vec<&Polygon> {
        self.index.query(rect)
    }

    /// Owned copies of the candidates, safe to use after a lock is released.
    pub fn query_region(&self, rect: &BoundingBox) -> Vec<Polygon> {
        self.candidates(rect).into_iter().cloned().collect()
    }

    /// Candidates that could block the segment `a -> b`.
    pub fn candidates_for_segment(&self, a: Point, b: Point) -> Vec<&Polygon> {
        let rect = BoundingBox::new(a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y));
        self.candidates(&rect)
    }
}

impl std::fmt::Debug for ZoneIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZoneIndex")
            .field("polygons", &self.len())
            .field("total_vertices", &self.total_vertices)
            .finish()
    }
}

impl From<Vec<Polygon>> for ZoneIndex {
    fn from(polygons: Vec<Polygon>) -> Self {
        Self::build(polygons)
    }
}

/// How a route query picks its search rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum QueryRegion {
    /// Inflate the start/end box by margin and expansion factor.
    Around { margin: f64, expansion_factor: f64 },
    /// Use the caller's rectangle as-is.
    Custom(BoundingBox),
}

impl QueryRegion {
    /// Resolve the selection in `request`. Unset or zero margin and factor
    /// fall back to the supplied defaults.
    pub fn from_request(request: &RouteRequest, default_margin: f64, default_factor: f64) -> Self {
        if let Some(bbox) = request.custom_bbox {
            return Self::Custom(bbox);
        }
        let pick = |value: Option<f64>, default: f64| match value {
            Some(v) if v != 0.0 => v,
            _ => default,
        };
        Self::Around {
            margin: pick(request.margin, default_margin),
            expansion_factor: pick(request.expansion_factor, default_factor),
        }
    }

    pub fn rect(&self, start: Point, end: Point) -> BoundingBox {
        match *self {
            Self::Around {
                margin,
                expansion_factor,
            } => route_query_rect(start, end, margin, expansion_factor),
            Self::Custom(bbox) => bbox,
        }
    }
}

/// Start/end bounding box inflated per axis by the larger of `margin` and
/// half the span times `expansion_factor`.
pub fn route_query_rect(start: Point, end: Point, margin: f64, expansion_factor: f64) -> BoundingBox {
    let min_x = start.x.min(end.x);
    let max_x = start.x.max(end.x);
    let min_y = start.y.min(end.y);
    let max_y = start.y.max(end.y);

    let extra_x = margin.max((max_x - min_x) * expansion_factor * 0.5);
    let extra_y = margin.max((max_y - min_y) * expansion_factor * 0.5);

    BoundingBox::new(min_x - extra_x, min_y - extra_y, max_x + extra_x, max_y + extra_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_at(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::from_coords(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size)])
    }

    #[test]
    fn query_returns_intersecting_boxes_only() {
        let index = ZoneIndex::build(vec![
            square_at(0.0, 0.0, 10.0),
            square_at(100.0, 100.0, 10.0),
            square_at(5.0, 5.0, 2.0),
        ]);
        let hits = index.query_region(&BoundingBox::new(-1.0, -1.0, 8.0, 8.0));
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|poly| poly.vertices[0].x < 50.0));
    }

    #[test]
    fn touching_boxes_are_returned() {
        let index = ZoneIndex::build(vec![square_at(0.0, 0.0, 10.0)]);
        let hits = index.query_region(&BoundingBox::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn empty_polygons_are_skipped() {
        let index = ZoneIndex::build(vec![Polygon::default(), square_at(0.0, 0.0, 1.0)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.total_vertices(), 4);
    }

    #[test]
    fn inverted_rect_returns_nothing() {
        let index = ZoneIndex::build(vec![square_at(0.0, 0.0, 10.0)]);
        assert!(index
            .query_region(&BoundingBox::new(5.0, 5.0, -5.0, -5.0))
            .is_empty());
    }

    #[test]
    fn range_index_insert_then_query() {
        let mut index: RTreeIndex<&str> = RTreeIndex::new();
        index.insert(BoundingBox::new(0.0, 0.0, 1.0, 1.0), "a");
        index.insert(BoundingBox::new(5.0, 5.0, 6.0, 6.0), "b");
        assert_eq!(index.len(), 2);
        let hits = index.query(&BoundingBox::new(0.5, 0.5, 2.0, 2.0));
        assert_eq!(hits, vec![&"a"]);
    }

    #[test]
    fn many_zones_stay_superset_correct() {
        let zones: Vec<Polygon> = (0..400)
            .map(|i| square_at((i % 20) as f64 * 10.0, (i / 20) as f64 * 10.0, 4.0))
            .collect();
        let index = ZoneIndex::build(zones.clone());
        let rect = BoundingBox::new(33.0, 47.0, 91.0, 122.0);
        let hits = index.query_region(&rect);
        for zone in &zones {
            let bbox = zone.bbox().expect("bbox");
            if bbox.intersects(&rect) {
                assert!(hits.contains(zone), "missing zone at {:?}", bbox);
            }
        }
    }

    #[test]
    fn margin_dominates_short_routes() {
        let rect = route_query_rect(Point::new(0.0, 0.0), Point::new(10.0, 0.0), 100.0, 1.0);
        assert_eq!(rect, BoundingBox::new(-100.0, -100.0, 110.0, 100.0));
    }

    #[test]
    fn expansion_factor_dominates_long_routes() {
        let rect = route_query_rect(Point::new(0.0, 0.0), Point::new(1000.0, 400.0), 10.0, 2.0);
        assert_eq!(rect, BoundingBox::new(-1000.0, -400.0, 2000.0, 800.0));
    }

    #[test]
    fn custom_box_bypasses_margin() {
        let request = RouteRequest {
            custom_bbox: Some(BoundingBox::new(1.0, 2.0, 3.0, 4.0)),
            margin: Some(500.0),
            ..Default::default()
        };
        let region = QueryRegion::from_request(&request, 1000.0, 1.0);
        assert_eq!(
            region.rect(Point::new(0.0, 0.0), Point::new(50.0, 50.0)),
            BoundingBox::new(1.0, 2.0, 3.0, 4.0)
        );
    }

    #[test]
    fn zero_margin_falls_back_to_default() {
        let request = RouteRequest {
            margin: Some(0.0),
            ..Default::default()
        };
        assert_eq!(
            QueryRegion::from_request(&request, 1000.0, 1.0),
            QueryRegion::Around {
                margin: 1000.0,
                expansion_factor: 1.0
            }
        );
    }
}
