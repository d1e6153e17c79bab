//! Probabilistic roadmap: sampled free-space nodes joined by clear edges.
//!
//! A [`Roadmap`] is the persisted form. [`PreparedRoadmap`] wraps it with a
//! searchable [`Graph`] and an R-tree over node positions. Route queries never
//! touch either; they get a [`RoadmapOverlay`] that borrows the base graph and
//! keeps the start and end nodes private.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::Rng;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

use crate::error::ConnectivityFailure;
use crate::geometry::{distance, inside_any, is_path_clear, Segment};
use crate::graph::{Edge, Graph, GraphBuilder, NodeId, SearchGraph};
use crate::models::{BoundingBox, GeoBounds, Point};
use crate::spatial_index::ZoneIndex;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapConfig {
    /// Sampling region.
    pub bounds: GeoBounds,
    /// Sampling gives up after `attempt_factor * num_samples` draws.
    pub attempt_factor: usize,
}

impl Default for RoadmapConfig {
    fn default() -> Self {
        Self {
            bounds: GeoBounds::NETHERLANDS,
            attempt_factor: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapNode {
    pub id: NodeId,
    pub point: Point,
    /// Neighbor ids. Costs are recomputed from positions on load.
    pub edges: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Roadmap {
    pub nodes: Vec<RoadmapNode>,
    pub bounding_box: GeoBounds,
    pub num_samples: usize,
    pub connection_radius: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub built_at: Option<DateTime<Utc>>,
}

impl Roadmap {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Undirected edge count, counting each listed pair once.
    pub fn edge_count(&self) -> usize {
        let mut pairs = HashSet::new();
        for node in &self.nodes {
            for &neighbor in &node.edges {
                pairs.insert((node.id.min(neighbor), node.id.max(neighbor)));
            }
        }
        pairs.len()
    }

    /// Searchable graph with planar-distance costs. Neighbor ids that do not
    /// resolve to a node are dropped.
    pub fn to_graph(&self) -> Graph {
        let mut builder = GraphBuilder::with_capacity(self.nodes.len());
        for node in &self.nodes {
            builder.insert_node(node.id, node.point);
        }
        for node in &self.nodes {
            for &neighbor in &node.edges {
                if let Some(to) = builder.point(neighbor) {
                    builder.add_directed_edge(node.id, neighbor, distance(node.point, to));
                }
            }
        }
        builder.freeze()
    }
}

/// Counters from one roadmap build.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapBuildStats {
    pub requested: usize,
    pub generated: usize,
    pub attempts: usize,
    pub edges: usize,
    pub rejected_edges: usize,
}

impl RoadmapBuildStats {
    /// Samples missing because the attempt budget ran out.
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.generated)
    }
}

#[derive(Debug, Clone, Copy)]
struct NodePosition {
    id: NodeId,
    position: [f64; 2],
}

impl RTreeObject for NodePosition {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.position)
    }
}

impl PointDistance for NodePosition {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.position[0] - point[0];
        let dy = self.position[1] - point[1];
        dx * dx + dy * dy
    }
}

fn node_tree(nodes: impl Iterator<Item = (NodeId, Point)>) -> RTree<NodePosition> {
    RTree::bulk_load(
        nodes
            .map(|(id, point)| NodePosition {
                id,
                position: [point.x, point.y],
            })
            .collect(),
    )
}

fn within_radius(tree: &RTree<NodePosition>, point: Point, radius: f64) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = tree
        .locate_within_distance([point.x, point.y], radius * radius)
        .map(|node| node.id)
        .collect();
    ids.sort_unstable();
    ids
}

fn segment_is_clear(a: Point, b: Point, obstacles: &ZoneIndex) -> bool {
    is_path_clear(a, b, obstacles.candidates_for_segment(a, b))
}

fn inside_obstacle(point: Point, obstacles: &ZoneIndex) -> bool {
    let probe = BoundingBox::new(point.x, point.y, point.x, point.y);
    inside_any(point, obstacles.candidates(&probe))
}

/// Sample and connect a roadmap.
///
/// Points are drawn uniformly inside `config.bounds` (x = longitude,
/// y = latitude); draws inside an obstacle are discarded. When the attempt
/// budget runs out first, the roadmap is built from the samples found and the
/// shortfall is reported in the stats. Node pairs within `connection_radius`
/// whose segment passes the line-of-sight test get a symmetric edge.
pub fn build_roadmap<R: Rng + ?Sized>(
    num_samples: usize,
    connection_radius: f64,
    obstacles: &ZoneIndex,
    config: &RoadmapConfig,
    rng: &mut R,
) -> (Roadmap, RoadmapBuildStats) {
    let started = Instant::now();
    let bounds = config.bounds;
    tracing::info!(
        "Building roadmap with {} samples against {} obstacles",
        num_samples,
        obstacles.len()
    );

    let mut stats = RoadmapBuildStats {
        requested: num_samples,
        ..Default::default()
    };
    let max_attempts = num_samples.saturating_mul(config.attempt_factor);
    let mut points: Vec<Point> = Vec::new();

    if bounds.is_valid() {
        while points.len() < num_samples && stats.attempts < max_attempts {
            stats.attempts += 1;
            let lat = rng.random_range(bounds.min_lat..=bounds.max_lat);
            let lon = rng.random_range(bounds.min_lon..=bounds.max_lon);
            let point = Point::new(lon, lat);
            if !inside_obstacle(point, obstacles) {
                points.push(point);
            }
        }
    } else {
        tracing::warn!("Roadmap sampling bounds are invalid: {:?}", bounds);
    }
    stats.generated = points.len();

    if stats.shortfall() > 0 {
        tracing::warn!(
            "Only generated {} valid samples (requested {}) after {} attempts",
            stats.generated,
            stats.requested,
            stats.attempts
        );
    }

    let tree = node_tree(points.iter().copied().enumerate());
    let mut adjacency: Vec<Vec<NodeId>> = vec![Vec::new(); points.len()];
    for (i, &point) in points.iter().enumerate() {
        for j in within_radius(&tree, point, connection_radius) {
            if j <= i {
                continue;
            }
            if segment_is_clear(point, points[j], obstacles) {
                adjacency[i].push(j);
                adjacency[j].push(i);
                stats.edges += 1;
            } else {
                stats.rejected_edges += 1;
            }
        }
    }

    let nodes = points
        .into_iter()
        .zip(adjacency)
        .enumerate()
        .map(|(id, (point, edges))| RoadmapNode { id, point, edges })
        .collect();

    tracing::info!(
        "Roadmap built: {} nodes, {} edges, {} rejected in {:.2}s",
        stats.generated,
        stats.edges,
        stats.rejected_edges,
        started.elapsed().as_secs_f64()
    );

    let roadmap = Roadmap {
        nodes,
        bounding_box: bounds,
        num_samples,
        connection_radius,
        built_at: Some(Utc::now()),
    };
    (roadmap, stats)
}

/// Roadmap ready for queries.
pub struct PreparedRoadmap {
    roadmap: Roadmap,
    graph: Graph,
    tree: RTree<NodePosition>,
}

impl PreparedRoadmap {
    pub fn new(roadmap: Roadmap) -> Self {
        let graph = roadmap.to_graph();
        let tree = node_tree(roadmap.nodes.iter().map(|node| (node.id, node.point)));
        Self {
            roadmap,
            graph,
            tree,
        }
    }

    pub fn roadmap(&self) -> &Roadmap {
        &self.roadmap
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn connection_radius(&self) -> f64 {
        self.roadmap.connection_radius
    }

    /// Closest node and its planar distance, or `None` for an empty roadmap.
    pub fn nearest_node(&self, point: Point) -> Option<(NodeId, f64)> {
        self.tree
            .nearest_neighbor(&[point.x, point.y])
            .map(|node| (node.id, node.distance_2(&[point.x, point.y]).sqrt()))
    }

    /// Nodes within the connection radius of `point`, in id order.
    pub fn nodes_near(&self, point: Point) -> Vec<NodeId> {
        within_radius(&self.tree, point, self.roadmap.connection_radius)
    }

    /// Each undirected edge once, as a segment between node positions.
    pub fn edge_segments(&self) -> Vec<Segment> {
        let mut seen = HashSet::new();
        let mut segments = Vec::new();
        for (id, point) in self.graph.nodes() {
            for edge in self.graph.edges(id) {
                if !seen.insert((id.min(edge.to), id.max(edge.to))) {
                    continue;
                }
                if let Some(to) = self.graph.point(edge.to) {
                    segments.push(Segment::new(point, to));
                }
            }
        }
        segments
    }

    /// Splice `start` and `end` into a private overlay.
    ///
    /// Each endpoint is joined to every node within the connection radius
    /// that it can see. An endpoint with no such node fails the query for
    /// that endpoint; the shared graph is never modified.
    pub fn connect_endpoints(
        &self,
        start: Point,
        end: Point,
        obstacles: &ZoneIndex,
    ) -> Result<RoadmapOverlay<'_>, ConnectivityFailure> {
        let start_id = self.graph.next_id();
        let end_id = start_id + 1;
        let mut overlay = RoadmapOverlay {
            base: &self.graph,
            extra_nodes: HashMap::from([(start_id, start), (end_id, end)]),
            extra_edges: HashMap::new(),
            start: start_id,
            end: end_id,
        };

        for (endpoint_id, endpoint, failure) in [
            (start_id, start, ConnectivityFailure::StartUnreachable),
            (end_id, end, ConnectivityFailure::EndUnreachable),
        ] {
            let mut connected = false;
            for node in self.nodes_near(endpoint) {
                let Some(node_point) = self.graph.point(node) else {
                    continue;
                };
                if segment_is_clear(endpoint, node_point, obstacles) {
                    overlay.add_edge(endpoint_id, node, distance(endpoint, node_point));
                    connected = true;
                }
            }
            if !connected {
                tracing::debug!("Roadmap overlay: {}", failure);
                return Err(failure);
            }
        }

        Ok(overlay)
    }
}

impl std::fmt::Debug for PreparedRoadmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRoadmap")
            .field("nodes", &self.roadmap.len())
            .field("connection_radius", &self.roadmap.connection_radius)
            .finish()
    }
}

/// Query-scoped view: the shared roadmap graph plus private endpoint nodes.
pub struct RoadmapOverlay<'a> {
    base: &'a Graph,
    extra_nodes: HashMap<NodeId, Point>,
    extra_edges: HashMap<NodeId, Vec<Edge>>,
    pub start: NodeId,
    pub end: NodeId,
}

impl RoadmapOverlay<'_> {
    fn add_edge(&mut self, a: NodeId, b: NodeId, cost: f64) {
        self.extra_edges.entry(a).or_default().push(Edge { to: b, cost });
        self.extra_edges.entry(b).or_default().push(Edge { to: a, cost });
    }
}

impl SearchGraph for RoadmapOverlay<'_> {
    fn point(&self, id: NodeId) -> Option<Point> {
        self.extra_nodes
            .get(&id)
            .copied()
            .or_else(|| self.base.point(id))
    }

    fn neighbors(&self, id: NodeId) -> impl Iterator<Item = Edge> + '_ {
        self.base
            .neighbors(id)
            .chain(self.extra_edges.get(&id).into_iter().flatten().copied())
    }

    fn node_count(&self) -> usize {
        self.base.node_count() + self.extra_nodes.len()
    }
}
