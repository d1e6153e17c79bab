//! Per-query visibility graph over start, end and obstacle vertices.

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::geometry::{distance, is_path_clear};
use crate::graph::{Graph, GraphBuilder, NodeId};
use crate::models::{Point, Polygon};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisibilityConfig {
    /// Above this many nodes only the direct start-end edge is considered.
    pub max_nodes: usize,
    /// Pair counts above this are logged as slow builds.
    pub slow_build_pairs: usize,
}

impl Default for VisibilityConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1000,
            slow_build_pairs: 100_000,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct VisibilityStats {
    pub nodes: usize,
    pub pairs_checked: usize,
    pub edges_added: usize,
    /// Start coincides with an obstacle vertex.
    pub start_on_vertex: bool,
    /// End coincides with an obstacle vertex.
    pub end_on_vertex: bool,
    /// Node ceiling exceeded; the graph holds at most the direct edge.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
pub struct VisibilityGraph {
    pub graph: Graph,
    pub start: NodeId,
    pub end: NodeId,
    pub stats: VisibilityStats,
}

/// Exact-equality key for a point. Adding zero folds `-0.0` into `0.0`.
fn point_key(p: Point) -> (u64, u64) {
    ((p.x + 0.0).to_bits(), (p.y + 0.0).to_bits())
}

/// Build the visibility graph for one query.
///
/// Node 0 is `start`, node 1 is `end`, followed by every distinct obstacle
/// vertex. Each unordered node pair with a clear line of sight gets a
/// symmetric edge weighted by planar distance.
pub fn build_visibility_graph(
    start: Point,
    end: Point,
    obstacles: &[Polygon],
    config: &VisibilityConfig,
) -> VisibilityGraph {
    let started = Instant::now();
    let mut builder = GraphBuilder::new();
    let start_id = builder.push_node(start);
    let end_id = builder.push_node(end);

    let mut seen: HashMap<(u64, u64), NodeId> = HashMap::new();
    seen.insert(point_key(start), start_id);
    seen.entry(point_key(end)).or_insert(end_id);

    let mut stats = VisibilityStats::default();
    for vertex in obstacles.iter().flat_map(|polygon| polygon.vertices.iter()) {
        match seen.get(&point_key(*vertex)) {
            Some(&id) if id == start_id => stats.start_on_vertex = true,
            Some(&id) if id == end_id => stats.end_on_vertex = true,
            Some(_) => {}
            None => {
                let id = builder.push_node(*vertex);
                seen.insert(point_key(*vertex), id);
            }
        }
    }

    stats.nodes = builder.len();
    let possible_pairs = stats.nodes * (stats.nodes - 1) / 2;
    tracing::debug!(
        "Visibility graph: {} unique nodes, up to {} pairs to check",
        stats.nodes,
        possible_pairs
    );

    if stats.nodes > config.max_nodes {
        tracing::warn!(
            "Visibility graph has {} nodes (limit {}); using direct start-end edge only",
            stats.nodes,
            config.max_nodes
        );
        let mut direct = GraphBuilder::with_capacity(2);
        direct.push_node(start);
        direct.push_node(end);
        stats.pairs_checked = 1;
        if is_path_clear(start, end, obstacles) {
            direct.add_edge(start_id, end_id, distance(start, end));
            stats.edges_added = 1;
        }
        stats.truncated = true;
        return VisibilityGraph {
            graph: direct.freeze(),
            start: start_id,
            end: end_id,
            stats,
        };
    }

    if possible_pairs > config.slow_build_pairs {
        tracing::warn!("Visibility graph needs {} line-of-sight checks", possible_pairs);
    }

    let nodes: Vec<(NodeId, Point)> = (0..stats.nodes)
        .filter_map(|id| builder.point(id).map(|point| (id, point)))
        .collect();
    for (offset, &(i, pi)) in nodes.iter().enumerate() {
        for &(j, pj) in &nodes[offset + 1..] {
            stats.pairs_checked += 1;
            if is_path_clear(pi, pj, obstacles) {
                builder.add_edge(i, j, distance(pi, pj));
                stats.edges_added += 1;
            }
        }
    }

    tracing::debug!(
        "Visibility graph built: {} edges from {} pairs in {:?}",
        stats.edges_added,
        stats.pairs_checked,
        started.elapsed()
    );

    VisibilityGraph {
        graph: builder.freeze(),
        start: start_id,
        end: end_id,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::SearchGraph;

    fn square() -> Polygon {
        Polygon::from_coords(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
    }

    #[test]
    fn no_obstacles_gives_direct_edge() {
        let vg = build_visibility_graph(
            Point::new(0.0, 0.0),
            Point::new(3.0, 4.0),
            &[],
            &VisibilityConfig::default(),
        );
        assert_eq!(vg.graph.len(), 2);
        assert_eq!(vg.graph.edges(vg.start)[0].cost, 5.0);
        assert!(vg.graph.is_symmetric());
    }

    #[test]
    fn shared_vertices_are_deduplicated() {
        let a = square();
        let b = Polygon::from_coords(&[(10.0, 0.0), (20.0, 0.0), (20.0, 10.0), (10.0, 10.0)]);
        let vg = build_visibility_graph(
            Point::new(-5.0, 5.0),
            Point::new(25.0, 5.0),
            &[a, b],
            &VisibilityConfig::default(),
        );
        assert_eq!(vg.stats.nodes, 8);
        assert!(vg.graph.is_symmetric());
    }

    #[test]
    fn endpoint_on_vertex_is_flagged() {
        let vg = build_visibility_graph(
            Point::new(0.0, 0.0),
            Point::new(20.0, 20.0),
            &[square()],
            &VisibilityConfig::default(),
        );
        assert!(vg.stats.start_on_vertex);
        assert!(!vg.stats.end_on_vertex);
        assert_eq!(vg.graph.len(), 5);
    }

    #[test]
    fn blocked_pair_has_no_edge() {
        let vg = build_visibility_graph(
            Point::new(-5.0, 5.0),
            Point::new(15.0, 5.0),
            &[square()],
            &VisibilityConfig::default(),
        );
        assert!(vg.graph.neighbors(vg.start).all(|edge| edge.to != vg.end));
        assert!(!vg.stats.truncated);
    }

    fn capped() -> VisibilityConfig {
        VisibilityConfig {
            max_nodes: 3,
            ..Default::default()
        }
    }

    #[test]
    fn node_ceiling_keeps_clear_direct_edge() {
        let vg = build_visibility_graph(
            Point::new(-5.0, 20.0),
            Point::new(15.0, 20.0),
            &[square()],
            &capped(),
        );
        assert!(vg.stats.truncated);
        assert_eq!(vg.graph.len(), 2);
        assert_eq!(vg.graph.directed_edge_count(), 2);
        assert_eq!(vg.graph.edges(vg.start)[0].to, vg.end);
        assert!(vg.graph.is_symmetric());
    }

    #[test]
    fn node_ceiling_drops_blocked_direct_edge() {
        let vg = build_visibility_graph(
            Point::new(-5.0, 5.0),
            Point::new(15.0, 5.0),
            &[square()],
            &capped(),
        );
        assert!(vg.stats.truncated);
        assert_eq!(vg.graph.len(), 2);
        assert_eq!(vg.graph.directed_edge_count(), 0);
        assert_eq!(vg.stats.edges_added, 0);
    }
}
