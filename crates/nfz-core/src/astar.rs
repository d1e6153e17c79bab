//! A* shortest path over any [`SearchGraph`].
//!
//! The heuristic is the planar distance to the goal, which is admissible and
//! consistent for graphs weighted by planar distance. Improvements to an open
//! node push a fresh heap entry; stale entries are skipped on pop.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::geometry::distance;
use crate::graph::{NodeId, SearchGraph};
use crate::models::Point;

#[derive(Debug, Clone, Copy)]
struct FloatOrd(f64);

impl PartialEq for FloatOrd {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for FloatOrd {}

impl PartialOrd for FloatOrd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FloatOrd {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    id: NodeId,
    g_score: FloatOrd,
    f_score: FloatOrd,
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f_score
            .cmp(&other.f_score)
            .then_with(|| other.g_score.cmp(&self.g_score))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Outcome of one search.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub path: Vec<Point>,
    pub node_ids: Vec<NodeId>,
    pub cost: f64,
    pub success: bool,
    pub nodes_expanded: usize,
}

impl SearchResult {
    fn failed(nodes_expanded: usize) -> Self {
        Self {
            nodes_expanded,
            ..Default::default()
        }
    }
}

/// Find the cheapest path from `start` to `goal`.
///
/// An empty graph or an endpoint id missing from the graph fails immediately
/// with an empty path. Closed nodes are never expanded twice.
pub fn astar<G: SearchGraph>(graph: &G, start: NodeId, goal: NodeId) -> SearchResult {
    if graph.node_count() == 0 {
        return SearchResult::failed(0);
    }
    let (Some(start_point), Some(goal_point)) = (graph.point(start), graph.point(goal)) else {
        return SearchResult::failed(0);
    };

    let heuristic = |id: NodeId| graph.point(id).map_or(f64::INFINITY, |p| distance(p, goal_point));

    let mut open_set: BinaryHeap<Reverse<OpenNode>> = BinaryHeap::new();
    open_set.push(Reverse(OpenNode {
        id: start,
        g_score: FloatOrd(0.0),
        f_score: FloatOrd(distance(start_point, goal_point)),
    }));
    let mut closed_set: HashSet<NodeId> = HashSet::new();
    let mut g_score: HashMap<NodeId, f64> = HashMap::new();
    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    g_score.insert(start, 0.0);

    let mut nodes_expanded = 0usize;

    while let Some(Reverse(current)) = open_set.pop() {
        if closed_set.contains(&current.id) {
            continue;
        }
        let best_g = g_score.get(&current.id).copied().unwrap_or(f64::INFINITY);
        if current.g_score.0 > best_g {
            continue;
        }

        nodes_expanded += 1;

        if current.id == goal {
            let node_ids = reconstruct(&came_from, goal);
            let path = node_ids.iter().filter_map(|id| graph.point(*id)).collect();
            return SearchResult {
                path,
                node_ids,
                cost: best_g,
                success: true,
                nodes_expanded,
            };
        }

        closed_set.insert(current.id);

        for edge in graph.neighbors(current.id) {
            if closed_set.contains(&edge.to) || !graph.contains(edge.to) {
                continue;
            }
            let tentative_g = best_g + edge.cost;
            if tentative_g < g_score.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(edge.to, current.id);
                g_score.insert(edge.to, tentative_g);
                open_set.push(Reverse(OpenNode {
                    id: edge.to,
                    g_score: FloatOrd(tentative_g),
                    f_score: FloatOrd(tentative_g + heuristic(edge.to)),
                }));
            }
        }
    }

    SearchResult::failed(nodes_expanded)
}

fn reconstruct(came_from: &HashMap<NodeId, NodeId>, goal: NodeId) -> Vec<NodeId> {
    let mut ids = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from.get(&current) {
        ids.push(*prev);
        current = *prev;
    }
    ids.reverse();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, GraphBuilder};

    fn connect(builder: &mut GraphBuilder, a: NodeId, b: NodeId) {
        let (Some(pa), Some(pb)) = (builder.point(a), builder.point(b)) else {
            panic!("missing node");
        };
        builder.add_edge(a, b, distance(pa, pb));
    }

    /// 0 -> 3 either directly along a long detour or via 1 and 2.
    fn diamond() -> Graph {
        let mut builder = GraphBuilder::new();
        for (x, y) in [(0.0, 0.0), (1.0, 1.0), (2.0, 1.0), (3.0, 0.0), (1.5, -10.0)] {
            builder.push_node(Point::new(x, y));
        }
        connect(&mut builder, 0, 1);
        connect(&mut builder, 1, 2);
        connect(&mut builder, 2, 3);
        connect(&mut builder, 0, 4);
        connect(&mut builder, 4, 3);
        builder.freeze()
    }

    #[test]
    fn finds_cheapest_path() {
        let result = astar(&diamond(), 0, 3);
        assert!(result.success);
        assert_eq!(result.node_ids, vec![0, 1, 2, 3]);
        let expected = 2.0_f64.sqrt() * 2.0 + 1.0;
        assert!((result.cost - expected).abs() < 1e-12);
        assert_eq!(result.path.first(), Some(&Point::new(0.0, 0.0)));
        assert_eq!(result.path.last(), Some(&Point::new(3.0, 0.0)));
    }

    #[test]
    fn cheaper_route_found_later_replaces_parent() {
        // Node 2 is first reached through the expensive edge from 0, then
        // improved through 1 before it is expanded.
        let mut builder = GraphBuilder::new();
        builder.push_node(Point::new(0.0, 0.0));
        builder.push_node(Point::new(1.0, 0.0));
        builder.push_node(Point::new(2.0, 0.0));
        builder.push_node(Point::new(3.0, 0.0));
        builder.add_edge(0, 1, 1.0);
        builder.add_edge(0, 2, 10.0);
        builder.add_edge(1, 2, 1.0);
        builder.add_edge(2, 3, 1.0);
        let result = astar(&builder.freeze(), 0, 3);
        assert!(result.success);
        assert_eq!(result.node_ids, vec![0, 1, 2, 3]);
        assert_eq!(result.cost, 3.0);
    }

    #[test]
    fn never_expands_a_node_twice() {
        let graph = diamond();
        let result = astar(&graph, 0, 3);
        assert!(result.nodes_expanded <= graph.len());
    }

    #[test]
    fn start_equals_goal() {
        let result = astar(&diamond(), 2, 2);
        assert!(result.success);
        assert_eq!(result.node_ids, vec![2]);
        assert_eq!(result.cost, 0.0);
    }

    #[test]
    fn disconnected_goal_fails() {
        let mut builder = GraphBuilder::new();
        builder.push_node(Point::new(0.0, 0.0));
        builder.push_node(Point::new(1.0, 0.0));
        let result = astar(&builder.freeze(), 0, 1);
        assert!(!result.success);
        assert!(result.path.is_empty());
        assert_eq!(result.nodes_expanded, 1);
    }

    #[test]
    fn missing_endpoint_or_empty_graph_fails_immediately() {
        let empty = GraphBuilder::new().freeze();
        assert!(!astar(&empty, 0, 1).success);

        let result = astar(&diamond(), 0, 42);
        assert!(!result.success);
        assert!(result.path.is_empty());
        assert_eq!(result.nodes_expanded, 0);
    }
}
