//! Weighted graph shared by both graph builders and the search.
//!
//! Graphs are accumulated in a [`GraphBuilder`] and frozen into an immutable
//! [`Graph`]. Search code only sees the [`SearchGraph`] trait, so a roadmap
//! overlay can stack private nodes on top of a shared base graph without
//! copying it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::Point;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub to: NodeId,
    pub cost: f64,
}

/// Read-only view the search runs on.
pub trait SearchGraph {
    fn point(&self, id: NodeId) -> Option<Point>;

    fn neighbors(&self, id: NodeId) -> impl Iterator<Item = Edge> + '_;

    fn node_count(&self) -> usize;

    fn contains(&self, id: NodeId) -> bool {
        self.point(id).is_some()
    }
}

/// Immutable adjacency map.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: HashMap<NodeId, Point>,
    edges: HashMap<NodeId, Vec<Edge>>,
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn edges(&self, id: NodeId) -> &[Edge] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, Point)> + '_ {
        self.nodes.iter().map(|(id, point)| (*id, *point))
    }

    /// Number of directed adjacency entries. Twice the undirected edge count
    /// for a symmetric graph.
    pub fn directed_edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Smallest id above every existing id.
    pub fn next_id(&self) -> NodeId {
        self.nodes.keys().max().map_or(0, |max| max + 1)
    }

    /// Every edge `i -> j` has a matching `j -> i` of equal cost.
    pub fn is_symmetric(&self) -> bool {
        self.edges.iter().all(|(from, list)| {
            list.iter().all(|edge| {
                self.edges(edge.to)
                    .iter()
                    .any(|back| back.to == *from && back.cost == edge.cost)
            })
        })
    }
}

impl SearchGraph for Graph {
    fn point(&self, id: NodeId) -> Option<Point> {
        self.nodes.get(&id).copied()
    }

    fn neighbors(&self, id: NodeId) -> impl Iterator<Item = Edge> + '_ {
        self.edges.get(&id).into_iter().flatten().copied()
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// Scratch structure for graph construction.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: HashMap<NodeId, Point>,
    edges: HashMap<NodeId, Vec<Edge>>,
    next_id: NodeId,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            nodes: HashMap::with_capacity(nodes),
            edges: HashMap::with_capacity(nodes),
            next_id: 0,
        }
    }

    /// Add a node under the next free id.
    pub fn push_node(&mut self, point: Point) -> NodeId {
        let id = self.next_id;
        self.insert_node(id, point);
        id
    }

    /// Add or replace the node `id`.
    pub fn insert_node(&mut self, id: NodeId, point: Point) {
        self.nodes.insert(id, point);
        self.next_id = self.next_id.max(id + 1);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn point(&self, id: NodeId) -> Option<Point> {
        self.nodes.get(&id).copied()
    }

    /// Insert `a -> b` and `b -> a` with the same cost.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId, cost: f64) {
        self.add_directed_edge(a, b, cost);
        self.add_directed_edge(b, a, cost);
    }

    pub fn add_directed_edge(&mut self, from: NodeId, to: NodeId, cost: f64) {
        self.edges.entry(from).or_default().push(Edge { to, cost });
    }

    pub fn freeze(self) -> Graph {
        Graph {
            nodes: self.nodes,
            edges: self.edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut builder = GraphBuilder::new();
        assert_eq!(builder.push_node(Point::new(0.0, 0.0)), 0);
        assert_eq!(builder.push_node(Point::new(1.0, 0.0)), 1);
        builder.insert_node(7, Point::new(2.0, 0.0));
        assert_eq!(builder.push_node(Point::new(3.0, 0.0)), 8);
        assert_eq!(builder.freeze().next_id(), 9);
    }

    #[test]
    fn undirected_edges_are_symmetric() {
        let mut builder = GraphBuilder::new();
        let a = builder.push_node(Point::new(0.0, 0.0));
        let b = builder.push_node(Point::new(3.0, 4.0));
        builder.add_edge(a, b, 5.0);
        let graph = builder.freeze();
        assert!(graph.is_symmetric());
        assert_eq!(graph.directed_edge_count(), 2);
        assert_eq!(graph.neighbors(b).collect::<Vec<_>>(), vec![Edge { to: a, cost: 5.0 }]);
    }

    #[test]
    fn one_way_edge_breaks_symmetry() {
        let mut builder = GraphBuilder::new();
        let a = builder.push_node(Point::new(0.0, 0.0));
        let b = builder.push_node(Point::new(1.0, 0.0));
        builder.add_directed_edge(a, b, 1.0);
        assert!(!builder.freeze().is_symmetric());
    }

    #[test]
    fn unknown_node_has_no_neighbors() {
        let graph = GraphBuilder::new().freeze();
        assert!(graph.is_empty());
        assert_eq!(graph.neighbors(3).count(), 0);
        assert!(!graph.contains(3));
        assert_eq!(graph.next_id(), 0);
    }
}
