//! Error taxonomy for route queries and roadmap persistence.

use std::path::PathBuf;

use thiserror::Error;

use crate::graph::NodeId;

/// Why a route could not be connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConnectivityFailure {
    #[error("start point could not be connected to the graph")]
    StartUnreachable,
    #[error("end point could not be connected to the graph")]
    EndUnreachable,
    #[error("no path exists between start and end")]
    NoPath,
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("invalid request: {0}")]
    InvalidInput(String),

    #[error("{0} not built")]
    NotReady(&'static str),

    #[error("too many vertices after simplification: {vertices} (limit {limit})")]
    Capacity { vertices: usize, limit: usize },

    #[error(transparent)]
    Connectivity(#[from] ConnectivityFailure),

    #[error("{0} already built; set force to rebuild")]
    AlreadyBuilt(&'static str),
}

impl RouteError {
    /// Rebuild conflicts are reported separately from request failures.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::AlreadyBuilt(_))
    }
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to read or write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed roadmap document: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("duplicate node id {0}")]
    DuplicateNode(NodeId),

    #[error("node {node} lists unknown neighbor {neighbor}")]
    DanglingEdge { node: NodeId, neighbor: NodeId },

    #[error("node {node} lists neighbor {neighbor}, which does not list it back")]
    OneWayEdge { node: NodeId, neighbor: NodeId },
}
