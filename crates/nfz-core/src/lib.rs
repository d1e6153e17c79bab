//! No-fly-zone route planning engine.
//!
//! Geometry predicates, an R-tree obstacle index, polygon preprocessing, the
//! visibility graph and probabilistic roadmap builders, and a generic A*
//! search. Everything here is synchronous and free of shared state; the
//! `nfz-planner` crate owns the locked service around it.

pub mod astar;
pub mod error;
pub mod geometry;
pub mod graph;
pub mod merge;
pub mod models;
pub mod persistence;
pub mod roadmap;
pub mod simplify;
pub mod spatial_index;
pub mod visibility;

pub use astar::{astar, SearchResult};
pub use error::{ConnectivityFailure, PersistenceError, RouteError};
pub use geometry::{
    distance, haversine_distance, is_path_clear, path_length_meters, point_in_polygon,
    segments_intersect, Segment,
};
pub use graph::{Edge, Graph, GraphBuilder, NodeId, SearchGraph};
pub use merge::remove_contained_polygons;
pub use models::{
    BoundingBox, GeoBounds, IndexBuildRequest, IndexBuildSummary, Point, Polygon,
    RoadmapBuildRequest, RoadmapBuildSummary, RouteRequest, RouteResponse, RouteStrategy,
};
pub use roadmap::{
    build_roadmap, PreparedRoadmap, Roadmap, RoadmapBuildStats, RoadmapConfig, RoadmapNode,
    RoadmapOverlay,
};
pub use simplify::{simplify_polygon, simplify_polygons, EpsilonPolicy};
pub use spatial_index::{QueryRegion, RTreeIndex, RangeIndex, ZoneIndex};
pub use visibility::{build_visibility_graph, VisibilityConfig, VisibilityGraph, VisibilityStats};
