//! Route planning service.
//!
//! [`RoutePlanner`] owns the obstacle index and the roadmap, each behind its
//! own reader-writer lock. Queries copy what they need out of the index, or
//! clone the roadmap handle, and release the lock before building graphs, so
//! a rebuild never disturbs a search that already started.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use nfz_core::geometry::{looks_geographic, path_length_meters};
use nfz_core::models::total_vertices;
use nfz_core::spatial_index::route_query_rect;
use nfz_core::{
    astar, build_roadmap, build_visibility_graph, remove_contained_polygons, simplify_polygons,
    ConnectivityFailure, EpsilonPolicy, IndexBuildRequest, IndexBuildSummary, Point, Polygon,
    PreparedRoadmap, QueryRegion, RoadmapBuildRequest, RoadmapBuildSummary, RouteError,
    RouteRequest, RouteResponse, RouteStrategy, SearchGraph, SearchResult, ZoneIndex,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::PlannerConfig;
use crate::store::RoadmapStore;

const INDEX: &str = "spatial index";
const ROADMAP: &str = "roadmap";

/// Statistics gathered while answering one query, reported even on failure.
#[derive(Debug, Clone, Default)]
struct QueryStats {
    polygons_queried: Option<usize>,
    vertices_before: Option<usize>,
    vertices_after: Option<usize>,
    simplified_polygons: Option<Vec<Polygon>>,
    graph_nodes: Option<usize>,
    nodes_explored: Option<usize>,
}

impl QueryStats {
    fn into_response(self, outcome: Result<SearchResult, RouteError>) -> RouteResponse {
        let mut response = RouteResponse {
            polygons_queried: self.polygons_queried,
            vertices_before: self.vertices_before,
            vertices_after: self.vertices_after,
            simplified_polygons: self.simplified_polygons,
            graph_nodes: self.graph_nodes,
            nodes_explored: self.nodes_explored,
            ..Default::default()
        };
        match outcome {
            Ok(result) => {
                if result.path.iter().all(|p| looks_geographic(*p)) {
                    response.distance_meters = Some(path_length_meters(&result.path));
                }
                response.path_cost = Some(result.cost);
                response.path = result.path;
                response.success = true;
            }
            Err(err) => {
                response.message = Some(err.to_string());
            }
        }
        response
    }
}

pub struct RoutePlanner {
    config: PlannerConfig,
    store: RoadmapStore,
    index: RwLock<Option<ZoneIndex>>,
    roadmap: RwLock<Option<Arc<PreparedRoadmap>>>,
}

impl RoutePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        let store = RoadmapStore::new(config.roadmap_path.clone());
        Self {
            config,
            store,
            index: RwLock::new(None),
            roadmap: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn store(&self) -> &RoadmapStore {
        &self.store
    }

    pub fn is_index_ready(&self) -> bool {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Polygon and vertex counts of the current index.
    pub fn index_counts(&self) -> Option<(usize, usize)> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|index| (index.len(), index.total_vertices()))
    }

    /// Handle to the current roadmap. Stays valid across rebuilds.
    pub fn roadmap(&self) -> Option<Arc<PreparedRoadmap>> {
        self.roadmap
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Build the obstacle index. Fails with a conflict when an index exists
    /// and `force` is not set.
    pub fn build_index(&self, request: IndexBuildRequest) -> Result<IndexBuildSummary, RouteError> {
        let mut guard = self.index.write().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() && !request.force {
            tracing::warn!("Spatial index already built; rebuild refused without force");
            return Err(RouteError::AlreadyBuilt(INDEX));
        }

        let started = Instant::now();
        let received_count = request.polygons.len();
        let polygons = if self.config.merge_contained_on_build {
            remove_contained_polygons(request.polygons)
        } else {
            request.polygons
        };
        let index = ZoneIndex::build(polygons);
        let summary = IndexBuildSummary {
            success: true,
            indexed_count: index.len(),
            total_vertices: index.total_vertices(),
            received_count,
        };
        *guard = Some(index);

        tracing::info!(
            "Spatial index built: {} of {} polygons, {} vertices in {:?}",
            summary.indexed_count,
            received_count,
            summary.total_vertices,
            started.elapsed()
        );
        Ok(summary)
    }

    /// Build the roadmap, seeded from the configuration when a seed is set.
    pub fn build_roadmap(
        &self,
        request: RoadmapBuildRequest,
    ) -> Result<RoadmapBuildSummary, RouteError> {
        match self.config.roadmap_seed {
            Some(seed) => self.build_roadmap_with(request, &mut StdRng::seed_from_u64(seed)),
            None => self.build_roadmap_with(request, &mut rand::rng()),
        }
    }

    pub fn build_roadmap_with<R: Rng + ?Sized>(
        &self,
        request: RoadmapBuildRequest,
        rng: &mut R,
    ) -> Result<RoadmapBuildSummary, RouteError> {
        if request.num_samples == 0 {
            return Err(RouteError::InvalidInput("numSamples must be positive".into()));
        }
        if request.num_samples > self.config.max_roadmap_samples {
            return Err(RouteError::InvalidInput(format!(
                "numSamples {} exceeds the limit of {}",
                request.num_samples, self.config.max_roadmap_samples
            )));
        }
        if !(request.connection_radius.is_finite() && request.connection_radius > 0.0) {
            return Err(RouteError::InvalidInput(
                "connectionRadius must be a positive number".into(),
            ));
        }

        let mut guard = self.roadmap.write().unwrap_or_else(PoisonError::into_inner);
        if guard.is_some() && !request.force {
            tracing::warn!("Roadmap already built; rebuild refused without force");
            return Err(RouteError::AlreadyBuilt(ROADMAP));
        }

        let obstacles = ZoneIndex::build(request.no_fly_zones);
        let (roadmap, stats) = build_roadmap(
            request.num_samples,
            request.connection_radius,
            &obstacles,
            &self.config.roadmap(),
            rng,
        );

        let saved_to = if request.save_to_file {
            match self.store.save(&roadmap) {
                Ok(()) => Some(self.store.path().display().to_string()),
                Err(err) => {
                    tracing::warn!("Roadmap built but not saved: {}", err);
                    None
                }
            }
        } else {
            None
        };

        let summary = RoadmapBuildSummary {
            success: true,
            num_nodes: roadmap.len(),
            num_edges: stats.edges,
            requested_samples: stats.requested,
            bounding_box: roadmap.bounding_box,
            saved_to,
        };
        *guard = Some(Arc::new(PreparedRoadmap::new(roadmap)));
        Ok(summary)
    }

    /// Install the roadmap from the store if one is there. Missing,
    /// unreadable and inconsistent files are logged and treated as absent.
    pub fn load_roadmap(&self) -> bool {
        match self.store.load() {
            Ok(Some(roadmap)) => {
                let prepared = Arc::new(PreparedRoadmap::new(roadmap));
                *self.roadmap.write().unwrap_or_else(PoisonError::into_inner) = Some(prepared);
                true
            }
            Ok(None) => {
                tracing::info!("No roadmap file at {}", self.store.path().display());
                false
            }
            Err(err) => {
                tracing::warn!("Ignoring roadmap file: {}", err);
                false
            }
        }
    }

    /// Answer a route query. Never fails; errors are reported in the response.
    pub fn plan_route(&self, request: &RouteRequest) -> RouteResponse {
        let started = Instant::now();
        let mut stats = QueryStats::default();
        let outcome = self.route(request, &mut stats);

        match &outcome {
            Ok(result) => tracing::info!(
                "Route found: {} waypoints, cost {:.4}, {} nodes expanded in {:?}",
                result.path.len(),
                result.cost,
                result.nodes_expanded,
                started.elapsed()
            ),
            Err(err) => tracing::info!("Route failed: {}", err),
        }
        stats.into_response(outcome)
    }

    fn route(
        &self,
        request: &RouteRequest,
        stats: &mut QueryStats,
    ) -> Result<SearchResult, RouteError> {
        validate(request)?;
        let result = match request.strategy {
            RouteStrategy::Visibility => self.route_visibility(request, stats)?,
            RouteStrategy::Roadmap => self.route_roadmap(request, stats)?,
        };
        stats.nodes_explored = Some(result.nodes_expanded);
        if result.success {
            Ok(result)
        } else {
            Err(ConnectivityFailure::NoPath.into())
        }
    }

    fn route_visibility(
        &self,
        request: &RouteRequest,
        stats: &mut QueryStats,
    ) -> Result<SearchResult, RouteError> {
        let region = QueryRegion::from_request(
            request,
            self.config.default_margin,
            self.config.default_expansion_factor,
        );
        let rect = region.rect(request.start, request.end);
        let candidates = {
            let guard = self.index.read().unwrap_or_else(PoisonError::into_inner);
            let index = guard.as_ref().ok_or(RouteError::NotReady(INDEX))?;
            index.query_region(&rect)
        };
        tracing::debug!("Query rect {:?}: {} candidate polygons", rect, candidates.len());

        let before = total_vertices(&candidates);
        stats.polygons_queried = Some(candidates.len());
        stats.vertices_before = Some(before);

        let policy =
            EpsilonPolicy::from_request(request.simplification_epsilon, self.config.auto_simplify);
        let obstacles = match policy.resolve(&candidates) {
            Some(epsilon) => {
                let simplified = simplify_polygons(&candidates, epsilon);
                tracing::debug!("Simplifying with epsilon {}", epsilon);
                stats.simplified_polygons = Some(simplified.clone());
                simplified
            }
            None => candidates,
        };
        let after = total_vertices(&obstacles);
        stats.vertices_after = Some(after);

        if after > self.config.max_vertices {
            return Err(RouteError::Capacity {
                vertices: after,
                limit: self.config.max_vertices,
            });
        }

        let vg = build_visibility_graph(
            request.start,
            request.end,
            &obstacles,
            &self.config.visibility(),
        );
        stats.graph_nodes = Some(vg.stats.nodes);
        Ok(astar(&vg.graph, vg.start, vg.end))
    }

    fn route_roadmap(
        &self,
        request: &RouteRequest,
        stats: &mut QueryStats,
    ) -> Result<SearchResult, RouteError> {
        let roadmap = self.roadmap().ok_or(RouteError::NotReady(ROADMAP))?;
        // Endpoint links stay within the connection radius of an endpoint.
        let rect = route_query_rect(
            request.start,
            request.end,
            roadmap.connection_radius(),
            0.0,
        );
        let candidates = {
            let guard = self.index.read().unwrap_or_else(PoisonError::into_inner);
            let index = guard.as_ref().ok_or(RouteError::NotReady(INDEX))?;
            index.query_region(&rect)
        };
        stats.polygons_queried = Some(candidates.len());
        let obstacles = ZoneIndex::build(candidates);

        let overlay = roadmap.connect_endpoints(request.start, request.end, &obstacles)?;
        stats.graph_nodes = Some(overlay.node_count());
        Ok(astar(&overlay, overlay.start, overlay.end))
    }
}

impl std::fmt::Debug for RoutePlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutePlanner")
            .field("index", &self.index_counts())
            .field("roadmap", &self.roadmap())
            .finish()
    }
}

fn validate(request: &RouteRequest) -> Result<(), RouteError> {
    let check_point = |name: &str, p: Point| {
        if p.is_finite() {
            Ok(())
        } else {
            Err(RouteError::InvalidInput(format!("{name} must have finite coordinates")))
        }
    };
    check_point("start", request.start)?;
    check_point("end", request.end)?;

    for (name, value) in [
        ("margin", request.margin),
        ("expansionFactor", request.expansion_factor),
        ("simplificationEpsilon", request.simplification_epsilon),
    ] {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(RouteError::InvalidInput(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
    }

    if let Some(bbox) = request.custom_bbox {
        if !bbox.is_valid() {
            return Err(RouteError::InvalidInput(
                "customBBox must have finite corners with min <= max".into(),
            ));
        }
    }
    Ok(())
}
