//! Planner configuration from environment.

use std::env;
use std::path::PathBuf;

use nfz_core::{GeoBounds, RoadmapConfig, VisibilityConfig};

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub default_margin: f64,
    pub default_expansion_factor: f64,
    /// Route queries above this many vertices after simplification are rejected.
    pub max_vertices: usize,
    pub max_visibility_nodes: usize,
    /// Estimate a simplification tolerance when the request carries none.
    pub auto_simplify: bool,
    pub merge_contained_on_build: bool,
    pub roadmap_path: PathBuf,
    pub roadmap_bounds: GeoBounds,
    pub roadmap_attempt_factor: usize,
    /// Roadmap builds asking for more samples are rejected.
    pub max_roadmap_samples: usize,
    pub roadmap_seed: Option<u64>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            default_margin: 1000.0,
            default_expansion_factor: 1.0,
            max_vertices: 10_000,
            max_visibility_nodes: 1000,
            auto_simplify: true,
            merge_contained_on_build: true,
            roadmap_path: PathBuf::from("prm_graph.json"),
            roadmap_bounds: GeoBounds::NETHERLANDS,
            roadmap_attempt_factor: 10,
            max_roadmap_samples: 100_000,
            roadmap_seed: None,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            default_margin: env::var("NFZ_DEFAULT_MARGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_margin),
            default_expansion_factor: env::var("NFZ_DEFAULT_EXPANSION_FACTOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_expansion_factor),
            max_vertices: env::var("NFZ_MAX_VERTICES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_vertices),
            max_visibility_nodes: env::var("NFZ_MAX_VISIBILITY_NODES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_visibility_nodes),
            auto_simplify: env::var("NFZ_AUTO_SIMPLIFY")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.auto_simplify),
            merge_contained_on_build: env::var("NFZ_MERGE_CONTAINED")
                .ok()
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.merge_contained_on_build),
            roadmap_path: env::var("NFZ_ROADMAP_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.roadmap_path),
            roadmap_bounds: env::var("NFZ_ROADMAP_BOUNDS")
                .ok()
                .and_then(|s| parse_bounds(&s))
                .unwrap_or(defaults.roadmap_bounds),
            roadmap_attempt_factor: env::var("NFZ_ROADMAP_ATTEMPT_FACTOR")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.roadmap_attempt_factor),
            max_roadmap_samples: env::var("NFZ_MAX_ROADMAP_SAMPLES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_roadmap_samples),
            roadmap_seed: env::var("NFZ_ROADMAP_SEED")
                .ok()
                .and_then(|s| s.parse().ok()),
        }
    }

    pub fn visibility(&self) -> VisibilityConfig {
        VisibilityConfig {
            max_nodes: self.max_visibility_nodes,
            ..Default::default()
        }
    }

    pub fn roadmap(&self) -> RoadmapConfig {
        RoadmapConfig {
            bounds: self.roadmap_bounds,
            attempt_factor: self.roadmap_attempt_factor,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `minLon,minLat,maxLon,maxLat`; anything else is ignored.
fn parse_bounds(value: &str) -> Option<GeoBounds> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|part| part.trim().parse().ok())
        .collect::<Option<_>>()?;
    let [min_lon, min_lat, max_lon, max_lat] = parts[..] else {
        return None;
    };
    let bounds = GeoBounds {
        min_lat,
        max_lat,
        min_lon,
        max_lon,
    };
    bounds.is_valid().then_some(bounds)
}
