//! Route planning service around the `nfz-core` engine.

pub mod config;
pub mod planner;
pub mod store;

pub use config::PlannerConfig;
pub use planner::RoutePlanner;
pub use store::RoadmapStore;
