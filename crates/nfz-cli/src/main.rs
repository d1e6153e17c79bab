//! `nfz` - plan drone routes around no-fly zones from the command line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use nfz_core::{
    BoundingBox, IndexBuildRequest, Point, Polygon, RoadmapBuildRequest, RouteRequest,
    RouteStrategy,
};
use nfz_planner::{PlannerConfig, RoutePlanner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Roadmap file (overrides NFZ_ROADMAP_PATH)
    #[arg(long, global = true)]
    roadmap_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan one route and print the response as JSON
    Route {
        /// JSON file holding an array of polygons
        #[arg(long)]
        zones: PathBuf,

        /// Start point as x,y
        #[arg(long, value_parser = parse_point)]
        start: Point,

        /// End point as x,y
        #[arg(long, value_parser = parse_point)]
        end: Point,

        #[arg(long)]
        margin: Option<f64>,

        #[arg(long)]
        expansion_factor: Option<f64>,

        /// Query rectangle as minX,minY,maxX,maxY
        #[arg(long, value_parser = parse_bbox)]
        bbox: Option<BoundingBox>,

        /// Douglas-Peucker tolerance
        #[arg(long)]
        epsilon: Option<f64>,

        #[arg(long, value_enum, default_value_t = Strategy::Visibility)]
        strategy: Strategy,
    },

    /// Sample a roadmap and save it
    BuildRoadmap {
        /// JSON file holding an array of polygons
        #[arg(long)]
        zones: PathBuf,

        #[arg(long, default_value_t = 5000)]
        samples: usize,

        /// Connection radius in coordinate units
        #[arg(long, default_value_t = 0.05)]
        radius: f64,

        #[arg(long)]
        seed: Option<u64>,

        /// Keep the roadmap in memory only
        #[arg(long)]
        no_save: bool,
    },

    /// Summarize the saved roadmap
    InspectRoadmap {
        /// Also report the node nearest to x,y
        #[arg(long, value_parser = parse_point)]
        near: Option<Point>,

        /// Write every edge as a segment to this JSON file
        #[arg(long)]
        segments: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Strategy {
    Visibility,
    Roadmap,
}

impl From<Strategy> for RouteStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Visibility => RouteStrategy::Visibility,
            Strategy::Roadmap => RouteStrategy::Roadmap,
        }
    }
}

fn parse_numbers<const N: usize>(value: &str) -> Result<[f64; N], String> {
    let numbers = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|e| format!("{part:?}: {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    numbers
        .try_into()
        .map_err(|_| format!("expected {N} comma-separated numbers"))
}

fn parse_point(value: &str) -> Result<Point, String> {
    let [x, y] = parse_numbers::<2>(value)?;
    Ok(Point::new(x, y))
}

fn parse_bbox(value: &str) -> Result<BoundingBox, String> {
    let [min_x, min_y, max_x, max_y] = parse_numbers::<4>(value)?;
    Ok(BoundingBox::new(min_x, min_y, max_x, max_y))
}

fn load_zones(path: &Path) -> Result<Vec<Polygon>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading zones from {}", path.display()))?;
    let zones: Vec<Polygon> = serde_json::from_str(&data)
        .with_context(|| format!("parsing zones in {}", path.display()))?;
    tracing::info!("Loaded {} zones from {}", zones.len(), path.display());
    Ok(zones)
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("nfz_planner=info".parse()?)
                .add_directive("nfz_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let mut config = PlannerConfig::from_env();
    if let Some(path) = args.roadmap_path {
        config.roadmap_path = path;
    }

    match args.command {
        Command::Route {
            zones,
            start,
            end,
            margin,
            expansion_factor,
            bbox,
            epsilon,
            strategy,
        } => {
            let planner = RoutePlanner::new(config);
            planner.build_index(IndexBuildRequest {
                polygons: load_zones(&zones)?,
                force: false,
            })?;

            let strategy = RouteStrategy::from(strategy);
            if strategy == RouteStrategy::Roadmap && !planner.load_roadmap() {
                bail!(
                    "no usable roadmap at {}; run build-roadmap first",
                    planner.store().path().display()
                );
            }

            let response = planner.plan_route(&RouteRequest {
                start,
                end,
                margin,
                expansion_factor,
                custom_bbox: bbox,
                simplification_epsilon: epsilon,
                strategy,
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
            if !response.success {
                bail!(response.message.unwrap_or_else(|| "route failed".to_string()));
            }
        }
        Command::BuildRoadmap {
            zones,
            samples,
            radius,
            seed,
            no_save,
        } => {
            if seed.is_some() {
                config.roadmap_seed = seed;
            }
            let planner = RoutePlanner::new(config);
            let summary = planner.build_roadmap(RoadmapBuildRequest {
                num_samples: samples,
                connection_radius: radius,
                save_to_file: !no_save,
                force: true,
                no_fly_zones: load_zones(&zones)?,
            })?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::InspectRoadmap { near, segments } => {
            let planner = RoutePlanner::new(config);
            if !planner.load_roadmap() {
                bail!("no usable roadmap at {}", planner.store().path().display());
            }
            let Some(prepared) = planner.roadmap() else {
                bail!("roadmap not loaded");
            };
            let roadmap = prepared.roadmap();
            println!("nodes:             {}", roadmap.len());
            println!("edges:             {}", roadmap.edge_count());
            println!("requested samples: {}", roadmap.num_samples);
            println!("connection radius: {}", roadmap.connection_radius);
            if let Some(built_at) = roadmap.built_at {
                println!("built at:          {}", built_at.to_rfc3339());
            }
            if let Some(point) = near {
                match prepared.nearest_node(point) {
                    Some((id, distance)) => println!("nearest node:      {id} at {distance:.6}"),
                    None => println!("nearest node:      none"),
                }
            }
            if let Some(path) = segments {
                let lines: Vec<[Point; 2]> = prepared
                    .edge_segments()
                    .into_iter()
                    .map(|segment| [segment.a, segment.b])
                    .collect();
                fs::write(&path, serde_json::to_string(&lines)?)
                    .with_context(|| format!("writing segments to {}", path.display()))?;
                println!("segments:          {} written to {}", lines.len(), path.display());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_and_bbox_arguments_parse() {
        assert_eq!(parse_point("4.9, 52.3"), Ok(Point::new(4.9, 52.3)));
        assert_eq!(
            parse_bbox("0,1,2,3"),
            Ok(BoundingBox::new(0.0, 1.0, 2.0, 3.0))
        );
        assert!(parse_point("1").is_err());
        assert!(parse_point("1,x").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
