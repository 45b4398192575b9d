//! planner.rs — Mission planning orchestration
//!
//! The pure engine behind the HTTP surface. For each origin/target pair it
//! recovers the planar scale, rasterizes jammers, repairs blocked endpoints,
//! runs A*, smooths the result, and projects waypoints back to lat/lng.
//!
//! Error policy: bad input (no origins, no targets, a paired endpoint
//! without planar coordinates) rejects the whole request; an infeasible pair
//! only drops that pair with a warning and the remaining pairs still plan.

use thiserror::Error;
use tracing::{info, warn};

use uav_types::{
    EndpointSpec, JammerSpec, PlanRequest, PlanResponse, Trajectory, TrajectoryStats, Waypoint,
};

use crate::astar;
use crate::geo::{self, GeoPoint, Point2};
use crate::grid::{GridBounds, GridCell, InflatedObstacle, ObstacleGrid, GRID_SCALE};
use crate::smooth;

/// Altitude assigned to every planned waypoint, metres.
const DEFAULT_ALTITUDE_M: f64 = 50.0;
/// Padding around the mission bounding box, unscaled cells per side.
const BOUNDS_MARGIN: i64 = 50;

// ── Configuration ─────────────────────────────────────────────────────────────

/// Caps the scaled search grid; pairs whose bounds exceed it are dropped
/// instead of rasterized (guards against huge radii or runaway scale
/// factors).
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub max_grid_cells: u64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_grid_cells: std::env::var("PLANNER_MAX_GRID_CELLS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64_000_000),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// Request-level validation failures; all map to a 400 response.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("No origins provided")]
    NoOrigins,
    #[error("No targets provided")]
    NoTargets,
    #[error("Endpoint {0} is missing x/y coordinates")]
    MissingPlanarCoords(String),
}

// ── Internal endpoint view ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Endpoint {
    xy: Point2,
    geo: Option<GeoPoint>,
}

fn endpoint_id(spec: &EndpointSpec, role: &str, index: usize) -> String {
    spec.id.clone().unwrap_or_else(|| format!("{role}-{index}"))
}

fn resolve_endpoint(spec: &EndpointSpec) -> Option<Endpoint> {
    let xy = Point2::new(spec.x?, spec.y?);
    let geo = match (spec.lat, spec.lng) {
        (Some(lat), Some(lng)) => Some(GeoPoint { lat, lng }),
        _ => None,
    };
    Some(Endpoint { xy, geo })
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Plan all origin/target pairs of a mission. The i-th origin pairs with the
/// i-th target; surplus endpoints on either side are ignored.
pub fn plan_mission(req: &PlanRequest, config: &PlannerConfig) -> Result<PlanResponse, PlanError> {
    info!(
        "Mission request: {} origins, {} targets, {} jammers",
        req.origins.len(),
        req.targets.len(),
        req.jammers.len()
    );

    if req.origins.is_empty() {
        return Err(PlanError::NoOrigins);
    }
    if req.targets.is_empty() {
        return Err(PlanError::NoTargets);
    }

    // Validate every paired endpoint up front so a bad request does no
    // partial work.
    let pair_count = req.origins.len().min(req.targets.len());
    let mut pairs = Vec::with_capacity(pair_count);
    for i in 0..pair_count {
        let origin_id = endpoint_id(&req.origins[i], "origin", i);
        let target_id = endpoint_id(&req.targets[i], "target", i);
        let origin = resolve_endpoint(&req.origins[i])
            .ok_or_else(|| PlanError::MissingPlanarCoords(origin_id.clone()))?;
        let target = resolve_endpoint(&req.targets[i])
            .ok_or_else(|| PlanError::MissingPlanarCoords(target_id.clone()))?;
        pairs.push((origin_id, target_id, origin, target));
    }

    let mut trajectories = Vec::new();
    let mut scale_factor = geo::DEFAULT_SCALE_FACTOR;

    for (origin_id, target_id, origin, target) in pairs {
        info!("Planning path from {origin_id} to {target_id}");
        let outcome = plan_pair(&origin, &target, &req.jammers, config);
        scale_factor = outcome.scale_factor;

        match outcome.waypoints {
            Some(waypoints) => {
                let stats = trajectory_stats(&waypoints, &origin, &target, &req.jammers);
                info!(
                    "Trajectory {origin_id} → {target_id}: {} waypoints, length {:.2}, {} steps in jammer zones",
                    stats.total_waypoints, stats.path_length, stats.steps_in_jammer
                );
                trajectories.push(Trajectory { origin_id, target_id, waypoints, stats });
            }
            None => warn!("No path found from {origin_id} to {target_id}; skipping pair"),
        }
    }

    Ok(PlanResponse {
        num_trajectories: trajectories.len(),
        trajectories,
        jammers_considered: req.jammers.len(),
        algorithm: "A* pathfinding".to_string(),
        scale_factor,
        meters_per_coord: (scale_factor != 0.0).then(|| 1.0 / scale_factor),
    })
}

// ── Per-pair planning ─────────────────────────────────────────────────────────

struct PairOutcome {
    scale_factor: f64,
    waypoints: Option<Vec<Waypoint>>,
}

impl PairOutcome {
    fn infeasible(scale_factor: f64) -> Self {
        Self { scale_factor, waypoints: None }
    }
}

fn plan_pair(
    origin: &Endpoint,
    target: &Endpoint,
    jammers: &[JammerSpec],
    config: &PlannerConfig,
) -> PairOutcome {
    let scale_factor = derive_scale(origin, target);
    let obstacles = inflate_jammers(jammers, scale_factor);

    // Unscaled bounds over the endpoints and every obstacle bounding box.
    let mut xs = vec![origin.xy.x, target.xy.x];
    let mut ys = vec![origin.xy.y, target.xy.y];
    for obs in &obstacles {
        xs.push(obs.center.x - obs.radius_units);
        xs.push(obs.center.x + obs.radius_units);
        ys.push(obs.center.y - obs.radius_units);
        ys.push(obs.center.y + obs.radius_units);
    }
    let min_of = |v: &[f64]| v.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_of = |v: &[f64]| v.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let bounds = GridBounds {
        x_min: min_of(&xs).floor() as i64 - BOUNDS_MARGIN,
        x_max: max_of(&xs).ceil() as i64 + BOUNDS_MARGIN,
        y_min: min_of(&ys).floor() as i64 - BOUNDS_MARGIN,
        y_max: max_of(&ys).ceil() as i64 + BOUNDS_MARGIN,
    }
    .scaled(GRID_SCALE);

    if bounds.cell_count() > config.max_grid_cells {
        warn!(
            "Search grid of {} cells exceeds cap {}; dropping pair",
            bounds.cell_count(),
            config.max_grid_cells
        );
        return PairOutcome::infeasible(scale_factor);
    }

    let grid = ObstacleGrid::rasterize(bounds, &obstacles);
    info!(
        "Grid x [{}, {}] y [{}, {}] at GRID_SCALE={GRID_SCALE}, {} blocked cells",
        bounds.x_min,
        bounds.x_max,
        bounds.y_min,
        bounds.y_max,
        grid.blocked_count()
    );

    let start_cell = to_cell(origin.xy);
    let goal_cell = to_cell(target.xy);

    let start = grid.nearest_free_cell(start_cell);
    if start != start_cell {
        warn!("Shifted start from {start_cell:?} to free cell {start:?}");
    }
    let goal = grid.nearest_free_cell(goal_cell);
    if goal != goal_cell {
        warn!("Shifted goal from {goal_cell:?} to free cell {goal:?}");
    }

    let Some(path) = astar::astar(&grid, start, goal) else {
        return PairOutcome::infeasible(scale_factor);
    };
    info!("A* found path with {} waypoints", path.len());

    let smoothed = smooth::smooth_path(&grid, &path);
    if smoothed.len() != path.len() {
        info!("Smoothed path from {} to {} waypoints", path.len(), smoothed.len());
    }

    // Unscale cells back to coordinate units and project to lat/lng.
    let mut waypoints: Vec<Waypoint> = smoothed
        .iter()
        .map(|&(i, j)| {
            let p = Point2::new(i as f64 / GRID_SCALE as f64, j as f64 / GRID_SCALE as f64);
            let geo_pt = origin
                .geo
                .map(|og| geo::project_to_geo(og, origin.xy, p, scale_factor));
            Waypoint {
                x: p.x,
                y: p.y,
                alt: DEFAULT_ALTITUDE_M,
                lat: geo_pt.map(|g| g.lat),
                lng: geo_pt.map(|g| g.lng),
            }
        })
        .collect();

    // Snap first/last to the exact endpoints when their own cells are free;
    // a repaired endpoint keeps the repaired waypoint instead.
    if !grid.is_blocked(start_cell) {
        if let Some(first) = waypoints.first_mut() {
            first.x = origin.xy.x;
            first.y = origin.xy.y;
            if let Some(og) = origin.geo {
                first.lat = Some(og.lat);
                first.lng = Some(og.lng);
            }
        }
    } else {
        warn!("Origin lies inside a jammer; keeping first free waypoint");
    }
    if !grid.is_blocked(goal_cell) {
        if let Some(last) = waypoints.last_mut() {
            last.x = target.xy.x;
            last.y = target.xy.y;
            if let Some(tg) = target.geo {
                last.lat = Some(tg.lat);
                last.lng = Some(tg.lng);
            }
        }
    } else {
        warn!("Target lies inside a jammer; keeping last free waypoint");
    }

    PairOutcome { scale_factor, waypoints: Some(waypoints) }
}

fn derive_scale(origin: &Endpoint, target: &Endpoint) -> f64 {
    let scale = geo::derive_scale_factor(origin.xy, target.xy, origin.geo, target.geo);
    if scale == geo::DEFAULT_SCALE_FACTOR {
        warn!("Could not derive scale factor from endpoints, using default");
    } else {
        info!("Scale factor: {scale:.6} coordinate units per metre");
    }
    scale
}

fn to_cell(p: Point2) -> GridCell {
    (
        (p.x * GRID_SCALE as f64).round() as i64,
        (p.y * GRID_SCALE as f64).round() as i64,
    )
}

/// Jammer radii arrive in metres; convert to coordinate units. Jammers
/// without planar fields or with a non-positive radius are skipped.
fn inflate_jammers(jammers: &[JammerSpec], scale_factor: f64) -> Vec<InflatedObstacle> {
    let mut out = Vec::new();
    for j in jammers {
        let (Some(x), Some(y), Some(radius)) = (j.x, j.y, j.radius) else {
            continue;
        };
        if radius <= 0.0 {
            warn!("Jammer {:?} has a non-positive radius; skipping", j.id);
            continue;
        }
        let radius_units = radius * scale_factor;
        info!("Jammer at ({x:.2}, {y:.2}), radius {radius}m = {radius_units:.2} coords");
        out.push(InflatedObstacle { center: Point2::new(x, y), radius_units });
    }
    out
}

// ── Statistics ────────────────────────────────────────────────────────────────

fn trajectory_stats(
    waypoints: &[Waypoint],
    origin: &Endpoint,
    target: &Endpoint,
    jammers: &[JammerSpec],
) -> TrajectoryStats {
    // Geographic length when both endpoints carry geo, planar otherwise.
    let path_length: f64 = if origin.geo.is_some() && target.geo.is_some() {
        waypoints
            .windows(2)
            .map(|w| match ((w[0].lat, w[0].lng), (w[1].lat, w[1].lng)) {
                ((Some(lat1), Some(lng1)), (Some(lat2), Some(lng2))) => {
                    geo::haversine_distance(lat1, lng1, lat2, lng2)
                }
                _ => 0.0,
            })
            .sum()
    } else {
        waypoints
            .windows(2)
            .map(|w| Point2::new(w[0].x, w[0].y).dist(Point2::new(w[1].x, w[1].y)))
            .sum()
    };

    // Each waypoint counts at most once, however many discs cover it.
    let steps_in_jammer = waypoints
        .iter()
        .filter(|wp| {
            let (Some(lat), Some(lng)) = (wp.lat, wp.lng) else {
                return false;
            };
            jammers.iter().any(|j| match (j.lat, j.lng, j.radius) {
                (Some(jlat), Some(jlng), Some(radius)) => {
                    geo::haversine_distance(lat, lng, jlat, jlng) <= radius
                }
                _ => false,
            })
        })
        .count();

    TrajectoryStats {
        total_waypoints: waypoints.len(),
        path_length: (path_length * 100.0).round() / 100.0,
        steps_in_jammer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::EARTH_RADIUS_M;

    // Latitude whose great-circle distance from the equator is `meters`,
    // so planar x in "metres north" gives scale_factor = 1.
    fn lat_for_meters(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_M).to_degrees()
    }

    fn endpoint(id: &str, x: f64, y: f64, geo: Option<(f64, f64)>) -> EndpointSpec {
        EndpointSpec {
            id: Some(id.to_string()),
            lat: geo.map(|g| g.0),
            lng: geo.map(|g| g.1),
            x: Some(x),
            y: Some(y),
        }
    }

    fn jammer(id: &str, x: f64, y: f64, radius: f64, geo: Option<(f64, f64)>) -> JammerSpec {
        JammerSpec {
            id: Some(id.to_string()),
            x: Some(x),
            y: Some(y),
            radius: Some(radius),
            lat: geo.map(|g| g.0),
            lng: geo.map(|g| g.1),
        }
    }

    fn unit_scale_request(jammers: Vec<JammerSpec>) -> PlanRequest {
        PlanRequest {
            origins: vec![endpoint("ORIGIN-1", 0.0, 0.0, Some((0.0, 0.0)))],
            targets: vec![endpoint("TARGET-1", 100.0, 0.0, Some((lat_for_meters(100.0), 0.0)))],
            jammers,
        }
    }

    #[test]
    fn straight_line_without_jammers_is_two_waypoints() {
        let resp = plan_mission(&unit_scale_request(vec![]), &PlannerConfig::default()).unwrap();
        assert_eq!(resp.num_trajectories, 1);
        assert_eq!(resp.jammers_considered, 0);
        assert!((resp.scale_factor - 1.0).abs() < 1e-9);

        let t = &resp.trajectories[0];
        assert_eq!(t.origin_id, "ORIGIN-1");
        assert_eq!(t.target_id, "TARGET-1");
        assert_eq!(t.stats.total_waypoints, 2);
        assert_eq!(t.stats.steps_in_jammer, 0);
        assert!((t.stats.path_length - 100.0).abs() < 0.01);

        // Free endpoints snap to the exact origin/target, planar and geo.
        let first = &t.waypoints[0];
        let last = &t.waypoints[1];
        assert_eq!((first.x, first.y), (0.0, 0.0));
        assert_eq!(first.lat, Some(0.0));
        assert_eq!(first.lng, Some(0.0));
        assert_eq!((last.x, last.y), (100.0, 0.0));
        assert_eq!(last.lat, Some(lat_for_meters(100.0)));
        assert_eq!(last.lng, Some(0.0));
        assert!(t.waypoints.iter().all(|w| w.alt == 50.0));
    }

    #[test]
    fn detour_around_one_jammer() {
        let req = unit_scale_request(vec![jammer(
            "JAMMER-1",
            50.0,
            0.0,
            20.0,
            Some((lat_for_meters(50.0), 0.0)),
        )]);
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        assert_eq!(resp.num_trajectories, 1);

        let t = &resp.trajectories[0];
        assert!(t.stats.path_length > 100.0, "length {}", t.stats.path_length);
        assert!(t.stats.path_length < 111.0, "length {}", t.stats.path_length);
        let center = Point2::new(50.0, 0.0);
        for wp in &t.waypoints {
            let d = Point2::new(wp.x, wp.y).dist(center);
            assert!(d > 20.0, "waypoint ({}, {}) is {d} units from the jammer", wp.x, wp.y);
        }
    }

    #[test]
    fn blocked_origin_is_repaired_outside_the_disc() {
        let req = PlanRequest {
            origins: vec![endpoint("ORIGIN-1", 0.0, 0.0, Some((0.0, 0.0)))],
            targets: vec![endpoint("TARGET-1", 100.0, 0.0, Some((lat_for_meters(100.0), 0.0)))],
            jammers: vec![jammer("JAMMER-1", 0.0, 0.0, 10.0, Some((0.0, 0.0)))],
        };
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        assert_eq!(resp.num_trajectories, 1);

        let t = &resp.trajectories[0];
        let first = &t.waypoints[0];
        let start = Point2::new(first.x, first.y);
        // Repaired start: outside the disc, but close to the requested origin.
        assert!(start.dist(Point2::new(0.0, 0.0)) > 10.0);
        assert!(start.dist(Point2::new(0.0, 0.0)) <= 11.0);
        // Target is free, so the far end still snaps exactly.
        let last = t.waypoints.last().unwrap();
        assert_eq!((last.x, last.y), (100.0, 0.0));
    }

    #[test]
    fn sealed_target_drops_the_pair_but_not_the_request() {
        let req = PlanRequest {
            origins: vec![endpoint("ORIGIN-1", 0.0, 0.0, Some((0.0, 0.0)))],
            targets: vec![endpoint("TARGET-1", 100.0, 0.0, Some((lat_for_meters(100.0), 0.0)))],
            jammers: vec![jammer(
                "JAMMER-1",
                100.0,
                0.0,
                500.0,
                Some((lat_for_meters(100.0), 0.0)),
            )],
        };
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        assert_eq!(resp.num_trajectories, 0);
        assert!(resp.trajectories.is_empty());
        assert_eq!(resp.jammers_considered, 1);
    }

    #[test]
    fn oversized_grid_drops_the_pair() {
        let req = unit_scale_request(vec![]);
        let config = PlannerConfig { max_grid_cells: 1_000 };
        let resp = plan_mission(&req, &config).unwrap();
        assert_eq!(resp.num_trajectories, 0);
    }

    #[test]
    fn planning_is_deterministic() {
        let req = unit_scale_request(vec![jammer(
            "JAMMER-1",
            50.0,
            0.0,
            20.0,
            Some((lat_for_meters(50.0), 0.0)),
        )]);
        let config = PlannerConfig::default();
        let a = serde_json::to_string(&plan_mission(&req, &config).unwrap()).unwrap();
        let b = serde_json::to_string(&plan_mission(&req, &config).unwrap()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn planar_only_missions_omit_geo() {
        let req = PlanRequest {
            origins: vec![endpoint("ORIGIN-1", 0.0, 0.0, None)],
            targets: vec![endpoint("TARGET-1", 10.0, 10.0, None)],
            jammers: vec![],
        };
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        let t = &resp.trajectories[0];
        assert!(t.waypoints.iter().all(|w| w.lat.is_none() && w.lng.is_none()));
        // Planar fallback: Euclidean path length and the default scale.
        assert!((t.stats.path_length - 200.0_f64.sqrt()).abs() < 0.01);
        assert_eq!(resp.scale_factor, geo::DEFAULT_SCALE_FACTOR);
    }

    #[test]
    fn pairing_truncates_to_the_shorter_side() {
        let req = PlanRequest {
            origins: vec![
                endpoint("ORIGIN-1", 0.0, 0.0, None),
                endpoint("ORIGIN-2", 5.0, 5.0, None),
            ],
            targets: vec![endpoint("TARGET-1", 10.0, 0.0, None)],
            jammers: vec![],
        };
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        assert_eq!(resp.num_trajectories, 1);
        assert_eq!(resp.trajectories[0].origin_id, "ORIGIN-1");
    }

    #[test]
    fn missing_ids_get_positional_defaults() {
        let req = PlanRequest {
            origins: vec![EndpointSpec { id: None, lat: None, lng: None, x: Some(0.0), y: Some(0.0) }],
            targets: vec![EndpointSpec { id: None, lat: None, lng: None, x: Some(5.0), y: Some(0.0) }],
            jammers: vec![],
        };
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        assert_eq!(resp.trajectories[0].origin_id, "origin-0");
        assert_eq!(resp.trajectories[0].target_id, "target-0");
    }

    #[test]
    fn validation_errors_reject_the_request() {
        let config = PlannerConfig::default();
        let empty = PlanRequest::default();
        assert_eq!(plan_mission(&empty, &config).unwrap_err(), PlanError::NoOrigins);

        let no_targets = PlanRequest {
            origins: vec![endpoint("ORIGIN-1", 0.0, 0.0, None)],
            ..Default::default()
        };
        assert_eq!(plan_mission(&no_targets, &config).unwrap_err(), PlanError::NoTargets);

        let missing_xy = PlanRequest {
            origins: vec![EndpointSpec {
                id: Some("ORIGIN-1".to_string()),
                lat: Some(37.5),
                lng: Some(-122.5),
                x: None,
                y: None,
            }],
            targets: vec![endpoint("TARGET-1", 10.0, 0.0, None)],
            jammers: vec![],
        };
        assert_eq!(
            plan_mission(&missing_xy, &config).unwrap_err(),
            PlanError::MissingPlanarCoords("ORIGIN-1".to_string())
        );
    }

    #[test]
    fn smoothed_segments_stay_clear_of_jammers() {
        // Rebuild the grid the planner used and Bresenham-check every chord.
        let req = unit_scale_request(vec![
            jammer("JAMMER-1", 35.0, 5.0, 12.0, Some((lat_for_meters(35.0), 0.0))),
            jammer("JAMMER-2", 65.0, -6.0, 15.0, Some((lat_for_meters(65.0), 0.0))),
        ]);
        let resp = plan_mission(&req, &PlannerConfig::default()).unwrap();
        assert_eq!(resp.num_trajectories, 1);

        let obstacles = [
            InflatedObstacle { center: Point2::new(35.0, 5.0), radius_units: 12.0 },
            InflatedObstacle { center: Point2::new(65.0, -6.0), radius_units: 15.0 },
        ];
        // Same bounds the planner derives: endpoints ∪ obstacle boxes, padded.
        let bounds = GridBounds { x_min: -50, x_max: 150, y_min: -71, y_max: 67 }
            .scaled(GRID_SCALE);
        let grid = ObstacleGrid::rasterize(bounds, &obstacles);

        let cells: Vec<GridCell> = resp.trajectories[0]
            .waypoints
            .iter()
            .map(|w| to_cell(Point2::new(w.x, w.y)))
            .collect();
        for w in cells.windows(2) {
            assert!(smooth::line_of_sight(&grid, w[0], w[1]));
        }
    }
}
