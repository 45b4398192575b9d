//! geo.rs — Coordinate model
//!
//! Missions mix three frames: the planar "coordinate units" the search runs
//! in, metres, and WGS-84 lat/lng. Coordinate units are not metres; the
//! units-per-metre scale is recovered empirically per origin/target pair by
//! dividing the planar separation by the great-circle separation.
//!
//! Reprojection back to lat/lng is equirectangular at the origin latitude,
//! acceptable because trajectories are short relative to Earth curvature.
//! Frame contract: planar x is north-aligned, so Δlat derives from Δx and
//! Δlng from Δy.

// ── Constants ─────────────────────────────────────────────────────────────────

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const METERS_PER_DEG_LAT: f64 = 110_540.0;
pub const METERS_PER_DEG_LNG_EQUATOR: f64 = 111_320.0;

/// Units-per-metre fallback when an endpoint pair is degenerate or carries
/// no geography (0.0001 degrees ≈ 11 m).
pub const DEFAULT_SCALE_FACTOR: f64 = 0.0001;

// ── Types ─────────────────────────────────────────────────────────────────────

/// Planar position in coordinate units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist(&self, other: Point2) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// WGS-84 position in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

// ── Distance & scale ──────────────────────────────────────────────────────────

/// Great-circle distance between two lat/lng points in metres.
pub fn haversine_distance(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lng2 - lng1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Coordinate units per metre for one endpoint pair. Falls back to
/// [`DEFAULT_SCALE_FACTOR`] when the planar separation is zero or either
/// endpoint lacks geography.
pub fn derive_scale_factor(
    origin_xy: Point2,
    target_xy: Point2,
    origin_geo: Option<GeoPoint>,
    target_geo: Option<GeoPoint>,
) -> f64 {
    let d_xy = origin_xy.dist(target_xy);
    if d_xy <= 0.0 {
        return DEFAULT_SCALE_FACTOR;
    }
    match (origin_geo, target_geo) {
        (Some(og), Some(tg)) => d_xy / haversine_distance(og.lat, og.lng, tg.lat, tg.lng),
        _ => DEFAULT_SCALE_FACTOR,
    }
}

// ── Reprojection ──────────────────────────────────────────────────────────────

/// Project a planar point back to lat/lng as an offset from the origin
/// endpoint. Δlat comes from Δx and Δlng from Δy (north-aligned planar x).
pub fn project_to_geo(
    origin_geo: GeoPoint,
    origin_xy: Point2,
    point: Point2,
    scale_factor: f64,
) -> GeoPoint {
    let dx_units = point.x - origin_xy.x;
    let dy_units = point.y - origin_xy.y;

    // scale_factor is units per metre, so metres = units / scale_factor.
    let dx_m = if scale_factor != 0.0 { dx_units / scale_factor } else { 0.0 };
    let dy_m = if scale_factor != 0.0 { dy_units / scale_factor } else { 0.0 };

    let meters_per_deg_lng = METERS_PER_DEG_LNG_EQUATOR * origin_geo.lat.to_radians().cos();
    let dlat = dx_m / METERS_PER_DEG_LAT;
    let dlng = if meters_per_deg_lng != 0.0 { dy_m / meters_per_deg_lng } else { 0.0 };

    GeoPoint {
        lat: origin_geo.lat + dlat,
        lng: origin_geo.lng + dlng,
    }
}
