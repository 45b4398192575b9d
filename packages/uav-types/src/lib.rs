//! # uav-types
//!
//! Shared wire types for the Hornet fleet services.
//!
//! These types are used by:
//! - `pathplanner`: mission planning request/response bodies (HTTP `/plan`)
//! - `uav-simulator`: duplex channel messages exchanged with the backend
//!
//! ## Coordinate Conventions
//!
//! - **Planar frame**: mission x/y in "coordinate units" (not metres; the
//!   planner recovers units-per-metre from each origin/target pair)
//! - **Geographic frame**: WGS-84 lat/lng degrees
//! - **Simulator frame**: local Cartesian metres, z up, ground at z = 0

use serde::{Deserialize, Serialize};

// ── Mission planning request ──────────────────────────────────────────────────

/// One origin or target of a mission. Planar x/y must be present for
/// planning to proceed; lat/lng are optional and unlock geographic output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// A circular radio-frequency exclusion zone. `radius` is in metres; the
/// planner converts it to coordinate units before rasterization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JammerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

/// Body of `POST /plan`. Origins are paired with targets index-by-index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanRequest {
    #[serde(default)]
    pub origins: Vec<EndpointSpec>,
    #[serde(default)]
    pub targets: Vec<EndpointSpec>,
    #[serde(default)]
    pub jammers: Vec<JammerSpec>,
}

// ── Mission planning response ─────────────────────────────────────────────────

/// One step of a planned trajectory. lat/lng are present only when the
/// origin endpoint carried geography.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub alt: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryStats {
    pub total_waypoints: usize,
    /// Metres when geo waypoints are available, else coordinate units.
    pub path_length: f64,
    pub steps_in_jammer: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trajectory {
    pub origin_id: String,
    pub target_id: String,
    pub waypoints: Vec<Waypoint>,
    pub stats: TrajectoryStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanResponse {
    pub trajectories: Vec<Trajectory>,
    pub num_trajectories: usize,
    pub jammers_considered: usize,
    pub algorithm: String,
    /// Coordinate units per metre, recovered from the last planned pair.
    pub scale_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meters_per_coord: Option<f64>,
}

// ── Simulator state ───────────────────────────────────────────────────────────

/// 3D vector (metres or m/s depending on context)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Attitude in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Orientation {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
}

/// Flight status reported in every state update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UavStatus {
    #[default]
    Idle,
    Armed,
    Flying,
    Landing,
}

/// Telemetry payload of one `state_update` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UavStateData {
    pub position: Vec3,
    pub velocity: Vec3,
    pub orientation: Orientation,
    /// Percentage, rounded to 2 decimals on the wire.
    pub battery: f64,
    pub status: UavStatus,
    pub armed: bool,
}

// ── Duplex channel messages ───────────────────────────────────────────────────

/// Every frame on the simulator channel, discriminated by `type`.
///
/// Inbound to the simulator: `command`. Outbound: `command_response`
/// (exactly one per inbound command) and `state_update` (tick cadence).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    Command {
        command: String,
        #[serde(default)]
        params: serde_json::Value,
    },
    CommandResponse {
        command: String,
        success: bool,
        message: String,
    },
    StateUpdate {
        data: UavStateData,
        timestamp: String,
    },
}
