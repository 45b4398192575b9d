//! uav.rs — UAV state & physics
//!
//! Command-driven kinematic model for a single airframe. Each tick drains
//! the battery, integrates velocity, clamps to the ground, applies drag
//! proportional to speed, and blends velocity toward the seek target with a
//! first-order low-pass. The blend gain has units of 1/s; it shapes
//! responsiveness and is not a physical acceleration.
//!
//! Seek runs while airborne (flying or landing). The arrival cutoff that
//! clears the target and parks the airframe applies only while flying; a
//! landing keeps its ground target until touchdown, where the ground clamp
//! completes the transition to armed.

use serde_json::Value;

use uav_types::{ChannelMessage, Orientation, UavStateData, UavStatus, Vec3};

// ── Physics constants ─────────────────────────────────────────────────────────

/// Top speed, m/s (120 km/h). Seek targets half of this.
pub const MAX_VELOCITY_MPS: f64 = 33.33;
/// Seek blend gain, 1/s.
pub const RESPONSIVENESS_GAIN: f64 = 5.0;
pub const DRAG_COEFFICIENT: f64 = 0.5;
/// Battery drain, %/s.
pub const BATTERY_DRAIN_IDLE: f64 = 0.01;
pub const BATTERY_DRAIN_FLYING: f64 = 0.05;
/// Below this battery percentage a flying UAV is forced into landing.
pub const LOW_BATTERY_PCT: f64 = 10.0;

/// Seek target counts as reached inside this radius, m.
const TARGET_REACHED_M: f64 = 0.5;
/// Maximum altitude still treated as "on the ground" for arm/disarm, m.
const GROUND_EPSILON_M: f64 = 0.1;
const DEFAULT_TAKEOFF_ALTITUDE_M: f64 = 10.0;

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Uav {
    pub id: String,
    /// Metres, z up; ground at z = 0.
    pub position: Vec3,
    /// m/s
    pub velocity: Vec3,
    /// Degrees
    pub orientation: Orientation,
    /// Percent, clamped to [0, 100].
    pub battery: f64,
    pub status: UavStatus,
    pub armed: bool,
    pub target: Option<Vec3>,
}

impl Uav {
    pub fn new(id: impl Into<String>, initial_position: Vec3) -> Self {
        Self {
            id: id.into(),
            position: initial_position,
            velocity: Vec3::zero(),
            orientation: Orientation::default(),
            battery: 100.0,
            status: UavStatus::Idle,
            armed: false,
            target: None,
        }
    }

    /// Advance the simulation by `dt` seconds.
    pub fn update_physics(&mut self, dt: f64) {
        // Battery drain; flying costs more than sitting (or descending).
        let drain = if self.status == UavStatus::Flying {
            BATTERY_DRAIN_FLYING
        } else {
            BATTERY_DRAIN_IDLE
        };
        self.battery = (self.battery - drain * dt).clamp(0.0, 100.0);

        // Forced landing below the battery floor, overriding any prior target.
        if self.battery < LOW_BATTERY_PCT && self.status == UavStatus::Flying {
            self.status = UavStatus::Landing;
            self.target = Some(Vec3::new(self.position.x, self.position.y, 0.0));
        }

        if matches!(self.status, UavStatus::Flying | UavStatus::Landing) {
            self.position.x += self.velocity.x * dt;
            self.position.y += self.velocity.y * dt;
            self.position.z += self.velocity.z * dt;

            // Ground clamp; touchdown completes a landing.
            if self.position.z < 0.0 {
                self.position.z = 0.0;
                self.velocity.z = 0.0;
                if self.status == UavStatus::Landing {
                    self.status = UavStatus::Armed;
                    self.velocity = Vec3::zero();
                }
            }

            // Drag opposes motion, proportional to speed.
            let speed = self.velocity.norm();
            if speed > 0.0 {
                let drag = DRAG_COEFFICIENT * speed;
                self.velocity.x -= self.velocity.x / speed * drag * dt;
                self.velocity.y -= self.velocity.y / speed * drag * dt;
                self.velocity.z -= self.velocity.z / speed * drag * dt;
            }
        }

        // Seek while airborne.
        if matches!(self.status, UavStatus::Flying | UavStatus::Landing) {
            if let Some(target) = self.target {
                let dx = target.x - self.position.x;
                let dy = target.y - self.position.y;
                let dz = target.z - self.position.z;
                let distance = (dx * dx + dy * dy + dz * dz).sqrt();

                if distance < TARGET_REACHED_M && self.status == UavStatus::Flying {
                    self.target = None;
                    self.velocity = Vec3::zero();
                } else if distance > 0.0 {
                    let vt = Vec3::new(
                        dx / distance * MAX_VELOCITY_MPS * 0.5,
                        dy / distance * MAX_VELOCITY_MPS * 0.5,
                        dz / distance * MAX_VELOCITY_MPS * 0.5,
                    );
                    self.velocity.x += (vt.x - self.velocity.x) * RESPONSIVENESS_GAIN * dt;
                    self.velocity.y += (vt.y - self.velocity.y) * RESPONSIVENESS_GAIN * dt;
                    self.velocity.z += (vt.z - self.velocity.z) * RESPONSIVENESS_GAIN * dt;
                }
            }
        }
    }

    /// Apply one command; returns exactly one response. A failed
    /// precondition leaves the state untouched.
    pub fn handle_command(&mut self, command: &str, params: &Value) -> ChannelMessage {
        let (success, message) = match command {
            "arm" => {
                if !self.armed && self.position.z < GROUND_EPSILON_M {
                    self.armed = true;
                    self.status = UavStatus::Armed;
                    (true, "UAV armed".to_string())
                } else {
                    (false, "Cannot arm (already armed or not on ground)".to_string())
                }
            }
            "disarm" => {
                if self.armed && self.position.z < GROUND_EPSILON_M {
                    self.armed = false;
                    self.status = UavStatus::Idle;
                    (true, "UAV disarmed".to_string())
                } else {
                    (false, "Cannot disarm (not on ground or not armed)".to_string())
                }
            }
            "takeoff" => {
                if self.armed && self.status == UavStatus::Armed {
                    let altitude = params
                        .get("altitude")
                        .and_then(Value::as_f64)
                        .unwrap_or(DEFAULT_TAKEOFF_ALTITUDE_M);
                    self.status = UavStatus::Flying;
                    self.target = Some(Vec3::new(self.position.x, self.position.y, altitude));
                    (true, format!("Taking off to {altitude}m"))
                } else {
                    (false, "Cannot takeoff (not armed or already flying)".to_string())
                }
            }
            "land" => {
                if self.status == UavStatus::Flying {
                    self.status = UavStatus::Landing;
                    self.target = Some(Vec3::new(self.position.x, self.position.y, 0.0));
                    (true, "Landing initiated".to_string())
                } else {
                    (false, "Cannot land (not flying)".to_string())
                }
            }
            "move" => {
                if self.status == UavStatus::Flying {
                    let dx = params.get("dx").and_then(Value::as_f64).unwrap_or(0.0);
                    let dy = params.get("dy").and_then(Value::as_f64).unwrap_or(0.0);
                    let dz = params.get("dz").and_then(Value::as_f64).unwrap_or(0.0);
                    self.target = Some(Vec3::new(
                        self.position.x + dx,
                        self.position.y + dy,
                        (self.position.z + dz).max(0.0),
                    ));
                    (true, format!("Moving by ({dx}, {dy}, {dz})"))
                } else {
                    (false, "Cannot move (not flying)".to_string())
                }
            }
            "rotate" => {
                if self.status == UavStatus::Flying {
                    let yaw_change = params.get("yaw").and_then(Value::as_f64).unwrap_or(0.0);
                    self.orientation.yaw = (self.orientation.yaw + yaw_change).rem_euclid(360.0);
                    (true, format!("Rotating by {yaw_change} degrees"))
                } else {
                    (false, "Cannot rotate (not flying)".to_string())
                }
            }
            "goto" => {
                if self.status == UavStatus::Flying {
                    let x = params.get("x").and_then(Value::as_f64).unwrap_or(self.position.x);
                    let y = params.get("y").and_then(Value::as_f64).unwrap_or(self.position.y);
                    let z = params.get("z").and_then(Value::as_f64).unwrap_or(self.position.z);
                    self.target = Some(Vec3::new(x, y, z.max(0.0)));
                    (true, format!("Going to position ({x}, {y}, {z})"))
                } else {
                    (false, "Cannot goto (not flying)".to_string())
                }
            }
            other => (false, format!("Unknown command: {other}")),
        };

        ChannelMessage::CommandResponse {
            command: command.to_string(),
            success,
            message,
        }
    }

    /// Telemetry snapshot for one `state_update` message.
    pub fn state_update(&self) -> ChannelMessage {
        ChannelMessage::StateUpdate {
            data: UavStateData {
                position: self.position,
                velocity: self.velocity,
                orientation: self.orientation,
                battery: (self.battery * 100.0).round() / 100.0,
                status: self.status,
                armed: self.armed,
            },
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
