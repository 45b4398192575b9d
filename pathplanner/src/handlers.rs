//! handlers.rs — HTTP surface
//!
//! Thin axum layer over the planning engine. Validation failures become 400
//! with an `error` body; per-pair infeasibility never fails the request.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use uav_types::PlanRequest;

use crate::planner::{self, PlannerConfig};

/// GET /health
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "service": "pathplanner" }))
}

/// POST /plan
pub async fn plan(
    State(config): State<PlannerConfig>,
    Json(req): Json<PlanRequest>,
) -> Response {
    match planner::plan_mission(&req, &config) {
        Ok(resp) => {
            info!("Returning {} trajectories", resp.num_trajectories);
            (StatusCode::OK, Json(resp)).into_response()
        }
        Err(err) => {
            warn!("Rejecting plan request: {err}");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}
