//! main.rs — Path planner service entry point
//!
//! Receives mission parameters (origins, targets, jammers) over HTTP and
//! returns waypoint trajectories planned with grid A* around jammer
//! exclusion zones. All planning state is request-local; requests plan
//! independently and in parallel.

mod astar;
mod geo;
mod grid;
mod handlers;
mod planner;
mod smooth;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use planner::PlannerConfig;

#[tokio::main]
async fn main() {
    // Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pathplanner=info".into()),
        )
        .init();

    info!("🛰 Path Planner service v{} starting", env!("CARGO_PKG_VERSION"));

    // CORS — mission-control UIs connect from arbitrary origins by default;
    // set CORS_ORIGINS to a comma-separated list to restrict.
    let cors_origins_env = std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
    let cors = if cors_origins_env.trim() == "*" {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = cors_origins_env
            .split(',')
            .filter_map(|o| o.trim().parse::<HeaderValue>().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/plan", post(handlers::plan))
        .with_state(PlannerConfig::default())
        .layer(cors);

    let port = std::env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("0.0.0.0:{port}");
    info!("🚀 Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
