use anyhow::Result;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::orchestrator::Orchestrator;
use crate::web::{handlers, AppState};

pub async fn start_web_server(orchestrator: Arc<Orchestrator>, host: &str, port: u16) -> Result<()> {
    let state = AppState::new(orchestrator);
    let app = create_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "web status API listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(handlers::get_status))
        .route("/api/safety", get(handlers::get_safety))
        .route("/api/services", get(handlers::get_services))
        .route("/api/metrics", get(handlers::get_metrics))
        .route("/api/alerts", get(handlers::get_alerts))
        .route("/api/alerts/{id}/ack", post(handlers::ack_alert))
        .route("/api/tools/{name}", post(handlers::run_tool))
        .route("/api/shutdown", post(handlers::shutdown))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
