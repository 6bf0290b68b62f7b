pub mod config;
pub mod modules;
pub mod services;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use modules::metrics::metrics_routes;
use modules::monitor::{status_routes, MonitorStore};
use services::metrics::MonitorMetrics;

pub struct AppState {
    pub store: Arc<dyn MonitorStore>,
    pub metrics: Arc<MonitorMetrics>,
}

pub fn create_app(state: AppState) -> Router {
    let metrics = Arc::clone(&state.metrics);
    let state = Arc::new(state);

    Router::new()
        .route("/", get(root))
        .nest("/api", status_routes())
        .with_state(state)
        .merge(metrics_routes(metrics))
        .layer(TraceLayer::new_for_http())
}

async fn root() -> &'static str {
    "Pulsewatch Monitoring Engine"
}
