use crate::state::AppState;
use crate::{api, logging};
use axum::middleware;
use axum::routing::get;
use axum::Router;

/// Builds the exporter's router: the landing page at `/` and the scrape
/// endpoint at the configured metrics path.
pub fn build_http_app(state: AppState) -> Router {
    let metrics_path = state.config.web.metrics_path.clone();

    Router::new()
        .route("/", get(api::landing))
        .route(&metrics_path, get(api::metrics))
        .with_state(state)
        .layer(middleware::from_fn(logging::request_logging))
}
