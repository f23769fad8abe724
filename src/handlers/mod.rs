pub mod api;
pub mod health;
pub mod metrics;

pub use api::*;
pub use health::*;
pub use metrics::*;

use axum::{middleware, routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::observability::observability_middleware;

/// Build the full application router: cart API, health, metrics
pub fn create_app(state: ApiState) -> Router {
    let metrics = state.metrics.clone();
    let metrics_for_middleware = metrics.clone();

    Router::new()
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
        .merge(create_api_router(state))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
