//! HTTP route handlers.

pub mod health;
pub mod metrics;
pub mod static_files;
pub mod upload;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router with every route and the static fallback.
pub fn app(state: AppState) -> Router {
    let router = Router::new()
        .merge(upload::router(&state))
        .merge(health::router())
        .merge(metrics::router());

    static_files::fallback(router)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
