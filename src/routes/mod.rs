//! Route modules for LanShare Server

pub mod browse;
pub mod download;
pub mod health;
pub mod upload;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let max_upload_bytes = state.config().transfer.max_upload_bytes;

    Router::new()
        .merge(health::router())
        .merge(browse::router())
        .merge(download::router())
        .merge(upload::router(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
