//! Download routes
//!
//! `GET /download` serves the configured file, or a freshly built archive
//! when the target is a directory.

use axum::{extract::State, response::Response, routing::get, Router};

use crate::error::Result;
use crate::state::AppState;
use crate::transfer::serve_download;

/// Create the download router
pub fn router() -> Router<AppState> {
    Router::new().route("/download", get(download))
}

async fn download(State(state): State<AppState>) -> Result<Response> {
    serve_download(state.paths(), state.archiver())
        .await
        .inspect_err(|e| state.report(e))
}
