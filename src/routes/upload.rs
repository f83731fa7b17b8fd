//! Upload routes
//!
//! Endpoints:
//! - GET /upload - Upload form
//! - POST /upload - Multipart upload into the configured upload directory

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::get,
    Router,
};

use crate::error::Result;
use crate::html;
use crate::state::AppState;
use crate::transfer::receive_upload;

/// Create the upload router. `max_upload_bytes` of 0 disables the body limit.
pub fn router(max_upload_bytes: u64) -> Router<AppState> {
    let limit = match usize::try_from(max_upload_bytes) {
        Ok(0) | Err(_) => DefaultBodyLimit::disable(),
        Ok(max) => DefaultBodyLimit::max(max),
    };

    Router::new()
        .route("/upload", get(upload_form).post(upload))
        .layer(limit)
}

/// GET /upload
async fn upload_form() -> Html<String> {
    Html(html::upload_form())
}

/// POST /upload
async fn upload(State(state): State<AppState>, multipart: Multipart) -> Result<Html<String>> {
    let chunk_size = state.config().transfer.upload_chunk_size;

    let files = receive_upload(multipart, state.paths(), chunk_size)
        .await
        .inspect_err(|e| state.report(e))?;

    tracing::info!(files = files.len(), "Upload request complete");

    Ok(Html(html::upload_complete(&files)))
}
