//! Browse routes
//!
//! `GET /browse` lists the whole browse root as a JSON array.

use axum::{extract::State, routing::get, Json, Router};

use crate::error::Result;
use crate::index::BrowseEntry;
use crate::paths::PathRole;
use crate::state::AppState;

/// Create the browse router
pub fn router() -> Router<AppState> {
    Router::new().route("/browse", get(browse))
}

async fn browse(State(state): State<AppState>) -> Result<Json<Vec<BrowseEntry>>> {
    let listing = async {
        let root = state.paths().get(PathRole::Browse)?;
        state.indexer().index_blocking(root).await
    }
    .await
    .inspect_err(|e| state.report(e))?;

    Ok(Json(listing))
}
