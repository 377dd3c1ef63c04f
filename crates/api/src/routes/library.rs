//! Media library listing endpoint.

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use mediasift_core::library::{scan_library, MediaItem};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Default page size when the client does not ask for one.
const DEFAULT_LIMIT: usize = 100;

/// Hard cap on page size.
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LibraryPage {
    pub items: Vec<MediaItem>,
    pub total: usize,
    pub offset: usize,
    pub limit: usize,
}

/// GET /library -- newest-first page of triagable media.
async fn list_library(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<DataResponse<LibraryPage>>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let root = state.config.media_root.clone();

    // Directory scanning is synchronous fs work; keep it off the runtime.
    let items = tokio::task::spawn_blocking(move || scan_library(&root))
        .await
        .map_err(|e| AppError::InternalError(format!("scan task failed: {e}")))??;

    let total = items.len();
    let page: Vec<MediaItem> = items.into_iter().skip(query.offset).take(limit).collect();

    Ok(Json(DataResponse {
        data: LibraryPage {
            items: page,
            total,
            offset: query.offset,
            limit,
        },
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/library", get(list_library))
}
