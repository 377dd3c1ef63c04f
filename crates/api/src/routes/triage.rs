//! Triage routing endpoints: route, undo, history.

use axum::extract::{Query, State};
use axum::{routing::get, routing::post, Json, Router};
use serde::Deserialize;

use mediasift_core::triage::{route_file, undo_route, TriageDestination, TriageRecord};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RouteRequest {
    pub file_name: String,
    pub destination: TriageDestination,
}

/// POST /triage/route -- move one file into a destination folder.
async fn route_media(
    State(state): State<AppState>,
    Json(request): Json<RouteRequest>,
) -> AppResult<Json<DataResponse<TriageRecord>>> {
    let root = state.config.media_root.clone();
    let dirs = state.triage_dirs.clone();

    let record = tokio::task::spawn_blocking(move || {
        route_file(&root, &dirs, &request.file_name, request.destination)
    })
    .await
    .map_err(|e| AppError::InternalError(format!("route task failed: {e}")))??;

    state
        .undo_history
        .lock()
        .expect("undo history poisoned")
        .push(record.clone());

    Ok(Json(DataResponse { data: record }))
}

/// POST /triage/undo -- reverse the most recent routing action.
async fn undo_last(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<TriageRecord>>> {
    let record = state
        .undo_history
        .lock()
        .expect("undo history poisoned")
        .pop()
        .ok_or_else(|| AppError::BadRequest("Nothing to undo".into()))?;

    let undo_record = record.clone();
    let result = tokio::task::spawn_blocking(move || undo_route(&undo_record))
        .await
        .map_err(|e| AppError::InternalError(format!("undo task failed: {e}")))?;

    if let Err(err) = result {
        // Leave the record on the history so the user can retry after
        // resolving the conflict.
        state
            .undo_history
            .lock()
            .expect("undo history poisoned")
            .push(record);
        return Err(err.into());
    }

    Ok(Json(DataResponse { data: record }))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// GET /triage/history -- recent actions, newest first.
async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<Json<DataResponse<Vec<TriageRecord>>>> {
    let records = state
        .undo_history
        .lock()
        .expect("undo history poisoned")
        .recent(query.limit.unwrap_or(20));

    Ok(Json(DataResponse { data: records }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/route", post(route_media))
        .route("/undo", post(undo_last))
        .route("/history", get(history))
}
