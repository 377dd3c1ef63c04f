//! Workflow endpoints: field extraction, submission, interruption, and
//! the node-definition catalog.

use axum::extract::{Path, State};
use axum::{routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use mediasift_core::error::CoreError;
use mediasift_core::library::validate_file_name;
use mediasift_core::metadata::{extract_from_file, EmbeddedWorkflows};
use mediasift_workflow::classify::{set_field, FieldPath};
use mediasift_workflow::{
    classify_fields, prepare_for_submission, ControlMode, FieldReport, SeedMode,
    SubmissionOptions, WorkflowDocument,
};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct FieldsResponse {
    pub file_name: String,
    /// `gui` or `api`, whichever embedded blob was classified.
    pub source: &'static str,
    #[serde(flatten)]
    pub report: FieldReport,
}

/// GET /workflow/{file_name}/fields -- classify the embedded workflow of
/// one media file for the field editor.
async fn get_fields(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> AppResult<Json<DataResponse<FieldsResponse>>> {
    let embedded = load_embedded(&state, &file_name).await?;

    let (raw, source) = match (&embedded.workflow, &embedded.prompt) {
        (Some(gui), _) => (gui, "gui"),
        (None, Some(api)) => (api, "api"),
        (None, None) => {
            return Err(CoreError::NotFound {
                entity: "embedded workflow",
                id: file_name,
            }
            .into())
        }
    };

    let document = WorkflowDocument::parse(raw)?;
    let report = classify_fields(&document);

    Ok(Json(DataResponse {
        data: FieldsResponse {
            file_name,
            source,
            report,
        },
    }))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Media file whose embedded workflow to submit. Mutually exclusive
    /// with `workflow`.
    pub file_name: Option<String>,
    /// An explicit workflow document (either format), e.g. after edits
    /// in the field editor.
    pub workflow: Option<Value>,
    pub seed_mode: Option<String>,
    pub control_mode: Option<String>,
    pub quantity: Option<u32>,
    pub base_seed: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedGraph {
    pub prompt_id: String,
    pub queue_number: Option<i64>,
    pub content_hash: String,
    pub mutated_seeds: usize,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponseBody {
    pub submitted: Vec<SubmittedGraph>,
}

/// POST /workflow/submit -- prepare one or more graphs and queue them on
/// ComfyUI, sequentially.
///
/// Sequential submission is deliberate: queuing N variants concurrently
/// can trip the server's queue-acceptance behaviour, and the increment
/// seed continuation depends on batch order. The first upstream failure
/// aborts the remainder.
async fn submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> AppResult<Json<DataResponse<SubmitResponseBody>>> {
    let raw = resolve_workflow(&state, &request).await?;

    let control_mode = match &request.control_mode {
        None => None,
        Some(s) => Some(ControlMode::parse(s).ok_or_else(|| {
            AppError::BadRequest(format!("Unknown control mode '{s}'"))
        })?),
    };

    let options = SubmissionOptions {
        seed_mode: request
            .seed_mode
            .as_deref()
            .map(SeedMode::parse)
            .unwrap_or_default(),
        control_mode,
        quantity: request.quantity.unwrap_or(1),
        base_seed: request.base_seed,
    };

    let graphs = prepare_for_submission(&raw, &options)?;

    let mut submitted = Vec::with_capacity(graphs.len());
    for graph in &graphs {
        let response = state.comfyui.submit_workflow(&graph.prompt).await?;
        tracing::info!(
            prompt_id = %response.prompt_id,
            content_hash = %graph.content_hash,
            mutated_seeds = graph.mutated_seeds,
            "Queued workflow on ComfyUI",
        );
        submitted.push(SubmittedGraph {
            prompt_id: response.prompt_id,
            queue_number: response.queue_number,
            content_hash: graph.content_hash.clone(),
            mutated_seeds: graph.mutated_seeds,
        });
    }

    Ok(Json(DataResponse {
        data: SubmitResponseBody { submitted },
    }))
}

#[derive(Debug, Deserialize)]
pub struct FieldEdit {
    pub path: FieldPath,
    pub value: Value,
}

#[derive(Debug, Deserialize)]
pub struct ApplyEditsRequest {
    pub workflow: Value,
    pub edits: Vec<FieldEdit>,
}

#[derive(Debug, Serialize)]
pub struct ApplyEditsResponse {
    pub workflow: Value,
    #[serde(flatten)]
    pub report: FieldReport,
}

/// POST /workflow/fields/apply -- write edited values back into a
/// workflow document through their classified paths and return the
/// updated document with a fresh classification.
async fn apply_edits(
    Json(request): Json<ApplyEditsRequest>,
) -> AppResult<Json<DataResponse<ApplyEditsResponse>>> {
    let mut document = WorkflowDocument::parse(&request.workflow)?;

    for edit in &request.edits {
        set_field(&mut document, &edit.path, edit.value.clone())?;
    }

    let report = classify_fields(&document);
    Ok(Json(DataResponse {
        data: ApplyEditsResponse {
            workflow: document.to_value(),
            report,
        },
    }))
}

/// POST /workflow/interrupt -- stop whatever ComfyUI is executing.
async fn interrupt(State(state): State<AppState>) -> AppResult<Json<DataResponse<bool>>> {
    state.comfyui.interrupt().await?;
    Ok(Json(DataResponse { data: true }))
}

/// GET /workflow/node-defs -- the (cached) node-definition catalog.
async fn node_defs(State(state): State<AppState>) -> AppResult<Json<DataResponse<Value>>> {
    let catalog =
        mediasift_comfyui::node_defs::cached_object_info(&state.comfyui, &state.node_defs_cache)
            .await?;
    Ok(Json(DataResponse { data: catalog }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn load_embedded(state: &AppState, file_name: &str) -> AppResult<EmbeddedWorkflows> {
    validate_file_name(file_name).map_err(AppError::Core)?;

    let path = state.config.media_root.join(file_name);
    if !path.is_file() {
        return Err(CoreError::NotFound {
            entity: "media file",
            id: file_name.to_string(),
        }
        .into());
    }

    let embedded = tokio::task::spawn_blocking(move || extract_from_file(&path))
        .await
        .map_err(|e| AppError::InternalError(format!("metadata task failed: {e}")))??;

    Ok(embedded)
}

/// Pick the document a submission starts from: explicit body, or the
/// file's embedded GUI graph (layout passes through), or its API graph.
async fn resolve_workflow(state: &AppState, request: &SubmitRequest) -> AppResult<Value> {
    if let Some(workflow) = &request.workflow {
        return Ok(workflow.clone());
    }

    let Some(file_name) = &request.file_name else {
        return Err(AppError::BadRequest(
            "Either 'workflow' or 'file_name' is required".into(),
        ));
    };

    let embedded = load_embedded(state, file_name).await?;
    embedded
        .preferred()
        .cloned()
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "embedded workflow",
                id: file_name.clone(),
            }
            .into()
        })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{file_name}/fields", get(get_fields))
        .route("/fields/apply", post(apply_edits))
        .route("/submit", post(submit))
        .route("/interrupt", post(interrupt))
        .route("/node-defs", get(node_defs))
}
