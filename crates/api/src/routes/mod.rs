pub mod health;
pub mod library;
pub mod triage;
pub mod workflow;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /library                         paginated media listing (GET)
///
/// /triage/route                    route a file to a destination (POST)
/// /triage/undo                     undo the most recent action (POST)
/// /triage/history                  recent triage records (GET)
///
/// /workflow/{file_name}/fields     classified fields of the embedded
///                                  workflow (GET)
/// /workflow/fields/apply           write edited field values back (POST)
/// /workflow/submit                 prepare and submit graphs (POST)
/// /workflow/interrupt              interrupt the running job (POST)
/// /workflow/node-defs              cached node-definition catalog (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(library::router())
        .nest("/triage", triage::router())
        .nest("/workflow", workflow::router())
}
