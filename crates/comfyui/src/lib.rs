//! ComfyUI REST client library.
//!
//! Wraps the ComfyUI HTTP endpoints the triage service talks to:
//! workflow submission, queue cancellation, interruption, history
//! retrieval, and the node-definition catalog.

pub mod api;
pub mod node_defs;

pub use api::{ComfyUIApi, ComfyUIApiError, SubmitResponse};
