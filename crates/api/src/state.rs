use std::sync::{Arc, Mutex};

use serde_json::Value;

use mediasift_comfyui::ComfyUIApi;
use mediasift_core::triage::{TriageDirs, UndoHistory};
use mediasift_workflow::TtlCache;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// HTTP client for the configured ComfyUI instance.
    pub comfyui: Arc<ComfyUIApi>,
    /// Destination directories derived from the media root.
    pub triage_dirs: TriageDirs,
    /// In-memory undo history for triage actions (process lifetime only).
    pub undo_history: Arc<Mutex<UndoHistory>>,
    /// TTL cache for the ComfyUI node-definition catalog.
    pub node_defs_cache: Arc<Mutex<TtlCache<Value>>>,
}

impl AppState {
    /// Build state from configuration.
    pub fn new(config: ServerConfig) -> Self {
        let comfyui = Arc::new(ComfyUIApi::new(config.comfyui_url.clone()));
        let triage_dirs = TriageDirs::under_root(&config.media_root);
        Self {
            config: Arc::new(config),
            comfyui,
            triage_dirs,
            undo_history: Arc::new(Mutex::new(UndoHistory::new())),
            node_defs_cache: Arc::new(mediasift_comfyui::node_defs::new_cache()),
        }
    }
}
