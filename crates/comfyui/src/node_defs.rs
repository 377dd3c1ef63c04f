//! Cached node-definition lookups.
//!
//! ComfyUI's `/object_info` catalog is several megabytes and changes
//! only when custom nodes are (un)installed, so fetches go through a
//! caller-owned [`TtlCache`] rather than hitting the server per request.
//! The cache is injected, never global, so tests control its state.

use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use mediasift_workflow::TtlCache;

use crate::api::{ComfyUIApi, ComfyUIApiError};

/// How long a fetched catalog stays fresh.
pub const NODE_DEFS_TTL: Duration = Duration::from_secs(300);

const CACHE_KEY: &str = "object_info";

/// Build the cache an application holds for node definitions.
pub fn new_cache() -> Mutex<TtlCache<Value>> {
    Mutex::new(TtlCache::new(NODE_DEFS_TTL))
}

/// Fetch the node-definition catalog, serving from cache when fresh.
pub async fn cached_object_info(
    api: &ComfyUIApi,
    cache: &Mutex<TtlCache<Value>>,
) -> Result<Value, ComfyUIApiError> {
    if let Some(cached) = cache.lock().expect("node-defs cache poisoned").get(CACHE_KEY) {
        tracing::debug!("Serving node definitions from cache");
        return Ok(cached);
    }

    let catalog = api.get_object_info().await?;

    let mut guard = cache.lock().expect("node-defs cache poisoned");
    guard.insert(CACHE_KEY, catalog.clone());
    tracing::info!("Refreshed node-definition catalog from ComfyUI");

    Ok(catalog)
}
