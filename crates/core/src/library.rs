//! Media library scanning.
//!
//! Scans the ComfyUI output directory (flat, non-recursive) for
//! supported images and videos and returns them newest-first, the order
//! the triage UI walks them in.

use std::path::Path;

use regex::Regex;
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{MediaKind, Timestamp};

/// A single triagable media file.
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    /// File name within the library root (no directory components).
    pub file_name: String,
    pub kind: MediaKind,
    pub size_bytes: u64,
    pub modified_at: Timestamp,
    /// Pixel dimensions from a header-only probe; `None` for videos and
    /// unreadable images.
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Counter parsed from ComfyUI's `<prefix>_00042_.png` naming scheme.
    pub sequence: Option<u32>,
}

/// Scan `root` for supported media files.
///
/// Subdirectories (including triage destinations nested under the root)
/// are not descended into. Entries that disappear mid-scan are skipped.
pub fn scan_library(root: &Path) -> Result<Vec<MediaItem>, CoreError> {
    if !root.is_dir() {
        return Err(CoreError::Validation(format!(
            "Library root '{}' is not a directory",
            root.display()
        )));
    }

    let sequence_re = Regex::new(r"_(\d{4,})_\.[^.]+$").expect("valid sequence regex");

    let mut items = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(kind) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(|e| MediaKind::from_extension(&e.to_lowercase()))
        else {
            continue;
        };

        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                tracing::debug!(file = file_name, error = %e, "Skipping unreadable entry");
                continue;
            }
        };

        let modified_at: Timestamp = meta
            .modified()
            .map(chrono::DateTime::from)
            .unwrap_or_else(|_| chrono::Utc::now());

        let (width, height) = match kind {
            MediaKind::Image => probe_dimensions(&path),
            MediaKind::Video => (None, None),
        };

        let sequence = sequence_re
            .captures(file_name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok());

        items.push(MediaItem {
            file_name: file_name.to_string(),
            kind,
            size_bytes: meta.len(),
            modified_at,
            width,
            height,
            sequence,
        });
    }

    // Newest first; name as tiebreaker for files written in the same second.
    items.sort_by(|a, b| {
        b.modified_at
            .cmp(&a.modified_at)
            .then_with(|| b.file_name.cmp(&a.file_name))
    });

    Ok(items)
}

/// Reject file names that could escape the library root.
pub fn validate_file_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation("File name must not be empty".into()));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(CoreError::Validation(format!(
            "File name '{name}' must not contain path components"
        )));
    }
    Ok(())
}

/// Header-only dimension probe. Failures are logged and reported as unknown.
fn probe_dimensions(path: &Path) -> (Option<u32>, Option<u32>) {
    match image::image_dimensions(path) {
        Ok((w, h)) => (Some(w), Some(h)),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Dimension probe failed");
            (None, None)
        }
    }
}
