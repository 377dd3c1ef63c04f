//! Triage routing: move media files into destination folders with undo.
//!
//! Every routing action moves a file (never unlinks it -- "delete" is a
//! move into a trash folder) and yields a [`TriageRecord`] that the
//! bounded [`UndoHistory`] can replay in reverse. History lives only for
//! the lifetime of the process.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::library::validate_file_name;
use crate::types::Timestamp;

/// Maximum number of actions the undo history retains.
pub const MAX_HISTORY: usize = 100;

/// Maximum numeric suffix tried when a destination name is taken.
const MAX_COLLISION_SUFFIX: u32 = 1000;

/// Where a triaged file can be routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriageDestination {
    Archive,
    Saved,
    Best,
    Delete,
}

impl TriageDestination {
    /// Directory name under the triage root.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Saved => "saved",
            Self::Best => "best",
            Self::Delete => "trash",
        }
    }

    /// Human-readable label for history display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Archive => "Archive",
            Self::Saved => "Saved",
            Self::Best => "Best",
            Self::Delete => "Trash",
        }
    }
}

/// Resolved destination directories.
#[derive(Debug, Clone)]
pub struct TriageDirs {
    pub archive: PathBuf,
    pub saved: PathBuf,
    pub best: PathBuf,
    pub trash: PathBuf,
}

impl TriageDirs {
    /// Standard layout: destination folders nested under the library root.
    pub fn under_root(root: &Path) -> Self {
        Self {
            archive: root.join(TriageDestination::Archive.dir_name()),
            saved: root.join(TriageDestination::Saved.dir_name()),
            best: root.join(TriageDestination::Best.dir_name()),
            trash: root.join(TriageDestination::Delete.dir_name()),
        }
    }

    pub fn for_destination(&self, dest: TriageDestination) -> &Path {
        match dest {
            TriageDestination::Archive => &self.archive,
            TriageDestination::Saved => &self.saved,
            TriageDestination::Best => &self.best,
            TriageDestination::Delete => &self.trash,
        }
    }
}

/// Record of one completed routing action, sufficient to undo it.
#[derive(Debug, Clone, Serialize)]
pub struct TriageRecord {
    pub file_name: String,
    pub destination: TriageDestination,
    /// Absolute source path the file was moved from.
    pub moved_from: PathBuf,
    /// Absolute path the file now lives at (may carry a collision suffix).
    pub moved_to: PathBuf,
    pub routed_at: Timestamp,
}

/// Move `file_name` from the library root into the destination folder.
///
/// Uses `fs::rename` and falls back to copy+remove when the rename fails
/// (e.g. across filesystems). Name collisions in the destination get a
/// `name_1.ext` style suffix rather than overwriting.
pub fn route_file(
    root: &Path,
    dirs: &TriageDirs,
    file_name: &str,
    dest: TriageDestination,
) -> Result<TriageRecord, CoreError> {
    validate_file_name(file_name)?;

    let source = root.join(file_name);
    if !source.is_file() {
        return Err(CoreError::NotFound {
            entity: "media file",
            id: file_name.to_string(),
        });
    }

    let dest_dir = dirs.for_destination(dest);
    std::fs::create_dir_all(dest_dir)?;

    let target = unoccupied_target(dest_dir, file_name)?;
    move_file(&source, &target)?;

    tracing::info!(
        file = file_name,
        destination = dest.dir_name(),
        "Routed media file",
    );

    Ok(TriageRecord {
        file_name: file_name.to_string(),
        destination: dest,
        moved_from: source,
        moved_to: target,
        routed_at: chrono::Utc::now(),
    })
}

/// Reverse a routing action, moving the file back where it came from.
pub fn undo_route(record: &TriageRecord) -> Result<(), CoreError> {
    if !record.moved_to.is_file() {
        return Err(CoreError::Conflict(format!(
            "Cannot undo: '{}' is no longer at its routed location",
            record.file_name
        )));
    }
    if record.moved_from.exists() {
        return Err(CoreError::Conflict(format!(
            "Cannot undo: a file already exists at '{}'",
            record.moved_from.display()
        )));
    }
    move_file(&record.moved_to, &record.moved_from)?;
    tracing::info!(file = %record.file_name, "Undid triage action");
    Ok(())
}

/// Bounded most-recent-first history of routing actions.
#[derive(Debug, Default)]
pub struct UndoHistory {
    records: VecDeque<TriageRecord>,
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an action, evicting the oldest once [`MAX_HISTORY`] is hit.
    pub fn push(&mut self, record: TriageRecord) {
        if self.records.len() == MAX_HISTORY {
            self.records.pop_back();
        }
        self.records.push_front(record);
    }

    /// Remove and return the most recent action.
    pub fn pop(&mut self) -> Option<TriageRecord> {
        self.records.pop_front()
    }

    /// Most recent first.
    pub fn recent(&self, limit: usize) -> Vec<TriageRecord> {
        self.records.iter().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// First destination path whose name is free, suffixing `_1`, `_2`, ...
fn unoccupied_target(dest_dir: &Path, file_name: &str) -> Result<PathBuf, CoreError> {
    let plain = dest_dir.join(file_name);
    if !plain.exists() {
        return Ok(plain);
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((s, e)) => (s, Some(e)),
        None => (file_name, None),
    };

    for n in 1..=MAX_COLLISION_SUFFIX {
        let candidate_name = match ext {
            Some(e) => format!("{stem}_{n}.{e}"),
            None => format!("{stem}_{n}"),
        };
        let candidate = dest_dir.join(candidate_name);
        if !candidate.exists() {
            return Ok(candidate);
        }
    }

    Err(CoreError::Conflict(format!(
        "Too many name collisions for '{file_name}' in '{}'",
        dest_dir.display()
    )))
}

/// Rename, falling back to copy+remove for cross-device moves.
fn move_file(from: &Path, to: &Path) -> Result<(), CoreError> {
    if std::fs::rename(from, to).is_err() {
        std::fs::copy(from, to)?;
        std::fs::remove_file(from)?;
    }
    Ok(())
}
