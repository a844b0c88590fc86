//! Publish state — the ledger of what has previously been reconciled.
//!
//! Persists a `StateFile` JSON document at `<root>/.vellum/state.json` with
//! shape `{ "posts": { [relativePath]: StateEntry } }`. Writes use an atomic
//! `.tmp` + rename pattern.
//!
//! The remote store, not this file, is the source of truth for what has been
//! published — local state only skips redundant writes. A missing or corrupt
//! file therefore degrades to an empty mapping instead of failing the run.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{io_err, SyncError};

/// Last-known publish facts for one document, keyed by its path relative to
/// the site root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateEntry {
    /// Content digest at last publish. An empty string is a valid
    /// "no-confidence" placeholder: never equal to a fresh digest, so the
    /// document republishes on the next run.
    pub hash: String,
    /// Primary record identity.
    pub at_uri: String,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    /// Companion cross-reference (e.g. a social post announcing the
    /// document), created outside the publish cycle and preserved verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_uri: Option<String>,
}

/// On-disk state payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    #[serde(default)]
    pub posts: BTreeMap<String, StateEntry>,
}

/// `<root>/.vellum/state.json` — pure, no I/O.
pub fn state_path_at(root: &Path) -> PathBuf {
    root.join(".vellum").join("state.json")
}

/// Site-root-relative state key for a document under `content_dir`,
/// `/`-separated on every platform.
pub fn state_key(content_dir: &Path, rel_path: &Path) -> String {
    content_dir
        .join(rel_path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Load the publish state. Missing or corrupt files yield an empty mapping.
pub fn load_at(root: &Path) -> StateFile {
    let path = state_path_at(root);
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return StateFile::default(),
        Err(err) => {
            tracing::warn!("unreadable state file {}: {err}", path.display());
            return StateFile::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(state) => state,
        Err(err) => {
            tracing::warn!(
                "corrupt state file {} — starting from empty state: {err}",
                path.display()
            );
            StateFile::default()
        }
    }
}

/// Save the publish state atomically.
///
/// Writes to `<path>.tmp` then renames to `<path>`.
pub fn save_at(root: &Path, state: &StateFile) -> Result<(), SyncError> {
    let path = state_path_at(root);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}
