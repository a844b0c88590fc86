//! Site configuration — `vellum.yaml` at the site root.
//!
//! # Storage layout
//!
//! ```text
//! <root>/
//!   vellum.yaml        (site config — this module)
//!   .vellum/
//!     state.json       (publish state — vellum-sync)
//!   <content_dir>/     (the Markdown collection)
//! ```
//!
//! Every function takes an explicit `root: &Path`; tests use `TempDir` roots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::frontmatter::{default_date_fallbacks, FieldMap};

/// Remote collection names for the two paired record types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collections {
    /// Primary document records.
    pub document: String,
    /// Secondary note records, keyed 1:1 with their document record.
    pub note: String,
}

impl Default for Collections {
    fn default() -> Self {
        Collections {
            document: "site.vellum.document".to_owned(),
            note: "site.vellum.note".to_owned(),
        }
    }
}

/// Root of `vellum.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteConfig {
    pub version: u32,
    /// Directory holding the Markdown collection, relative to the site root.
    pub content_dir: PathBuf,
    /// Base URL of the remote content store.
    pub service: String,
    /// Authority segment of every record identity (e.g. a DID).
    pub repo: String,
    #[serde(default)]
    pub collections: Collections,
    /// Canonical field name → source field name overrides for frontmatter.
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
    /// Ordered alternate field names for the publish date.
    #[serde(default = "default_date_fallbacks")]
    pub date_fallbacks: Vec<String>,
    /// Relative path prefixes (under `content_dir`) excluded from scanning.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl SiteConfig {
    pub fn new(service: String, repo: String) -> SiteConfig {
        SiteConfig {
            version: 1,
            content_dir: PathBuf::from("content"),
            service,
            repo,
            collections: Collections::default(),
            fields: BTreeMap::new(),
            date_fallbacks: default_date_fallbacks(),
            exclude: Vec::new(),
        }
    }

    /// `<root>/<content_dir>`.
    pub fn content_root(&self, root: &Path) -> PathBuf {
        root.join(&self.content_dir)
    }

    /// Field resolution configuration for the frontmatter parser.
    pub fn field_map(&self) -> FieldMap {
        FieldMap {
            sources: self.fields.clone(),
            date_fallbacks: self.date_fallbacks.clone(),
        }
    }
}

/// `<root>/vellum.yaml` — pure, no I/O.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join("vellum.yaml")
}

/// Load the site config.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with path
/// and line context) if malformed.
pub fn load_at(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = config_path_at(root);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// Atomically save the site config.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `rename`. The `.tmp` lives in
/// the same directory as the target, so the rename never crosses filesystems.
pub fn save_at(root: &Path, config: &SiteConfig) -> Result<(), ConfigError> {
    let path = config_path_at(root);
    let tmp = root.join("vellum.yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp, yaml)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// Scaffold `vellum.yaml` and the content directory at `root`.
///
/// Idempotent: if the config already exists, loads and returns it unchanged.
pub fn init_at(root: &Path, service: String, repo: String) -> Result<SiteConfig, ConfigError> {
    let path = config_path_at(root);
    if path.exists() {
        return load_at(root);
    }
    let config = SiteConfig::new(service, repo);
    save_at(root, &config)?;
    std::fs::create_dir_all(config.content_root(root))?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
