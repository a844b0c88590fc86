//! Error types for vellum-sync.

use std::path::PathBuf;

use thiserror::Error;

use vellum_core::error::{ConfigError, IdentityError, ParseError};
use vellum_remote::TransportError;

/// All errors that can arise from scanning, planning, and publishing.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from site configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// A document's metadata block failed to parse.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    /// A stored or frontmatter record identity failed to parse.
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// A document is planned for update but neither its frontmatter nor its
    /// state entry carries a record identity.
    #[error("{key} is marked for update but carries no record identity")]
    MissingIdentity { key: String },

    /// An error from the remote content store.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization error (state store).
    #[error("state store JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
