//! Error types for vellum-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from site configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `vellum.yaml` did not exist at the expected path.
    #[error("no vellum.yaml found at {path} — run `vellum init` first")]
    NotFound { path: PathBuf },
}

/// Errors from frontmatter parsing.
///
/// A document with no metadata block at all is NOT an error — the parser
/// falls back to defaults. These fire only when a block opens and then
/// violates the line grammar.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The opening marker was never closed.
    #[error("unterminated '{marker}' metadata block")]
    Unterminated { marker: &'static str },

    /// A line inside the block is neither an assignment, a list item,
    /// a continuation, nor blank.
    #[error("malformed metadata at line {line}: {text:?}")]
    MalformedLine { line: usize, text: String },
}

/// Errors from record identity parsing.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// Anything other than `at://authority/collection/rkey` with all three
    /// segments non-empty.
    #[error("malformed record identity {input:?}: expected at://authority/collection/rkey")]
    Malformed { input: String },
}
