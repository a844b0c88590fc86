//! Content directory scanner.
//!
//! Walks `<root>/<content_dir>` for `.md`/`.mdx` files in deterministic
//! (sorted) order, applies the configured exclusion prefixes, and parses each
//! document. A document whose metadata block fails to parse is skipped with a
//! warning — one bad file never blocks the batch.

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use vellum_core::error::ParseError;
use vellum_core::types::Value;
use vellum_core::{frontmatter, Document, SiteConfig, Slug};

use crate::error::{io_err, SyncError};

/// Result of one scan: parsed documents in walk order, plus the files whose
/// metadata failed to parse.
#[derive(Debug)]
pub struct ScanOutcome {
    pub documents: Vec<Document>,
    pub skipped: Vec<(PathBuf, ParseError)>,
}

/// Scan the content directory under `root`.
pub fn scan_at(root: &Path, config: &SiteConfig) -> Result<ScanOutcome, SyncError> {
    let content_root = config.content_root(root);
    if !content_root.is_dir() {
        return Err(io_err(
            &content_root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "content directory not found"),
        ));
    }

    let fields = config.field_map();
    let mut documents = Vec::new();
    let mut skipped = Vec::new();

    for entry in WalkDir::new(&content_root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| content_root.clone());
            io_err(
                path,
                e.into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("walk failed")),
            )
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if !is_markdown(path) {
            continue;
        }

        let rel_path = path
            .strip_prefix(&content_root)
            .unwrap_or(path)
            .to_path_buf();
        if is_excluded(&rel_path, &config.exclude) {
            tracing::debug!("excluded: {}", rel_path.display());
            continue;
        }

        let raw = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
        let parsed = match frontmatter::parse(&raw, &fields) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!("skipping {}: {err}", rel_path.display());
                skipped.push((rel_path, err));
                continue;
            }
        };

        let slug_override = parsed
            .raw_fields
            .get("slug")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let slug = Slug::derive(&rel_path, slug_override.as_deref());

        documents.push(Document {
            path: path.to_path_buf(),
            rel_path,
            slug,
            front: parsed.front,
            raw_fields: parsed.raw_fields,
            body: parsed.body,
            raw,
            style: parsed.style,
        });
    }

    Ok(ScanOutcome { documents, skipped })
}

fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("mdx")
    )
}

/// A pattern excludes a file when it names it exactly or is a path prefix of
/// it. Patterns are relative to the content directory; a trailing `/` is
/// tolerated.
fn is_excluded(rel_path: &Path, patterns: &[String]) -> bool {
    let rel = rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    patterns.iter().any(|pattern| {
        let pattern = pattern.trim_end_matches('/');
        !pattern.is_empty() && (rel == pattern || rel.starts_with(&format!("{pattern}/")))
    })
}
