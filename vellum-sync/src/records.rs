//! Remote record payloads and cover-image upload.

use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use vellum_core::{Document, SiteConfig};
use vellum_remote::{BlobRef, RecordStore};

/// Primary document record payload.
pub fn document_record(
    doc: &Document,
    config: &SiteConfig,
    key: &str,
    cover: Option<&BlobRef>,
) -> Value {
    let mut record = json!({
        "$type": config.collections.document,
        "title": doc.front.title,
        "publishedAt": doc.front.date,
        "slug": doc.slug.0,
        "path": key,
        "tags": doc.front.tags,
        "content": doc.body,
    });
    if let Some(description) = &doc.front.description {
        record["description"] = json!(description);
    }
    if let Some(BlobRef(blob)) = cover {
        record["coverImage"] = blob.clone();
    }
    record
}

/// Secondary note record payload, keyed 1:1 with its document record.
/// Carries the link-resolved body.
pub fn note_record(doc: &Document, config: &SiteConfig, resolved_body: &str) -> Value {
    json!({
        "$type": config.collections.note,
        "title": doc.front.title,
        "publishedAt": doc.front.date,
        "slug": doc.slug.0,
        "content": resolved_body,
    })
}

/// Ordered candidate locations for a cover reference: next to the document,
/// under the content root, under the site root.
pub fn cover_candidates(
    doc: &Document,
    root: &Path,
    config: &SiteConfig,
    cover: &str,
) -> Vec<PathBuf> {
    let trimmed = cover.trim_start_matches("./").trim_start_matches('/');
    let mut candidates = Vec::new();
    if !cover.starts_with('/') {
        if let Some(dir) = doc.path.parent() {
            candidates.push(dir.join(trimmed));
        }
    }
    candidates.push(config.content_root(root).join(trimmed));
    candidates.push(root.join(trimmed));
    candidates.dedup();
    candidates
}

/// Upload the first candidate that can be read and accepted by the store.
/// Returns `None` when every candidate fails — the caller publishes without
/// a cover.
pub fn upload_cover(store: &mut dyn RecordStore, candidates: &[PathBuf]) -> Option<BlobRef> {
    for path in candidates {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        match store.upload_blob(&bytes, mime_for(path)) {
            Ok(blob) => return Some(blob),
            Err(err) => {
                tracing::warn!("blob upload failed for {}: {err}", path.display());
            }
        }
    }
    None
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("avif") => "image/avif",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use vellum_core::{FrontMatter, Slug};

    use super::*;

    fn doc() -> Document {
        Document {
            path: PathBuf::from("/site/content/posts/hello.md"),
            rel_path: PathBuf::from("posts/hello.md"),
            slug: Slug::from("posts/hello"),
            front: FrontMatter {
                title: "Hello".to_owned(),
                date: "2024-03-01".to_owned(),
                tags: vec!["rust".to_owned()],
                ..FrontMatter::default()
            },
            raw_fields: Default::default(),
            body: "body\n".to_owned(),
            raw: "body\n".to_owned(),
            style: None,
        }
    }

    fn config() -> SiteConfig {
        SiteConfig::new("https://pds.test".to_owned(), "did:plc:test".to_owned())
    }

    #[test]
    fn document_record_shape() {
        let record = document_record(&doc(), &config(), "content/posts/hello.md", None);
        assert_eq!(record["$type"], "site.vellum.document");
        assert_eq!(record["title"], "Hello");
        assert_eq!(record["path"], "content/posts/hello.md");
        assert_eq!(record["tags"][0], "rust");
        assert!(record.get("description").is_none());
        assert!(record.get("coverImage").is_none());
    }

    #[test]
    fn cover_blob_embedded() {
        let blob = BlobRef(serde_json::json!({ "$type": "blob", "ref": { "$link": "b1" } }));
        let record = document_record(&doc(), &config(), "k", Some(&blob));
        assert_eq!(record["coverImage"]["ref"]["$link"], "b1");
    }

    #[test]
    fn candidates_try_document_dir_first() {
        let root = Path::new("/site");
        let candidates = cover_candidates(&doc(), root, &config(), "./img/cover.png");
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/site/content/posts/img/cover.png"),
                PathBuf::from("/site/content/img/cover.png"),
                PathBuf::from("/site/img/cover.png"),
            ]
        );
    }

    #[test]
    fn absolute_cover_skips_document_dir() {
        let root = Path::new("/site");
        let candidates = cover_candidates(&doc(), root, &config(), "/img/cover.png");
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/site/content/img/cover.png"),
                PathBuf::from("/site/img/cover.png"),
            ]
        );
    }

    #[test]
    fn mime_guessing() {
        assert_eq!(mime_for(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("a.webp")), "image/webp");
        assert_eq!(mime_for(Path::new("a.bin")), "application/octet-stream");
    }
}
