//! Intra-collection link resolution and stale-link detection.
//!
//! Plain `[text](target)` references between documents in the collection are
//! rewritten once the target has a remote identity: the target becomes the
//! paired note record's `at://` identity. Targets that are not yet published
//! (or are drafts) collapse to their display text — a dangling link would
//! point nowhere. Image embeds (`![..]`), mention embeds (`@[..]`), absolute
//! URLs, and in-page anchors are never touched.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::{Captures, Regex};

use vellum_core::{Document, RecordRef, Slug};

use crate::state::{state_key, StateFile};

/// `[text](target)`, optionally preceded by an embed sigil. Targets with
/// whitespace or nested parens are left alone — those are not references this
/// tool produced.
fn link_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([!@])?\[([^\]]*)\]\(([^()\s]+)\)").expect("link pattern"))
}

/// Rewrite every intra-collection reference in `body` against `docs`.
pub fn resolve_links(body: &str, docs: &[Document], note_collection: &str) -> String {
    link_regex()
        .replace_all(body, |caps: &Captures| {
            let whole = caps.get(0).map_or("", |m| m.as_str());
            // Embeds and mentions pass through untouched.
            if caps.get(1).is_some() {
                return whole.to_owned();
            }
            let text = caps.get(2).map_or("", |m| m.as_str());
            let target = caps.get(3).map_or("", |m| m.as_str());
            if is_external(target) {
                return whole.to_owned();
            }
            let normalized = normalize_target(target);
            if normalized.is_empty() {
                return whole.to_owned();
            }
            let Some(doc) = find_target(docs, &normalized) else {
                // Unmatched references — including ones into other sites —
                // are left completely unchanged.
                return whole.to_owned();
            };
            match published_ref(doc) {
                Some(uri) => format!(
                    "[{text}](at://{}/{}/{})",
                    uri.authority, note_collection, uri.rkey
                ),
                None => text.to_owned(),
            }
        })
        .into_owned()
}

/// Documents published in an earlier run whose bodies still hold a plain
/// reference to one of `new_slugs`.
///
/// `exclude` is the batch currently being processed — those documents get
/// freshly resolved links anyway. Drafts and never-published documents are
/// skipped.
pub fn find_stale_documents<'a>(
    docs: &'a [Document],
    state: &StateFile,
    content_dir: &Path,
    new_slugs: &[Slug],
    exclude: &BTreeSet<PathBuf>,
) -> Vec<&'a Document> {
    docs.iter()
        .filter(|doc| !exclude.contains(&doc.rel_path))
        .filter(|doc| !doc.front.draft)
        .filter(|doc| is_published(doc, state, content_dir))
        .filter(|doc| references_any(&doc.body, new_slugs))
        .collect()
}

fn references_any(body: &str, slugs: &[Slug]) -> bool {
    link_regex().captures_iter(body).any(|caps| {
        if caps.get(1).is_some() {
            return false;
        }
        let target = caps.get(3).map_or("", |m| m.as_str());
        if is_external(target) {
            return false;
        }
        let normalized = normalize_target(target);
        !normalized.is_empty() && slugs.iter().any(|slug| slug_matches(&slug.0, &normalized))
    })
}

fn is_published(doc: &Document, state: &StateFile, content_dir: &Path) -> bool {
    if doc.front.at_uri.is_some() {
        return true;
    }
    state
        .posts
        .get(&state_key(content_dir, &doc.rel_path))
        .is_some_and(|entry| !entry.at_uri.is_empty())
}

/// Everything that is not a candidate for rewriting: absolute URLs, mailto,
/// in-page anchors, and mention-prefixed references.
fn is_external(target: &str) -> bool {
    target.contains("://")
        || target.starts_with("mailto:")
        || target.starts_with('#')
        || target.starts_with('@')
}

/// Normalize a link target for slug comparison: leading `./`/`../` segments,
/// a trailing slash, a `.md`/`.mdx` suffix, and a trailing `/index` all go.
fn normalize_target(target: &str) -> String {
    let mut t = target;
    loop {
        if let Some(rest) = t.strip_prefix("./") {
            t = rest;
        } else if let Some(rest) = t.strip_prefix("../") {
            t = rest;
        } else {
            break;
        }
    }
    let t = t.trim_start_matches('/');
    let t = t.strip_suffix('/').unwrap_or(t);
    let t = t
        .strip_suffix(".mdx")
        .or_else(|| t.strip_suffix(".md"))
        .unwrap_or(t);
    let t = t.strip_suffix("/index").unwrap_or(t);
    t.to_owned()
}

/// Slug equality, or one being a path-suffix of the other — tolerates
/// relative vs. absolute reference styles. First match in list order wins.
fn slug_matches(slug: &str, target: &str) -> bool {
    slug == target
        || slug.ends_with(&format!("/{target}"))
        || target.ends_with(&format!("/{slug}"))
}

fn find_target<'a>(docs: &'a [Document], normalized: &str) -> Option<&'a Document> {
    docs.iter().find(|doc| slug_matches(&doc.slug.0, normalized))
}

fn published_ref(doc: &Document) -> Option<RecordRef> {
    if doc.front.draft {
        return None;
    }
    doc.front.at_uri.as_deref()?.parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
