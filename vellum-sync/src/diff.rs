//! Change detection — local plan, local deletions, remote orphans.
//!
//! Pure compute-then-report: nothing here touches the remote store or mutates
//! state. Classification precedence for a non-draft document:
//!
//! 1. forced flag overrides all
//! 2. no state entry → create, or update when the frontmatter already carries
//!    an identity (state loss)
//! 3. state entry present → update only when the fresh fingerprint differs

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use vellum_core::Document;
use vellum_remote::RemoteRecord;

use crate::fingerprint;
use crate::state::{state_key, StateFile};

// ---------------------------------------------------------------------------
// Local plan
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Create => write!(f, "create"),
            Action::Update => write!(f, "update"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    New,
    ContentChanged,
    Forced,
    MissingState,
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::New => write!(f, "new"),
            Reason::ContentChanged => write!(f, "content-changed"),
            Reason::Forced => write!(f, "forced"),
            Reason::MissingState => write!(f, "missing-state"),
        }
    }
}

/// One planned remote write, ephemeral to the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanEntry {
    /// Index into the scanned document list.
    pub doc: usize,
    pub action: Action,
    pub reason: Reason,
}

/// Local diff result: writes to perform, up-to-date documents, drafts.
#[derive(Debug, Default)]
pub struct LocalPlan {
    pub entries: Vec<PlanEntry>,
    pub skipped: Vec<usize>,
    pub drafts: Vec<usize>,
}

/// Classify every scanned document against the state store.
pub fn plan_local(
    docs: &[Document],
    state: &StateFile,
    content_dir: &Path,
    force: bool,
) -> LocalPlan {
    let mut plan = LocalPlan::default();
    for (idx, doc) in docs.iter().enumerate() {
        if doc.front.draft {
            plan.drafts.push(idx);
            continue;
        }

        let key = state_key(content_dir, &doc.rel_path);
        let entry = state.posts.get(&key);
        let has_identity =
            doc.front.at_uri.is_some() || entry.is_some_and(|e| !e.at_uri.is_empty());

        if force {
            let action = if has_identity { Action::Update } else { Action::Create };
            plan.entries.push(PlanEntry {
                doc: idx,
                action,
                reason: Reason::Forced,
            });
            continue;
        }

        match entry {
            None => {
                let (action, reason) = if doc.front.at_uri.is_some() {
                    (Action::Update, Reason::MissingState)
                } else {
                    (Action::Create, Reason::New)
                };
                plan.entries.push(PlanEntry {
                    doc: idx,
                    action,
                    reason,
                });
            }
            Some(entry) => {
                // An empty stored hash never equals a fresh digest, so
                // "no-confidence" entries republish here.
                let fresh = fingerprint::digest(doc.raw.as_bytes());
                if entry.hash == fresh {
                    plan.skipped.push(idx);
                } else {
                    plan.entries.push(PlanEntry {
                        doc: idx,
                        action: Action::Update,
                        reason: Reason::ContentChanged,
                    });
                }
            }
        }
    }
    plan
}

// ---------------------------------------------------------------------------
// Deletions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOrigin {
    /// The local file behind a state entry vanished.
    LocalRemoved,
    /// A remote record has no corresponding local document.
    RemoteOrphan,
}

/// One pending remote deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDeletion {
    /// Site-root-relative state key (may be empty for an orphan whose payload
    /// carries no path).
    pub key: String,
    /// Primary record identity to delete.
    pub at_uri: String,
    pub origin: DeletionOrigin,
}

/// State entries whose document no longer exists on disk.
///
/// Confirmed by an existence check against the site root, not by absence from
/// the current scan — an exclusion-pattern change must not delete records.
pub fn pending_deletions(root: &Path, state: &StateFile) -> Vec<PendingDeletion> {
    state
        .posts
        .iter()
        .filter(|(key, _)| !root.join(key).exists())
        .map(|(key, entry)| PendingDeletion {
            key: key.clone(),
            at_uri: entry.at_uri.clone(),
            origin: DeletionOrigin::LocalRemoved,
        })
        .collect()
}

/// Remote records with no corresponding local document, excluding anything
/// already covered by the local deletion diff.
///
/// "No corresponding local document" is confirmed against the disk as well as
/// the scanned set: a file that merely became excluded keeps its records.
pub fn find_orphans(
    root: &Path,
    remote: &[RemoteRecord],
    docs: &[Document],
    content_dir: &Path,
    pending: &[PendingDeletion],
) -> Vec<PendingDeletion> {
    let local_keys: BTreeSet<String> = docs
        .iter()
        .map(|doc| state_key(content_dir, &doc.rel_path))
        .collect();
    let covered_uris: BTreeSet<&str> = pending.iter().map(|d| d.at_uri.as_str()).collect();
    let covered_keys: BTreeSet<&str> = pending
        .iter()
        .map(|d| d.key.as_str())
        .filter(|k| !k.is_empty())
        .collect();

    let mut orphans = Vec::new();
    for record in remote {
        let uri = record.uri.to_string();
        if covered_uris.contains(uri.as_str()) {
            continue;
        }
        let path = record
            .value
            .get("path")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        if !path.is_empty()
            && (local_keys.contains(path) || covered_keys.contains(path) || root.join(path).exists())
        {
            continue;
        }
        if path.is_empty() {
            tracing::warn!("remote record {uri} carries no path — treating as orphaned");
        }
        orphans.push(PendingDeletion {
            key: path.to_owned(),
            at_uri: uri,
            origin: DeletionOrigin::RemoteOrphan,
        });
    }
    orphans
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::Utc;
    use serde_json::json;
    use tempfile::TempDir;
    use vellum_core::{FrontMatter, RecordRef, Slug};

    use crate::state::StateEntry;

    use super::*;

    fn doc(rel: &str, raw: &str, at_uri: Option<&str>, draft: bool) -> Document {
        Document {
            path: PathBuf::from(format!("/site/content/{rel}")),
            rel_path: PathBuf::from(rel),
            slug: Slug::derive(Path::new(rel), None),
            front: FrontMatter {
                at_uri: at_uri.map(str::to_owned),
                draft,
                ..FrontMatter::default()
            },
            raw_fields: Default::default(),
            body: raw.to_owned(),
            raw: raw.to_owned(),
            style: None,
        }
    }

    fn entry_with_hash(hash: &str) -> StateEntry {
        StateEntry {
            hash: hash.to_owned(),
            at_uri: "at://did:plc:a/site.vellum.document/k".to_owned(),
            published_at: Utc::now(),
            slug: "x".to_owned(),
            social_uri: None,
        }
    }

    #[test]
    fn new_document_is_created() {
        let docs = vec![doc("a.md", "# A\n", None, false)];
        let plan = plan_local(&docs, &StateFile::default(), Path::new("content"), false);
        assert_eq!(plan.entries.len(), 1);
        assert_eq!(plan.entries[0].action, Action::Create);
        assert_eq!(plan.entries[0].reason, Reason::New);
    }

    #[test]
    fn identity_without_state_is_an_update() {
        let docs = vec![doc("a.md", "raw", Some("at://did:plc:a/c/k"), false)];
        let plan = plan_local(&docs, &StateFile::default(), Path::new("content"), false);
        assert_eq!(plan.entries[0].action, Action::Update);
        assert_eq!(plan.entries[0].reason, Reason::MissingState);
    }

    #[test]
    fn matching_hash_skips() {
        let raw = "# Same\n";
        let docs = vec![doc("a.md", raw, None, false)];
        let mut state = StateFile::default();
        state.posts.insert(
            "content/a.md".to_owned(),
            entry_with_hash(&fingerprint::digest(raw.as_bytes())),
        );
        let plan = plan_local(&docs, &state, Path::new("content"), false);
        assert!(plan.entries.is_empty());
        assert_eq!(plan.skipped, vec![0]);
    }

    #[test]
    fn changed_hash_updates() {
        let docs = vec![doc("a.md", "# Edited\n", None, false)];
        let mut state = StateFile::default();
        state
            .posts
            .insert("content/a.md".to_owned(), entry_with_hash("stale"));
        let plan = plan_local(&docs, &state, Path::new("content"), false);
        assert_eq!(plan.entries[0].action, Action::Update);
        assert_eq!(plan.entries[0].reason, Reason::ContentChanged);
    }

    #[test]
    fn empty_hash_placeholder_republishes() {
        let docs = vec![doc("a.md", "# A\n", None, false)];
        let mut state = StateFile::default();
        state
            .posts
            .insert("content/a.md".to_owned(), entry_with_hash(""));
        let plan = plan_local(&docs, &state, Path::new("content"), false);
        assert_eq!(plan.entries[0].reason, Reason::ContentChanged);
    }

    #[test]
    fn force_overrides_matching_hash() {
        let raw = "# Same\n";
        let docs = vec![doc("a.md", raw, None, false)];
        let mut state = StateFile::default();
        state.posts.insert(
            "content/a.md".to_owned(),
            entry_with_hash(&fingerprint::digest(raw.as_bytes())),
        );
        let plan = plan_local(&docs, &state, Path::new("content"), true);
        assert_eq!(plan.entries[0].action, Action::Update);
        assert_eq!(plan.entries[0].reason, Reason::Forced);
    }

    #[test]
    fn drafts_reported_separately() {
        let docs = vec![doc("a.md", "# A\n", None, true)];
        let plan = plan_local(&docs, &StateFile::default(), Path::new("content"), true);
        assert!(plan.entries.is_empty());
        assert_eq!(plan.drafts, vec![0]);
    }

    #[test]
    fn missing_file_queued_for_deletion_exactly_once() {
        let root = TempDir::new().unwrap();
        let present = root.path().join("content/present.md");
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, "# P\n").unwrap();

        let mut state = StateFile::default();
        state
            .posts
            .insert("content/present.md".to_owned(), entry_with_hash("h"));
        state
            .posts
            .insert("content/gone.md".to_owned(), entry_with_hash("h"));

        let pending = pending_deletions(root.path(), &state);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].key, "content/gone.md");
        assert_eq!(pending[0].origin, DeletionOrigin::LocalRemoved);
    }

    fn remote(uri: &str, path: &str) -> RemoteRecord {
        RemoteRecord {
            uri: uri.parse::<RecordRef>().unwrap(),
            value: json!({ "path": path, "title": "T" }),
        }
    }

    #[test]
    fn remote_record_without_local_doc_is_orphaned_once() {
        let root = TempDir::new().unwrap();
        let docs = vec![doc("a.md", "# A\n", None, false)];
        let remote_records = vec![
            remote("at://did:plc:a/site.vellum.document/ka", "content/a.md"),
            remote("at://did:plc:a/site.vellum.document/kg", "content/ghost.md"),
        ];
        let orphans = find_orphans(root.path(), &remote_records, &docs, Path::new("content"), &[]);
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].at_uri, "at://did:plc:a/site.vellum.document/kg");
        assert_eq!(orphans[0].origin, DeletionOrigin::RemoteOrphan);
    }

    #[test]
    fn orphan_already_covered_by_local_diff_is_not_duplicated() {
        let root = TempDir::new().unwrap();
        let pending = vec![PendingDeletion {
            key: "content/gone.md".to_owned(),
            at_uri: "at://did:plc:a/site.vellum.document/kg".to_owned(),
            origin: DeletionOrigin::LocalRemoved,
        }];
        let remote_records = vec![remote(
            "at://did:plc:a/site.vellum.document/kg",
            "content/gone.md",
        )];
        let orphans = find_orphans(
            root.path(),
            &remote_records,
            &[],
            Path::new("content"),
            &pending,
        );
        assert!(orphans.is_empty());
    }

    #[test]
    fn excluded_but_present_file_is_not_orphaned() {
        let root = TempDir::new().unwrap();
        let on_disk = root.path().join("content/archive/old.md");
        std::fs::create_dir_all(on_disk.parent().unwrap()).unwrap();
        std::fs::write(&on_disk, "# Old\n").unwrap();

        // Not in the scanned set (excluded), but still on disk.
        let remote_records = vec![remote(
            "at://did:plc:a/site.vellum.document/ko",
            "content/archive/old.md",
        )];
        let orphans = find_orphans(root.path(), &remote_records, &[], Path::new("content"), &[]);
        assert!(orphans.is_empty());
    }
}
