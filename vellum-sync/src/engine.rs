//! The reconciliation engine — one full publish cycle.
//!
//! ## Phase order
//!
//! 1. Scan the content directory (§ [`scan`]).
//! 2. Local diff against the state store (§ [`diff::plan_local`]).
//! 3. Deletion diff — state entries whose file vanished.
//! 4. Remote diff — orphaned records with no local document.
//! 5. Primary write pass: cover blob, create/update the document record,
//!    rewrite the frontmatter identity on disk immediately after a create.
//! 6. Secondary write pass: the note record at the same rkey, with links
//!    resolved against the full document set.
//! 7. Stale-link repair: re-put note records of previously published
//!    documents that referenced a slug created in pass 5.
//! 8. Deletion pass: primary record, then best-effort note record, then the
//!    state entry.
//! 9. Commit the state store.
//!
//! Dry run executes phases 1–4 and reports the plan without mutating
//! anything. Errors are caught at the per-document boundary inside every
//! pass: one failing document never blocks the rest of the batch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::Value;

use vellum_core::{frontmatter, Document, RecordRef, SiteConfig, Slug};
use vellum_remote::{RecordStore, TransportError};

use crate::diff::{self, Action, PendingDeletion, Reason};
use crate::error::{io_err, SyncError};
use crate::state::{self, state_key, StateEntry};
use crate::{fingerprint, links, records, scan};

// ---------------------------------------------------------------------------
// Options and summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default)]
pub struct PublishOptions {
    /// Execute phases 1–4 only and report the plan.
    pub dry_run: bool,
    /// Republish every non-draft document regardless of stored hashes.
    pub force: bool,
}

/// One planned write, reported for dry runs and summaries.
#[derive(Debug, Clone)]
pub struct PlannedAction {
    pub key: String,
    pub slug: String,
    pub action: Action,
    pub reason: Reason,
}

/// The canonical user-visible result of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    /// Note records re-put by the stale-link repair pass.
    pub repaired: usize,
    pub skipped: usize,
    pub drafts: usize,
    pub errors: usize,
    pub planned: Vec<PlannedAction>,
    pub deletions: Vec<PendingDeletion>,
    pub warnings: Vec<String>,
}

fn warn(summary: &mut RunSummary, message: String) {
    tracing::warn!("{message}");
    summary.warnings.push(message);
}

// ---------------------------------------------------------------------------
// publish_at
// ---------------------------------------------------------------------------

/// Run the full publish cycle for the site at `root`.
pub fn publish_at(
    root: &Path,
    config: &SiteConfig,
    store: &mut dyn RecordStore,
    options: &PublishOptions,
) -> Result<RunSummary, SyncError> {
    let now = Utc::now();
    let mut summary = RunSummary::default();

    // Phase 1: scan.
    let outcome = scan::scan_at(root, config)?;
    let mut docs = outcome.documents;
    for (path, err) in &outcome.skipped {
        summary.errors += 1;
        warn(&mut summary, format!("skipped {}: {err}", path.display()));
    }
    tracing::info!("scanned {} documents", docs.len());

    // Phase 2: local diff.
    let mut state = state::load_at(root);
    let plan = diff::plan_local(&docs, &state, &config.content_dir, options.force);
    summary.skipped = plan.skipped.len();
    summary.drafts = plan.drafts.len();
    for entry in &plan.entries {
        summary.planned.push(PlannedAction {
            key: state_key(&config.content_dir, &docs[entry.doc].rel_path),
            slug: docs[entry.doc].slug.0.clone(),
            action: entry.action,
            reason: entry.reason,
        });
    }

    // Phases 3 + 4: deletion diff, then remote orphan diff. A record caught
    // by both categories is queued once.
    let mut deletions = diff::pending_deletions(root, &state);
    let remote = store.list_records(&config.repo, &config.collections.document)?;
    let orphans = diff::find_orphans(root, &remote, &docs, &config.content_dir, &deletions);
    deletions.extend(orphans);
    let mut seen = BTreeSet::new();
    deletions.retain(|d| seen.insert(d.at_uri.clone()));
    summary.deletions = deletions.clone();

    if options.dry_run {
        return Ok(summary);
    }

    // Phase 5: primary write pass, in scan order.
    let mut written: Vec<(usize, RecordRef, bool)> = Vec::new();
    for entry in &plan.entries {
        let idx = entry.doc;
        let key = state_key(&config.content_dir, &docs[idx].rel_path);

        let mut cover_blob = None;
        if let Some(cover) = docs[idx].front.cover.clone() {
            let candidates = records::cover_candidates(&docs[idx], root, config, &cover);
            cover_blob = records::upload_cover(store, &candidates);
            if cover_blob.is_none() {
                warn(
                    &mut summary,
                    format!("cover {cover:?} for {key} not uploaded — publishing without it"),
                );
            }
        }

        let payload = records::document_record(&docs[idx], config, &key, cover_blob.as_ref());
        let result = match entry.action {
            Action::Create => store
                .create_record(&config.collections.document, None, payload)
                .map(|uri| (uri, true))
                .map_err(SyncError::from),
            Action::Update => update_primary(store, &docs[idx], state.posts.get(&key), &key, payload),
        };

        match result {
            Ok((uri, created)) => {
                if created {
                    // Rewrite the identity into the file immediately: a crash
                    // after this point reclassifies as an update, never a
                    // duplicate create.
                    let rewritten =
                        frontmatter::set_identity(&docs[idx].raw, docs[idx].style, &uri.to_string());
                    if let Err(err) = atomic_write(&docs[idx].path, &rewritten) {
                        warn(
                            &mut summary,
                            format!("failed to rewrite {}: {err}", docs[idx].path.display()),
                        );
                    }
                    docs[idx].raw = rewritten;
                    summary.created += 1;
                } else {
                    summary.updated += 1;
                }
                docs[idx].front.at_uri = Some(uri.to_string());

                let social_uri = state.posts.get(&key).and_then(|e| e.social_uri.clone());
                state.posts.insert(
                    key,
                    StateEntry {
                        hash: fingerprint::digest(docs[idx].raw.as_bytes()),
                        at_uri: uri.to_string(),
                        published_at: now,
                        slug: docs[idx].slug.0.clone(),
                        social_uri,
                    },
                );
                written.push((idx, uri, created));
            }
            Err(err) => {
                summary.errors += 1;
                warn(&mut summary, format!("publish failed for {key}: {err}"));
            }
        }
    }

    // Phase 6: note records. Non-fatal — the primary record stands.
    for (idx, uri, created) in &written {
        let doc = &docs[*idx];
        let resolved = links::resolve_links(&doc.body, &docs, &config.collections.note);
        let payload = records::note_record(doc, config, &resolved);
        if let Err(err) = put_note(store, uri, &config.collections.note, payload, *created) {
            warn(&mut summary, format!("note record for {} failed: {err}", doc.slug));
        }
    }

    // Phase 7: stale-link repair over everything outside the current batch.
    let new_slugs: Vec<Slug> = written
        .iter()
        .filter(|(_, _, created)| *created)
        .map(|(idx, _, _)| docs[*idx].slug.clone())
        .collect();
    if !new_slugs.is_empty() {
        let batch: BTreeSet<PathBuf> = plan
            .entries
            .iter()
            .map(|e| docs[e.doc].rel_path.clone())
            .collect();
        let stale =
            links::find_stale_documents(&docs, &state, &config.content_dir, &new_slugs, &batch);
        for doc in stale {
            let key = state_key(&config.content_dir, &doc.rel_path);
            let Some(raw_uri) = existing_identity(doc, state.posts.get(&key)) else {
                continue;
            };
            let Ok(uri) = raw_uri.parse::<RecordRef>() else {
                warn(
                    &mut summary,
                    format!("stale-link repair skipped for {}: bad identity {raw_uri:?}", doc.slug),
                );
                continue;
            };
            let resolved = links::resolve_links(&doc.body, &docs, &config.collections.note);
            let payload = records::note_record(doc, config, &resolved);
            match put_note(store, &uri, &config.collections.note, payload, false) {
                Ok(()) => summary.repaired += 1,
                Err(err) => warn(
                    &mut summary,
                    format!("stale-link repair for {} failed: {err}", doc.slug),
                ),
            }
        }
    }

    // Phase 8: deletions — primary, best-effort note, then the state entry.
    for pending in &deletions {
        let uri: RecordRef = match pending.at_uri.parse() {
            Ok(uri) => uri,
            Err(err) => {
                summary.errors += 1;
                warn(&mut summary, format!("cannot delete {:?}: {err}", pending.at_uri));
                continue;
            }
        };
        match store.delete_record(&uri) {
            Ok(()) => {
                let note_uri = uri.with_collection(&config.collections.note);
                if let Err(err) = store.delete_record(&note_uri) {
                    // The note record may never have been created.
                    tracing::debug!("note delete for {} skipped: {err}", pending.at_uri);
                }
                state.posts.remove(&pending.key);
                summary.deleted += 1;
            }
            Err(err) => {
                summary.errors += 1;
                warn(
                    &mut summary,
                    format!("delete failed for {}: {err}", pending.at_uri),
                );
            }
        }
    }

    // Phase 9: commit.
    state::save_at(root, &state)?;
    tracing::info!(
        "published: {} created, {} updated, {} deleted, {} errors",
        summary.created,
        summary.updated,
        summary.deleted,
        summary.errors
    );
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// The identity an update targets: the frontmatter field first, then the
/// state entry.
fn existing_identity(doc: &Document, entry: Option<&StateEntry>) -> Option<String> {
    doc.front
        .at_uri
        .clone()
        .or_else(|| entry.map(|e| e.at_uri.clone()).filter(|uri| !uri.is_empty()))
}

fn update_primary(
    store: &mut dyn RecordStore,
    doc: &Document,
    entry: Option<&StateEntry>,
    key: &str,
    payload: Value,
) -> Result<(RecordRef, bool), SyncError> {
    let raw_uri = existing_identity(doc, entry).ok_or_else(|| SyncError::MissingIdentity {
        key: key.to_owned(),
    })?;
    let uri: RecordRef = raw_uri.parse()?;
    store.update_record(&uri, payload)?;
    Ok((uri, false))
}

/// Put the note record paired with `primary`. Creates then falls back to
/// update (or the reverse), so a missing note never fails an update run.
fn put_note(
    store: &mut dyn RecordStore,
    primary: &RecordRef,
    note_collection: &str,
    payload: Value,
    created: bool,
) -> Result<(), TransportError> {
    let note_uri = primary.with_collection(note_collection);
    if created {
        match store.create_record(note_collection, Some(&primary.rkey), payload.clone()) {
            Ok(_) => Ok(()),
            Err(_) => store.update_record(&note_uri, payload),
        }
    } else {
        match store.update_record(&note_uri, payload.clone()) {
            Ok(()) => Ok(()),
            Err(_) => store
                .create_record(note_collection, Some(&primary.rkey), payload)
                .map(|_| ()),
        }
    }
}

/// Write `content` to `path` via a `.tmp` sibling and atomic rename.
fn atomic_write(path: &Path, content: &str) -> Result<(), SyncError> {
    let tmp = PathBuf::from(format!("{}.vellum.tmp", path.display()));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
