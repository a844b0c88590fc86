//! Deletion reconciliation: vanished local files, remote orphans, dry runs.

mod common;

use chrono::Utc;
use serde_json::json;

use common::{read_doc, site, write_doc, MemoryStore};
use vellum_sync::state::{load_at, save_at, state_path_at, StateEntry, StateFile};
use vellum_sync::{publish_at, DeletionOrigin, PublishOptions};

const DOC_COLLECTION: &str = "site.vellum.document";
const NOTE_COLLECTION: &str = "site.vellum.note";

#[test]
fn removed_local_file_deletes_remote_records_and_state() {
    let (root, config) = site();
    let path = write_doc(&root, &config, "a.md", "# A\n");

    let mut store = MemoryStore::new("did:plc:test");
    publish_at(root.path(), &config, &mut store, &PublishOptions::default()).expect("first run");
    let primary = load_at(root.path()).posts["content/a.md"].at_uri.clone();

    std::fs::remove_file(&path).expect("remove");
    let summary = publish_at(root.path(), &config, &mut store, &PublishOptions::default())
        .expect("second run");

    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.deletions.len(), 1);
    assert_eq!(summary.deletions[0].origin, DeletionOrigin::LocalRemoved);
    assert!(load_at(root.path()).posts.is_empty());
    assert!(store.record(&primary).is_none());
    // Best-effort note deletion was attempted too.
    let rkey = primary.rsplit('/').next().unwrap();
    assert_eq!(
        store.deletes_of(&format!("at://did:plc:test/{NOTE_COLLECTION}/{rkey}")),
        1
    );
}

#[test]
fn orphaned_remote_record_is_deleted() {
    let (root, config) = site();
    write_doc(&root, &config, "keep.md", "# Keep\n");

    let mut store = MemoryStore::new("did:plc:test");
    let ghost = format!("at://did:plc:test/{DOC_COLLECTION}/kg");
    store.seed(&ghost, json!({ "path": "content/ghost.md", "title": "Ghost" }));

    let summary = publish_at(root.path(), &config, &mut store, &PublishOptions::default())
        .expect("publish");
    assert_eq!(summary.created, 1);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.deletions[0].origin, DeletionOrigin::RemoteOrphan);
    assert!(store.record(&ghost).is_none());
}

#[test]
fn record_in_both_deletion_categories_is_deleted_once() {
    let (root, config) = site();

    let gone = format!("at://did:plc:test/{DOC_COLLECTION}/kg");
    let mut state = StateFile::default();
    state.posts.insert(
        "content/gone.md".to_owned(),
        StateEntry {
            hash: "h".to_owned(),
            at_uri: gone.clone(),
            published_at: Utc::now(),
            slug: "gone".to_owned(),
            social_uri: None,
        },
    );
    save_at(root.path(), &state).expect("seed state");

    let mut store = MemoryStore::new("did:plc:test");
    store.seed(&gone, json!({ "path": "content/gone.md" }));

    let summary = publish_at(root.path(), &config, &mut store, &PublishOptions::default())
        .expect("publish");
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.deletions.len(), 1, "queued exactly once");
    assert_eq!(store.deletes_of(&gone), 1);
    assert!(load_at(root.path()).posts.is_empty());
}

#[test]
fn dry_run_reports_the_plan_and_mutates_nothing() {
    let (root, config) = site();
    write_doc(&root, &config, "a.md", "# A\n");

    let mut store = MemoryStore::new("did:plc:test");
    let ghost = format!("at://did:plc:test/{DOC_COLLECTION}/kg");
    store.seed(&ghost, json!({ "path": "content/ghost.md" }));

    let options = PublishOptions {
        dry_run: true,
        ..PublishOptions::default()
    };
    let summary = publish_at(root.path(), &config, &mut store, &options).expect("dry run");

    assert_eq!(summary.planned.len(), 1);
    assert_eq!(summary.deletions.len(), 1);
    assert_eq!(summary.created, 0);
    assert_eq!(summary.deleted, 0);

    // Nothing was touched: no state file, no new records, no ghost deletion,
    // no frontmatter rewrite.
    assert!(!state_path_at(root.path()).exists());
    assert!(store.record(&ghost).is_some());
    assert_eq!(store.records.len(), 1);
    assert_eq!(read_doc(&root, &config, "a.md"), "# A\n");
}

#[test]
fn exclusion_pattern_change_does_not_delete_existing_records() {
    let (root, mut config) = site();
    write_doc(&root, &config, "archive/old.md", "# Old\n");

    let mut store = MemoryStore::new("did:plc:test");
    publish_at(root.path(), &config, &mut store, &PublishOptions::default()).expect("first run");

    // The file still exists on disk, so a new exclusion must not queue it.
    config.exclude.push("archive/".to_owned());
    let summary = publish_at(root.path(), &config, &mut store, &PublishOptions::default())
        .expect("second run");
    assert_eq!(summary.deleted, 0, "excluded but present file kept remotely");
    assert!(!load_at(root.path()).posts.is_empty());
}
