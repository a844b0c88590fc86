#![allow(dead_code)]

//! Shared test fixtures: a temp site on disk and an in-memory record store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::{json, Value};
use tempfile::TempDir;

use vellum_core::{RecordRef, SiteConfig};
use vellum_remote::{BlobRef, RecordStore, RemoteRecord, TransportError};

/// A fresh site root with a default config and an existing content dir.
pub fn site() -> (TempDir, SiteConfig) {
    let root = TempDir::new().expect("tempdir");
    let config = SiteConfig::new("https://pds.test".to_owned(), "did:plc:test".to_owned());
    std::fs::create_dir_all(config.content_root(root.path())).expect("mkdir content");
    (root, config)
}

pub fn write_doc(root: &TempDir, config: &SiteConfig, rel: &str, contents: &str) -> PathBuf {
    let path = config.content_root(root.path()).join(rel);
    std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    std::fs::write(&path, contents).expect("write doc");
    path
}

pub fn read_doc(root: &TempDir, config: &SiteConfig, rel: &str) -> String {
    std::fs::read_to_string(config.content_root(root.path()).join(rel)).expect("read doc")
}

/// In-memory [`RecordStore`]: a `uri → value` map plus call accounting and
/// injectable write failures.
pub struct MemoryStore {
    pub authority: String,
    pub records: BTreeMap<String, Value>,
    /// Collections whose create/update calls fail with HTTP 500.
    pub fail_writes: Vec<String>,
    /// Every delete attempt, in order, including ones answered 404.
    pub delete_log: Vec<String>,
    pub upload_count: usize,
    next_key: usize,
}

impl MemoryStore {
    pub fn new(authority: &str) -> MemoryStore {
        MemoryStore {
            authority: authority.to_owned(),
            records: BTreeMap::new(),
            fail_writes: Vec::new(),
            delete_log: Vec::new(),
            upload_count: 0,
            next_key: 0,
        }
    }

    pub fn seed(&mut self, uri: &str, value: Value) {
        self.records.insert(uri.to_owned(), value);
    }

    pub fn record(&self, uri: &str) -> Option<&Value> {
        self.records.get(uri)
    }

    pub fn deletes_of(&self, uri: &str) -> usize {
        self.delete_log.iter().filter(|u| *u == uri).count()
    }

    fn failing(&self, collection: &str) -> bool {
        self.fail_writes.iter().any(|c| c == collection)
    }

    fn injected(status: u16) -> TransportError {
        TransportError::Http {
            status,
            message: "injected failure".to_owned(),
        }
    }
}

impl RecordStore for MemoryStore {
    fn create_record(
        &mut self,
        collection: &str,
        rkey: Option<&str>,
        value: Value,
    ) -> Result<RecordRef, TransportError> {
        if self.failing(collection) {
            return Err(Self::injected(500));
        }
        let rkey = match rkey {
            Some(rkey) => rkey.to_owned(),
            None => {
                self.next_key += 1;
                format!("rk{}", self.next_key)
            }
        };
        let uri = format!("at://{}/{collection}/{rkey}", self.authority);
        self.records.insert(uri.clone(), value);
        Ok(uri.parse().expect("memory store uri"))
    }

    fn update_record(&mut self, uri: &RecordRef, value: Value) -> Result<(), TransportError> {
        if self.failing(&uri.collection) {
            return Err(Self::injected(500));
        }
        let key = uri.to_string();
        if !self.records.contains_key(&key) {
            return Err(Self::injected(404));
        }
        self.records.insert(key, value);
        Ok(())
    }

    fn delete_record(&mut self, uri: &RecordRef) -> Result<(), TransportError> {
        let key = uri.to_string();
        self.delete_log.push(key.clone());
        if self.records.remove(&key).is_none() {
            return Err(Self::injected(404));
        }
        Ok(())
    }

    fn list_records(
        &mut self,
        repo: &str,
        collection: &str,
    ) -> Result<Vec<RemoteRecord>, TransportError> {
        let prefix = format!("at://{repo}/{collection}/");
        self.records
            .iter()
            .filter(|(uri, _)| uri.starts_with(&prefix))
            .map(|(uri, value)| {
                Ok(RemoteRecord {
                    uri: uri
                        .parse()
                        .map_err(|_| Self::injected(500))?,
                    value: value.clone(),
                })
            })
            .collect()
    }

    fn upload_blob(&mut self, bytes: &[u8], mime: &str) -> Result<BlobRef, TransportError> {
        self.upload_count += 1;
        Ok(BlobRef(json!({
            "$type": "blob",
            "mimeType": mime,
            "size": bytes.len(),
        })))
    }
}
