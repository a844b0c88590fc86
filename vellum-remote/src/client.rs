//! The collaborator contract the publish engine consumes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use vellum_core::RecordRef;

use crate::error::TransportError;

/// One record fetched from a remote listing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRecord {
    pub uri: RecordRef,
    pub value: Value,
}

/// Opaque blob reference returned by the store, embedded verbatim into
/// record payloads that reference the blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobRef(pub Value);

/// Remote content store operations.
///
/// Takes `&mut self` throughout: implementations connect lazily and memoize
/// their handle on first use. Calls are issued sequentially, one document at
/// a time — implementations need no internal synchronization.
pub trait RecordStore {
    /// Create a record; `rkey` of `None` lets the store assign one. Returns
    /// the full identity of the created record.
    fn create_record(
        &mut self,
        collection: &str,
        rkey: Option<&str>,
        value: Value,
    ) -> Result<RecordRef, TransportError>;

    fn update_record(&mut self, uri: &RecordRef, value: Value) -> Result<(), TransportError>;

    fn delete_record(&mut self, uri: &RecordRef) -> Result<(), TransportError>;

    /// Full listing of `collection` under `repo` — implementations page
    /// through any cursor until exhausted.
    fn list_records(
        &mut self,
        repo: &str,
        collection: &str,
    ) -> Result<Vec<RemoteRecord>, TransportError>;

    fn upload_blob(&mut self, bytes: &[u8], mime: &str) -> Result<BlobRef, TransportError>;
}
