//! ureq-backed XRPC client for an AT-style personal data server.
//!
//! Thin by design: `com.atproto.repo.*` record CRUD plus blob upload, bearer
//! token auth. Session and credential acquisition live outside this crate —
//! the token arrives ready-made.

use std::time::Duration;

use serde_json::{json, Value};

use vellum_core::RecordRef;

use crate::client::{BlobRef, RecordStore, RemoteRecord};
use crate::error::TransportError;

const PAGE_SIZE: &str = "100";

/// Lazily-connected XRPC client.
///
/// The HTTP agent is built on first use and reused for every subsequent call
/// in the run.
pub struct XrpcClient {
    service: String,
    repo: String,
    token: String,
    agent: Option<ureq::Agent>,
}

impl XrpcClient {
    pub fn new(service: String, repo: String, token: String) -> XrpcClient {
        XrpcClient {
            service,
            repo,
            token,
            agent: None,
        }
    }

    /// Idempotent ensure-connected accessor: builds the agent once, hands out
    /// the same underlying handle on every repeat call.
    fn agent(&mut self) -> ureq::Agent {
        self.agent
            .get_or_insert_with(|| {
                tracing::debug!("connecting to {}", self.service);
                ureq::AgentBuilder::new()
                    .timeout(Duration::from_secs(30))
                    .build()
            })
            .clone()
    }

    fn url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service.trim_end_matches('/'), method)
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.token)
    }

    fn post(&mut self, method: &str, body: Value) -> Result<Value, TransportError> {
        let url = self.url(method);
        let auth = self.auth();
        let response = self
            .agent()
            .post(&url)
            .set("Authorization", &auth)
            .send_json(body)?;
        Ok(response.into_json()?)
    }
}

/// Decode one entry of a `listRecords` page.
fn parse_record(entry: &Value) -> Result<RemoteRecord, TransportError> {
    let uri = entry
        .get("uri")
        .and_then(Value::as_str)
        .ok_or_else(|| TransportError::Response("listing entry missing uri".to_owned()))?;
    let uri: RecordRef = uri
        .parse()
        .map_err(|_| TransportError::Response(format!("unparseable record uri {uri:?}")))?;
    Ok(RemoteRecord {
        uri,
        value: entry.get("value").cloned().unwrap_or(Value::Null),
    })
}

impl RecordStore for XrpcClient {
    fn create_record(
        &mut self,
        collection: &str,
        rkey: Option<&str>,
        value: Value,
    ) -> Result<RecordRef, TransportError> {
        let mut body = json!({
            "repo": self.repo,
            "collection": collection,
            "record": value,
        });
        if let Some(rkey) = rkey {
            body["rkey"] = json!(rkey);
        }
        let reply = self.post("com.atproto.repo.createRecord", body)?;
        let uri = reply
            .get("uri")
            .and_then(Value::as_str)
            .ok_or_else(|| TransportError::Response("createRecord reply missing uri".to_owned()))?;
        uri.parse()
            .map_err(|_| TransportError::Response(format!("unparseable record uri {uri:?}")))
    }

    fn update_record(&mut self, uri: &RecordRef, value: Value) -> Result<(), TransportError> {
        self.post(
            "com.atproto.repo.putRecord",
            json!({
                "repo": uri.authority,
                "collection": uri.collection,
                "rkey": uri.rkey,
                "record": value,
            }),
        )?;
        Ok(())
    }

    fn delete_record(&mut self, uri: &RecordRef) -> Result<(), TransportError> {
        self.post(
            "com.atproto.repo.deleteRecord",
            json!({
                "repo": uri.authority,
                "collection": uri.collection,
                "rkey": uri.rkey,
            }),
        )?;
        Ok(())
    }

    fn list_records(
        &mut self,
        repo: &str,
        collection: &str,
    ) -> Result<Vec<RemoteRecord>, TransportError> {
        let url = self.url("com.atproto.repo.listRecords");
        let auth = self.auth();
        let agent = self.agent();

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut request = agent
                .get(&url)
                .set("Authorization", &auth)
                .query("repo", repo)
                .query("collection", collection)
                .query("limit", PAGE_SIZE);
            if let Some(cursor) = &cursor {
                request = request.query("cursor", cursor);
            }
            let page: Value = request.call()?.into_json()?;

            let entries = page
                .get("records")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            let page_len = entries.len();
            for entry in &entries {
                records.push(parse_record(entry)?);
            }

            cursor = page
                .get("cursor")
                .and_then(Value::as_str)
                .map(str::to_owned);
            if cursor.is_none() || page_len == 0 {
                break;
            }
        }
        tracing::debug!("listed {} records in {collection}", records.len());
        Ok(records)
    }

    fn upload_blob(&mut self, bytes: &[u8], mime: &str) -> Result<BlobRef, TransportError> {
        let url = self.url("com.atproto.repo.uploadBlob");
        let auth = self.auth();
        let reply: Value = self
            .agent()
            .post(&url)
            .set("Authorization", &auth)
            .set("Content-Type", mime)
            .send_bytes(bytes)?
            .into_json()?;
        let blob = reply
            .get("blob")
            .cloned()
            .ok_or_else(|| TransportError::Response("uploadBlob reply missing blob".to_owned()))?;
        Ok(BlobRef(blob))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
