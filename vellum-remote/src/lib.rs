//! # vellum-remote
//!
//! The [`RecordStore`] contract the publish engine writes against, and the
//! ureq-backed [`XrpcClient`] that speaks it to an AT-style PDS.

pub mod client;
pub mod error;
pub mod xrpc;

pub use client::{BlobRef, RecordStore, RemoteRecord};
pub use error::TransportError;
pub use xrpc::XrpcClient;
