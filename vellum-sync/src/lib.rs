//! # vellum-sync
//!
//! Change detection and the multi-pass publish engine.
//!
//! Call [`publish_at`] to run a full reconciliation cycle for a site root, or
//! with [`PublishOptions::dry_run`] to compute and report the plan without
//! touching the remote store.

pub mod diff;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod links;
pub mod records;
pub mod scan;
pub mod state;

pub use diff::{Action, DeletionOrigin, PendingDeletion, Reason};
pub use engine::{publish_at, PlannedAction, PublishOptions, RunSummary};
pub use error::SyncError;
pub use scan::{scan_at, ScanOutcome};
