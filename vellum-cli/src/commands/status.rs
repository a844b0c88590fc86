//! `vellum status` — pending changes at a glance, fully offline.
//!
//! Runs the scan and local diff phases only: nothing here contacts the
//! remote store, so orphaned remote records are not reported (use
//! `vellum publish --dry-run` for the full plan).

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use vellum_core::config;
use vellum_sync::diff::{pending_deletions, plan_local, Action};
use vellum_sync::{scan_at, state};

/// Arguments for `vellum status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Site root directory.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocStatus {
    New,
    Changed,
    Clean,
    Draft,
    Deleted,
}

impl DocStatus {
    fn key(self) -> &'static str {
        match self {
            DocStatus::New => "new",
            DocStatus::Changed => "changed",
            DocStatus::Clean => "clean",
            DocStatus::Draft => "draft",
            DocStatus::Deleted => "deleted",
        }
    }

    fn label(self) -> &'static str {
        match self {
            DocStatus::New => "NEW",
            DocStatus::Changed => "CHANGED",
            DocStatus::Clean => "CLEAN",
            DocStatus::Draft => "DRAFT",
            DocStatus::Deleted => "DELETED",
        }
    }

    fn indicator(self) -> String {
        match self {
            DocStatus::New => "■".cyan().bold().to_string(),
            DocStatus::Changed => "■".yellow().bold().to_string(),
            DocStatus::Clean => "■".green().bold().to_string(),
            DocStatus::Draft => "■".bright_black().bold().to_string(),
            DocStatus::Deleted => "■".magenta().bold().to_string(),
        }
    }
}

#[derive(Debug)]
struct StatusRow {
    slug: String,
    status: DocStatus,
    detail: String,
    last_published_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    documents: Vec<DocumentStatusJson>,
}

#[derive(Serialize)]
struct StatusSummaryJson {
    documents: usize,
    pending_writes: usize,
    pending_deletions: usize,
    drafts: usize,
}

#[derive(Serialize)]
struct DocumentStatusJson {
    slug: String,
    status: String,
    detail: String,
    last_published_at: Option<String>,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "document")]
    slug: String,
    #[tabled(rename = "status")]
    status: String,
    #[tabled(rename = "detail")]
    detail: String,
    #[tabled(rename = "last publish")]
    last_publish: String,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.root.display()))?;
        let config =
            config::load_at(&root).context("failed to load site config — run `vellum init` first")?;

        let outcome = scan_at(&root, &config).context("scan failed")?;
        let state = state::load_at(&root);
        let plan = plan_local(&outcome.documents, &state, &config.content_dir, false);
        let deletions = pending_deletions(&root, &state);

        let mut classified: BTreeMap<usize, (DocStatus, String)> = BTreeMap::new();
        for entry in &plan.entries {
            let status = match entry.action {
                Action::Create => DocStatus::New,
                Action::Update => DocStatus::Changed,
            };
            classified.insert(entry.doc, (status, entry.reason.to_string()));
        }
        for idx in &plan.skipped {
            classified.insert(*idx, (DocStatus::Clean, "up to date".to_owned()));
        }
        for idx in &plan.drafts {
            classified.insert(*idx, (DocStatus::Draft, "not published".to_owned()));
        }

        let mut rows = Vec::new();
        for (idx, doc) in outcome.documents.iter().enumerate() {
            let (status, detail) = classified
                .remove(&idx)
                .unwrap_or((DocStatus::Clean, "up to date".to_owned()));
            let key = state::state_key(&config.content_dir, &doc.rel_path);
            rows.push(StatusRow {
                slug: doc.slug.0.clone(),
                status,
                detail,
                last_published_at: state.posts.get(&key).map(|e| e.published_at),
            });
        }
        for deletion in &deletions {
            rows.push(StatusRow {
                slug: deletion.key.clone(),
                status: DocStatus::Deleted,
                detail: "file removed".to_owned(),
                last_published_at: state.posts.get(&deletion.key).map(|e| e.published_at),
            });
        }

        let pending_writes = plan.entries.len();
        if self.json {
            print_json(&rows, outcome.documents.len(), pending_writes, deletions.len(), plan.drafts.len())?;
        } else {
            print_table(&rows, outcome.documents.len(), pending_writes, deletions.len());
        }
        Ok(())
    }
}

fn print_json(
    rows: &[StatusRow],
    documents: usize,
    pending_writes: usize,
    pending_deletions: usize,
    drafts: usize,
) -> Result<()> {
    let payload = StatusReportJson {
        summary: StatusSummaryJson {
            documents,
            pending_writes,
            pending_deletions,
            drafts,
        },
        documents: rows
            .iter()
            .map(|row| DocumentStatusJson {
                slug: row.slug.clone(),
                status: row.status.key().to_owned(),
                detail: row.detail.clone(),
                last_published_at: row.last_published_at.map(|t| t.to_rfc3339()),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(rows: &[StatusRow], documents: usize, pending_writes: usize, deletions: usize) {
    println!(
        "Vellum v{} | {} documents | {} pending write(s) | {} pending deletion(s)",
        env!("CARGO_PKG_VERSION"),
        documents,
        pending_writes,
        deletions,
    );

    if rows.is_empty() {
        println!("No documents found.");
        return;
    }

    println!(
        "Indicators: {} NEW  {} CHANGED  {} CLEAN  {} DRAFT  {} DELETED",
        DocStatus::New.indicator(),
        DocStatus::Changed.indicator(),
        DocStatus::Clean.indicator(),
        DocStatus::Draft.indicator(),
        DocStatus::Deleted.indicator(),
    );

    let table_rows: Vec<StatusTableRow> = rows
        .iter()
        .map(|row| StatusTableRow {
            slug: row.slug.clone(),
            status: row.status.label().to_owned(),
            detail: row.detail.clone(),
            last_publish: row
                .last_published_at
                .map_or_else(|| "never".to_owned(), format_age),
        })
        .collect();
    let mut table = Table::new(table_rows);
    table.with(Style::rounded());
    println!("{table}");

    if pending_writes + deletions > 0 {
        println!("Run 'vellum publish' to reconcile.");
    }
}

/// Compact age: `42s`, `7m`, `3h`, `12d`.
fn format_age(timestamp: DateTime<Utc>) -> String {
    let seconds = Utc::now()
        .signed_duration_since(timestamp)
        .num_seconds()
        .max(0) as u64;
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
