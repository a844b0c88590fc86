//! `vellum publish` — run the reconciliation cycle for a site.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use vellum_core::config;
use vellum_remote::XrpcClient;
use vellum_sync::{publish_at, PublishOptions, RunSummary};

/// Arguments for `vellum publish`.
#[derive(Args, Debug)]
pub struct PublishArgs {
    /// Site root directory.
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    /// Compute and report the plan without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Republish every non-draft document regardless of stored hashes.
    #[arg(long)]
    pub force: bool,
}

impl PublishArgs {
    pub fn run(self) -> Result<()> {
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.root.display()))?;
        let config = config::load_at(&root).context("failed to load site config")?;
        let token = std::env::var("VELLUM_TOKEN")
            .context("VELLUM_TOKEN is not set — export an access token for the remote store")?;

        let mut store = XrpcClient::new(config.service.clone(), config.repo.clone(), token);
        let options = PublishOptions {
            dry_run: self.dry_run,
            force: self.force,
        };
        let summary = publish_at(&root, &config, &mut store, &options)
            .with_context(|| format!("publish failed for '{}'", root.display()))?;

        print_summary(&summary, self.dry_run);
        if summary.errors > 0 {
            bail!("{} document(s) failed to publish", summary.errors);
        }
        Ok(())
    }
}

fn print_summary(summary: &RunSummary, dry_run: bool) {
    if dry_run {
        if summary.planned.is_empty() && summary.deletions.is_empty() {
            println!("[dry-run] ✓ nothing to publish");
            return;
        }
        for item in &summary.planned {
            println!("[dry-run] ~ {} {} ({})", item.action, item.slug, item.reason);
        }
        for deletion in &summary.deletions {
            let name = if deletion.key.is_empty() {
                &deletion.at_uri
            } else {
                &deletion.key
            };
            println!("[dry-run] ✖ delete {name}");
        }
        println!(
            "[dry-run] {} write(s), {} deletion(s), {} skipped, {} draft(s)",
            summary.planned.len(),
            summary.deletions.len(),
            summary.skipped,
            summary.drafts,
        );
        return;
    }

    println!(
        "✓ {} created, {} updated, {} deleted, {} skipped ({} drafts)",
        summary.created, summary.updated, summary.deleted, summary.skipped, summary.drafts,
    );
    if summary.repaired > 0 {
        println!("  ↻ {} stale reference(s) repaired", summary.repaired);
    }
    for warning in &summary.warnings {
        println!("  ⚠ {warning}");
    }
}
