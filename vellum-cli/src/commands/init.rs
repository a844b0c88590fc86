//! `vellum init [<path>] --service <url> --repo <authority>`

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use vellum_core::config;

/// Scaffold a site: vellum.yaml plus the content directory.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Site root directory (created if missing).
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Base URL of the remote content store.
    #[arg(long)]
    pub service: String,

    /// Authority segment of every record identity (e.g. "did:plc:...").
    #[arg(long)]
    pub repo: String,
}

impl InitArgs {
    pub fn run(self) -> Result<()> {
        std::fs::create_dir_all(&self.root)
            .with_context(|| format!("cannot create '{}'", self.root.display()))?;
        let root = self
            .root
            .canonicalize()
            .with_context(|| format!("cannot resolve path '{}'", self.root.display()))?;

        let config = config::init_at(&root, self.service, self.repo)
            .with_context(|| format!("failed to init site at '{}'", root.display()))?;

        println!("✓ Initialized site at '{}'", root.display());
        println!("  Config:  {}", config::config_path_at(&root).display());
        println!("  Content: {}", config.content_root(&root).display());
        Ok(())
    }
}
