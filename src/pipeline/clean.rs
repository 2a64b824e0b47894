// src/pipeline/clean.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use crate::dag::{TransformUnit, UnitFuture};
use crate::fs::FileSystem;

/// Empties the output directory, keeping the directory itself.
#[derive(Debug, Clone)]
pub struct CleanUnit {
    fs: Arc<dyn FileSystem>,
    out: PathBuf,
}

impl CleanUnit {
    pub fn new(fs: Arc<dyn FileSystem>, out: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            out: out.into(),
        }
    }

    fn clean(&self) -> anyhow::Result<usize> {
        if !self.fs.is_dir(&self.out) {
            return Ok(0);
        }
        let entries = self.fs.read_dir(&self.out)?;
        for entry in &entries {
            self.fs
                .remove(entry)
                .with_context(|| format!("cleaning {:?}", entry))?;
        }
        Ok(entries.len())
    }
}

impl TransformUnit for CleanUnit {
    fn run(&self) -> UnitFuture<'_> {
        let this = self.clone();
        Box::pin(async move {
            let removed = tokio::task::spawn_blocking(move || this.clean())
                .await
                .context("clean worker stopped")??;
            debug!(removed, "output directory cleaned");
            Ok(())
        })
    }
}
