// src/pipeline/copy.rs

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::dag::{TransformUnit, UnitFuture};
use crate::errors::{PipelineError, Result};
use crate::fs::{walk_files, FileSystem};
use crate::watch::path_utils::relative_str;

/// Copies a directory tree, optionally filtered by globs relative to `from`.
#[derive(Debug, Clone)]
pub struct CopyUnit {
    fs: Arc<dyn FileSystem>,
    from: PathBuf,
    to: PathBuf,
    include: Option<GlobSet>,
}

impl CopyUnit {
    pub fn new(fs: Arc<dyn FileSystem>, from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            from: from.into(),
            to: to.into(),
            include: None,
        }
    }

    /// Only copy files matching one of `patterns`.
    pub fn only(mut self, patterns: &[&str]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pat in patterns {
            let glob = Glob::new(pat)
                .map_err(|e| PipelineError::ConfigError(format!("invalid glob '{pat}': {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| PipelineError::ConfigError(e.to_string()))?;
        self.include = Some(set);
        Ok(self)
    }

    fn copy_all(&self) -> anyhow::Result<usize> {
        let mut copied = 0;
        for file in walk_files(self.fs.as_ref(), &self.from)? {
            let Some(rel) = relative_str(&self.from, &file) else {
                continue;
            };
            if let Some(include) = &self.include {
                if !include.is_match(&rel) {
                    continue;
                }
            }
            let bytes = self.fs.read(&file)?;
            let dest = self.to.join(&rel);
            self.fs
                .write(&dest, &bytes)
                .with_context(|| format!("copying {:?} to {:?}", file, dest))?;
            copied += 1;
        }
        Ok(copied)
    }
}

impl TransformUnit for CopyUnit {
    fn run(&self) -> UnitFuture<'_> {
        let this = self.clone();
        Box::pin(async move {
            let from = this.from.clone();
            let copied = tokio::task::spawn_blocking(move || this.copy_all())
                .await
                .context("copy worker stopped")??;
            debug!(from = ?from, copied, "files copied");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use std::path::Path;

    #[tokio::test]
    async fn copies_only_matching_files() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/img/logo.svg", "<svg/>");
        fs.add_file("/p/src/img/photos/cat.jpg", "jpg");
        fs.add_file("/p/src/img/notes.txt", "skip me");

        let unit = CopyUnit::new(Arc::new(fs.clone()), "/p/src/img", "/p/app/img")
            .only(&["**/*.{jpg,png,jpeg,svg}"])
            .unwrap();
        unit.run().await.unwrap();

        assert_eq!(fs.read_to_string(Path::new("/p/app/img/logo.svg")).unwrap(), "<svg/>");
        assert!(fs.is_file(Path::new("/p/app/img/photos/cat.jpg")));
        assert!(!fs.exists(Path::new("/p/app/img/notes.txt")));
    }

    #[tokio::test]
    async fn unfiltered_copy_takes_everything() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/resources/robots.txt", "User-agent: *");
        fs.add_file("/p/src/resources/docs/a.pdf", "pdf");

        CopyUnit::new(Arc::new(fs.clone()), "/p/src/resources", "/p/app")
            .run()
            .await
            .unwrap();

        assert!(fs.is_file(Path::new("/p/app/robots.txt")));
        assert!(fs.is_file(Path::new("/p/app/docs/a.pdf")));
    }

    #[test]
    fn bad_glob_is_a_config_error() {
        let fs = MockFileSystem::new();
        let err = CopyUnit::new(Arc::new(fs), "/a", "/b").only(&["["]).unwrap_err();
        assert!(matches!(err, PipelineError::ConfigError(_)));
    }
}
