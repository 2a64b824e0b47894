// src/pipeline/tools.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::debug;

use crate::config::FontConverter;
use crate::dag::{TransformUnit, UnitFuture};
use crate::exec::{run_shell, shell_quote};
use crate::fs::{walk_files, FileSystem};
use crate::pipeline::{expand, FONTS};
use crate::watch::path_utils::relative_str;

/// One converter invocation: `input` through `converter` into `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontJob {
    pub input: PathBuf,
    pub output: PathBuf,
    pub converter: usize,
}

/// Runs every configured converter once per `.ttf` file below `src`,
/// mirroring the directory layout below `out`.
#[derive(Debug, Clone)]
pub struct FontsUnit {
    fs: Arc<dyn FileSystem>,
    src: PathBuf,
    out: PathBuf,
    converters: Vec<FontConverter>,
    cwd: PathBuf,
}

impl FontsUnit {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        src: impl Into<PathBuf>,
        out: impl Into<PathBuf>,
        converters: Vec<FontConverter>,
        cwd: impl Into<PathBuf>,
    ) -> Self {
        Self {
            fs,
            src: src.into(),
            out: out.into(),
            converters,
            cwd: cwd.into(),
        }
    }

    /// Every `(font, converter)` pair to run, font-major.
    pub fn jobs(&self) -> anyhow::Result<Vec<FontJob>> {
        let mut jobs = Vec::new();
        for file in walk_files(self.fs.as_ref(), &self.src)? {
            let is_ttf = file
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf"));
            if !is_ttf {
                continue;
            }
            let Some(rel) = relative_str(&self.src, &file) else {
                continue;
            };
            for (idx, conv) in self.converters.iter().enumerate() {
                let ext = conv.extension.trim_start_matches('.');
                jobs.push(FontJob {
                    input: file.clone(),
                    output: self.out.join(Path::new(&rel).with_extension(ext)),
                    converter: idx,
                });
            }
        }
        Ok(jobs)
    }

    async fn convert_all(&self) -> anyhow::Result<()> {
        let jobs = self.jobs()?;
        let mut failed = Vec::new();

        for job in &jobs {
            if let Some(parent) = job.output.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {:?}", parent))?;
            }
            let input = shell_quote(&job.input.to_string_lossy());
            let output = shell_quote(&job.output.to_string_lossy());
            let cmd = expand(
                &self.converters[job.converter].cmd,
                &[("input", input.as_str()), ("output", output.as_str())],
            );
            if let Err(err) = run_shell(FONTS, &cmd, &self.cwd).await {
                failed.push(format!("{}: {err:#}", job.output.display()));
            }
        }

        if !failed.is_empty() {
            bail!(
                "{} of {} font conversions failed: {}",
                failed.len(),
                jobs.len(),
                failed.join("; ")
            );
        }
        debug!(converted = jobs.len(), "fonts converted");
        Ok(())
    }
}

impl TransformUnit for FontsUnit {
    fn run(&self) -> UnitFuture<'_> {
        Box::pin(self.convert_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfigFile;
    use crate::fs::MockFileSystem;

    #[test]
    fn every_font_gets_every_format() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/src/fonts/Inter.ttf", "ttf");
        fs.add_file("/p/src/fonts/mono/Code.TTF", "ttf");
        fs.add_file("/p/src/fonts/LICENSE.txt", "text");

        let unit = FontsUnit::new(
            Arc::new(fs),
            "/p/src/fonts",
            "/p/app/fonts",
            RawConfigFile::default().tools.fonts,
            "/p",
        );
        let outputs: Vec<PathBuf> = unit.jobs().unwrap().into_iter().map(|j| j.output).collect();
        assert_eq!(
            outputs,
            vec![
                PathBuf::from("/p/app/fonts/Inter.woff"),
                PathBuf::from("/p/app/fonts/Inter.woff2"),
                PathBuf::from("/p/app/fonts/mono/Code.woff"),
                PathBuf::from("/p/app/fonts/mono/Code.woff2"),
            ]
        );
    }

    #[cfg(unix)]
    fn copy_as(ext: &str) -> FontConverter {
        FontConverter {
            cmd: "cp {input} {output}".to_string(),
            extension: ext.to_string(),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn converters_run_per_font() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/fonts");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("a.ttf"), "A").unwrap();
        std::fs::write(src.join("b.ttf"), "B").unwrap();

        let unit = FontsUnit::new(
            Arc::new(crate::fs::RealFileSystem),
            &src,
            dir.path().join("app/fonts"),
            vec![copy_as("woff"), copy_as("woff2")],
            dir.path(),
        );
        unit.run().await.unwrap();

        let out = dir.path().join("app/fonts");
        assert_eq!(std::fs::read_to_string(out.join("b.woff")).unwrap(), "B");
        assert_eq!(std::fs::read_to_string(out.join("a.woff2")).unwrap(), "A");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn font_names_with_spaces_are_passed_intact() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src dir/fonts");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::write(src.join("Open Sans.ttf"), "OS").unwrap();

        let unit = FontsUnit::new(
            Arc::new(crate::fs::RealFileSystem),
            &src,
            dir.path().join("app/fonts"),
            vec![copy_as("woff")],
            dir.path(),
        );
        unit.run().await.unwrap();

        let out = dir.path().join("app/fonts/Open Sans.woff");
        assert_eq!(std::fs::read_to_string(out).unwrap(), "OS");
    }
}
