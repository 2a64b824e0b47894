// src/pipeline/html.rs

//! HTML partial inlining.
//!
//! `@include('header.html')` (or with double quotes) is replaced by the
//! contents of the referenced file, resolved relative to the including
//! file. Included files may include further files. Arguments after the
//! path, as in `@include('card.html', { "title": "x" })`, are accepted and
//! ignored.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use regex::Regex;
use tracing::debug;

use crate::dag::{TransformUnit, UnitFuture};
use crate::errors::{PipelineError, Result};
use crate::fs::{walk_files, FileSystem};
use crate::watch::path_utils::relative_str;

const INCLUDE_PATTERN: &str = r#"@include\(\s*['"]([^'"]+)['"]\s*(?:,[^)]*)?\)"#;

/// Maximum include depth; deeper chains are reported as errors.
const MAX_DEPTH: usize = 32;

/// Renders every `.html` file below `src` into the same relative path below
/// `out`.
///
/// Files whose name, or any directory above them, starts with `_` are
/// partials. They are rendered like any other page unless
/// [`HtmlUnit::skip_partials`] is set.
#[derive(Debug, Clone)]
pub struct HtmlUnit {
    fs: Arc<dyn FileSystem>,
    src: PathBuf,
    out: PathBuf,
    include: Regex,
    skip_partials: bool,
}

impl HtmlUnit {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        src: impl Into<PathBuf>,
        out: impl Into<PathBuf>,
    ) -> Result<Self> {
        let include = Regex::new(INCLUDE_PATTERN)
            .map_err(|e| PipelineError::ConfigError(format!("include pattern: {e}")))?;
        Ok(Self {
            fs,
            src: src.into(),
            out: out.into(),
            include,
            skip_partials: false,
        })
    }

    /// Leave partials out of the output directory.
    pub fn skip_partials(mut self, skip: bool) -> Self {
        self.skip_partials = skip;
        self
    }

    fn render_all(&self) -> anyhow::Result<usize> {
        let mut rendered = 0;
        for file in walk_files(self.fs.as_ref(), &self.src)? {
            if file.extension().and_then(|e| e.to_str()) != Some("html") {
                continue;
            }
            let Some(rel) = relative_str(&self.src, &file) else {
                continue;
            };
            if self.skip_partials && is_partial(&rel) {
                continue;
            }

            let html = self.render(&file)?;
            self.fs.write(&self.out.join(&rel), html.as_bytes())?;
            rendered += 1;
        }
        Ok(rendered)
    }

    /// Render one file with all includes expanded.
    pub fn render(&self, file: &Path) -> anyhow::Result<String> {
        let mut stack = Vec::new();
        self.render_inner(file, &mut stack)
    }

    fn render_inner(&self, file: &Path, stack: &mut Vec<PathBuf>) -> anyhow::Result<String> {
        if stack.iter().any(|p| p == file) {
            let chain: Vec<String> = stack
                .iter()
                .chain(std::iter::once(&file.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            bail!("include cycle: {}", chain.join(" -> "));
        }
        if stack.len() >= MAX_DEPTH {
            bail!("includes nested deeper than {MAX_DEPTH} levels at {:?}", file);
        }

        let text = self
            .fs
            .read_to_string(file)
            .with_context(|| match stack.last() {
                Some(parent) => format!("included from {:?}", parent),
                None => format!("rendering {:?}", file),
            })?;

        stack.push(file.to_path_buf());
        let base = file.parent().unwrap_or(Path::new(""));

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.include.captures_iter(&text) {
            let (Some(whole), Some(target)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            out.push_str(&text[last..whole.start()]);
            let included = normalize(&base.join(target.as_str()));
            out.push_str(&self.render_inner(&included, stack)?);
            last = whole.end();
        }
        out.push_str(&text[last..]);

        stack.pop();
        Ok(out)
    }
}

impl TransformUnit for HtmlUnit {
    fn run(&self) -> UnitFuture<'_> {
        let this = self.clone();
        Box::pin(async move {
            let rendered = tokio::task::spawn_blocking(move || this.render_all())
                .await
                .context("html worker stopped")??;
            debug!(rendered, "html pages rendered");
            Ok(())
        })
    }
}

fn is_partial(rel: &str) -> bool {
    rel.split('/').any(|part| part.starts_with('_'))
}

/// Resolve `.` and `..` lexically so cycle detection sees one spelling per
/// file.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
