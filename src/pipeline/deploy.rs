// src/pipeline/deploy.rs

//! Upload of the output tree to a remote file store.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, bail, Context};
use futures::{stream, StreamExt};
use opendal::{services, ErrorKind, Operator};
use tracing::{debug, info, warn};

use crate::config::DeploySection;
use crate::dag::{TransformUnit, UnitFuture};
use crate::errors::{PipelineError, Result};
use crate::fs::{walk_files, FileSystem};
use crate::watch::path_utils::relative_str;

/// What the remote store knows about a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFile {
    Missing,
    /// Present, with its modification time in Unix seconds if reported.
    Present { modified_secs: Option<i64> },
}

/// Upload unless the remote copy is at least as new as the local one.
///
/// Unknown timestamps on either side mean upload.
pub fn needs_upload(local_modified: Option<SystemTime>, remote: RemoteFile) -> bool {
    let remote_secs = match remote {
        RemoteFile::Missing => return true,
        RemoteFile::Present { modified_secs: None } => return true,
        RemoteFile::Present {
            modified_secs: Some(secs),
        } => secs,
    };
    let Some(local) = local_modified else {
        return true;
    };
    let local_secs = match local.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs() as i64,
        Err(_) => return true,
    };
    local_secs > remote_secs
}

/// Outcome of one deploy run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    pub uploaded: usize,
    pub skipped: usize,
    /// `(remote path, cause)` for each failed transfer.
    pub failed: Vec<(String, String)>,
}

enum Transfer {
    Uploaded,
    Skipped,
}

/// Build the FTP operator described by `cfg`.
pub fn ftp_operator(cfg: &DeploySection) -> Result<Operator> {
    let host = cfg
        .host
        .as_deref()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| PipelineError::ConfigError("deploy.host is not set".to_string()))?;

    let mut builder = services::Ftp::default().endpoint(host).root(&cfg.root);
    if let Some(user) = cfg.user.as_deref() {
        builder = builder.user(user);
    }
    if let Some(password) = cfg.password.as_deref() {
        builder = builder.password(password);
    }

    let op = Operator::new(builder)
        .map_err(|e| PipelineError::Deploy(format!("initializing ftp client: {e}")))?
        .finish();
    info!(host, root = %cfg.root, "deploy target configured");
    Ok(op)
}

/// Upload every file below `out` that the remote store lacks or has an
/// older copy of, with at most `parallel` transfers in flight.
pub async fn deploy_tree(
    fs: Arc<dyn FileSystem>,
    out: &Path,
    op: &Operator,
    parallel: usize,
) -> anyhow::Result<DeployReport> {
    let files = walk_files(fs.as_ref(), out)?;
    debug!(files = files.len(), "deploy candidates collected");

    let jobs: Vec<(PathBuf, String)> = files
        .into_iter()
        .filter_map(|file| relative_str(out, &file).map(|rel| (file, rel)))
        .collect();

    let results: Vec<(String, anyhow::Result<Transfer>)> = stream::iter(jobs)
        .map(|(file, rel)| {
            let fs = Arc::clone(&fs);
            let op = op.clone();
            async move {
                let res = transfer(fs.as_ref(), &file, &rel, &op).await;
                (rel, res)
            }
        })
        .buffer_unordered(parallel.max(1))
        .collect()
        .await;

    let mut report = DeployReport::default();
    for (rel, res) in results {
        match res {
            Ok(Transfer::Uploaded) => report.uploaded += 1,
            Ok(Transfer::Skipped) => report.skipped += 1,
            Err(err) => {
                warn!(path = %rel, "upload failed: {err:#}");
                report.failed.push((rel, format!("{err:#}")));
            }
        }
    }
    report.failed.sort();
    Ok(report)
}

async fn transfer(
    fs: &dyn FileSystem,
    file: &Path,
    rel: &str,
    op: &Operator,
) -> anyhow::Result<Transfer> {
    let remote = match op.stat(rel).await {
        Ok(meta) => RemoteFile::Present {
            modified_secs: meta.last_modified().map(|dt| dt.timestamp()),
        },
        Err(err) if err.kind() == ErrorKind::NotFound => RemoteFile::Missing,
        Err(err) => return Err(anyhow!(err).context(format!("stat {rel}"))),
    };

    let local_modified = fs.modified(file)?;
    if !needs_upload(local_modified, remote) {
        debug!(path = %rel, "remote copy is up to date");
        return Ok(Transfer::Skipped);
    }

    let bytes = fs.read(file)?;
    let size = bytes.len();
    op.write(rel, bytes)
        .await
        .with_context(|| format!("uploading {rel}"))?;
    debug!(path = %rel, size, "uploaded");
    Ok(Transfer::Uploaded)
}

/// The `deploy` task.
#[derive(Debug, Clone)]
pub struct DeployUnit {
    fs: Arc<dyn FileSystem>,
    out: PathBuf,
    cfg: DeploySection,
    operator: Option<Operator>,
}

impl DeployUnit {
    pub fn new(fs: Arc<dyn FileSystem>, out: impl Into<PathBuf>, cfg: DeploySection) -> Self {
        Self {
            fs,
            out: out.into(),
            cfg,
            operator: None,
        }
    }

    /// Use `operator` instead of connecting to the configured FTP host.
    pub fn with_operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    async fn deploy(&self) -> anyhow::Result<()> {
        let op = match &self.operator {
            Some(op) => op.clone(),
            None => ftp_operator(&self.cfg)?,
        };

        let report = deploy_tree(self.fs.clone(), &self.out, &op, self.cfg.parallel).await?;
        info!(
            uploaded = report.uploaded,
            skipped = report.skipped,
            failed = report.failed.len(),
            "deploy finished"
        );

        if !report.failed.is_empty() {
            let list: Vec<String> = report
                .failed
                .iter()
                .map(|(path, cause)| format!("{path}: {cause}"))
                .collect();
            bail!(
                "{} of {} transfers failed: {}",
                report.failed.len(),
                report.failed.len() + report.uploaded + report.skipped,
                list.join("; ")
            );
        }
        Ok(())
    }
}

impl TransformUnit for DeployUnit {
    fn run(&self) -> UnitFuture<'_> {
        Box::pin(self.deploy())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::fs::MockFileSystem;

    fn memory() -> Operator {
        Operator::new(services::Memory::default()).unwrap().finish()
    }

    #[test]
    fn upload_rules() {
        let t = UNIX_EPOCH + Duration::from_secs(1_000);
        assert!(needs_upload(Some(t), RemoteFile::Missing));
        assert!(needs_upload(Some(t), RemoteFile::Present { modified_secs: None }));
        assert!(needs_upload(None, RemoteFile::Present { modified_secs: Some(5) }));
        assert!(needs_upload(Some(t), RemoteFile::Present { modified_secs: Some(999) }));
        assert!(!needs_upload(Some(t), RemoteFile::Present { modified_secs: Some(1_000) }));
        assert!(!needs_upload(Some(t), RemoteFile::Present { modified_secs: Some(2_000) }));
    }

    #[tokio::test]
    async fn uploads_the_output_tree() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/app/index.html", "<p>");
        fs.add_file("/p/app/css/main.css", "body{}");
        fs.add_file("/p/app/img/a/b.png", "png");
        let op = memory();

        let report = deploy_tree(Arc::new(fs), Path::new("/p/app"), &op, 2)
            .await
            .unwrap();

        assert_eq!(report.uploaded, 3);
        assert!(report.failed.is_empty());
        let css = op.read("css/main.css").await.unwrap().to_vec();
        assert_eq!(css, b"body{}");
        assert!(op.exists("img/a/b.png").await.unwrap());
    }

    #[tokio::test]
    async fn unit_uses_injected_operator() {
        let fs = MockFileSystem::new();
        fs.add_file("/p/app/robots.txt", "User-agent: *");
        let op = memory();

        let unit = DeployUnit::new(Arc::new(fs), "/p/app", DeploySection::default())
            .with_operator(op.clone());
        unit.run().await.unwrap();

        assert!(op.exists("robots.txt").await.unwrap());
    }

    #[tokio::test]
    async fn missing_host_fails_the_task() {
        let unit = DeployUnit::new(
            Arc::new(MockFileSystem::new()),
            "/p/app",
            DeploySection::default(),
        );
        let err = unit.run().await.unwrap_err();
        assert!(format!("{err:#}").contains("deploy.host"));
    }
}
