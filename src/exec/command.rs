// src/exec/command.rs

//! External tool execution.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info};

use crate::dag::{TransformUnit, UnitFuture};
use crate::types::TaskName;

/// Lines of stderr kept for the failure message.
const STDERR_TAIL: usize = 20;

/// A transformation delegated to an external program.
#[derive(Debug, Clone)]
pub struct CommandUnit {
    task: TaskName,
    cmd: String,
    cwd: PathBuf,
}

impl CommandUnit {
    pub fn new(task: impl Into<TaskName>, cmd: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            task: task.into(),
            cmd: cmd.into(),
            cwd: cwd.into(),
        }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }
}

impl TransformUnit for CommandUnit {
    fn run(&self) -> UnitFuture<'_> {
        Box::pin(run_shell(&self.task, &self.cmd, &self.cwd))
    }
}

/// Quote `value` for the shell [`run_shell`] uses, unless it only holds
/// characters that need no quoting.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        return value.to_string();
    }
    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Run `cmd` through the platform shell in `cwd`.
///
/// Stdout lines are logged at info level as tool output; stderr lines at
/// debug. A non-zero exit becomes an error carrying the exit code and the
/// last lines of stderr.
pub async fn run_shell(task: &str, cmd: &str, cwd: &Path) -> Result<()> {
    info!(task, cmd, "running external tool");

    let mut command = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    };

    command
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning `{cmd}` for task '{task}'"))?;

    let stdout_task = child.stdout.take().map(|stdout| {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(task = %task, "{line}");
            }
        })
    });

    let stderr_task = child.stderr.take().map(|stderr| {
        let task = task.to_string();
        tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!(task = %task, "stderr: {line}");
                if tail.len() == STDERR_TAIL {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail
        })
    });

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for `{cmd}` of task '{task}'"))?;

    if let Some(handle) = stdout_task {
        let _ = handle.await;
    }
    let tail = match stderr_task {
        Some(handle) => handle.await.unwrap_or_default(),
        None => VecDeque::new(),
    };

    if !status.success() {
        let code = status
            .code()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let stderr: Vec<String> = tail.into_iter().collect();
        if stderr.is_empty() {
            bail!("`{cmd}` exited with status {code}");
        }
        bail!("`{cmd}` exited with status {code}: {}", stderr.join("\n"));
    }

    debug!(task, cmd, "external tool finished");
    Ok(())
}
