// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod reload;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{load_and_validate, ConfigFile};
use crate::dag::{Scheduler, Task, TaskGraph};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::errors::PipelineError;
use crate::exec::SchedulerBackend;
use crate::pipeline::{Pipeline, BUILD, DEFAULT, DEPLOY, STYLES};
use crate::reload::{spawn_server, ReloadNotifier, ViewerRegistry};
use crate::types::BuildMode;
use crate::watch::{spawn_watcher, BindingTable};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the task graph and watch bindings
/// - the scheduler for one-shot entry points
/// - watcher / runtime / live-reload server for `default` and `watch`
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    let command = args.command();

    let mode = match command {
        Command::Build => BuildMode::Production,
        _ => BuildMode::Development,
    };

    let pipeline = Pipeline::new(&root, cfg.clone(), mode);
    let graph = Arc::new(pipeline.build_graph()?);
    let bindings = pipeline.binding_table(&graph)?;

    if args.dry_run {
        print_dry_run(&graph, &bindings, mode);
        return Ok(());
    }

    info!(?command, ?mode, root = ?root, "starting");

    match command {
        Command::Build => run_once(&Scheduler::new(), &graph, BUILD).await,
        Command::Styles => run_once(&Scheduler::new(), &graph, STYLES).await,
        Command::Deploy => run_once(&Scheduler::new(), &graph, DEPLOY).await,
        Command::Default => {
            let registry = ViewerRegistry::new();
            let scheduler = Scheduler::with_notifier(ReloadNotifier::new(registry.clone()));
            if let Err(err) = run_once(&scheduler, &graph, DEFAULT).await {
                // The watcher picks up the fix.
                warn!("initial build failed: {err:#}");
            }
            watch_and_serve(&cfg, &pipeline, graph, bindings, scheduler, registry).await
        }
        Command::Watch => {
            let registry = ViewerRegistry::new();
            let scheduler = Scheduler::with_notifier(ReloadNotifier::new(registry.clone()));
            watch_and_serve(&cfg, &pipeline, graph, bindings, scheduler, registry).await
        }
    }
}

/// Run one named task to completion; a failed run becomes an error.
pub async fn run_once(scheduler: &Scheduler, graph: &TaskGraph, name: &str) -> Result<()> {
    let task = graph.task(name)?;
    let result = scheduler.run(&task).await;
    if result.succeeded() {
        return Ok(());
    }
    let cause = result
        .failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(PipelineError::Transformation {
        task: name.to_string(),
        cause,
    }
    .into())
}

/// Serve the output directory and re-run bound tasks on change until Ctrl-C.
async fn watch_and_serve(
    cfg: &ConfigFile,
    pipeline: &Pipeline,
    graph: Arc<TaskGraph>,
    bindings: BindingTable,
    scheduler: Scheduler,
    registry: ViewerRegistry,
) -> Result<()> {
    let _server = if cfg.server.enabled {
        Some(spawn_server(&cfg.server, pipeline.out_dir(), registry.clone()).await?)
    } else {
        None
    };

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let executor = SchedulerBackend::new(scheduler, rt_tx.clone());

    let _watcher = spawn_watcher(
        pipeline.root(),
        bindings,
        Duration::from_millis(cfg.watch.debounce_ms),
        rt_tx.clone(),
    )?;

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }
    drop(rt_tx);

    let core = CoreRuntime::new(graph, RuntimeOptions::default());
    let runtime = Runtime::new(core, rt_rx, executor);
    let core = runtime.run().await?;

    info!(
        runs = core.completed_runs(),
        failed = core.failed_runs(),
        viewers = registry.len(),
        "watch stopped"
    );
    Ok(())
}

/// Figure out a sensible project root.
///
/// - If the config path has a non-empty parent (e.g. "site/Assetpipe.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Assetpipe.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Dry-run output: task tree and watch bindings.
fn print_dry_run(graph: &TaskGraph, bindings: &BindingTable, mode: BuildMode) {
    println!("assetpipe dry-run ({mode:?})");
    println!();

    println!("tasks ({}):", graph.len());
    for name in graph.names() {
        let Some(task) = graph.get(name) else { continue };
        match task {
            Task::Leaf(leaf) => {
                println!("  - {name}");
                if !leaf.inputs().is_empty() {
                    println!("      inputs: {:?}", leaf.inputs());
                }
                if let Some(out) = leaf.output() {
                    println!("      output: {}", out.display());
                }
                if let Some(kind) = leaf.reload() {
                    println!("      reload: {kind}");
                }
            }
            composite => {
                let children: Vec<&str> = composite.children().iter().map(|c| c.name()).collect();
                println!("  - {name} = {}({})", composite.kind(), children.join(", "));
            }
        }
    }
    println!();

    println!("watch bindings ({}):", bindings.bindings().len());
    for binding in bindings.bindings() {
        println!("  {} -> {}", binding.pattern, binding.task);
    }

    debug!("dry-run complete (no execution)");
}
