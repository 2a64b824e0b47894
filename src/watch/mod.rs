// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling the `pattern -> task` binding table.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of changes into one trigger per task.
//!
//! It does **not** know whether a task is running; re-entrancy and
//! coalescing are handled by the engine.

pub mod bindings;
pub mod debounce;
pub mod path_utils;
pub mod watcher;

pub use bindings::{BindingTable, WatchBinding};
pub use debounce::Debouncer;
pub use watcher::{spawn_watcher, WatcherHandle};
