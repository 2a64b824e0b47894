// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(String),

    /// A composite contains itself, directly or transitively.
    #[error("Cyclic task graph: {0}")]
    CyclicGraph(String),

    /// A task finished with a failed run result.
    #[error("Task '{task}' failed: {cause}")]
    Transformation { task: String, cause: String },

    #[error("Watch setup failed: {0}")]
    WatchSetup(String),

    #[error("Deploy error: {0}")]
    Deploy(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipelineError>;
