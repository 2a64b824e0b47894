// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk, falling back to defaults (`loader.rs`).
//! - Validate basic invariants like sane limits and unambiguous watch
//!   patterns (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, DEPLOY_PASSWORD_ENV};
pub use model::{
    BindingConfig, ConfigFile, DeploySection, FontConverter, HtmlSection, PathsSection,
    RawConfigFile, ServerSection, ToolCommand, ToolsSection, WatchSection,
};
