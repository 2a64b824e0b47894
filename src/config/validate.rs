// src/config/validate.rs

use std::collections::HashMap;

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{PipelineError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipelineError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_server(cfg)?;
    validate_watch(cfg)?;
    validate_fonts(cfg)?;
    validate_deploy(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    if cfg.paths.src.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(
            "[paths].src must not be empty".to_string(),
        ));
    }
    if cfg.paths.out.as_os_str().is_empty() {
        return Err(PipelineError::ConfigError(
            "[paths].out must not be empty".to_string(),
        ));
    }
    if cfg.paths.src == cfg.paths.out {
        return Err(PipelineError::ConfigError(format!(
            "[paths].src and [paths].out must differ (both are {:?})",
            cfg.paths.src
        )));
    }
    Ok(())
}

fn validate_server(cfg: &RawConfigFile) -> Result<()> {
    if cfg.server.enabled && cfg.server.port == 0 {
        return Err(PipelineError::ConfigError(
            "[server].port must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_watch(cfg: &RawConfigFile) -> Result<()> {
    if cfg.watch.debounce_ms == 0 {
        return Err(PipelineError::ConfigError(
            "[watch].debounce_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    let Some(bindings) = &cfg.watch.binding else {
        return Ok(());
    };

    // A pattern owns exactly one task.
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for binding in bindings {
        Glob::new(&binding.pattern).map_err(|e| {
            PipelineError::ConfigError(format!(
                "invalid watch pattern '{}': {e}",
                binding.pattern
            ))
        })?;

        if binding.task.trim().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "watch pattern '{}' has an empty task name",
                binding.pattern
            )));
        }

        if let Some(previous) = owners.insert(&binding.pattern, &binding.task) {
            if previous != binding.task {
                return Err(PipelineError::ConfigError(format!(
                    "watch pattern '{}' is bound to both '{}' and '{}'",
                    binding.pattern, previous, binding.task
                )));
            }
        }
    }

    Ok(())
}

fn validate_fonts(cfg: &RawConfigFile) -> Result<()> {
    let mut seen = HashMap::new();
    for (idx, conv) in cfg.tools.fonts.iter().enumerate() {
        let ext = conv.extension.trim_start_matches('.');
        if ext.is_empty() || conv.cmd.trim().is_empty() {
            return Err(PipelineError::ConfigError(format!(
                "[[tools.fonts]] entry {idx} needs both `cmd` and `extension`"
            )));
        }
        if ext.eq_ignore_ascii_case("ttf") {
            return Err(PipelineError::ConfigError(
                "[[tools.fonts]] extension must not be `ttf`".to_string(),
            ));
        }
        if let Some(first) = seen.insert(ext.to_ascii_lowercase(), idx) {
            return Err(PipelineError::ConfigError(format!(
                "[[tools.fonts]] entries {first} and {idx} both write `.{ext}` files"
            )));
        }
    }
    Ok(())
}

fn validate_deploy(cfg: &RawConfigFile) -> Result<()> {
    if cfg.deploy.parallel == 0 {
        return Err(PipelineError::ConfigError(
            "[deploy].parallel must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
