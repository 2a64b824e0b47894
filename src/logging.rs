// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from, in order: `--log-level`, the `ASSETPIPE_LOG`
//! environment variable (any `EnvFilter` directive string, e.g.
//! `"info,assetpipe::watch=debug"`), then `info`. Chatty transport crates
//! are capped at `warn` unless the directive string names them.
//!
//! Output goes to stderr; stdout belongs to the dry-run listing.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "ASSETPIPE_LOG";

const QUIET_DEPS: &[&str] = &["hyper", "tower_http", "opendal", "suppaftp"];

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directives = match cli_level {
        Some(lvl) => level_directive(lvl).to_string(),
        None => std::env::var(LOG_ENV).unwrap_or_else(|_| "info".to_string()),
    };

    fmt()
        .with_env_filter(build_filter(&directives)?)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("installing log subscriber: {e}"))
}

/// Parse `directives` and append a `warn` cap for each dependency the
/// caller did not mention.
pub fn build_filter(directives: &str) -> Result<EnvFilter> {
    let mut filter = EnvFilter::try_new(directives.trim())
        .map_err(|e| anyhow!("invalid log filter {directives:?}: {e}"))?;
    for dep in QUIET_DEPS {
        if !directives.contains(dep) {
            filter = filter.add_directive(format!("{dep}=warn").parse()?);
        }
    }
    Ok(filter)
}

fn level_directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
