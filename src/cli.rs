// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `assetpipe`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetpipe",
    version,
    about = "Build, watch and deploy front-end assets.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Assetpipe.toml` in the current working directory. A missing
    /// file means "use the built-in defaults".
    #[arg(long, value_name = "PATH", default_value = "Assetpipe.toml", global = true)]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETPIPE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task graph and watch bindings, but don't
    /// run anything.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Entry point to run. Defaults to `default`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl CliArgs {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Default)
    }
}

/// Pipeline entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Clean, build all assets, compile styles, then watch and serve with
    /// live reload.
    Default,
    /// Production build: clean, build all assets without sourcemaps and run
    /// the image optimization pass.
    Build,
    /// Compile stylesheets only.
    Styles,
    /// Watch sources and serve with live reload, without an initial build.
    Watch,
    /// Upload the output directory to the configured remote store.
    Deploy,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_subcommand_means_default() {
        let args = CliArgs::try_parse_from(["assetpipe"]).unwrap();
        assert_eq!(args.command(), Command::Default);
        assert_eq!(args.config, "Assetpipe.toml");
    }

    #[test]
    fn global_flags_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["assetpipe", "build", "--config", "x.toml", "--dry-run"])
                .unwrap();
        assert_eq!(args.command(), Command::Build);
        assert_eq!(args.config, "x.toml");
        assert!(args.dry_run);
    }
}
