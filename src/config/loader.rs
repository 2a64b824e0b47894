// src/config/loader.rs

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Environment variable that supplies (and overrides) `deploy.password`.
pub const DEPLOY_PASSWORD_ENV: &str = "ASSETPIPE_DEPLOY_PASSWORD";

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// A missing file is not an error: the built-in defaults are returned. This
/// only performs TOML deserialization; use [`load_and_validate`] for the
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(?path, "config file not found; using built-in defaults");
        return Ok(RawConfigFile::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file, apply environment overrides and validate.
///
/// This is the recommended entry point for the rest of the application.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let mut raw_config = load_from_path(&path)?;
    apply_env_overrides(&mut raw_config, std::env::var(DEPLOY_PASSWORD_ENV).ok());
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Credentials from the environment take precedence over the file.
pub(crate) fn apply_env_overrides(raw: &mut RawConfigFile, password: Option<String>) {
    if let Some(password) = password.filter(|p| !p.is_empty()) {
        raw.deploy.password = Some(password);
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let raw = load_from_path(dir.path().join("nope.toml")).unwrap();
        assert_eq!(raw.paths.out, PathBuf::from("app"));
        assert_eq!(raw.watch.debounce_ms, 200);
        assert_eq!(raw.deploy.parallel, 10);
    }

    #[test]
    fn env_password_overrides_file() {
        let mut raw: RawConfigFile = toml::from_str(
            r#"
            [deploy]
            host = "ftp.example.com"
            password = "from-file"
            "#,
        )
        .unwrap();

        apply_env_overrides(&mut raw, Some(String::new()));
        assert_eq!(raw.deploy.password.as_deref(), Some("from-file"));

        apply_env_overrides(&mut raw, Some("from-env".to_string()));
        assert_eq!(raw.deploy.password.as_deref(), Some("from-env"));
    }
}
