use std::fmt;

/// Canonical task name type used throughout the crate.
pub type TaskName = String;

/// Which flavour of pipeline is being assembled.
///
/// - `Development`: sourcemaps are emitted; used by `default`, `styles`
///   and `watch`.
/// - `Production`: no sourcemaps; used by `build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    Development,
    Production,
}

impl BuildMode {
    pub fn sourcemaps(self) -> bool {
        matches!(self, BuildMode::Development)
    }
}

/// What a connected viewer should do after a task rewrote its output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Reload the whole page.
    Refresh,
    /// Swap stylesheets in place without a page reload.
    Inject,
}

impl fmt::Display for ReloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReloadKind::Refresh => f.write_str("refresh"),
            ReloadKind::Inject => f.write_str("inject"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_development_emits_sourcemaps() {
        assert!(BuildMode::Development.sourcemaps());
        assert!(!BuildMode::Production.sourcemaps());
    }

    #[test]
    fn reload_kind_names_match_client_events() {
        assert_eq!(ReloadKind::Refresh.to_string(), "refresh");
        assert_eq!(ReloadKind::Inject.to_string(), "inject");
    }
}
