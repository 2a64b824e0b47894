// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

/// Configuration as read from a TOML file, before validation.
///
/// Every section is optional; the defaults reproduce the classic layout
/// (`src/` in, `app/` out, live-reload server on port 3000):
///
/// ```toml
/// [paths]
/// src = "src"
/// out = "app"
///
/// [server]
/// port = 3000
///
/// [watch]
/// debounce_ms = 200
///
/// [[watch.binding]]
/// pattern = "src/scss/**/*.scss"
/// task = "styles"
///
/// [tools.styles]
/// cmd = "sass --style=compressed {sourcemap} {src}/scss/main.scss {out}/css/main.min.css"
///
/// [[tools.fonts]]
/// cmd = "fonttools ttLib --flavor woff2 -o {output} {input}"
/// extension = "woff2"
///
/// [deploy]
/// host = "ftp.example.com"
/// user = "site"
/// parallel = 10
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub watch: WatchSection,

    #[serde(default)]
    pub html: HtmlSection,

    #[serde(default)]
    pub tools: ToolsSection,

    #[serde(default)]
    pub deploy: DeploySection,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)` (see
/// `validate.rs`) or the loader.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub server: ServerSection,
    pub watch: WatchSection,
    pub html: HtmlSection,
    pub tools: ToolsSection,
    pub deploy: DeploySection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            server: raw.server,
            watch: raw.watch,
            html: raw.html,
            tools: raw.tools,
            deploy: raw.deploy,
        }
    }
}

/// `[paths]` section. Both paths are relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    #[serde(default = "default_src")]
    pub src: PathBuf,

    #[serde(default = "default_out")]
    pub out: PathBuf,
}

fn default_src() -> PathBuf {
    PathBuf::from("src")
}

fn default_out() -> PathBuf {
    PathBuf::from("app")
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            src: default_src(),
            out: default_out(),
        }
    }
}

/// `[server]` section for the live-reload server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            host: default_host(),
            port: default_port(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period that closes a batch of filesystem events.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Explicit `{ pattern, task }` table. `None` means the built-in table.
    #[serde(default)]
    pub binding: Option<Vec<BindingConfig>>,
}

fn default_debounce_ms() -> u64 {
    200
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            binding: None,
        }
    }
}

/// One `[[watch.binding]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BindingConfig {
    pub pattern: String,
    pub task: String,
}

/// `[html]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HtmlSection {
    /// Leave `_`-prefixed partials out of the output directory. Off by
    /// default: every `.html` file is rendered and written.
    #[serde(default)]
    pub skip_partials: bool,
}

/// `[tools]` section: external commands backing the opaque transformations.
///
/// Commands run through the platform shell. Placeholders:
/// - `{src}` / `{out}`: the configured source and output directories
/// - `{sourcemap}`: `sourcemap_on` in development builds, `sourcemap_off`
///   in production builds, inserted verbatim
/// - `{input}` / `{output}`: per-file paths (fonts only)
///
/// Path values are shell-quoted when they contain anything beyond plain
/// path characters, so templates must not add their own quotes around
/// placeholders.
///
/// The default style command only compiles and minifies. Vendor prefixing
/// is a second step chained onto the same command, e.g.
/// `... {out}/css/main.min.css && postcss {out}/css/main.min.css --use autoprefixer -r`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    #[serde(default = "default_styles_tool")]
    pub styles: ToolCommand,

    #[serde(default = "default_scripts_tool")]
    pub scripts: ToolCommand,

    /// Font converters; each `.ttf` is run through every entry.
    #[serde(default = "default_font_converters")]
    pub fonts: Vec<FontConverter>,

    /// Optional image optimizer; when unset, the optimization pass copies
    /// images unchanged.
    #[serde(default)]
    pub optimize_images: Option<String>,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            styles: default_styles_tool(),
            scripts: default_scripts_tool(),
            fonts: default_font_converters(),
            optimize_images: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCommand {
    pub cmd: String,

    #[serde(default)]
    pub sourcemap_on: String,

    #[serde(default)]
    pub sourcemap_off: String,
}

fn default_styles_tool() -> ToolCommand {
    ToolCommand {
        cmd: "sass --style=compressed {sourcemap} {src}/scss/main.scss {out}/css/main.min.css"
            .to_string(),
        sourcemap_on: "--source-map".to_string(),
        sourcemap_off: "--no-source-map".to_string(),
    }
}

fn default_scripts_tool() -> ToolCommand {
    ToolCommand {
        cmd: "esbuild {src}/js/main.js --bundle --minify {sourcemap} --outfile={out}/js/main.js"
            .to_string(),
        sourcemap_on: "--sourcemap".to_string(),
        sourcemap_off: String::new(),
    }
}

/// One font output format, run once per `.ttf` file.
#[derive(Debug, Clone, Deserialize)]
pub struct FontConverter {
    pub cmd: String,

    /// Extension of the produced font files.
    pub extension: String,
}

fn default_font_converters() -> Vec<FontConverter> {
    ["woff", "woff2"]
        .into_iter()
        .map(|flavor| FontConverter {
            cmd: format!("fonttools ttLib --flavor {flavor} -o {{output}} {{input}}"),
            extension: flavor.to_string(),
        })
        .collect()
}

/// `[deploy]` section: remote file store connection.
///
/// `password` is usually left out of the file and supplied through
/// `ASSETPIPE_DEPLOY_PASSWORD`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub user: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Remote directory the output tree is uploaded into.
    #[serde(default = "default_remote_root")]
    pub root: String,

    /// Maximum number of concurrent transfers.
    #[serde(default = "default_parallel")]
    pub parallel: usize,
}

fn default_remote_root() -> String {
    "/".to_string()
}

fn default_parallel() -> usize {
    10
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            password: None,
            root: default_remote_root(),
            parallel: default_parallel(),
        }
    }
}
