// src/pipeline/mod.rs

//! The concrete asset pipeline: leaf tasks, composites and the built-in
//! watch bindings.
//!
//! ```text
//! default = sequence(clean, assets, styles)
//! build   = sequence(clean, assets, styles, optimize-images)
//! assets  = parallel(html, scripts, fonts, resources, images)
//! ```

pub mod clean;
pub mod copy;
pub mod deploy;
pub mod html;
pub mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::ConfigFile;
use crate::dag::{LeafTask, TaskGraph, TaskGraphBuilder};
use crate::errors::Result;
use crate::exec::{shell_quote, CommandUnit};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{BuildMode, ReloadKind};
use crate::watch::{BindingTable, WatchBinding};

pub use clean::CleanUnit;
pub use copy::CopyUnit;
pub use deploy::{DeployReport, DeployUnit};
pub use html::HtmlUnit;
pub use tools::{FontJob, FontsUnit};

pub const CLEAN: &str = "clean";
pub const HTML: &str = "html";
pub const SCRIPTS: &str = "scripts";
pub const STYLES: &str = "styles";
pub const FONTS: &str = "fonts";
pub const IMAGES: &str = "images";
pub const RESOURCES: &str = "resources";
pub const OPTIMIZE_IMAGES: &str = "optimize-images";
pub const DEPLOY: &str = "deploy";
pub const ASSETS: &str = "assets";
pub const DEFAULT: &str = "default";
pub const BUILD: &str = "build";

/// Image extensions copied to `out/img`.
pub const IMAGE_GLOB: &str = "**/*.{jpg,png,jpeg,svg}";

/// Wires the configured project into a task graph.
#[derive(Debug, Clone)]
pub struct Pipeline {
    root: PathBuf,
    cfg: ConfigFile,
    mode: BuildMode,
    fs: Arc<dyn FileSystem>,
}

impl Pipeline {
    pub fn new(root: impl Into<PathBuf>, cfg: ConfigFile, mode: BuildMode) -> Self {
        Self {
            root: root.into(),
            cfg,
            mode,
            fs: Arc::new(RealFileSystem),
        }
    }

    /// Swap the filesystem used by the in-process units.
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn src_dir(&self) -> PathBuf {
        self.root.join(&self.cfg.paths.src)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.root.join(&self.cfg.paths.out)
    }

    /// Register every leaf and composite.
    pub fn build_graph(&self) -> Result<TaskGraph> {
        let src = self.src_dir();
        let out = self.out_dir();
        let mut b = TaskGraphBuilder::new();

        b.define_task(
            LeafTask::new(CLEAN, Arc::new(CleanUnit::new(self.fs.clone(), &out)))
                .with_output(&out),
        );

        b.define_task(
            LeafTask::new(
                HTML,
                Arc::new(
                    HtmlUnit::new(self.fs.clone(), &src, &out)?
                        .skip_partials(self.cfg.html.skip_partials),
                ),
            )
            .with_inputs([self.pattern("**/*.html")])
            .with_output(&out)
            .with_reload(ReloadKind::Refresh),
        );

        b.define_task(
            LeafTask::new(SCRIPTS, Arc::new(self.tool_unit(SCRIPTS, &self.cfg.tools.scripts)))
                .with_inputs([self.pattern("js/**/*.js")])
                .with_output(out.join("js"))
                .with_reload(ReloadKind::Refresh),
        );

        b.define_task(
            LeafTask::new(STYLES, Arc::new(self.tool_unit(STYLES, &self.cfg.tools.styles)))
                .with_inputs([self.pattern("scss/**/*.scss")])
                .with_output(out.join("css"))
                .with_reload(ReloadKind::Inject),
        );

        b.define_task(
            LeafTask::new(
                FONTS,
                Arc::new(FontsUnit::new(
                    self.fs.clone(),
                    src.join("fonts"),
                    out.join("fonts"),
                    self.cfg.tools.fonts.clone(),
                    &self.root,
                )),
            )
            .with_inputs([self.pattern("fonts/**/*.ttf")])
            .with_output(out.join("fonts")),
        );

        b.define_task(
            LeafTask::new(IMAGES, Arc::new(self.images_copy()?))
                .with_inputs([self.pattern(&format!("img/{IMAGE_GLOB}"))])
                .with_output(out.join("img"))
                .with_reload(ReloadKind::Refresh),
        );

        b.define_task(
            LeafTask::new(
                RESOURCES,
                Arc::new(CopyUnit::new(self.fs.clone(), src.join("resources"), &out)),
            )
            .with_inputs([self.pattern("resources/**")])
            .with_output(&out)
            .with_reload(ReloadKind::Refresh),
        );

        let optimize = match &self.cfg.tools.optimize_images {
            Some(cmd) => LeafTask::new(
                OPTIMIZE_IMAGES,
                Arc::new(CommandUnit::new(
                    OPTIMIZE_IMAGES,
                    self.expand_tool(cmd, ""),
                    &self.root,
                )),
            ),
            None => LeafTask::new(OPTIMIZE_IMAGES, Arc::new(self.images_copy()?)),
        };
        b.define_task(optimize.with_output(out.join("img")));

        b.define_task(
            LeafTask::new(
                DEPLOY,
                Arc::new(DeployUnit::new(self.fs.clone(), &out, self.cfg.deploy.clone())),
            )
            .with_inputs([format!("{}/**", self.cfg.paths.out.display())]),
        );

        b.parallel(ASSETS, [HTML, SCRIPTS, FONTS, RESOURCES, IMAGES])
            .sequence(DEFAULT, [CLEAN, ASSETS, STYLES])
            .sequence(BUILD, [CLEAN, ASSETS, STYLES, OPTIMIZE_IMAGES]);

        b.build()
    }

    /// Configured bindings, or the built-in table.
    pub fn bindings(&self) -> Vec<WatchBinding> {
        match &self.cfg.watch.binding {
            Some(list) => list
                .iter()
                .map(|b| WatchBinding::new(&b.pattern, &b.task))
                .collect(),
            None => default_bindings(&self.cfg.paths.src),
        }
    }

    pub fn binding_table(&self, graph: &TaskGraph) -> Result<BindingTable> {
        BindingTable::compile(self.bindings(), graph)
    }

    fn pattern(&self, below_src: &str) -> String {
        format!("{}/{below_src}", slash_path(&self.cfg.paths.src))
    }

    fn images_copy(&self) -> Result<CopyUnit> {
        CopyUnit::new(self.fs.clone(), self.src_dir().join("img"), self.out_dir().join("img"))
            .only(&[IMAGE_GLOB])
    }

    fn tool_unit(&self, task: &str, tool: &crate::config::ToolCommand) -> CommandUnit {
        let sourcemap = if self.mode.sourcemaps() {
            tool.sourcemap_on.as_str()
        } else {
            tool.sourcemap_off.as_str()
        };
        CommandUnit::new(task, self.expand_tool(&tool.cmd, sourcemap), &self.root)
    }

    fn expand_tool(&self, template: &str, sourcemap: &str) -> String {
        let src = shell_quote(&slash_path(&self.cfg.paths.src));
        let out = shell_quote(&slash_path(&self.cfg.paths.out));
        expand(
            template,
            &[("src", src.as_str()), ("out", out.as_str()), ("sourcemap", sourcemap)],
        )
    }
}

/// Built-in `pattern -> task` table for a source directory.
pub fn default_bindings(src: &Path) -> Vec<WatchBinding> {
    let src = slash_path(src);
    vec![
        WatchBinding::new(format!("{src}/scss/**/*.scss"), STYLES),
        WatchBinding::new(format!("{src}/**/*.html"), HTML),
        WatchBinding::new(format!("{src}/img/{IMAGE_GLOB}"), IMAGES),
        WatchBinding::new(format!("{src}/resources/**"), RESOURCES),
        WatchBinding::new(format!("{src}/fonts/**/*.ttf"), FONTS),
        WatchBinding::new(format!("{src}/js/**/*.js"), SCRIPTS),
    ]
}

/// Replace `{name}` placeholders with the given values, inserted as-is.
///
/// Unknown placeholders are left alone. An empty value also takes the space
/// in front of its placeholder with it; the rest of the template is not
/// touched.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in vars {
        let placeholder = format!("{{{name}}}");
        if value.is_empty() {
            out = out.replace(&format!(" {placeholder}"), "");
        }
        out = out.replace(&placeholder, value);
    }
    out
}

fn slash_path(path: &Path) -> String {
    let s = path.to_string_lossy().replace('\\', "/");
    s.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigFile, RawConfigFile};
    use crate::dag::TaskKind;
    use crate::fs::MockFileSystem;

    fn pipeline(mode: BuildMode) -> Pipeline {
        let cfg = ConfigFile::try_from(RawConfigFile::default()).unwrap();
        Pipeline::new("/proj", cfg, mode).with_fs(Arc::new(MockFileSystem::new()))
    }

    #[test]
    fn graph_has_the_classic_shape() {
        let graph = pipeline(BuildMode::Development).build_graph().unwrap();

        let default = graph.task(DEFAULT).unwrap();
        assert_eq!(default.kind(), TaskKind::Sequence);
        let children: Vec<_> = default.children().iter().map(|c| c.name()).collect();
        assert_eq!(children, vec![CLEAN, ASSETS, STYLES]);

        let assets = graph.task(ASSETS).unwrap();
        assert_eq!(assets.kind(), TaskKind::Parallel);
        assert_eq!(assets.children().len(), 5);

        let build = graph.task(BUILD).unwrap();
        assert_eq!(build.children().last().unwrap().name(), OPTIMIZE_IMAGES);
        assert!(graph.contains(DEPLOY));
    }

    #[test]
    fn reload_kinds_follow_task_roles() {
        let graph = pipeline(BuildMode::Development).build_graph().unwrap();
        let leaf = |name: &str| graph.task(name).unwrap().leaves()[0].reload();
        assert_eq!(leaf(STYLES), Some(ReloadKind::Inject));
        assert_eq!(leaf(HTML), Some(ReloadKind::Refresh));
        assert_eq!(leaf(CLEAN), None);
    }

    #[test]
    fn default_bindings_compile_against_the_graph() {
        let p = pipeline(BuildMode::Development);
        let graph = p.build_graph().unwrap();
        let table = p.binding_table(&graph).unwrap();

        assert_eq!(table.tasks_for("src/scss/main.scss"), vec![STYLES]);
        assert_eq!(table.tasks_for("src/img/logo.svg"), vec![IMAGES]);
        assert_eq!(table.tasks_for("src/js/app/util.js"), vec![SCRIPTS]);
        assert_eq!(table.tasks_for("src/fonts/Inter.ttf"), vec![FONTS]);
        assert!(table.tasks_for("app/index.html").is_empty());
    }

    #[test]
    fn sourcemap_flag_depends_on_mode() {
        let dev = pipeline(BuildMode::Development);
        let prod = pipeline(BuildMode::Production);
        let styles = &dev.cfg.tools.styles;

        assert!(dev.tool_unit(STYLES, styles).cmd().contains("--source-map"));
        assert!(prod.tool_unit(STYLES, styles).cmd().contains("--no-source-map"));
        assert_eq!(
            prod.tool_unit(STYLES, styles).cmd(),
            "sass --style=compressed --no-source-map src/scss/main.scss app/css/main.min.css"
        );
    }

    #[cfg(unix)]
    #[test]
    fn paths_with_spaces_are_quoted_in_tool_commands() {
        let mut raw = RawConfigFile::default();
        raw.paths.out = PathBuf::from("public site");
        let cfg = ConfigFile::try_from(raw).unwrap();
        let p = Pipeline::new("/proj", cfg, BuildMode::Production);

        assert_eq!(
            p.tool_unit(STYLES, &p.cfg.tools.styles).cmd(),
            "sass --style=compressed --no-source-map src/scss/main.scss 'public site'/css/main.min.css"
        );
    }

    #[test]
    fn expand_collapses_empty_values() {
        assert_eq!(
            expand("tool {a} {flag} {b}", &[("a", "x"), ("flag", ""), ("b", "y")]),
            "tool x y"
        );
        assert_eq!(expand("keep {unknown}", &[]), "keep {unknown}");
        assert_eq!(
            expand("echo 'a  b' {flag}", &[("flag", "")]),
            "echo 'a  b'"
        );
    }
}
