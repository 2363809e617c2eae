//! The task registry: every named task wired to its globs and outputs.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::clean::Cleaner;
use crate::copy::AssetCopier;
use crate::glob::SourceGlob;
use crate::graph::{run_step, GraphError, Step};
use crate::minify::MarkupMinifier;
use crate::reload::ReloadSink;
use crate::styles::{StyleBundler, StyleOptions};
use crate::task::{Task, TaskError, TaskName, TaskReport};
use crate::templates::TemplateCompiler;
use crate::watchlist::Watchlist;

/// Image extensions copied by the images task.
pub const IMAGE_PATTERN: &str = "**/*.{jpg,png,svg,gif,ico,webp,avif}";

/// Configuration for a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Source tree root
    pub src_dir: PathBuf,

    /// Output tree root, deleted at the start of every build
    pub dist_dir: PathBuf,

    /// Stylesheet post-processing
    pub styles: StyleOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            src_dir: PathBuf::from("src"),
            dist_dir: PathBuf::from("dist"),
            styles: StyleOptions::default(),
        }
    }
}

/// All tasks of a site, plus the sink they notify on success.
pub struct Pipeline {
    config: PipelineConfig,
    tasks: BTreeMap<TaskName, Task>,
    watchlist: Watchlist,
    reload: Arc<dyn ReloadSink>,
}

impl Pipeline {
    /// Wire every task for `config`.
    pub fn new(config: PipelineConfig, reload: Arc<dyn ReloadSink>) -> Result<Self, TaskError> {
        let tasks = define_tasks(&config)?;
        let watchlist = Watchlist::standard(&config.src_dir)?;

        Ok(Self {
            config,
            tasks,
            watchlist,
            reload,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Look up a task body.
    pub fn task(&self, name: TaskName) -> Option<&Task> {
        self.tasks.get(&name)
    }

    /// Which task each source glob triggers in watch mode.
    pub fn watchlist(&self) -> &Watchlist {
        &self.watchlist
    }

    /// Run one task and notify the reload sink if it succeeds.
    pub async fn run_task(&self, name: TaskName) -> Result<TaskReport, TaskError> {
        let task = self
            .tasks
            .get(&name)
            .ok_or_else(|| TaskError::UnknownTask(name.to_string()))?;

        tracing::info!("Starting '{}'...", name);
        let start = Instant::now();

        match task.run().await {
            Ok(files) => {
                let elapsed = start.elapsed();
                tracing::info!(
                    "Finished '{}' after {}ms ({} files)",
                    name,
                    elapsed.as_millis(),
                    files
                );

                if let Some(signal) = task.reload_signal() {
                    self.reload.notify(signal);
                }

                Ok(TaskReport {
                    task: name,
                    files,
                    elapsed,
                })
            }
            Err(e) => {
                tracing::error!(
                    "'{}' errored after {}ms: {}",
                    name,
                    start.elapsed().as_millis(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Clean the output tree, then run every generator in parallel.
    pub async fn build(self: Arc<Self>) -> Result<Vec<TaskReport>, GraphError> {
        run_step(self, Step::build()).await
    }
}

fn define_tasks(config: &PipelineConfig) -> Result<BTreeMap<TaskName, Task>, TaskError> {
    let src = &config.src_dir;
    let dist = &config.dist_dir;
    let styles = &config.styles;

    let copier = |dir: &str, pattern: &str| -> Result<Task, TaskError> {
        Ok(Task::Copy(AssetCopier::new(
            SourceGlob::new(src.join(dir), pattern)?,
            dist.join(dir),
        )))
    };
    let bundler = |base: PathBuf, bundle: &str| -> Result<Task, TaskError> {
        Ok(Task::Styles(StyleBundler::new(
            SourceGlob::new(base, "**/*.css")?,
            bundle,
            dist,
            styles.clone(),
        )))
    };

    let mut tasks = BTreeMap::new();

    tasks.insert(TaskName::Clean, Task::Clean(Cleaner::new(dist)));
    tasks.insert(
        TaskName::Html,
        Task::Minify(MarkupMinifier::new(SourceGlob::new(src, "**/*.html")?, dist)),
    );
    tasks.insert(
        TaskName::Templates,
        Task::Templates(TemplateCompiler::new(
            SourceGlob::new(src.join("pages"), "**/*.jinja")?,
            src,
            dist,
        )),
    );
    tasks.insert(TaskName::Css, bundler(src.clone(), "bundle.css")?);
    tasks.insert(TaskName::LayoutsCss, bundler(src.join("layouts"), "bundle.css")?);
    tasks.insert(TaskName::PagesCss, bundler(src.join("pages"), "index.css")?);
    tasks.insert(TaskName::Images, copier("images", IMAGE_PATTERN)?);
    tasks.insert(TaskName::Fonts, copier("fonts", "**/*.{woff,woff2}")?);
    tasks.insert(TaskName::Icons, copier("icons", "**/*")?);
    tasks.insert(TaskName::Scripts, copier("scripts", "**/*.js")?);

    Ok(tasks)
}
