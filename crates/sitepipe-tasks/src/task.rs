//! Task names, task bodies and task errors.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::clean::Cleaner;
use crate::copy::AssetCopier;
use crate::glob::SourceGlob;
use crate::minify::MarkupMinifier;
use crate::reload::ReloadSignal;
use crate::styles::StyleBundler;
use crate::templates::TemplateCompiler;

/// The named tasks a pipeline exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskName {
    Clean,
    Html,
    Templates,
    Css,
    LayoutsCss,
    PagesCss,
    Images,
    Fonts,
    Icons,
    Scripts,
}

impl TaskName {
    /// Every task, in listing order.
    pub const ALL: [TaskName; 10] = [
        TaskName::Html,
        TaskName::Templates,
        TaskName::Css,
        TaskName::LayoutsCss,
        TaskName::PagesCss,
        TaskName::Images,
        TaskName::Fonts,
        TaskName::Icons,
        TaskName::Scripts,
        TaskName::Clean,
    ];

    /// Name used on the command line and in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskName::Clean => "clean",
            TaskName::Html => "html",
            TaskName::Templates => "pug",
            TaskName::Css => "css",
            TaskName::LayoutsCss => "layoutsCss",
            TaskName::PagesCss => "pagesCss",
            TaskName::Images => "images",
            TaskName::Fonts => "fonts",
            TaskName::Icons => "icons",
            TaskName::Scripts => "scripts",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskName {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "templates" {
            return Ok(TaskName::Templates);
        }

        TaskName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| TaskError::UnknownTask(s.to_string()))
    }
}

/// Errors that can occur while running a task.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Invalid glob {pattern}: {message}")]
    Glob { pattern: String, message: String },

    #[error("Failed to walk source tree: {0}")]
    Walk(String),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to render template {path}: {message}")]
    Template { path: String, message: String },

    #[error("Failed to process stylesheet {path}: {message}")]
    Style { path: String, message: String },

    #[error("{}", describe_files(.0))]
    Files(Vec<TaskError>),

    #[error("Unknown task: {0}")]
    UnknownTask(String),
}

impl TaskError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        TaskError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

fn describe_files(errors: &[TaskError]) -> String {
    let details: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    format!("{} file(s) failed: {}", errors.len(), details.join("; "))
}

/// Outcome of a successful task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskReport {
    /// Task that ran
    pub task: TaskName,

    /// Number of outputs written (or trees removed, for clean)
    pub files: usize,

    /// Wall time of the run
    pub elapsed: Duration,
}

/// A task body.
#[derive(Debug)]
pub enum Task {
    Clean(Cleaner),
    Copy(AssetCopier),
    Templates(TemplateCompiler),
    Minify(MarkupMinifier),
    Styles(StyleBundler),
}

impl Task {
    /// Run the task once, returning the number of outputs it produced.
    pub async fn run(&self) -> Result<usize, TaskError> {
        match self {
            Task::Clean(task) => task.run().await,
            Task::Copy(task) => task.run().await,
            Task::Templates(task) => task.run().await,
            Task::Minify(task) => task.run().await,
            Task::Styles(task) => task.run().await,
        }
    }

    /// Signal to push to connected browsers after a successful run.
    pub fn reload_signal(&self) -> Option<ReloadSignal> {
        match self {
            Task::Clean(_) => None,
            Task::Styles(task) => Some(ReloadSignal::Styles {
                path: task.bundle_name().to_string(),
            }),
            Task::Copy(_) | Task::Templates(_) | Task::Minify(_) => Some(ReloadSignal::Reload),
        }
    }

    /// The glob the task reads from, if any.
    pub fn sources(&self) -> Option<&SourceGlob> {
        match self {
            Task::Clean(_) => None,
            Task::Copy(task) => Some(task.sources()),
            Task::Templates(task) => Some(task.sources()),
            Task::Minify(task) => Some(task.sources()),
            Task::Styles(task) => Some(task.sources()),
        }
    }
}

/// Write `contents` to `path`, creating parent directories first.
pub(crate) async fn write_output(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), TaskError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| TaskError::io(parent, e))?;
    }

    tokio::fs::write(path, contents)
        .await
        .map_err(|e| TaskError::io(path, e))
}
