//! Series and parallel composition of tasks.
//!
//! A series stops at the first failing step and never starts the steps
//! after it. A parallel group starts every member on its own tokio task and
//! lets all of them finish, then reports every failure together.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;

use crate::pipeline::Pipeline;
use crate::task::{TaskError, TaskName, TaskReport};

/// A node in the task graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run one named task
    Task(TaskName),

    /// Run steps one after another, stopping at the first failure
    Series(Vec<Step>),

    /// Run steps concurrently; every member runs to completion
    Parallel(Vec<Step>),
}

impl Step {
    /// `clean`, then every generator at once.
    pub fn build() -> Self {
        Step::Series(vec![
            Step::Task(TaskName::Clean),
            Step::Parallel(
                [
                    TaskName::Templates,
                    TaskName::LayoutsCss,
                    TaskName::PagesCss,
                    TaskName::Images,
                    TaskName::Fonts,
                    TaskName::Icons,
                    TaskName::Scripts,
                ]
                .into_iter()
                .map(Step::Task)
                .collect(),
            ),
        ])
    }

    /// Every task this step can run, depth first.
    pub fn tasks(&self) -> Vec<TaskName> {
        match self {
            Step::Task(name) => vec![*name],
            Step::Series(steps) | Step::Parallel(steps) => {
                steps.iter().flat_map(Step::tasks).collect()
            }
        }
    }
}

/// A task that failed inside a graph run.
#[derive(Debug)]
pub struct TaskFailure {
    pub task: TaskName,
    pub error: TaskError,
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}': {}", self.task, self.error)
    }
}

/// Errors from running a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("{}", describe_failures(.0))]
    TasksFailed(Vec<TaskFailure>),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl GraphError {
    /// Names of the tasks that failed.
    pub fn failed_tasks(&self) -> Vec<TaskName> {
        match self {
            GraphError::TasksFailed(failures) => failures.iter().map(|f| f.task).collect(),
            GraphError::Panicked(_) => Vec::new(),
        }
    }
}

fn describe_failures(failures: &[TaskFailure]) -> String {
    let details: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!("{} task(s) failed: {}", failures.len(), details.join("; "))
}

type StepFuture = Pin<Box<dyn Future<Output = Result<Vec<TaskReport>, GraphError>> + Send>>;

/// Run a step against a pipeline, returning the reports of every task run.
pub fn run_step(pipeline: Arc<Pipeline>, step: Step) -> StepFuture {
    Box::pin(async move {
        match step {
            Step::Task(name) => match pipeline.run_task(name).await {
                Ok(report) => Ok(vec![report]),
                Err(error) => Err(GraphError::TasksFailed(vec![TaskFailure {
                    task: name,
                    error,
                }])),
            },

            Step::Series(steps) => {
                let mut reports = Vec::new();
                for step in steps {
                    reports.extend(run_step(Arc::clone(&pipeline), step).await?);
                }
                Ok(reports)
            }

            Step::Parallel(steps) => {
                let mut set = JoinSet::new();
                for step in steps {
                    set.spawn(run_step(Arc::clone(&pipeline), step));
                }

                let mut reports = Vec::new();
                let mut failures = Vec::new();
                let mut panic = None;

                while let Some(joined) = set.join_next().await {
                    match joined {
                        Ok(Ok(done)) => reports.extend(done),
                        Ok(Err(GraphError::TasksFailed(failed))) => failures.extend(failed),
                        Ok(Err(GraphError::Panicked(message))) => panic = Some(message),
                        Err(e) => panic = Some(e.to_string()),
                    }
                }

                if let Some(message) = panic {
                    Err(GraphError::Panicked(message))
                } else if failures.is_empty() {
                    Ok(reports)
                } else {
                    Err(GraphError::TasksFailed(failures))
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    use crate::pipeline::PipelineConfig;
    use crate::reload::NoReload;
    use crate::styles::StyleOptions;

    fn pipeline(root: &Path) -> Arc<Pipeline> {
        let config = PipelineConfig {
            src_dir: root.join("src"),
            dist_dir: root.join("dist"),
            styles: StyleOptions {
                browsers: vec!["safari 10".to_string()],
                minify: false,
            },
        };
        Arc::new(Pipeline::new(config, Arc::new(NoReload)).unwrap())
    }

    fn write(path: &Path, contents: impl AsRef<[u8]>) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn build_cleans_before_generators() {
        let build = Step::build();

        let Step::Series(steps) = &build else {
            panic!("build should be a series");
        };
        assert_eq!(steps[0], Step::Task(TaskName::Clean));
        assert!(matches!(steps[1], Step::Parallel(_)));
        assert!(!build.tasks().contains(&TaskName::Html));
        assert!(!build.tasks().contains(&TaskName::Css));
        assert_eq!(build.tasks().len(), 8);
    }

    #[tokio::test]
    async fn builds_pages_and_page_styles() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(
            &root.join("src/pages/index.jinja"),
            "<!DOCTYPE html>\n<html>\n<body>\n  <h1>Home</h1>\n</body>\n</html>\n",
        );
        write(
            &root.join("src/pages/style.css"),
            ".hero { user-select: none; }\n",
        );

        let reports = pipeline(root).build().await.unwrap();

        assert_eq!(reports.len(), 8);
        let html = fs::read_to_string(root.join("dist/index.html")).unwrap();
        assert!(html.contains("\n  <h1>Home</h1>\n"));
        let css = fs::read_to_string(root.join("dist/index.css")).unwrap();
        assert!(css.contains(".hero"));
        assert!(css.contains("-webkit-user-select: none"));
    }

    #[tokio::test]
    async fn copies_images_byte_for_byte() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        let logo: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 13];
        write(&root.join("src/images/logo.png"), &logo);

        pipeline(root).build().await.unwrap();

        assert_eq!(fs::read(root.join("dist/images/logo.png")).unwrap(), logo);
    }

    #[tokio::test]
    async fn build_leaves_no_stale_outputs() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(&root.join("src/scripts/app.js"), "run();");
        write(&root.join("dist/scripts/removed.js"), "old();");
        write(&root.join("dist/leftover.html"), "<p>old</p>");

        pipeline(root).build().await.unwrap();

        assert!(root.join("dist/scripts/app.js").exists());
        assert!(!root.join("dist/scripts/removed.js").exists());
        assert!(!root.join("dist/leftover.html").exists());
    }

    #[tokio::test]
    async fn clean_without_output_succeeds() {
        let temp = tempdir().unwrap();

        let reports = run_step(pipeline(temp.path()), Step::Task(TaskName::Clean))
            .await
            .unwrap();

        assert_eq!(reports[0].files, 0);
    }

    #[tokio::test]
    async fn parallel_group_runs_every_member() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(&root.join("src/pages/broken.jinja"), "{% for %}");
        write(&root.join("src/layouts/base.css"), "..broken { }");
        write(&root.join("src/fonts/inter.woff2"), b"wOF2");
        write(&root.join("src/icons/menu.svg"), "<svg/>");

        let err = pipeline(root).build().await.unwrap_err();

        let mut failed = err.failed_tasks();
        failed.sort();
        assert_eq!(failed, vec![TaskName::Templates, TaskName::LayoutsCss]);
        assert!(root.join("dist/fonts/inter.woff2").exists());
        assert!(root.join("dist/icons/menu.svg").exists());
        assert!(root.join("dist/index.css").exists());
    }

    #[tokio::test]
    async fn series_stops_at_first_failure() {
        let temp = tempdir().unwrap();
        let root = temp.path();
        write(&root.join("src/layouts/base.css"), "..broken { }");
        write(&root.join("src/scripts/app.js"), "run();");

        let step = Step::Series(vec![
            Step::Task(TaskName::LayoutsCss),
            Step::Task(TaskName::Scripts),
        ]);
        let err = run_step(pipeline(root), step).await.unwrap_err();

        assert_eq!(err.failed_tasks(), vec![TaskName::LayoutsCss]);
        assert!(!root.join("dist/scripts/app.js").exists());
    }
}
