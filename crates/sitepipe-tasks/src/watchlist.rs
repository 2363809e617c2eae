//! Mapping from changed source files to the task that regenerates them.

use std::path::Path;

use crate::glob::SourceGlob;
use crate::pipeline::IMAGE_PATTERN;
use crate::task::{TaskError, TaskName};

/// Globs paired with the task a matching change reruns.
#[derive(Debug, Clone, Default)]
pub struct Watchlist {
    entries: Vec<(SourceGlob, TaskName)>,
}

impl Watchlist {
    /// An empty watchlist.
    pub fn new() -> Self {
        Self::default()
    }

    /// The fixed mapping for a source tree rooted at `src`.
    pub fn standard(src: &Path) -> Result<Self, TaskError> {
        Ok(Self::new()
            .with(SourceGlob::new(src, "**/*.jinja")?, TaskName::Templates)
            .with(SourceGlob::new(src, "**/*.html")?, TaskName::Html)
            .with(SourceGlob::new(src.join("layouts"), "**/*.css")?, TaskName::LayoutsCss)
            .with(SourceGlob::new(src.join("pages"), "**/*.css")?, TaskName::PagesCss)
            .with(SourceGlob::new(src, IMAGE_PATTERN)?, TaskName::Images)
            .with(SourceGlob::new(src.join("icons"), "**/*")?, TaskName::Icons)
            .with(SourceGlob::new(src.join("fonts"), "**/*.{woff,woff2}")?, TaskName::Fonts)
            .with(SourceGlob::new(src.join("scripts"), "**/*.js")?, TaskName::Scripts))
    }

    /// Add a glob that triggers `task`.
    pub fn with(mut self, glob: SourceGlob, task: TaskName) -> Self {
        self.entries.push((glob, task));
        self
    }

    /// Tasks to rerun for a change at `path`, each at most once.
    pub fn tasks_for(&self, path: &Path) -> Vec<TaskName> {
        let mut tasks = Vec::new();
        for (glob, task) in &self.entries {
            if glob.matches(path) && !tasks.contains(task) {
                tasks.push(*task);
            }
        }
        tasks
    }

    /// Every task that can be triggered by a change.
    pub fn tasks(&self) -> Vec<TaskName> {
        let mut tasks = Vec::new();
        for (_, task) in &self.entries {
            if !tasks.contains(task) {
                tasks.push(*task);
            }
        }
        tasks
    }
}
