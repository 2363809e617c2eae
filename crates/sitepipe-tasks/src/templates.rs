//! Template compilation to HTML pages.

use std::path::{Component, Path, PathBuf};

use minijinja::{context, path_loader, Environment};

use crate::glob::{SourceFile, SourceGlob};
use crate::task::{write_output, TaskError};

/// Renders template sources into HTML files.
///
/// Templates are loaded by their path relative to `root`, so a page can
/// `{% extends "layouts/base.jinja" %}` or include any partial in the
/// source tree.
#[derive(Debug, Clone)]
pub struct TemplateCompiler {
    sources: SourceGlob,
    root: PathBuf,
    dest: PathBuf,
}

impl TemplateCompiler {
    /// Create a compiler for `sources`, loading templates from `root`.
    pub fn new(sources: SourceGlob, root: impl Into<PathBuf>, dest: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            root: root.into(),
            dest: dest.into(),
        }
    }

    pub fn sources(&self) -> &SourceGlob {
        &self.sources
    }

    /// Render every matched template.
    ///
    /// A template that fails to render or write is logged and skipped; the
    /// rest of the batch is still written and the task then fails listing
    /// every broken template.
    pub async fn run(&self) -> Result<usize, TaskError> {
        let files = self.sources.collect()?;
        let env = self.environment();

        let mut written = 0;
        let mut failures = Vec::new();

        for file in &files {
            let page = file.relative.with_extension("html");

            let output = self.dest.join(&page);
            let rendered = match self.render(&env, file, &page) {
                Ok(html) => write_output(&output, html).await,
                Err(e) => Err(e),
            };

            match rendered {
                Ok(()) => {
                    tracing::debug!("Rendered {} -> {}", file.path.display(), output.display());
                    written += 1;
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    failures.push(e);
                }
            }
        }

        if failures.is_empty() {
            Ok(written)
        } else {
            Err(TaskError::Files(failures))
        }
    }

    /// A fresh environment so edited partials are picked up on every run.
    fn environment(&self) -> Environment<'static> {
        let mut env = Environment::new();
        env.set_loader(path_loader(self.root.clone()));

        // Pretty output: block tags leave no stray blank lines or indentation.
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        env
    }

    fn render(
        &self,
        env: &Environment<'static>,
        file: &SourceFile,
        page: &Path,
    ) -> Result<String, TaskError> {
        let name = template_name(&self.root, &file.path).ok_or_else(|| TaskError::Template {
            path: file.path.display().to_string(),
            message: format!("not inside template root {}", self.root.display()),
        })?;

        let tmpl = env.get_template(&name).map_err(|e| TaskError::Template {
            path: name.clone(),
            message: e.to_string(),
        })?;

        tmpl.render(context! {
            path => slash_path(page),
        })
        .map_err(|e| TaskError::Template {
            path: name,
            message: e.to_string(),
        })
    }
}

/// Loader name of `path`: its path under `root` with forward slashes.
fn template_name(root: &Path, path: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(slash_path)
}

fn slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
