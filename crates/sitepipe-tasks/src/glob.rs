//! Source globs: a base directory plus a pattern over paths relative to it.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;
use wax::{Glob, Pattern};

use crate::task::TaskError;

/// A file matched by a [`SourceGlob`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path on disk
    pub path: PathBuf,

    /// Path relative to the glob base
    pub relative: PathBuf,
}

/// A glob pattern anchored at a base directory.
///
/// `images/**/*.{png,jpg}` style patterns are written relative to `base`;
/// the relative path of each match is what output paths are derived from.
#[derive(Clone)]
pub struct SourceGlob {
    base: PathBuf,
    pattern: String,
    glob: Arc<Glob<'static>>,
}

impl SourceGlob {
    /// Compile `pattern` relative to `base`.
    pub fn new(base: impl Into<PathBuf>, pattern: &str) -> Result<Self, TaskError> {
        let glob = Glob::new(pattern)
            .map_err(|e| TaskError::Glob {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?
            .into_owned();

        Ok(Self {
            base: base.into(),
            pattern: pattern.to_string(),
            glob: Arc::new(glob),
        })
    }

    /// Directory the pattern is anchored at.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The pattern as written.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Whether `path` lies under the base and matches the pattern.
    pub fn matches(&self, path: &Path) -> bool {
        match path.strip_prefix(&self.base) {
            Ok(relative) if !relative.as_os_str().is_empty() => self.glob.is_match(relative),
            _ => false,
        }
    }

    /// Collect every regular file under the base that matches.
    ///
    /// Files come back sorted by relative path so bundles concatenate in a
    /// stable order. A missing base yields no files.
    pub fn collect(&self) -> Result<Vec<SourceFile>, TaskError> {
        if !self.base.exists() {
            tracing::debug!("Source directory not found: {}", self.base.display());
            return Ok(Vec::new());
        }

        let mut files = Vec::new();

        for entry in WalkDir::new(&self.base).follow_links(true) {
            let entry = entry
                .map_err(|e| TaskError::Walk(format!("{}: {}", self.base.display(), e)))?;

            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let Ok(relative) = path.strip_prefix(&self.base) else {
                continue;
            };

            if self.glob.is_match(relative) {
                files.push(SourceFile {
                    path: path.to_path_buf(),
                    relative: relative.to_path_buf(),
                });
            }
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));

        Ok(files)
    }
}

impl fmt::Debug for SourceGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceGlob")
            .field("base", &self.base)
            .field("pattern", &self.pattern)
            .finish()
    }
}

impl fmt::Display for SourceGlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base.display(), self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn collects_sorted_matches() {
        let temp = tempdir().unwrap();
        let base = temp.path().join("images");
        touch(&base.join("z.png"));
        touch(&base.join("a/logo.svg"));
        touch(&base.join("b.jpg"));
        touch(&base.join("notes.txt"));

        let glob = SourceGlob::new(&base, "**/*.{jpg,png,svg}").unwrap();
        let relative: Vec<PathBuf> = glob
            .collect()
            .unwrap()
            .into_iter()
            .map(|f| f.relative)
            .collect();

        assert_eq!(
            relative,
            vec![
                PathBuf::from("a/logo.svg"),
                PathBuf::from("b.jpg"),
                PathBuf::from("z.png"),
            ]
        );
    }

    #[test]
    fn missing_base_is_empty() {
        let temp = tempdir().unwrap();
        let glob = SourceGlob::new(temp.path().join("fonts"), "**/*.woff2").unwrap();

        assert!(glob.collect().unwrap().is_empty());
    }

    #[test]
    fn matches_paths_under_base_only() {
        let glob = SourceGlob::new("/site/src/layouts", "**/*.css").unwrap();

        assert!(glob.matches(Path::new("/site/src/layouts/grid.css")));
        assert!(glob.matches(Path::new("/site/src/layouts/header/nav.css")));
        assert!(!glob.matches(Path::new("/site/src/pages/style.css")));
        assert!(!glob.matches(Path::new("/site/src/layouts/grid.scss")));
        assert!(!glob.matches(Path::new("/site/src/layouts")));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let err = SourceGlob::new("src", "**/*.{css").unwrap_err();

        assert!(matches!(err, TaskError::Glob { .. }));
    }
}
