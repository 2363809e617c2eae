//! Verbatim asset copying.

use std::path::{Path, PathBuf};

use crate::glob::SourceGlob;
use crate::task::TaskError;

/// Copies every matched file unchanged into a destination directory,
/// keeping its path relative to the glob base.
#[derive(Debug, Clone)]
pub struct AssetCopier {
    sources: SourceGlob,
    dest: PathBuf,
}

impl AssetCopier {
    /// Create a copier from `sources` into `dest`.
    pub fn new(sources: SourceGlob, dest: impl Into<PathBuf>) -> Self {
        Self {
            sources,
            dest: dest.into(),
        }
    }

    pub fn sources(&self) -> &SourceGlob {
        &self.sources
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    /// Copy everything the glob matches. Nothing is skipped as up to date.
    pub async fn run(&self) -> Result<usize, TaskError> {
        let files = self.sources.collect()?;

        for file in &files {
            let target = self.dest.join(&file.relative);

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| TaskError::io(parent, e))?;
            }

            tokio::fs::copy(&file.path, &target)
                .await
                .map_err(|e| TaskError::io(&file.path, e))?;

            tracing::debug!("Copied {} -> {}", file.path.display(), target.display());
        }

        Ok(files.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[tokio::test]
    async fn copies_bytes_unchanged() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src/fonts");
        let dist = temp.path().join("dist/fonts");
        fs::create_dir_all(src.join("inter")).unwrap();

        let regular: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        fs::write(src.join("inter/regular.woff2"), &regular).unwrap();
        fs::write(src.join("mono.woff"), b"wOFF").unwrap();
        fs::write(src.join("LICENSE.txt"), b"not a font").unwrap();

        let copier = AssetCopier::new(SourceGlob::new(&src, "**/*.{woff,woff2}").unwrap(), &dist);
        let copied = copier.run().await.unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read(dist.join("inter/regular.woff2")).unwrap(), regular);
        assert_eq!(fs::read(dist.join("mono.woff")).unwrap(), b"wOFF");
        assert!(!dist.join("LICENSE.txt").exists());
    }

    #[tokio::test]
    async fn recopies_on_every_run() {
        let temp = tempdir().unwrap();
        let src = temp.path().join("src/scripts");
        let dist = temp.path().join("dist/scripts");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("app.js"), "console.log(1);").unwrap();

        let copier = AssetCopier::new(SourceGlob::new(&src, "**/*.js").unwrap(), &dist);
        copier.run().await.unwrap();

        fs::write(dist.join("app.js"), "edited in output").unwrap();
        copier.run().await.unwrap();

        assert_eq!(
            fs::read_to_string(dist.join("app.js")).unwrap(),
            "console.log(1);"
        );
    }
}
