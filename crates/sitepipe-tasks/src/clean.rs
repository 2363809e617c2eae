//! Output tree removal.

use std::io::ErrorKind;
use std::path::PathBuf;

use crate::task::TaskError;

/// Deletes the output directory tree.
#[derive(Debug, Clone)]
pub struct Cleaner {
    target: PathBuf,
}

impl Cleaner {
    /// Create a cleaner for `target`.
    pub fn new(target: impl Into<PathBuf>) -> Self {
        Self {
            target: target.into(),
        }
    }

    /// Remove the tree. A missing tree is not an error.
    pub async fn run(&self) -> Result<usize, TaskError> {
        match tokio::fs::remove_dir_all(&self.target).await {
            Ok(()) => {
                tracing::debug!("Removed {}", self.target.display());
                Ok(1)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(0),
            Err(e) => Err(TaskError::io(&self.target, e)),
        }
    }
}
