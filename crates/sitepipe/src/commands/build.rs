//! Full site build command.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use sitepipe_tasks::{NoReload, Pipeline};

use crate::config::Settings;

/// Run the build command.
pub async fn run(settings: &Settings) -> Result<()> {
    tracing::info!(
        "Building {} into {}",
        settings.pipeline.src_dir.display(),
        settings.pipeline.dist_dir.display()
    );

    let start = Instant::now();
    let pipeline = Arc::new(Pipeline::new(settings.pipeline.clone(), Arc::new(NoReload))?);
    let reports = pipeline.build().await?;

    let files: usize = reports.iter().map(|report| report.files).sum();
    tracing::info!(
        "Built {} files with {} tasks in {}ms",
        files,
        reports.len(),
        start.elapsed().as_millis()
    );

    Ok(())
}
