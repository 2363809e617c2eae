//! Run a single named task.

use std::sync::Arc;

use anyhow::Result;
use sitepipe_tasks::{NoReload, Pipeline, TaskName};

use crate::config::Settings;

/// Run the task once. Nothing is listening, so reload signals are dropped.
pub async fn run(settings: &Settings, task: TaskName) -> Result<()> {
    let pipeline = Pipeline::new(settings.pipeline.clone(), Arc::new(NoReload))?;
    pipeline.run_task(task).await?;

    Ok(())
}
