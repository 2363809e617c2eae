//! List the named tasks.

use std::sync::Arc;

use anyhow::Result;
use sitepipe_tasks::{NoReload, Pipeline, Step, Task, TaskName};

use crate::config::Settings;

/// Print every task with the glob it reads.
pub fn run(settings: &Settings) -> Result<()> {
    let pipeline = Pipeline::new(settings.pipeline.clone(), Arc::new(NoReload))?;

    for name in TaskName::ALL {
        let sources = match pipeline.task(name).and_then(Task::sources) {
            Some(glob) => glob.to_string(),
            None => format!("deletes {}", settings.pipeline.dist_dir.display()),
        };
        println!("{:<12} {}", name.as_str(), sources);
    }

    let generators: Vec<&str> = Step::build()
        .tasks()
        .into_iter()
        .filter(|task| *task != TaskName::Clean)
        .map(|task| task.as_str())
        .collect();
    println!("{:<12} clean, then [{}]", "build", generators.join(", "));
    println!("{:<12} build, then watch and serve", "watchapp");

    Ok(())
}
