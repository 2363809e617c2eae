//! Serialized reruns of watched tasks.
//!
//! Each task gets one worker and a single pending slot. A request while the
//! task is idle starts it; a request while it runs fills the slot; any
//! further request before the rerun starts is folded into the slot.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::pipeline::Pipeline;
use crate::task::TaskName;

/// What happened to a rerun request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rerun {
    /// The task will run
    Scheduled,

    /// A rerun was already pending; this request joined it
    Coalesced,

    /// The task has no worker
    Unwatched,
}

/// Per-task rerun workers.
pub struct RerunQueue {
    slots: HashMap<TaskName, mpsc::Sender<()>>,
}

impl RerunQueue {
    /// Spawn one worker per task. Must be called inside a tokio runtime.
    pub fn spawn(pipeline: Arc<Pipeline>, tasks: impl IntoIterator<Item = TaskName>) -> Self {
        let mut slots = HashMap::new();

        for task in tasks {
            if slots.contains_key(&task) {
                continue;
            }

            let (tx, mut rx) = mpsc::channel::<()>(1);
            let pipeline = Arc::clone(&pipeline);

            tokio::spawn(async move {
                while rx.recv().await.is_some() {
                    // Failures are already logged by the pipeline; stale
                    // output stays in place until the next successful run.
                    let _ = pipeline.run_task(task).await;
                }
            });

            slots.insert(task, tx);
        }

        Self { slots }
    }

    /// Ask for `task` to run again.
    pub fn request(&self, task: TaskName) -> Rerun {
        let Some(slot) = self.slots.get(&task) else {
            return Rerun::Unwatched;
        };

        match slot.try_send(()) {
            Ok(()) => Rerun::Scheduled,
            Err(TrySendError::Full(())) => Rerun::Coalesced,
            Err(TrySendError::Closed(())) => Rerun::Unwatched,
        }
    }
}
