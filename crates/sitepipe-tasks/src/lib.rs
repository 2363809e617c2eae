//! Task bodies and task graph for the sitepipe asset pipeline.
//!
//! Every task reads a fixed glob under the source tree and writes into the
//! output tree. The graph composes tasks into series and parallel groups,
//! and the watchlist maps changed source files back to the task that
//! regenerates them.

pub mod clean;
pub mod copy;
pub mod glob;
pub mod graph;
pub mod minify;
pub mod pipeline;
pub mod reload;
pub mod rerun;
pub mod styles;
pub mod task;
pub mod templates;
pub mod watchlist;

pub use glob::{SourceFile, SourceGlob};
pub use graph::{run_step, GraphError, Step, TaskFailure};
pub use pipeline::{Pipeline, PipelineConfig};
pub use reload::{NoReload, ReloadSignal, ReloadSink};
pub use rerun::{Rerun, RerunQueue};
pub use styles::StyleOptions;
pub use task::{Task, TaskError, TaskName, TaskReport};
pub use watchlist::Watchlist;
