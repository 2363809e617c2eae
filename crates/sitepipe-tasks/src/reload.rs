//! Reload notifications pushed to browsers after a task succeeds.

/// What connected browsers should do after a task run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadSignal {
    /// Full page reload
    Reload,

    /// Re-fetch one stylesheet without reloading the page
    Styles {
        /// Output-relative path of the stylesheet
        path: String,
    },
}

/// Receiver of reload signals.
///
/// The dev server implements this; one-shot commands use [`NoReload`].
pub trait ReloadSink: Send + Sync {
    /// Deliver a signal to every connected client. Never blocks.
    fn notify(&self, signal: ReloadSignal);
}

/// A sink that drops every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReload;

impl ReloadSink for NoReload {
    fn notify(&self, _signal: ReloadSignal) {}
}
