//! Build once, then watch sources and serve the output with live reload.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use sitepipe_tasks::{Pipeline, PipelineConfig, Rerun, RerunQueue};

use crate::server::{DevServer, DevServerConfig, ServerError};
use crate::watcher::FileWatcher;
use crate::websocket::HmrHub;

/// The long-running development session.
pub struct WatchApp {
    pipeline: Arc<Pipeline>,
    hub: HmrHub,
    server: DevServerConfig,
}

impl WatchApp {
    /// Wire a pipeline whose tasks notify this session's reload hub.
    pub fn new(pipeline: PipelineConfig, server: DevServerConfig) -> Result<Self, ServerError> {
        let hub = HmrHub::new();
        let pipeline = Pipeline::new(pipeline, Arc::new(hub.clone()))?;

        Ok(Self {
            pipeline: Arc::new(pipeline),
            hub,
            server,
        })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    pub fn hub(&self) -> &HmrHub {
        &self.hub
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` completes.
    ///
    /// Watching starts before the initial build so edits made while it runs
    /// are picked up. A failed initial build is logged and the session keeps
    /// going with whatever output exists.
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let watching = self.start_watching()?;

        if let Err(e) = Arc::clone(&self.pipeline).build().await {
            tracing::error!("Initial build failed: {}", e);
        }

        let server = DevServer::new(self.server, self.hub).start().await?;

        tracing::info!("Watching for changes. Press Ctrl+C to stop");
        shutdown.await;

        tracing::info!("Shutting down...");
        watching.abort();
        server.stop().await
    }

    /// Forward source changes to the rerun queue.
    fn start_watching(&self) -> Result<JoinHandle<()>, ServerError> {
        let src = self.pipeline.config().src_dir.clone();
        let (watcher, mut rx) =
            FileWatcher::new(&[src]).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let queue = RerunQueue::spawn(
            Arc::clone(&self.pipeline),
            self.pipeline.watchlist().tasks(),
        );
        let pipeline = Arc::clone(&self.pipeline);

        Ok(tokio::spawn(async move {
            // Keep watcher alive
            let _watcher = watcher;

            while let Some(event) = rx.recv().await {
                for task in pipeline.watchlist().tasks_for(event.path()) {
                    match queue.request(task) {
                        Rerun::Scheduled => {
                            tracing::info!("{} changed", event.path().display());
                        }
                        Rerun::Coalesced => {
                            tracing::debug!("'{}' already pending", task);
                        }
                        Rerun::Unwatched => {}
                    }
                }
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::sync::oneshot;

    use crate::websocket::HmrMessage;

    fn site(root: &Path) -> WatchApp {
        fs::create_dir_all(root.join("src/layouts")).unwrap();
        fs::create_dir_all(root.join("src/pages")).unwrap();
        fs::write(root.join("src/layouts/grid.css"), ".grid { display: grid; }").unwrap();
        fs::write(root.join("src/pages/style.css"), ".page { margin: 0; }").unwrap();
        fs::write(root.join("src/pages/index.jinja"), "<p>home</p>\n").unwrap();

        WatchApp::new(
            PipelineConfig {
                src_dir: root.join("src"),
                dist_dir: root.join("dist"),
                ..Default::default()
            },
            DevServerConfig {
                root: root.join("dist"),
                port: 0,
                open: false,
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn bundle_styles() -> HmrMessage {
        HmrMessage::Styles {
            path: "bundle.css".to_string(),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn layout_edit_reruns_only_layout_bundle() {
        let temp = tempdir().unwrap();
        let root = &temp.path().canonicalize().unwrap();
        let app = site(root);

        let mut rx = app.hub().subscribe();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let session = tokio::spawn(app.run_until(async {
            let _ = stop_rx.await;
        }));

        // One message per generator in the initial build.
        for _ in 0..7 {
            tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("initial build messages")
                .unwrap();
        }
        assert!(root.join("dist/index.html").exists());

        tokio::time::sleep(Duration::from_millis(300)).await;
        fs::write(root.join("src/layouts/grid.css"), ".grid { display: flex; }").unwrap();

        let first = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("rerun after layout edit")
            .unwrap();
        assert_eq!(first, bundle_styles());

        while let Ok(Ok(msg)) = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await {
            assert_eq!(msg, bundle_styles());
        }

        let bundle = fs::read_to_string(root.join("dist/bundle.css")).unwrap();
        assert!(bundle.contains("display: flex"));

        stop_tx.send(()).unwrap();
        session.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn edits_during_initial_build_are_picked_up() {
        let temp = tempdir().unwrap();
        let root = &temp.path().canonicalize().unwrap();
        let app = site(root);

        let mut rx = app.hub().subscribe();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let session = tokio::spawn(app.run_until(async {
            let _ = stop_rx.await;
        }));

        // The build has started once its first task reports.
        let first = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("initial build started")
            .unwrap();
        fs::write(root.join("src/layouts/grid.css"), ".grid { display: flex; }").unwrap();

        let mut bundles = usize::from(first == bundle_styles());
        while let Ok(Ok(msg)) = tokio::time::timeout(Duration::from_secs(2), rx.recv()).await {
            if msg == bundle_styles() {
                bundles += 1;
            }
        }

        // One from the build, at least one from the rerun.
        assert!(bundles >= 2, "layout bundle rebuilt {bundles} time(s)");
        let bundle = fs::read_to_string(root.join("dist/bundle.css")).unwrap();
        assert!(bundle.contains("display: flex"));

        stop_tx.send(()).unwrap();
        session.await.unwrap().unwrap();
    }
}
