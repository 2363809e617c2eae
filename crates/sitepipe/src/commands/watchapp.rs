//! Development session command.

use anyhow::Result;
use sitepipe_server::WatchApp;

use crate::config::Settings;

/// Build, then watch and serve until Ctrl-C.
pub async fn run(settings: &Settings) -> Result<()> {
    let app = WatchApp::new(settings.pipeline.clone(), settings.server.clone())?;
    app.run().await?;

    Ok(())
}
