//! Loading `sitepipe.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use sitepipe_server::DevServerConfig;
use sitepipe_tasks::{PipelineConfig, StyleOptions};

/// Configuration file structure (sitepipe.toml).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ConfigFile {
    paths: PathsConfig,
    styles: StylesConfig,
    server: ServerSettings,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PathsConfig {
    src: PathBuf,
    dist: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src: PathBuf::from("src"),
            dist: PathBuf::from("dist"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct StylesConfig {
    /// Browserslist queries for vendor prefixing
    browsers: Vec<String>,
    minify: bool,
}

impl Default for StylesConfig {
    fn default() -> Self {
        let defaults = StyleOptions::default();
        Self {
            browsers: defaults.browsers,
            minify: defaults.minify,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ServerSettings {
    host: String,
    port: u16,
    open: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let defaults = DevServerConfig::default();
        Self {
            host: defaults.host,
            port: defaults.port,
            open: defaults.open,
        }
    }
}

/// Resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pipeline: PipelineConfig,
    pub server: DevServerConfig,
}

impl ConfigFile {
    /// Resolve relative roots against `base`.
    pub fn resolve(self, base: &Path) -> Settings {
        let src_dir = base.join(&self.paths.src);
        let dist_dir = base.join(&self.paths.dist);

        Settings {
            server: DevServerConfig {
                root: dist_dir.clone(),
                port: self.server.port,
                host: self.server.host,
                open: self.server.open,
            },
            pipeline: PipelineConfig {
                src_dir,
                dist_dir,
                styles: StyleOptions {
                    browsers: self.styles.browsers,
                    minify: self.styles.minify,
                },
            },
        }
    }
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        tracing::debug!("No {} found, using defaults", path.display());
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    tracing::info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Load `path` and resolve its roots against the working directory.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    Ok(load_config(path)?.resolve(&cwd))
}
