//! sitepipe CLI - static-site asset pipeline with live reload.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use sitepipe_tasks::TaskName;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "sitepipe")]
#[command(about = "Static-site asset pipeline with live reload")]
#[command(version)]
pub struct Cli {
    /// Task to run (defaults to watchapp)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to sitepipe.toml config file
    #[arg(short, long, default_value = "sitepipe.toml", global = true)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Commands {
    /// Minify every HTML file into the output tree
    Html,

    /// Render page templates to HTML
    #[command(alias = "templates")]
    Pug,

    /// Bundle every stylesheet into bundle.css
    Css,

    /// Bundle layout stylesheets into bundle.css
    #[command(name = "layoutsCss")]
    LayoutsCss,

    /// Bundle page stylesheets into index.css
    #[command(name = "pagesCss")]
    PagesCss,

    /// Copy images
    Images,

    /// Copy web fonts
    Fonts,

    /// Copy icons
    Icons,

    /// Copy scripts
    Scripts,

    /// Delete the output tree
    Clean,

    /// Clean, then run every generator in parallel
    Build,

    /// Build, then watch sources and serve the output with live reload
    Watchapp,

    /// List the named tasks and their sources
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let settings = config::load_settings(&cli.config)?;

    let task = match cli.command.unwrap_or(Commands::Watchapp) {
        Commands::Build => return commands::build::run(&settings).await,
        Commands::Watchapp => return commands::watchapp::run(&settings).await,
        Commands::Tasks => return commands::tasks::run(&settings),
        Commands::Html => TaskName::Html,
        Commands::Pug => TaskName::Templates,
        Commands::Css => TaskName::Css,
        Commands::LayoutsCss => TaskName::LayoutsCss,
        Commands::PagesCss => TaskName::PagesCss,
        Commands::Images => TaskName::Images,
        Commands::Fonts => TaskName::Fonts,
        Commands::Icons => TaskName::Icons,
        Commands::Scripts => TaskName::Scripts,
        Commands::Clean => TaskName::Clean,
    };

    commands::run::run(&settings, task).await
}
