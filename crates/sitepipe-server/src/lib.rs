//! Development server with live reload for sitepipe.
//!
//! Serves the output tree over HTTP, pushes reload signals to connected
//! browsers over a WebSocket, and reruns tasks when source files change.

pub mod server;
pub mod watchapp;
pub mod watcher;
pub mod websocket;

pub use server::{DevServer, DevServerConfig, RunningServer, ServerError};
pub use watchapp::WatchApp;
pub use watcher::{FileWatcher, WatchEvent};
pub use websocket::{HmrHub, HmrMessage};
