//! Development server implementation.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use crate::websocket::{hmr_client_script, HmrHub, HmrMessage, HMR_ENDPOINT, HMR_SCRIPT_PATH};

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory to serve
    pub root: PathBuf,

    /// Port to listen on (0 picks a free port)
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("dist"),
            port: 3000,
            host: "127.0.0.1".to_string(),
            open: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Server error: {0}")]
    ServeError(String),

    #[error(transparent)]
    Pipeline(#[from] sitepipe_tasks::TaskError),
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: HmrHub,
}

impl DevServer {
    /// Create a server broadcasting through `hub`.
    pub fn new(config: DevServerConfig, hub: HmrHub) -> Self {
        Self { config, hub }
    }

    /// Bind and start serving in the background.
    pub async fn start(self) -> Result<RunningServer, ServerError> {
        let requested = format!("{}:{}", self.config.host, self.config.port);
        let addr: SocketAddr = requested
            .parse()
            .map_err(|_| ServerError::InvalidAddress(requested.clone()))?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(requested.clone(), e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(requested, e.to_string()))?;

        let app = router(&self.config.root, self.hub);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        let url = format!("http://{}", local_addr);
        tracing::info!("Serving {} at {}", self.config.root.display(), url);

        if self.config.open {
            let _ = open::that(&url);
        }

        Ok(RunningServer {
            local_addr,
            shutdown: shutdown_tx,
            handle,
        })
    }
}

/// A server started by [`DevServer::start`].
pub struct RunningServer {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl RunningServer {
    /// Address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server to finish.
    pub async fn stop(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(());
        self.handle
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()))?
            .map_err(|e| ServerError::ServeError(e.to_string()))
    }
}

/// Build the router: live reload endpoints plus the output tree.
pub fn router(root: &Path, hub: HmrHub) -> Router {
    Router::new()
        .route(HMR_ENDPOINT, get(ws_handler))
        .route(HMR_SCRIPT_PATH, get(hmr_script_handler))
        .fallback_service(ServeDir::new(root))
        .layer(middleware::map_response(inject_reload_script))
        .with_state(hub)
}

/// Handler for the WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<HmrHub>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, hub))
}

/// Forward hub messages to one client until it disconnects.
async fn handle_ws(mut socket: WebSocket, hub: HmrHub) {
    let mut rx = hub.subscribe();

    if send_message(&mut socket, &HmrMessage::Connected).await.is_err() {
        return;
    }

    loop {
        match rx.recv().await {
            Ok(msg) => {
                if send_message(&mut socket, &msg).await.is_err() {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::debug!("Live reload client lagged by {} messages", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn send_message(socket: &mut WebSocket, msg: &HmrMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the client script.
async fn hmr_script_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        hmr_client_script(),
    )
}

/// Add the live reload script tag to served HTML pages.
async fn inject_reload_script(response: Response) -> Response {
    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));

    if response.status() != StatusCode::OK || !is_html {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!("Failed to read response body: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script_tag(&bytes);
    parts.headers.remove(header::CONTENT_LENGTH);

    Response::from_parts(parts, Body::from(html))
}

/// Insert the script tag before the last `</body>`, or append it.
///
/// Works on raw bytes so pages in any encoding pass through unchanged.
fn inject_script_tag(html: &[u8]) -> Vec<u8> {
    let tag = format!(r#"<script src="{}"></script>"#, HMR_SCRIPT_PATH);
    let index = html
        .windows(CLOSING_BODY.len())
        .rposition(|window| window.eq_ignore_ascii_case(CLOSING_BODY))
        .unwrap_or(html.len());

    let mut out = Vec::with_capacity(html.len() + tag.len());
    out.extend_from_slice(&html[..index]);
    out.extend_from_slice(tag.as_bytes());
    out.extend_from_slice(&html[index..]);
    out
}

const CLOSING_BODY: &[u8] = b"</body>";
