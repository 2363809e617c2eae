//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use sitepipe_tasks::{ReloadSignal, ReloadSink};

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HmrMessage {
    /// Full page reload
    Reload,

    /// Re-fetch a stylesheet in place
    Styles {
        /// Output-relative path of the stylesheet
        path: String,
    },

    /// Connection established
    Connected,
}

impl From<ReloadSignal> for HmrMessage {
    fn from(signal: ReloadSignal) -> Self {
        match signal {
            ReloadSignal::Reload => HmrMessage::Reload,
            ReloadSignal::Styles { path } => HmrMessage::Styles { path },
        }
    }
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct HmrHub {
    sender: broadcast::Sender<HmrMessage>,
}

impl HmrHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: HmrMessage) {
        // No receivers just means no browser is open.
        let _ = self.sender.send(msg);
    }

    /// Subscribe to messages.
    pub fn subscribe(&self) -> broadcast::Receiver<HmrMessage> {
        self.sender.subscribe()
    }

    /// Number of connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for HmrHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadSink for HmrHub {
    fn notify(&self, signal: ReloadSignal) {
        self.send(signal.into());
    }
}

/// Path of the WebSocket endpoint.
pub const HMR_ENDPOINT: &str = "/__livereload";

/// Path of the client script.
pub const HMR_SCRIPT_PATH: &str = "/__livereload.js";

/// Client-side live reload script.
///
/// Connects back to the serving host, so it works on any bound port.
pub fn hmr_client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(scheme + location.host + '{endpoint}');
  let reconnectAttempts = 0;
  const maxReconnectAttempts = 10;

  ws.onopen = function() {{
    console.log('[livereload] Connected');
    reconnectAttempts = 0;
  }};

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);

    switch (msg.type) {{
      case 'reload':
        location.reload();
        break;

      case 'styles':
        let found = false;
        document.querySelectorAll('link[rel="stylesheet"]').forEach(function(link) {{
          const href = link.getAttribute('href').split('?')[0];
          if (href.endsWith(msg.path)) {{
            link.setAttribute('href', href + '?v=' + Date.now());
            found = true;
          }}
        }});
        if (!found) {{
          location.reload();
        }}
        break;

      case 'connected':
        break;
    }}
  }};

  ws.onclose = function() {{
    console.log('[livereload] Disconnected');
    if (reconnectAttempts < maxReconnectAttempts) {{
      reconnectAttempts++;
      setTimeout(function() {{
        location.reload();
      }}, 1000 * reconnectAttempts);
    }}
  }};
}})();
"#,
        endpoint = HMR_ENDPOINT
    )
}
