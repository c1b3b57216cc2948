//! WebSocket transport for the client.
//!
//! Provides [`ConnectedSocket`] which handles WebSocket I/O for text frames.
//! This is a thin layer that only moves frames; connection lifecycle and
//! classification remain in the Sans-IO [`crate::Session`].
//!
//! The channel is addressed by identity (`{ws_base}/ws/chat/{identity}`) and
//! authenticated out-of-band by the `access_token` cookie on the upgrade
//! request. The credential never appears in a payload.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{
        Message,
        client::IntoClientRequest,
        http::{HeaderValue, header::COOKIE},
    },
};
use trustline_proto::Identity;

/// Cookie carrying the session credential.
const AUTH_COOKIE: &str = "access_token";

/// Capacity of the frame channels in each direction.
const CHANNEL_CAPACITY: usize = 32;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),

    /// Protocol error.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Returns true if the error is transient and reconnecting may help.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Stream(_))
    }
}

/// Where to reach the server and how to authenticate.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// WebSocket base URL, e.g. `ws://localhost:8000`.
    pub ws_base: String,
    /// REST base URL, e.g. `http://localhost:8000`.
    pub api_base: String,
    /// Session credential issued at login.
    pub auth_token: String,
}

impl TransportConfig {
    /// Chat channel URL for `identity`.
    pub fn chat_url(&self, identity: &Identity) -> Result<reqwest::Url, TransportError> {
        let mut url = reqwest::Url::parse(&self.ws_base)
            .map_err(|e| TransportError::Connection(format!("invalid address: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| TransportError::Connection("address cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(["ws", "chat", identity.as_str()]);
        Ok(url)
    }

    pub(crate) fn cookie(&self) -> String {
        format!("{AUTH_COOKIE}={}", self.auth_token)
    }
}

/// Event delivered from the socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Text frame from the server.
    Frame(String),
    /// Socket closed or failed. No further events follow.
    Closed {
        /// Human-readable cause.
        reason: String,
    },
}

/// Handle to an open WebSocket.
///
/// Frames are sent/received via the channels, and an internal task handles
/// the socket I/O. Dropping `to_server` closes the socket gracefully.
pub struct ConnectedSocket {
    /// Send text frames to the server.
    pub to_server: mpsc::Sender<String>,
    /// Receive events from the server.
    pub from_server: mpsc::Receiver<TransportEvent>,
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Open the chat channel for `identity`.
///
/// Returns once the upgrade handshake has completed.
pub async fn connect(
    config: &TransportConfig,
    identity: &Identity,
) -> Result<ConnectedSocket, TransportError> {
    let url = config.chat_url(identity)?;
    let mut request = url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::Connection(format!("invalid request: {e}")))?;
    let cookie = HeaderValue::from_str(&config.cookie())
        .map_err(|e| TransportError::Protocol(format!("invalid credential: {e}")))?;
    request.headers_mut().insert(COOKIE, cookie);

    let (socket, _response) = connect_async(request)
        .await
        .map_err(|e| TransportError::Connection(format!("handshake failed: {e}")))?;
    tracing::debug!(%identity, "websocket open");

    let (to_server_tx, to_server_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
    let (from_server_tx, from_server_rx) = mpsc::channel::<TransportEvent>(CHANNEL_CAPACITY);

    tokio::spawn(run_connection(socket, to_server_rx, from_server_tx));

    Ok(ConnectedSocket { to_server: to_server_tx, from_server: from_server_rx })
}

/// Run the connection, bridging between channels and the socket.
///
/// Pings are answered by tungstenite while reading; they are not surfaced.
async fn run_connection(
    mut socket: Socket,
    mut to_server: mpsc::Receiver<String>,
    from_server: mpsc::Sender<TransportEvent>,
) {
    let reason = loop {
        tokio::select! {
            outgoing = to_server.recv() => match outgoing {
                Some(text) => {
                    if let Err(e) = socket.send(Message::text(text)).await {
                        break format!("send failed: {e}");
                    }
                },
                None => {
                    if let Err(e) = socket.close(None).await {
                        tracing::debug!(error = %e, "close handshake failed");
                    }
                    break "closed by client".to_string();
                },
            },
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    if from_server.send(TransportEvent::Frame(text.to_string())).await.is_err() {
                        break "receiver dropped".to_string();
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    break frame.map_or_else(
                        || "closed by server".to_string(),
                        |f| format!("closed by server: {} {}", f.code, f.reason.as_str()),
                    );
                },
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                    tracing::trace!("keepalive");
                },
                Some(Ok(Message::Binary(_) | Message::Frame(_))) => {
                    tracing::debug!("ignoring non-text frame");
                },
                Some(Err(e)) => break format!("stream error: {e}"),
                None => break "stream ended".to_string(),
            },
        }
    };

    tracing::debug!(%reason, "websocket task finished");
    // Receiver may already be gone.
    let _ = from_server.send(TransportEvent::Closed { reason }).await;
}
