//! Connection handlers for Pollcast server.
//!
//! Each WebSocket connection runs one task that forwards decoded commands to
//! the coordinator and writes the connection's outbound queue back to the
//! socket, in the encoding the client last used.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use bytes::BytesMut;
use dashmap::DashMap;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use pollcast_core::{Coordinator, CoordinatorHandle};
use pollcast_protocol::{codec, ClientFrame, Encoding, ProtocolError, ServerFrame};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, info, warn};

/// Error code for frames that cannot be decoded.
const PROTOCOL_ERROR_CODE: u16 = 1001;

/// Shared server state.
pub struct AppState {
    /// Handle to the classroom coordinator.
    pub coordinator: CoordinatorHandle,
    /// Server configuration.
    pub config: Config,
    /// Open WebSocket connections and when they were accepted.
    pub connections: DashMap<String, Instant>,
    /// One permit per allowed connection, taken before the upgrade.
    slots: Arc<Semaphore>,
    started_at: Instant,
}

impl AppState {
    /// Create new app state around a running coordinator.
    #[must_use]
    pub fn new(config: Config, coordinator: CoordinatorHandle) -> Self {
        Self {
            coordinator,
            slots: Arc::new(Semaphore::new(config.limits.max_connections)),
            config,
            connections: DashMap::new(),
            started_at: Instant::now(),
        }
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route(&state.config.transport.websocket_path, get(ws_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// Run the HTTP/WebSocket server.
///
/// # Errors
///
/// Returns an error if the server fails to bind or serve.
pub async fn run_server(config: Config) -> Result<()> {
    // Start metrics server if enabled
    if config.metrics.enabled {
        if let Err(e) = metrics::start_metrics_server(config.metrics.port) {
            error!("Failed to start metrics server: {:#}", e);
        }
    }

    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Pollcast server listening on {}", addr);
    info!(
        "WebSocket endpoint: ws://{}{}",
        addr, config.transport.websocket_path
    );

    serve(listener, config).await
}

/// Serve on an already bound listener with a fresh coordinator.
///
/// # Errors
///
/// Returns an error if serving fails.
pub async fn serve(listener: TcpListener, config: Config) -> Result<()> {
    let coordinator = Coordinator::spawn(config.classroom_config());
    let state = Arc::new(AppState::new(config, coordinator));

    axum::serve(listener, router(state))
        .await
        .context("Server error")?;

    Ok(())
}

/// Banner.
async fn index_handler() -> impl IntoResponse {
    Json(json!({
        "name": "pollcast",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check handler.
async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.coordinator.stats().await {
        Ok(stats) => {
            let oldest = state
                .connections
                .iter()
                .map(|entry| entry.value().elapsed().as_secs())
                .max()
                .unwrap_or(0);
            Json(json!({
                "status": "ok",
                "version": env!("CARGO_PKG_VERSION"),
                "uptimeSecs": state.started_at.elapsed().as_secs(),
                "connections": state.connections.len(),
                "oldestConnectionSecs": oldest,
                "participants": stats.participants,
                "activePoll": stats.active_poll,
                "completedPolls": stats.history_len,
                "chatMessages": stats.chat_len,
            }))
            .into_response()
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "unavailable", "error": e.to_string() })),
        )
            .into_response(),
    }
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let Ok(permit) = Arc::clone(&state.slots).try_acquire_owned() else {
        warn!(
            limit = state.config.limits.max_connections,
            "Connection limit reached"
        );
        metrics::record_error("connection_limit");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };

    ws.max_message_size(state.config.limits.max_message_size)
        .on_upgrade(move |socket| handle_websocket(socket, state, permit))
}

/// Handle a WebSocket connection.
///
/// The connection slot is released when `_permit` drops at the end.
async fn handle_websocket(
    socket: WebSocket,
    state: Arc<AppState>,
    _permit: OwnedSemaphorePermit,
) {
    let _metrics_guard = ConnectionMetricsGuard::new();

    let (connection_id, mut outbound) = match state.coordinator.connect() {
        Ok(registered) => registered,
        Err(e) => {
            error!(error = %e, "Failed to register connection");
            return;
        }
    };
    state
        .connections
        .insert(connection_id.clone(), Instant::now());

    debug!(connection = %connection_id, "WebSocket connected");

    let (mut sender, mut receiver) = socket.split();

    // Replies follow the encoding of the latest inbound frame.
    let mut encoding = Encoding::Json;

    loop {
        tokio::select! {
            biased;

            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = send_frame(&mut sender, &frame, encoding).await {
                        debug!(connection = %connection_id, error = %e, "Send failed");
                        break;
                    }
                }
                None => {
                    // Detached by the coordinator after a kick.
                    debug!(connection = %connection_id, "Outbound queue closed");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            },

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let start = Instant::now();
                        encoding = Encoding::Json;
                        metrics::record_message(text.len(), "inbound");

                        let decoded = codec::decode_json::<ClientFrame>(&text);
                        if !dispatch(decoded, &connection_id, &state, &mut sender, encoding).await {
                            break;
                        }

                        metrics::record_latency(start.elapsed().as_secs_f64());
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let start = Instant::now();
                        encoding = Encoding::MessagePack;
                        metrics::record_message(data.len(), "inbound");

                        let mut open = true;
                        for decoded in decode_binary(&data) {
                            open = dispatch(decoded, &connection_id, &state, &mut sender, encoding).await;
                            if !open {
                                break;
                            }
                        }
                        if !open {
                            break;
                        }

                        metrics::record_latency(start.elapsed().as_secs_f64());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(connection = %connection_id, "Received close frame");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(connection = %connection_id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(connection = %connection_id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    state.connections.remove(&connection_id);
    if let Err(e) = state.coordinator.disconnect(&connection_id) {
        warn!(connection = %connection_id, error = %e, "Disconnect not delivered");
    }

    debug!(connection = %connection_id, "WebSocket disconnected");
}

/// Decode every frame carried by one binary message.
///
/// A message is self-contained: a truncated trailing frame ends the list with
/// an error instead of waiting for the next message.
fn decode_binary(data: &[u8]) -> Vec<Result<ClientFrame, ProtocolError>> {
    let mut buf = BytesMut::from(data);
    let mut decoded = Vec::new();
    loop {
        match codec::decode_from::<ClientFrame>(&mut buf) {
            Ok(Some(frame)) => decoded.push(Ok(frame)),
            Ok(None) if buf.is_empty() => break,
            Ok(None) => {
                // `decode` reports how many bytes the tail is missing.
                decoded.push(codec::decode::<ClientFrame>(&buf));
                break;
            }
            Err(e) => {
                decoded.push(Err(e));
                break;
            }
        }
    }
    decoded
}

/// Forward a decoded frame to the coordinator, or reject an undecodable one.
///
/// Returns `false` when the connection should close.
async fn dispatch(
    decoded: Result<ClientFrame, ProtocolError>,
    connection_id: &str,
    state: &AppState,
    sender: &mut SplitSink<WebSocket, Message>,
    encoding: Encoding,
) -> bool {
    match decoded {
        Ok(frame) => {
            metrics::record_command(frame.kind());
            if let Err(e) = state.coordinator.send(connection_id, frame) {
                error!(connection = %connection_id, error = %e, "Coordinator unavailable");
                return false;
            }
            true
        }
        Err(e) => {
            warn!(connection = %connection_id, error = %e, "Undecodable frame");
            metrics::record_error("decode");
            let reply = ServerFrame::error(PROTOCOL_ERROR_CODE, e.to_string());
            send_frame(sender, &reply, encoding).await.is_ok()
        }
    }
}

/// Send a frame to the WebSocket.
async fn send_frame(
    sender: &mut SplitSink<WebSocket, Message>,
    frame: &ServerFrame,
    encoding: Encoding,
) -> Result<()> {
    let message = match encoding {
        Encoding::Json => Message::Text(codec::encode_json(frame)?),
        Encoding::MessagePack => Message::Binary(codec::encode(frame)?.to_vec()),
    };
    let len = match &message {
        Message::Text(text) => text.len(),
        Message::Binary(data) => data.len(),
        _ => 0,
    };
    metrics::record_message(len, "outbound");
    sender.send(message).await?;
    Ok(())
}
