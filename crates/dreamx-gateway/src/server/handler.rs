//! WebSocket handler

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::connection::{Connection, ConnectionState, Outbound};
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::GatewayState;

/// A connection without a heartbeat for this long is dropped
pub const HEARTBEAT_TIMEOUT_MS: u64 = 90_000;

/// Outgoing frames buffered per connection
const MESSAGE_BUFFER_SIZE: usize = 100;

/// How long the writer gets to flush a close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(State(state): State<GatewayState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = Connection::generate_session_id();
    let (tx, mut rx) = mpsc::channel::<Outbound>(MESSAGE_BUFFER_SIZE);
    let connection = state.registry().add_connection(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let hello = GatewayMessage::hello(&HelloPayload::with_interval(state.heartbeat_interval_ms()));
    let sent = match hello.to_json() {
        Ok(json) => ws_sink.send(Message::Text(json)).await.is_ok(),
        Err(_) => false,
    };
    if !sent {
        tracing::warn!(session_id = %session_id, "Failed to send Hello message");
        cleanup_connection(&state, &connection);
        return;
    }

    let state_recv = state.clone();
    let connection_recv = Arc::clone(&connection);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(close_code) = handle_text_message(&state_recv, &connection_recv, &text).await {
                        return Some(close_code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(session_id = %connection_recv.session_id(), "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::info!(session_id = %connection_recv.session_id(), "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(session_id = %connection_recv.session_id(), error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    let session_id_send = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Message(msg) => {
                    let Ok(json) = msg.to_json() else { continue };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(session_id = %session_id_send, "Failed to send message to WebSocket");
                        break;
                    }
                }
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: code.description().into(),
                    };
                    let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    let connection_hb = Arc::clone(&connection);
    let check_every = Duration::from_millis((state.heartbeat_interval_ms() / 2).max(1));
    let mut heartbeat_task = tokio::spawn(async move {
        let timeout = Duration::from_millis(HEARTBEAT_TIMEOUT_MS);
        let mut check_interval = interval(check_every);
        loop {
            check_interval.tick().await;
            let since = connection_hb.time_since_heartbeat();
            if since > timeout {
                tracing::warn!(
                    session_id = %connection_hb.session_id(),
                    time_since_ms = since.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                break;
            }
        }
    });

    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        _ = &mut send_task => None,
        _ = &mut heartbeat_task => Some(CloseCode::SessionTimeout),
    };

    if let Some(code) = close_code {
        tracing::debug!(session_id = %session_id, close_code = %code, "Closing connection");
        connection.close(code);
        if !send_task.is_finished() {
            let _ = tokio::time::timeout(CLOSE_GRACE, &mut send_task).await;
        }
    }

    recv_task.abort();
    send_task.abort();
    heartbeat_task.abort();
    cleanup_connection(&state, &connection);
}

async fn handle_text_message(state: &GatewayState, connection: &Arc<Connection>, text: &str) -> Result<(), CloseCode> {
    let message = GatewayMessage::from_json(text).map_err(|e| {
        tracing::debug!(session_id = %connection.session_id(), error = %e, "Failed to parse message");
        CloseCode::DecodeError
    })?;

    tracing::trace!(session_id = %connection.session_id(), op = %message.op, "Received message");

    match MessageDispatcher::dispatch(state, connection, message).await {
        Ok(Some(close_code)) => Err(close_code),
        Ok(None) => Ok(()),
        Err(e) => {
            tracing::warn!(session_id = %connection.session_id(), error = %e, "Handler error");
            Err(e.to_close_code())
        }
    }
}

fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    connection.set_state(ConnectionState::Disconnected);
    state.registry().remove_connection(connection.session_id());
    tracing::info!(
        session_id = %connection.session_id(),
        user_id = ?connection.user_id(),
        "Connection closed"
    );
}
