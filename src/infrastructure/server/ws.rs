//! WebSocket session rooms.
//!
//! A client subscribes with a text frame `join:session <session_id>` and
//! from then on receives that session's events as JSON frames
//! `{event, data, timestamp}`. Joining again switches rooms.

use super::state::AppState;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

const JOIN_PREFIX: &str = "join:session ";
const OUTBOUND_QUEUE_DEPTH: usize = 64;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUTBOUND_QUEUE_DEPTH);

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    let mut forward: Option<tokio::task::JoinHandle<()>> = None;
    while let Some(Ok(message)) = stream.next().await {
        match message {
            Message::Text(text) => {
                let Some(session_id) = text.strip_prefix(JOIN_PREFIX).map(str::trim) else {
                    debug!(frame = text.as_str(), "Ignoring unrecognized frame");
                    continue;
                };
                if session_id.is_empty() {
                    continue;
                }
                info!(session_id, "WebSocket client joined session room");
                if let Some(previous) = forward.take() {
                    previous.abort();
                }
                let mut events = BroadcastStream::new(state.events.subscribe(session_id));
                let out_tx = out_tx.clone();
                forward = Some(tokio::spawn(async move {
                    while let Some(item) = events.next().await {
                        match item {
                            Ok(event) => {
                                let Ok(frame) = serde_json::to_string(&event) else {
                                    continue;
                                };
                                if out_tx.send(frame).await.is_err() {
                                    break;
                                }
                            }
                            Err(lagged) => {
                                warn!(%lagged, "WebSocket subscriber lagged; events dropped");
                            }
                        }
                    }
                }));
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    if let Some(task) = forward {
        task.abort();
    }
    writer.abort();
    debug!("WebSocket connection closed");
}
