//! Progress WebSocket (component K): one socket per `file_id`, streaming
//! `ProgressMessage`s until the pipeline finishes or the client disconnects.
//!
//! Kept in the teacher's triple-task shape (a keepalive/broadcast-forwarding
//! task racing an upstream-reader task, torn down together via
//! `tokio::select!`) but scoped to one `file_id`'s channel instead of one
//! global event bus, and applying the per-subscriber 5-second send timeout
//! the original pipeline's `websocket_manager.py` enforces — the broadcast
//! channel itself has no notion of a slow consumer beyond lag-based drops.

use crate::config::PROGRESS_SUBSCRIBER_TIMEOUT;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(25);

pub async fn subscribe(
    websocket_upgrade: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(file_id): Path<i64>,
) -> impl IntoResponse {
    websocket_upgrade.on_upgrade(move |socket| stream_progress(socket, state, file_id))
}

async fn stream_progress(socket: WebSocket, state: AppState, file_id: i64) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let mut progress_subscriber = state.event_bus.subscribe(file_id);

    info!(file_id, "progress stream opened");

    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive = interval(KEEPALIVE_INTERVAL);
        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if socket_sender.send(Message::Ping(vec![])).await.is_err() {
                        break;
                    }
                },
                received = progress_subscriber.recv() => {
                    match received {
                        Ok(message) => {
                            let Ok(payload) = serde_json::to_string(&message) else { continue };
                            let send = tokio::time::timeout(
                                PROGRESS_SUBSCRIBER_TIMEOUT,
                                socket_sender.send(Message::Text(payload)),
                            )
                            .await;
                            match send {
                                Ok(Ok(())) => {}
                                Ok(Err(_)) => break,
                                Err(_) => {
                                    warn!(file_id, "progress subscriber too slow, dropping connection");
                                    break;
                                }
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(file_id, missed, "progress subscriber lagged, messages dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                },
            }
        }
    });

    let mut upstream_task = tokio::spawn(async move {
        while let Some(message) = socket_receiver.next().await {
            match message {
                Ok(Message::Close(_)) => break,
                Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut downstream_task => upstream_task.abort(),
        _ = &mut upstream_task => downstream_task.abort(),
    }

    debug!(file_id, "progress stream closed");
}
