//! WebSocket connection lifecycle.
//!
//! Runs one reader loop and one writer task per connection. The reader
//! hands inbound frames to the router strictly in arrival order — the
//! next frame is not read until the previous one is fully handled. The
//! writer task exclusively owns the socket sink and drains the session's
//! bounded outbound queue, so neither the router nor the broadcast
//! engine ever touches the socket.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::app_state::AppState;

/// Runs the read/write loop for a single WebSocket connection.
///
/// Registration happens before the first read and removal is the last
/// step of teardown, so no broadcast can target this connection after
/// the loop exits.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(state.session_queue_capacity);
    let session_id = state.registry.register(tx.clone()).await;
    tracing::info!(session_id = %session_id, "client connected");

    // Writer task: sole owner of the sink. Ends when every queue sender
    // is gone (unregistration drops the registry's copy) or the socket
    // rejects a write.
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if ws_tx.send(Message::text(frame)).await.is_err() {
                break;
            }
        }
    });

    // Reader loop: one frame at a time, in arrival order.
    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let responses = state.router.handle(session_id, text.as_str()).await;
                let mut closed = false;
                for envelope in responses {
                    match serde_json::to_string(&envelope) {
                        Ok(frame) => {
                            // Direct responses use the same queue as
                            // broadcasts; an error means the writer is
                            // gone and the connection is over.
                            if tx.send(frame).await.is_err() {
                                closed = true;
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::error!(
                                session_id = %session_id,
                                error = %e,
                                "response serialization failed"
                            );
                        }
                    }
                }
                if closed {
                    break;
                }
            }
            Ok(Message::Close(_)) | Err(_) => break,
            _ => {}
        }
    }

    // Teardown: removal from the registry is atomic with the socket
    // going away — after this point no fan-out can see the session.
    state.registry.unregister(session_id).await;
    drop(tx);
    let _ = writer.await;
    tracing::info!(session_id = %session_id, "client disconnected");
}
