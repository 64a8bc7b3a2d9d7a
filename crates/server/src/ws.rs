//! Per-transfer progress fan-out over WebSocket.
//!
//! The hub keeps one subscriber set per transfer id. Publishing serializes
//! the event once and sends it to every subscriber that is connected at
//! that moment; there is no replay and no delivery guarantee. A subscriber
//! whose channel has closed is dropped from the set without affecting the
//! others or the publisher.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use freight_core::ProgressEvent;

use crate::state::AppState;

/// Channel sender half for pushing messages to a WebSocket connection.
type Subscriber = mpsc::UnboundedSender<Message>;

/// Fan-out hub for live transfer progress.
///
/// Thread-safe via interior `RwLock`; wrapped in `Arc` and shared across
/// handlers and the sweeper.
pub struct ProgressHub {
    subscribers: RwLock<HashMap<String, HashMap<Uuid, Subscriber>>>,
}

impl ProgressHub {
    /// Create a new, empty hub.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Register a watcher for a transfer.
    ///
    /// Returns the connection id and the receiver half of the message
    /// channel so the caller can forward messages to the WebSocket sink.
    pub async fn subscribe(&self, transfer_id: &str) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let conn_id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .await
            .entry(transfer_id.to_string())
            .or_default()
            .insert(conn_id, tx);
        (conn_id, rx)
    }

    /// Remove a watcher. The last watcher leaving removes the map entry.
    pub async fn unsubscribe(&self, transfer_id: &str, conn_id: Uuid) {
        let mut subs = self.subscribers.write().await;
        if let Some(watchers) = subs.get_mut(transfer_id) {
            watchers.remove(&conn_id);
            if watchers.is_empty() {
                subs.remove(transfer_id);
            }
        }
    }

    /// Publish an event to every current watcher of its transfer.
    ///
    /// Fire-and-forget: send failures mean the watcher is gone and are
    /// ignored (the connection task cleans itself up on disconnect).
    pub async fn publish(&self, event: &ProgressEvent) {
        let payload = match event.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize progress event");
                return;
            }
        };

        let subs = self.subscribers.read().await;
        if let Some(watchers) = subs.get(event.transfer_id().as_str()) {
            for sender in watchers.values() {
                let _ = sender.send(Message::Text(payload.clone().into()));
            }
        }
    }

    /// Number of watchers currently subscribed to a transfer.
    pub async fn watcher_count(&self, transfer_id: &str) -> usize {
        self.subscribers
            .read()
            .await
            .get(transfer_id)
            .map(|w| w.len())
            .unwrap_or(0)
    }
}

impl Default for ProgressHub {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /ws/{transfer_id} - upgrade to a progress WebSocket.
///
/// Watching an unknown transfer id is allowed; the socket simply never
/// receives events. No events are replayed on connect.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(transfer_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state.progress, transfer_id))
}

/// Manage a single watcher connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), spawns a
/// sender task forwarding hub messages to the sink, answers text "ping"
/// with "pong" on the inbound loop, and cleans up on disconnect.
async fn handle_socket(socket: WebSocket, hub: Arc<ProgressHub>, transfer_id: String) {
    let (conn_id, mut rx) = hub.subscribe(&transfer_id).await;
    tracing::debug!(transfer_id = %transfer_id, conn_id = %conn_id, "Progress watcher connected");

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward hub messages to the WebSocket sink. The inbound
    // loop owns pong replies, so the sink also receives those via the hub
    // channel to keep a single writer.
    let pong_tx = {
        let subs = hub.subscribers.read().await;
        subs.get(&transfer_id)
            .and_then(|w| w.get(&conn_id))
            .cloned()
    };

    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                break;
            }
        }
    });

    // Inbound loop: the only application-level message is a text keepalive.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) if text.as_str() == "ping" => {
                if let Some(tx) = &pong_tx {
                    let _ = tx.send(Message::Text("pong".into()));
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.unsubscribe(&transfer_id, conn_id).await;
    send_task.abort();
    tracing::debug!(transfer_id = %transfer_id, conn_id = %conn_id, "Progress watcher disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use freight_core::TransferId;

    #[tokio::test]
    async fn test_publish_reaches_all_watchers() {
        let hub = ProgressHub::new();
        let id = TransferId::new();

        let (_c1, mut rx1) = hub.subscribe(id.as_str()).await;
        let (_c2, mut rx2) = hub.subscribe(id.as_str()).await;

        let event = ProgressEvent::progress(&id, 512, 1024, 1, 2);
        hub.publish(&event).await;

        for rx in [&mut rx1, &mut rx2] {
            let msg = rx.recv().await.expect("watcher should receive event");
            match msg {
                Message::Text(text) => {
                    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
                    assert_eq!(json["type"], "progress");
                    assert_eq!(json["progress"], 50);
                }
                other => panic!("unexpected message: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_publish_ignores_other_transfers() {
        let hub = ProgressHub::new();
        let watched = TransferId::new();
        let other = TransferId::new();

        let (_conn, mut rx) = hub.subscribe(watched.as_str()).await;
        hub.publish(&ProgressEvent::complete(&other)).await;

        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_last_unsubscribe_removes_entry() {
        let hub = ProgressHub::new();
        let id = TransferId::new();

        let (c1, _rx1) = hub.subscribe(id.as_str()).await;
        let (c2, _rx2) = hub.subscribe(id.as_str()).await;
        assert_eq!(hub.watcher_count(id.as_str()).await, 2);

        hub.unsubscribe(id.as_str(), c1).await;
        assert_eq!(hub.watcher_count(id.as_str()).await, 1);

        hub.unsubscribe(id.as_str(), c2).await;
        assert_eq!(hub.watcher_count(id.as_str()).await, 0);
        assert!(hub.subscribers.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_dead_subscriber_does_not_block_publish() {
        let hub = ProgressHub::new();
        let id = TransferId::new();

        let (_c1, rx1) = hub.subscribe(id.as_str()).await;
        drop(rx1);
        let (_c2, mut rx2) = hub.subscribe(id.as_str()).await;

        hub.publish(&ProgressEvent::complete(&id)).await;
        assert!(rx2.recv().await.is_some());
    }
}
