//! Worker Gateway
//!
//! Runs one worker connection through its lifecycle:
//!
//! ```text
//! Connecting ──assign──> Identified ──READY──> Active ──loop exit──> Disconnected
//!                            │
//!                            └── conflict: INVALID ID, close 1000, stop
//! ```
//!
//! `Disconnected` runs exactly once for every connection that reached
//! `Active`, whatever ended the receive loop: the slot is released and the
//! remaining workers get a `WORKER_DISCONNECT` broadcast.

use super::codec::{encode_event, PayloadCodec};
use super::connection::{Connection, Outbound, CLOSE_GOING_AWAY, CLOSE_NORMAL};
use super::error::CodecError;
use super::registry::Assignment;
use super::Coordinator;
use crate::api::AppState;
use crate::observability::{events, metrics};
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::HeaderMap,
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use sharder_core::{Event, WorkerSlot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace};

/// Request header carrying the slot a reconnecting worker held before.
/// Header names are case-insensitive, so workers may send `ID`.
pub const WORKER_ID_HEADER: &str = "id";

const REASON_INVALID_ID: &str = "Invalid worker id";
const REASON_SHUTDOWN: &str = "Server Shutdown";

/// Lifecycle state of one gateway connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Connecting,
    Identified,
    Active,
    Disconnected,
}

impl GatewayState {
    pub fn can_transition_to(self, next: GatewayState) -> bool {
        matches!(
            (self, next),
            (GatewayState::Connecting, GatewayState::Identified)
                | (GatewayState::Identified, GatewayState::Active)
                | (GatewayState::Active, GatewayState::Disconnected)
        )
    }
}

/// Why the receive loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Exit {
    PeerClosed,
    Transport(String),
    Decode(String),
    Shutdown,
}

impl Exit {
    fn reason(&self) -> &'static str {
        match self {
            Exit::PeerClosed => "peer_closed",
            Exit::Transport(_) => "transport_error",
            Exit::Decode(_) => "decode_error",
            Exit::Shutdown => "shutdown",
        }
    }
}

struct Session {
    state: GatewayState,
    connection: Connection,
}

impl Session {
    fn advance(&mut self, next: GatewayState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid gateway transition {:?} -> {:?}",
            self.state,
            next
        );
        trace!(
            connection_id = %self.connection.id(),
            from = ?self.state,
            to = ?next,
            "Gateway state transition"
        );
        self.state = next;
    }
}

/// GET / - WebSocket endpoint every worker connects to.
pub async fn gateway(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let requested = requested_slot(&headers);
    let coordinator = state.coordinator.clone();
    ws.on_upgrade(move |socket| serve(socket, requested, coordinator))
}

/// Parse the optional worker id header. Anything but a non-negative integer
/// counts as absent.
pub fn requested_slot(headers: &HeaderMap) -> Option<WorkerSlot> {
    headers
        .get(WORKER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse().ok())
}

/// Drive one upgraded worker socket to completion.
pub async fn serve(socket: WebSocket, requested: Option<WorkerSlot>, coordinator: Arc<Coordinator>) {
    // Released only after the writer has flushed or been aborted.
    let _ticket = coordinator.track_gateway();
    let (sink, mut stream) = socket.split();
    let (connection, rx) = Connection::channel(coordinator.config().outbound_buffer);
    let writer = tokio::spawn(write_loop(sink, rx));
    let close_timeout = coordinator.config().writer_close_timeout;

    let mut session = Session {
        state: GatewayState::Connecting,
        connection: connection.clone(),
    };
    metrics::record_connection_opened();

    let assignment = coordinator
        .registry()
        .assign(requested, connection.clone())
        .await;
    session.advance(GatewayState::Identified);

    let slot = match assignment {
        Assignment::Conflict { requested } => {
            metrics::record_assignment("conflict");
            events::worker_rejected(requested, &connection.id().to_string());
            send_event(coordinator.codec(), &connection, &Event::invalid_id(requested)).await;
            let _ = connection.close(CLOSE_NORMAL, REASON_INVALID_ID).await;
            drop(session);
            drop(connection);
            finish_writer(writer, close_timeout).await;
            metrics::record_connection_closed("conflict");
            return;
        }
        Assignment::Assigned { slot, reconnect } => {
            metrics::record_assignment(if reconnect { "reconnect" } else { "fresh" });
            slot
        }
    };

    let partition = coordinator.partition();
    let shards = partition.shards_for(slot);
    events::worker_identified(slot, &connection.id().to_string(), requested, shards.len());
    let ready = Event::ready(slot, partition.workers(), partition.range(), shards);
    send_event(coordinator.codec(), &connection, &ready).await;

    session.advance(GatewayState::Active);
    let exit = receive_loop(&mut stream, &connection, slot, &coordinator).await;
    session.advance(GatewayState::Disconnected);

    if exit == Exit::Shutdown {
        let _ = connection.close(CLOSE_GOING_AWAY, REASON_SHUTDOWN).await;
    }
    match &exit {
        Exit::Transport(e) | Exit::Decode(e) => {
            debug!(slot, connection_id = %connection.id(), error = %e, "Connection ended with error")
        }
        Exit::PeerClosed | Exit::Shutdown => {}
    }

    disconnect(&coordinator, &connection, slot, exit.reason()).await;

    drop(session);
    drop(connection);
    finish_writer(writer, close_timeout).await;
}

/// Release the slot and tell the remaining workers about it.
async fn disconnect(coordinator: &Coordinator, connection: &Connection, slot: WorkerSlot, reason: &str) {
    if coordinator.registry().release(slot, connection.id()).await.is_some() {
        metrics::record_worker_released();
    }
    events::worker_disconnected(slot, &connection.id().to_string(), reason);
    metrics::record_connection_closed(reason);

    let shards = coordinator.partition().shards_for(slot);
    match encode_event(coordinator.codec(), &Event::worker_disconnect(slot, shards)) {
        Ok(text) => {
            let delivery = coordinator.router().broadcast(Outbound::text(text)).await;
            trace!(slot, delivered = delivery.delivered, "Disconnect notice broadcast");
        }
        Err(e) => error!(slot, error = %e, "Failed to encode disconnect notice"),
    }
}

async fn receive_loop(
    stream: &mut SplitStream<WebSocket>,
    connection: &Connection,
    slot: WorkerSlot,
    coordinator: &Coordinator,
) -> Exit {
    let mut shutdown = coordinator.subscribe_shutdown();

    loop {
        let frame = tokio::select! {
            biased;
            _ = shutdown.wait_for(|stopping| *stopping) => return Exit::Shutdown,
            frame = stream.next() => frame,
        };

        let result = match frame {
            None | Some(Ok(Message::Close(_))) => return Exit::PeerClosed,
            Some(Err(e)) => return Exit::Transport(e.to_string()),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => continue,
            Some(Ok(Message::Text(text))) => {
                let payload = Outbound::Text(text.clone());
                handle_frame(coordinator, connection, slot, text.as_str().as_bytes(), payload).await
            }
            Some(Ok(Message::Binary(bytes))) => {
                let payload = Outbound::Binary(bytes.clone());
                handle_frame(coordinator, connection, slot, &bytes, payload).await
            }
        };

        if let Err(e) = result {
            return Exit::Decode(e.to_string());
        }
    }
}

/// Decode one inbound frame and route it. Routing errors go back to the
/// sender; only decode failures end the connection.
async fn handle_frame(
    coordinator: &Coordinator,
    connection: &Connection,
    slot: WorkerSlot,
    frame: &[u8],
    payload: Outbound,
) -> Result<(), CodecError> {
    let message = coordinator.codec().decode(frame)?;

    match coordinator.router().route_message(&message, payload).await {
        Ok(delivery) => {
            trace!(slot, delivered = delivery.delivered, dropped = delivery.dropped, "Message routed");
        }
        Err(e) => {
            let to = message.get("to").map(|to| match to {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            });
            events::address_rejected(slot, to.as_deref().unwrap_or(""), &e.to_string());
            send_event(
                coordinator.codec(),
                connection,
                &Event::invalid_address(to, e.to_string()),
            )
            .await;
        }
    }
    Ok(())
}

async fn send_event<T: Serialize>(codec: &dyn PayloadCodec, connection: &Connection, event: &T) {
    match encode_event(codec, event) {
        Ok(text) => {
            if let Err(e) = connection.send(Outbound::text(text)).await {
                debug!(error = %e, "Failed to queue event");
            }
        }
        Err(e) => error!(error = %e, "Failed to encode event"),
    }
}

async fn write_loop(mut sink: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(frame) = rx.recv().await {
        let (message, closing) = match frame {
            Outbound::Text(text) => (Message::Text(text), false),
            Outbound::Binary(bytes) => (Message::Binary(bytes), false),
            Outbound::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code,
                    reason: reason.into(),
                })),
                true,
            ),
        };
        if let Err(e) = sink.send(message).await {
            debug!(error = %e, "Socket write failed");
            break;
        }
        if closing {
            break;
        }
    }
    let _ = sink.close().await;
}

/// Give the writer `timeout` to flush, then abort it.
async fn finish_writer(mut writer: JoinHandle<()>, timeout: Duration) {
    if tokio::time::timeout(timeout, &mut writer).await.is_err() {
        debug!("Writer did not finish in time, aborting");
        writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_valid_transitions() {
        use GatewayState::*;
        assert!(Connecting.can_transition_to(Identified));
        assert!(Identified.can_transition_to(Active));
        assert!(Active.can_transition_to(Disconnected));
    }

    #[test]
    fn test_invalid_transitions() {
        use GatewayState::*;
        assert!(!Connecting.can_transition_to(Active));
        assert!(!Identified.can_transition_to(Disconnected));
        assert!(!Disconnected.can_transition_to(Connecting));
        assert!(!Active.can_transition_to(Identified));
    }

    #[test]
    fn test_requested_slot_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(requested_slot(&headers), None);

        headers.insert(WORKER_ID_HEADER, HeaderValue::from_static("2"));
        assert_eq!(requested_slot(&headers), Some(2));

        headers.insert(WORKER_ID_HEADER, HeaderValue::from_static("-1"));
        assert_eq!(requested_slot(&headers), None);

        headers.insert(WORKER_ID_HEADER, HeaderValue::from_static("two"));
        assert_eq!(requested_slot(&headers), None);
    }

    #[test]
    fn test_exit_reasons() {
        assert_eq!(Exit::PeerClosed.reason(), "peer_closed");
        assert_eq!(Exit::Transport("x".into()).reason(), "transport_error");
        assert_eq!(Exit::Decode("x".into()).reason(), "decode_error");
        assert_eq!(Exit::Shutdown.reason(), "shutdown");
    }
}
