//! Worker Connection Handles
//!
//! A [`Connection`] is the sending side of one worker's outbound queue. The
//! queue is drained by a writer task owned by the gateway, so every frame
//! queued on a connection reaches the socket in the order it was queued.

use super::error::SendError;
use axum::body::Bytes;
use axum::extract::ws::Utf8Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique id of a single connection, distinct from the slot it occupies.
pub type ConnectionId = Uuid;

/// Normal closure.
pub const CLOSE_NORMAL: u16 = 1000;
/// Endpoint is going away (server shutdown).
pub const CLOSE_GOING_AWAY: u16 = 1001;

/// A frame queued for delivery to a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    Text(Utf8Bytes),
    Binary(Bytes),
    Close { code: u16, reason: &'static str },
}

impl Outbound {
    pub fn text(text: impl Into<Utf8Bytes>) -> Self {
        Outbound::Text(text.into())
    }
}

/// Handle to a live worker connection.
#[derive(Debug, Clone)]
pub struct Connection {
    id: ConnectionId,
    connected_at: DateTime<Utc>,
    tx: mpsc::Sender<Outbound>,
}

impl Connection {
    /// Create a connection and the receiving side of its outbound queue.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let connection = Self {
            id: Uuid::new_v4(),
            connected_at: Utc::now(),
            tx,
        };
        (connection, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Queue a frame, waiting for space if the worker is behind.
    pub async fn send(&self, frame: Outbound) -> Result<(), SendError> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| SendError::Closed(self.id))
    }

    /// Queue a close frame.
    pub async fn close(&self, code: u16, reason: &'static str) -> Result<(), SendError> {
        self.send(Outbound::Close { code, reason }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_arrive_in_order() {
        let (conn, mut rx) = Connection::channel(8);
        conn.send(Outbound::text("a")).await.unwrap();
        conn.send(Outbound::text("b")).await.unwrap();
        conn.close(CLOSE_NORMAL, "bye").await.unwrap();

        assert_eq!(rx.recv().await, Some(Outbound::text("a")));
        assert_eq!(rx.recv().await, Some(Outbound::text("b")));
        assert_eq!(
            rx.recv().await,
            Some(Outbound::Close {
                code: CLOSE_NORMAL,
                reason: "bye"
            })
        );
    }

    #[tokio::test]
    async fn test_send_after_writer_dropped_fails() {
        let (conn, rx) = Connection::channel(1);
        drop(rx);
        assert!(matches!(
            conn.send(Outbound::text("x")).await,
            Err(SendError::Closed(id)) if id == conn.id()
        ));
    }

    #[test]
    fn test_ids_are_unique() {
        let (a, _ra) = Connection::channel(1);
        let (b, _rb) = Connection::channel(1);
        assert_ne!(a.id(), b.id());
    }
}
