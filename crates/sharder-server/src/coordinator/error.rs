//! Coordinator error types

use super::connection::ConnectionId;
use sharder_core::AddressError;
use thiserror::Error;

/// A message could not be routed. Reported back to the sender.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("message has no string 'to' field")]
    MissingTarget,
    #[error(transparent)]
    Address(#[from] AddressError),
}

/// The recipient's outbound queue is closed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("connection {0} is closed")]
    Closed(ConnectionId),
}

/// An inbound frame could not be decoded, or an event could not be encoded.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not a JSON object")]
    NotAnObject,
}
