//! WebSocket layer: connection lifecycle, action routing, broadcast.
//!
//! The WebSocket endpoint at `/ws` carries the entire client protocol:
//! one JSON envelope per text frame, inbound commands dispatched by the
//! router, outbound responses and broadcasts fanned out through each
//! session's bounded queue.

pub mod broadcast;
pub mod connection;
pub mod handler;
pub mod messages;
pub mod router;
