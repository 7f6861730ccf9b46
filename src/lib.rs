//! # workspace-relay
//!
//! Realtime workspace/channel chat relay over WebSocket.
//!
//! Clients hold one persistent socket each, exchange JSON envelopes, and
//! receive live updates when messages arrive or the workspace/channel
//! directory changes. This crate is the relay core: session tracking,
//! action routing, and broadcast fan-out; storage sits behind a small
//! persistence gateway.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket)
//!     │
//!     ├── Connection lifecycle (ws/connection)
//!     ├── ActionRouter (ws/router)
//!     ├── Broadcaster (ws/broadcast)
//!     │
//!     ├── SessionRegistry (domain/)
//!     ├── DirectoryService (service/)
//!     │
//!     └── Store gateway (persistence/) — PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
