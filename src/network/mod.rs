//! Network Module
//!
//! TCP client connections.
//!
//! ## Architecture
//! - One blocking connection per node
//! - Strict request/reply: one command in flight at a time
//! - Replies are read completely before any decoding starts

mod connection;

pub use connection::Connection;
