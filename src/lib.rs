//! # atlas-reply
//!
//! Client-side reply decoding for RESP-speaking key-value servers:
//! - Composable decoders assembled from small typed pieces
//! - Nested and flattened aggregate replies through one engine
//! - Per-reply decode state, never shared between replies
//! - Administrative node operations built on top
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Node (admin operations)                     │
//! │        info / config / memory stats / save / ping            │
//! └──────────────┬──────────────────────────────┬───────────────┘
//!                │ Command                      │ picks a decoder
//! ┌──────────────▼──────────────┐   ┌───────────▼───────────────┐
//! │     Connection (TCP)        │   │      Decode engine         │
//! │  codec: Command → bytes     │   │  RawValue + MultiDecoder   │
//! │  codec: bytes → RawValue ───┼──▶│  + DecodeState → typed     │
//! └─────────────────────────────┘   └───────────┬───────────────┘
//!                                               │
//!                          ┌────────────────────┼────────────────┐
//!                          ▼                    ▼                ▼
//!                   ┌────────────┐      ┌──────────────┐  ┌─────────────┐
//!                   │  Decoder   │      │ MultiDecoder │  │   Nested    │
//!                   │  (leaf)    │      │ (list, map)  │  │ (units)     │
//!                   └────────────┘      └──────────────┘  └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod decode;
pub mod network;
pub mod node;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AtlasError, DecodeError, DecodeResult, Result};
pub use config::Config;
pub use node::Node;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of atlas-reply
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
