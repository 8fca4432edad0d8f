//! Protocol Module
//!
//! Wire-level types for talking to a RESP server.
//!
//! ## Layers
//! - [`RawValue`]: a tokenized reply value, the input of the decode pipeline
//! - [`Command`]: the administrative requests this client issues
//! - codec: command encoding and reply tokenizing
//!
//! The decode pipeline never looks at bytes; it only consumes `RawValue`
//! trees produced here (or by any other tokenizer).

mod command;
mod raw;
mod codec;

pub use command::{Command, InfoSection};
pub use raw::RawValue;
pub use codec::{
    encode_command, write_command,
    encode_value, decode_value, read_value,
    ReadLimits, CRLF,
};
