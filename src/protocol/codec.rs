//! Protocol codec
//!
//! Encoding of commands and tokenizing of replies for the RESP wire format.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! *<argc>\r\n  $<len>\r\n<name>\r\n  $<len>\r\n<arg>\r\n ...
//! ```
//!
//! ### Reply Type Bytes
//! - `+` simple string, `-` error, `:` integer, `$` bulk string, `*` array
//! - RESP3: `%` map, `_` null, `#` boolean, `,` double

use std::io::{self, BufRead, Read, Write};

use bytes::Bytes;

use super::{Command, RawValue};
use crate::config::Config;
use crate::error::{AtlasError, Result};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Limits applied while tokenizing a reply
#[derive(Debug, Clone, Copy)]
pub struct ReadLimits {
    /// Largest bulk string accepted (in bytes)
    pub max_bulk_len: usize,

    /// Deepest aggregate nesting accepted
    pub max_depth: usize,
}

impl Default for ReadLimits {
    fn default() -> Self {
        ReadLimits::from(&Config::default())
    }
}

impl From<&Config> for ReadLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_bulk_len: config.max_bulk_len,
            max_depth: config.max_depth,
        }
    }
}

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command as an array of bulk strings
pub fn encode_command(command: &Command) -> Vec<u8> {
    let args = command.args();
    let name = command.name().as_bytes();

    let payload_len: usize = args.iter().map(|a| a.len() + 16).sum();
    let mut message = Vec::with_capacity(16 + name.len() + payload_len);

    push_header(&mut message, b'*', (args.len() + 1) as i64);
    push_bulk(&mut message, name);
    for arg in &args {
        push_bulk(&mut message, arg);
    }

    message
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Value Encoding
// =============================================================================

/// Encode a raw value in wire form
///
/// Used to script replies in tests and benchmarks.
pub fn encode_value(value: &RawValue) -> Vec<u8> {
    let mut out = Vec::new();
    push_value(&mut out, value);
    out
}

fn push_value(out: &mut Vec<u8>, value: &RawValue) {
    match value {
        RawValue::Simple(s) => push_line(out, b'+', s.as_bytes()),
        RawValue::Error(s) => push_line(out, b'-', s.as_bytes()),
        RawValue::Integer(n) => push_header(out, b':', *n),
        RawValue::Bulk(data) => push_bulk(out, data),
        RawValue::Null => out.extend_from_slice(b"_\r\n"),
        RawValue::Array(items) => {
            push_header(out, b'*', items.len() as i64);
            for item in items {
                push_value(out, item);
            }
        }
        RawValue::Map(entries) => {
            push_header(out, b'%', entries.len() as i64);
            for (key, value) in entries {
                push_value(out, key);
                push_value(out, value);
            }
        }
        RawValue::Boolean(b) => push_line(out, b'#', if *b { b"t" } else { b"f" }),
        RawValue::Double(d) => push_line(out, b',', d.to_string().as_bytes()),
    }
}

fn push_header(out: &mut Vec<u8>, tag: u8, n: i64) {
    push_line(out, tag, n.to_string().as_bytes());
}

fn push_line(out: &mut Vec<u8>, tag: u8, body: &[u8]) {
    out.push(tag);
    out.extend_from_slice(body);
    out.extend_from_slice(CRLF);
}

fn push_bulk(out: &mut Vec<u8>, data: &[u8]) {
    push_header(out, b'$', data.len() as i64);
    out.extend_from_slice(data);
    out.extend_from_slice(CRLF);
}

// =============================================================================
// Reply Tokenizing
// =============================================================================

/// Decode one complete raw value from bytes
pub fn decode_value(bytes: &[u8]) -> Result<RawValue> {
    let mut reader = bytes;
    read_value(&mut reader, &ReadLimits::default())
}

/// Read one complete raw value from a stream
///
/// Blocks until the whole value tree has been received.
pub fn read_value<R: BufRead>(reader: &mut R, limits: &ReadLimits) -> Result<RawValue> {
    read_at_depth(reader, limits, 0)
}

fn read_at_depth<R: BufRead>(reader: &mut R, limits: &ReadLimits, depth: usize) -> Result<RawValue> {
    if depth > limits.max_depth {
        return Err(AtlasError::Protocol(format!(
            "Aggregate nesting deeper than {}",
            limits.max_depth
        )));
    }

    let line = read_line(reader)?;
    let (tag, body) = match line.split_first() {
        Some((tag, body)) => (*tag, body),
        None => return Err(AtlasError::Protocol("Empty reply line".to_string())),
    };

    match tag {
        b'+' => Ok(RawValue::Simple(utf8(body)?)),
        b'-' => Ok(RawValue::Error(utf8(body)?)),
        b':' => Ok(RawValue::Integer(parse_int(body)?)),
        b'$' => {
            let len = parse_int(body)?;
            if len == -1 {
                return Ok(RawValue::Null);
            }
            let len = checked_len(len, "bulk length")?;
            if len > limits.max_bulk_len {
                return Err(AtlasError::Protocol(format!(
                    "Bulk string too large: {} bytes (max {})",
                    len, limits.max_bulk_len
                )));
            }

            let mut data = vec![0u8; len + CRLF.len()];
            reader.read_exact(&mut data)?;
            if !data.ends_with(CRLF) {
                return Err(AtlasError::Protocol(
                    "Bulk string not terminated by CRLF".to_string(),
                ));
            }
            data.truncate(len);
            Ok(RawValue::Bulk(Bytes::from(data)))
        }
        b'*' => {
            let count = parse_int(body)?;
            if count == -1 {
                return Ok(RawValue::Null);
            }
            let count = checked_len(count, "array length")?;
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(read_at_depth(reader, limits, depth + 1)?);
            }
            Ok(RawValue::Array(items))
        }
        b'%' => {
            let count = checked_len(parse_int(body)?, "map length")?;
            let mut entries = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                let key = read_at_depth(reader, limits, depth + 1)?;
                let value = read_at_depth(reader, limits, depth + 1)?;
                entries.push((key, value));
            }
            Ok(RawValue::Map(entries))
        }
        b'_' => Ok(RawValue::Null),
        b'#' => match body {
            b"t" => Ok(RawValue::Boolean(true)),
            b"f" => Ok(RawValue::Boolean(false)),
            _ => Err(AtlasError::Protocol(format!(
                "Invalid boolean: {:?}",
                String::from_utf8_lossy(body)
            ))),
        },
        b',' => utf8(body)?
            .parse::<f64>()
            .map(RawValue::Double)
            .map_err(|e| AtlasError::Protocol(format!("Invalid double: {}", e))),
        _ => Err(AtlasError::Protocol(format!(
            "Unknown reply type: 0x{:02x}",
            tag
        ))),
    }
}

/// Read one CRLF-terminated line, without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    if reader.read_until(b'\n', &mut line)? == 0 {
        return Err(AtlasError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed mid-reply",
        )));
    }
    if !line.ends_with(CRLF) {
        return Err(AtlasError::Protocol(
            "Reply line not terminated by CRLF".to_string(),
        ));
    }
    line.truncate(line.len() - CRLF.len());
    Ok(line)
}

fn utf8(body: &[u8]) -> Result<String> {
    String::from_utf8(body.to_vec())
        .map_err(|_| AtlasError::Protocol("Reply line is not valid UTF-8".to_string()))
}

fn parse_int(body: &[u8]) -> Result<i64> {
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            AtlasError::Protocol(format!(
                "Invalid integer: {:?}",
                String::from_utf8_lossy(body)
            ))
        })
}

fn checked_len(n: i64, what: &str) -> Result<usize> {
    usize::try_from(n).map_err(|_| AtlasError::Protocol(format!("Invalid {}: {}", what, n)))
}
