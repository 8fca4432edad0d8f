//! Leaf decoders
//!
//! A leaf decoder turns one raw value into one typed value.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use bytes::Bytes;

use super::DecodeState;
use crate::error::{DecodeError, DecodeResult};
use crate::protocol::RawValue;

/// Turns one raw wire value into one typed value
///
/// Implementations hold no per-reply data; anything that must survive
/// between elements lives in the [`DecodeState`].
pub trait Decoder: Send + Sync {
    type Output;

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> DecodeResult<Self::Output>;
}

/// Error for a raw value a decoder cannot accept
///
/// Error replies surface as protocol errors even if one slips past the engine.
pub(crate) fn mismatch(expected: &'static str, raw: &RawValue) -> DecodeError {
    match raw {
        RawValue::Error(message) => DecodeError::protocol(message.clone()),
        other => DecodeError::wire_shape(expected, other.kind()),
    }
}

/// UTF-8 text from a bulk or simple string; integers and doubles are rendered
#[derive(Debug, Clone, Copy, Default)]
pub struct StringDecoder;

impl Decoder for StringDecoder {
    type Output = String;

    fn decode(&self, raw: &RawValue, _state: &mut DecodeState) -> DecodeResult<String> {
        match raw {
            RawValue::Simple(s) => Ok(s.clone()),
            RawValue::Bulk(data) => String::from_utf8(data.to_vec())
                .map_err(|_| DecodeError::wire_shape("utf-8 string", "binary bulk string")),
            RawValue::Integer(n) => Ok(n.to_string()),
            RawValue::Double(d) => Ok(d.to_string()),
            other => Err(mismatch("string", other)),
        }
    }
}

/// Raw bytes of a bulk or simple string
#[derive(Debug, Clone, Copy, Default)]
pub struct BytesDecoder;

impl Decoder for BytesDecoder {
    type Output = Bytes;

    fn decode(&self, raw: &RawValue, _state: &mut DecodeState) -> DecodeResult<Bytes> {
        match raw {
            RawValue::Bulk(data) => Ok(data.clone()),
            RawValue::Simple(s) => Ok(Bytes::from(s.clone())),
            other => Err(mismatch("bulk string", other)),
        }
    }
}

/// Integer reply, or a string holding a decimal integer
#[derive(Debug, Clone, Copy, Default)]
pub struct IntegerDecoder;

impl Decoder for IntegerDecoder {
    type Output = i64;

    fn decode(&self, raw: &RawValue, _state: &mut DecodeState) -> DecodeResult<i64> {
        let text = match raw {
            RawValue::Integer(n) => return Ok(*n),
            RawValue::Simple(s) => s.as_bytes(),
            RawValue::Bulk(data) => &data[..],
            other => return Err(mismatch("integer", other)),
        };

        std::str::from_utf8(text)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or_else(|| DecodeError::wire_shape("integer", raw.kind()))
    }
}

/// RESP3 boolean, or integer 1/0
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanDecoder;

impl Decoder for BooleanDecoder {
    type Output = bool;

    fn decode(&self, raw: &RawValue, _state: &mut DecodeState) -> DecodeResult<bool> {
        match raw {
            RawValue::Boolean(b) => Ok(*b),
            RawValue::Integer(1) => Ok(true),
            RawValue::Integer(0) => Ok(false),
            other => Err(mismatch("boolean", other)),
        }
    }
}

/// Null maps to `None`, anything else goes through the inner decoder
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalDecoder<D>(pub D);

impl<D: Decoder> Decoder for OptionalDecoder<D> {
    type Output = Option<D::Output>;

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> DecodeResult<Self::Output> {
        match raw {
            RawValue::Null => Ok(None),
            other => self.0.decode(other, state).map(Some),
        }
    }
}

/// Renders any non-error value as text
///
/// Aggregates render as `[a, b]` and `{k: v}`; used where a reply mixes
/// scalars and nested values but the caller only wants strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextDecoder;

impl Decoder for TextDecoder {
    type Output = String;

    fn decode(&self, raw: &RawValue, _state: &mut DecodeState) -> DecodeResult<String> {
        let mut out = String::new();
        render(raw, &mut out)?;
        Ok(out)
    }
}

fn render(raw: &RawValue, out: &mut String) -> DecodeResult<()> {
    match raw {
        RawValue::Simple(s) => out.push_str(s),
        RawValue::Bulk(data) => out.push_str(&String::from_utf8_lossy(data)),
        RawValue::Integer(n) => {
            let _ = write!(out, "{}", n);
        }
        RawValue::Double(d) => {
            let _ = write!(out, "{}", d);
        }
        RawValue::Boolean(b) => {
            let _ = write!(out, "{}", b);
        }
        RawValue::Null => {}
        RawValue::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render(item, out).map_err(|e| e.at(i))?;
            }
            out.push(']');
        }
        RawValue::Map(entries) => {
            out.push('{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                render(key, out).map_err(|e| e.at(2 * i))?;
                out.push_str(": ");
                render(value, out).map_err(|e| e.at(2 * i + 1))?;
            }
            out.push('}');
        }
        RawValue::Error(message) => return Err(DecodeError::protocol(message.clone())),
    }
    Ok(())
}

/// Parses INFO text (`# Section` headers, `field:value` lines) into a map
#[derive(Debug, Clone, Copy, Default)]
pub struct InfoDecoder;

impl Decoder for InfoDecoder {
    type Output = BTreeMap<String, String>;

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> DecodeResult<Self::Output> {
        let text = StringDecoder.decode(raw, state)?;

        let fields = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(':'))
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();

        Ok(fields)
    }
}
