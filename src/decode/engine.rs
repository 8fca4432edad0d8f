//! Decode engine
//!
//! Drives a [`MultiDecoder`] over one reply:
//! 1. Reject error replies (top level or element) as protocol errors
//! 2. For each element in ascending position: select a leaf decoder, decode
//! 3. Hand the collected parts to the assembly step exactly once
//!
//! RESP3 maps are walked as alternating key/value positions, so the same
//! decoder reads a RESP2 flat array and a RESP3 map.

use super::{DecodeState, Decoder, MultiDecoder};
use crate::error::{DecodeError, DecodeResult};
use crate::protocol::RawValue;

/// Decode one reply with a fresh [`DecodeState`]
///
/// Returns `Ok(None)` for a null reply, or for an empty one when the decoder
/// does not handle empty aggregates.
pub fn decode<M: MultiDecoder>(reply: &RawValue, decoder: &M) -> DecodeResult<Option<M::Output>> {
    let mut state = DecodeState::new();
    decode_with_state(reply, decoder, &mut state)
}

/// Decode one aggregate with a caller-owned state
///
/// Used for sub-replies, which share the state of the enclosing decode.
pub fn decode_with_state<M: MultiDecoder>(
    reply: &RawValue,
    decoder: &M,
    state: &mut DecodeState,
) -> DecodeResult<Option<M::Output>> {
    match reply {
        RawValue::Error(message) => Err(DecodeError::protocol(message.clone())),
        RawValue::Null => Ok(None),
        RawValue::Array(items) => decode_elements(items.iter(), decoder, state),
        RawValue::Map(entries) => decode_elements(
            entries.iter().flat_map(|(key, value)| [key, value]),
            decoder,
            state,
        ),
        other => Err(DecodeError::wire_shape("aggregate", other.kind())),
    }
}

/// Decode a scalar reply with a plain leaf decoder
pub fn decode_scalar<D: Decoder>(reply: &RawValue, decoder: &D) -> DecodeResult<D::Output> {
    if let RawValue::Error(message) = reply {
        return Err(DecodeError::protocol(message.clone()));
    }
    decoder.decode(reply, &mut DecodeState::new())
}

fn decode_elements<'r, M, I>(
    elements: I,
    decoder: &M,
    state: &mut DecodeState,
) -> DecodeResult<Option<M::Output>>
where
    M: MultiDecoder,
    I: Iterator<Item = &'r RawValue>,
{
    let mut parts = Vec::with_capacity(elements.size_hint().0);

    for (position, raw) in elements.enumerate() {
        if let RawValue::Error(message) = raw {
            return Err(DecodeError::protocol(message.clone()).at(position));
        }

        let leaf = decoder.decoder(position, state);
        let part = leaf.decode(raw, state).map_err(|e| e.at(position))?;
        parts.push(part);
    }

    if parts.is_empty() && !decoder.handle_empty() {
        tracing::trace!("empty reply decoded as absent");
        return Ok(None);
    }

    tracing::trace!(elements = parts.len(), "assembling reply");
    decoder.assemble(parts, state).map(Some)
}

/// Leaf decoder for an element that is itself a framed aggregate
///
/// Runs the inner multi decoder over the sub-reply with the enclosing
/// decode's state, so nested cursors stay scoped to the one top-level reply.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubReplyDecoder<M>(pub M);

impl<M: MultiDecoder> Decoder for SubReplyDecoder<M> {
    type Output = Option<M::Output>;

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> DecodeResult<Self::Output> {
        decode_with_state(raw, &self.0, state)
    }
}
