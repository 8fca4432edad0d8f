//! Aggregate decoders
//!
//! A multi decoder answers two questions for one aggregate reply:
//! which leaf decoder reads element `i` (selection), and how the collected
//! element values become one result (assembly).

use std::collections::BTreeMap;
use std::marker::PhantomData;

use super::{DecodeState, Decoder};
use crate::error::{DecodeError, DecodeResult};
use crate::protocol::RawValue;

/// Assembly step: turns collected parts into one aggregate
pub trait Assembler: Send + Sync {
    type Part;
    type Output;

    /// Build the aggregate from parts in element order
    fn assemble(&self, parts: Vec<Self::Part>, state: &mut DecodeState) -> DecodeResult<Self::Output>;

    /// Whether a reply with zero elements still yields an (empty) aggregate
    ///
    /// When false, an empty reply decodes to "absent".
    fn handle_empty(&self) -> bool {
        true
    }
}

/// Selection plus assembly for one aggregate reply
pub trait MultiDecoder: Assembler {
    /// Leaf decoder for the element at `position`
    ///
    /// Called once per element, in ascending position order. Must return the
    /// same decoder for the same position within one decode, but may move
    /// cursors in `state`.
    fn decoder(&self, position: usize, state: &mut DecodeState) -> &dyn Decoder<Output = Self::Part>;
}

// =============================================================================
// Lists
// =============================================================================

/// Every element through the same leaf decoder, collected into a Vec
#[derive(Debug, Clone, Copy)]
pub struct ListDecoder<D> {
    element: D,
    handle_empty: bool,
}

impl<D: Decoder> ListDecoder<D> {
    pub fn new(element: D) -> Self {
        Self {
            element,
            handle_empty: true,
        }
    }

    /// Decode an empty reply as absent instead of an empty Vec
    pub fn absent_when_empty(mut self) -> Self {
        self.handle_empty = false;
        self
    }
}

impl<D: Decoder> Assembler for ListDecoder<D> {
    type Part = D::Output;
    type Output = Vec<D::Output>;

    fn assemble(&self, parts: Vec<D::Output>, _state: &mut DecodeState) -> DecodeResult<Self::Output> {
        Ok(parts)
    }

    fn handle_empty(&self) -> bool {
        self.handle_empty
    }
}

impl<D: Decoder> MultiDecoder for ListDecoder<D> {
    fn decoder(&self, _position: usize, _state: &mut DecodeState) -> &dyn Decoder<Output = D::Output> {
        &self.element
    }
}

/// Collects already-assembled units into a Vec
///
/// Assembly only; used as the outer half of a nested decoder.
pub struct Collect<T> {
    _unit: PhantomData<fn() -> T>,
}

impl<T> Collect<T> {
    pub fn new() -> Self {
        Self { _unit: PhantomData }
    }
}

impl<T> Default for Collect<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Assembler for Collect<T> {
    type Part = T;
    type Output = Vec<T>;

    fn assemble(&self, parts: Vec<T>, _state: &mut DecodeState) -> DecodeResult<Vec<T>> {
        Ok(parts)
    }
}

// =============================================================================
// Key/Value Pairs
// =============================================================================

/// One element of a key/value sequence
#[derive(Debug, Clone, PartialEq)]
pub enum Field<K, V> {
    Key(K),
    Value(V),
}

/// Adapts a key decoder to produce [`Field::Key`]
struct KeyOf<D, V> {
    inner: D,
    _value: PhantomData<fn() -> V>,
}

impl<D: Decoder, V> Decoder for KeyOf<D, V> {
    type Output = Field<D::Output, V>;

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> DecodeResult<Self::Output> {
        self.inner.decode(raw, state).map(Field::Key)
    }
}

/// Adapts a value decoder to produce [`Field::Value`]
struct ValueOf<D, K> {
    inner: D,
    _key: PhantomData<fn() -> K>,
}

impl<D: Decoder, K> Decoder for ValueOf<D, K> {
    type Output = Field<K, D::Output>;

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> DecodeResult<Self::Output> {
        self.inner.decode(raw, state).map(Field::Value)
    }
}

/// Key decoder at even positions, value decoder at odd ones
struct Alternating<K: Decoder, V: Decoder> {
    key: KeyOf<K, V::Output>,
    value: ValueOf<V, K::Output>,
}

impl<K: Decoder, V: Decoder> Alternating<K, V> {
    fn new(key: K, value: V) -> Self {
        Self {
            key: KeyOf {
                inner: key,
                _value: PhantomData,
            },
            value: ValueOf {
                inner: value,
                _key: PhantomData,
            },
        }
    }

    fn select(&self, position: usize) -> &dyn Decoder<Output = Field<K::Output, V::Output>> {
        if position % 2 == 0 {
            return &self.key;
        }
        &self.value
    }
}

/// Regroup alternating fields into pairs
fn into_pairs<K, V>(parts: Vec<Field<K, V>>) -> DecodeResult<Vec<(K, V)>> {
    if parts.len() % 2 != 0 {
        return Err(DecodeError::Arity {
            group: 2,
            actual: parts.len(),
        });
    }

    let mut pairs = Vec::with_capacity(parts.len() / 2);
    let mut parts = parts.into_iter();
    while let (Some(key), Some(value)) = (parts.next(), parts.next()) {
        match (key, value) {
            (Field::Key(k), Field::Value(v)) => pairs.push((k, v)),
            _ => return Err(DecodeError::wire_shape("key then value", "misaligned pair")),
        }
    }
    Ok(pairs)
}

/// Flat `[k1, v1, k2, v2, ...]` reply (or RESP3 map) into a sorted map
pub struct MapDecoder<K: Decoder, V: Decoder> {
    fields: Alternating<K, V>,
    handle_empty: bool,
}

impl<K: Decoder, V: Decoder> MapDecoder<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            fields: Alternating::new(key, value),
            handle_empty: true,
        }
    }

    /// Decode an empty reply as absent instead of an empty map
    pub fn absent_when_empty(mut self) -> Self {
        self.handle_empty = false;
        self
    }
}

impl<K, V> Assembler for MapDecoder<K, V>
where
    K: Decoder,
    V: Decoder,
    K::Output: Ord,
{
    type Part = Field<K::Output, V::Output>;
    type Output = BTreeMap<K::Output, V::Output>;

    fn assemble(&self, parts: Vec<Self::Part>, _state: &mut DecodeState) -> DecodeResult<Self::Output> {
        Ok(into_pairs(parts)?.into_iter().collect())
    }

    fn handle_empty(&self) -> bool {
        self.handle_empty
    }
}

impl<K, V> MultiDecoder for MapDecoder<K, V>
where
    K: Decoder,
    V: Decoder,
    K::Output: Ord,
{
    fn decoder(&self, position: usize, _state: &mut DecodeState) -> &dyn Decoder<Output = Self::Part> {
        self.fields.select(position)
    }
}

/// Exactly one key/value pair, as a tuple
///
/// The usual inner half of a nested decoder over a flattened pair sequence.
pub struct PairDecoder<K: Decoder, V: Decoder> {
    fields: Alternating<K, V>,
}

impl<K: Decoder, V: Decoder> PairDecoder<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self {
            fields: Alternating::new(key, value),
        }
    }
}

impl<K: Decoder, V: Decoder> Assembler for PairDecoder<K, V> {
    type Part = Field<K::Output, V::Output>;
    type Output = (K::Output, V::Output);

    fn assemble(&self, parts: Vec<Self::Part>, _state: &mut DecodeState) -> DecodeResult<Self::Output> {
        if parts.len() != 2 {
            return Err(DecodeError::Arity {
                group: 2,
                actual: parts.len(),
            });
        }
        into_pairs(parts)?
            .pop()
            .ok_or(DecodeError::Arity { group: 2, actual: 0 })
    }
}

impl<K: Decoder, V: Decoder> MultiDecoder for PairDecoder<K, V> {
    fn decoder(&self, position: usize, _state: &mut DecodeState) -> &dyn Decoder<Output = Self::Part> {
        self.fields.select(position)
    }
}

/// Collects `(key, value)` units into a sorted map
///
/// Assembly only; later duplicates of a key win.
pub struct CollectMap<K, V> {
    _entry: PhantomData<fn() -> (K, V)>,
}

impl<K, V> CollectMap<K, V> {
    pub fn new() -> Self {
        Self {
            _entry: PhantomData,
        }
    }
}

impl<K, V> Default for CollectMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord, V> Assembler for CollectMap<K, V> {
    type Part = (K, V);
    type Output = BTreeMap<K, V>;

    fn assemble(&self, parts: Vec<(K, V)>, _state: &mut DecodeState) -> DecodeResult<Self::Output> {
        Ok(parts.into_iter().collect())
    }
}
