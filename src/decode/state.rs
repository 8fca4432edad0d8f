//! Per-reply decode state
//!
//! Cursors for nested decoders, keyed by decoder identity.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Identity of one decoder instance
///
/// Allocated once at construction; two decoders never share an id, so their
/// cursors never collide inside a [`DecodeState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderId(u64);

impl DecoderId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        DecoderId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Cursor of one nested decoder: elements consumed in the current unit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NestedDecoderState {
    index: usize,
}

impl NestedDecoderState {
    /// Elements consumed so far in the current nested unit
    pub fn index(&self) -> usize {
        self.index
    }

    /// Consume one element of a unit `width` elements wide
    ///
    /// Returns true when this element completed the unit, in which case the
    /// index is back at zero.
    pub fn advance(&mut self, width: NonZeroUsize) -> bool {
        self.index += 1;
        if self.index >= width.get() {
            self.index = 0;
            true
        } else {
            false
        }
    }

    /// Start a new unit
    pub fn reset_decoder_index(&mut self) {
        self.index = 0;
    }
}

/// Mutable context for exactly one top-level reply decode
///
/// Created by the engine for each reply and dropped afterwards, so cursor
/// data never leaks into an unrelated decode. Not shared between threads.
#[derive(Debug, Default)]
pub struct DecodeState {
    cursors: HashMap<DecoderId, NestedDecoderState>,
}

impl DecodeState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor for `id`, created on first access
    pub fn nested(&mut self, id: DecoderId) -> &mut NestedDecoderState {
        self.cursors.entry(id).or_default()
    }

    /// Cursor for `id`, if it has been touched during this decode
    pub fn cursor(&self, id: DecoderId) -> Option<&NestedDecoderState> {
        self.cursors.get(&id)
    }

    /// Number of cursors created so far
    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }
}
