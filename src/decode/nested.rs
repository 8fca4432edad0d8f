//! Nested aggregate decoding
//!
//! A [`NestedMultiDecoder`] reads a reply as a sequence of fixed-width units.
//! `first` decodes the elements of each unit and assembles it; `second`
//! assembles the finished units into the final aggregate.
//!
//! ```text
//!   reply:   a1 b1 | a2 b2 | a3 b3        (width = 2)
//!   cursor:  0  1  | 0  1  | 0  1
//!   first:   {a1,b1} {a2,b2} {a3,b3}
//!   second:  [{a1,b1}, {a2,b2}, {a3,b3}]
//! ```
//!
//! Selection and assembly share one rule: a unit is `width` consecutive
//! elements. The cursor in [`DecodeState`] counts elements of the current
//! unit and returns to zero exactly when a unit completes.

use std::fmt;
use std::num::NonZeroUsize;

use super::{Assembler, DecodeState, Decoder, DecoderId, MultiDecoder};
use crate::error::{DecodeError, DecodeResult};

/// Which position `first` is asked to select for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    /// Index within the current unit (the cursor)
    UnitIndex,

    /// Position within the reply as handed over by the engine
    ReplyPosition,
}

/// When the cursor is forced back to the start of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryReset {
    /// Only when a unit completes
    UnitEnd,

    /// Also whenever the engine starts a reply at position 0
    FirstPosition,
}

/// Decoder for replies made of fixed-width nested units
pub struct NestedMultiDecoder<F, S> {
    id: DecoderId,
    first: F,
    second: S,
    width: NonZeroUsize,
    selection: Selection,
    boundary: BoundaryReset,
    handle_empty: bool,
}

impl<F, S> NestedMultiDecoder<F, S>
where
    F: MultiDecoder,
    S: Assembler<Part = F::Output>,
{
    /// Units of `width` elements; the cursor only resets when a unit completes
    pub fn new(first: F, second: S, width: NonZeroUsize, handle_empty: bool) -> Self {
        Self {
            id: DecoderId::next(),
            first,
            second,
            width,
            selection: Selection::UnitIndex,
            boundary: BoundaryReset::UnitEnd,
            handle_empty,
        }
    }

    /// Variant for flattened replies
    ///
    /// Position 0 always starts a new unit regardless of what the cursor
    /// accumulated before, and `first` selects by reply position.
    pub fn flat(first: F, second: S, width: NonZeroUsize, handle_empty: bool) -> Self {
        Self::new(first, second, width, handle_empty)
            .with_selection(Selection::ReplyPosition)
            .with_boundary_reset(BoundaryReset::FirstPosition)
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_boundary_reset(mut self, boundary: BoundaryReset) -> Self {
        self.boundary = boundary;
        self
    }

    /// Identity keying this decoder's cursor in a [`DecodeState`]
    pub fn id(&self) -> DecoderId {
        self.id
    }

    pub fn width(&self) -> NonZeroUsize {
        self.width
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn boundary_reset(&self) -> BoundaryReset {
        self.boundary
    }
}

impl<F, S> fmt::Debug for NestedMultiDecoder<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedMultiDecoder")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("selection", &self.selection)
            .field("boundary", &self.boundary)
            .field("handle_empty", &self.handle_empty)
            .finish_non_exhaustive()
    }
}

impl<F, S> Assembler for NestedMultiDecoder<F, S>
where
    F: MultiDecoder,
    S: Assembler<Part = F::Output>,
{
    type Part = F::Part;
    type Output = S::Output;

    fn assemble(&self, parts: Vec<F::Part>, state: &mut DecodeState) -> DecodeResult<S::Output> {
        let width = self.width.get();
        if parts.len() % width != 0 {
            return Err(DecodeError::Arity {
                group: width,
                actual: parts.len(),
            });
        }

        let mut units = Vec::with_capacity(parts.len() / width);
        let mut parts = parts.into_iter();
        loop {
            let unit: Vec<F::Part> = parts.by_ref().take(width).collect();
            if unit.is_empty() {
                break;
            }
            units.push(self.first.assemble(unit, state)?);
        }

        tracing::trace!(decoder = ?self.id, units = units.len(), "assembled nested units");
        self.second.assemble(units, state)
    }

    fn handle_empty(&self) -> bool {
        self.handle_empty
    }
}

impl<F, S> MultiDecoder for NestedMultiDecoder<F, S>
where
    F: MultiDecoder,
    S: Assembler<Part = F::Output>,
{
    fn decoder(&self, position: usize, state: &mut DecodeState) -> &dyn Decoder<Output = F::Part> {
        let cursor = state.nested(self.id);
        if position == 0 && self.boundary == BoundaryReset::FirstPosition {
            tracing::trace!(decoder = ?self.id, stale_index = cursor.index(), "new top-level unit");
            cursor.reset_decoder_index();
        }

        let unit_index = cursor.index();
        cursor.advance(self.width);

        let select_at = match self.selection {
            Selection::UnitIndex => unit_index,
            Selection::ReplyPosition => position,
        };
        self.first.decoder(select_at, state)
    }
}
