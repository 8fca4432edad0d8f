//! Decode Module
//!
//! Turns tokenized replies ([`RawValue`](crate::protocol::RawValue) trees)
//! into typed values, assembled from small reusable pieces.
//!
//! ## Pieces
//! - [`Decoder`]: one raw value into one typed value
//! - [`MultiDecoder`]: picks a leaf decoder per element, then assembles
//! - [`NestedMultiDecoder`]: a reply read as a sequence of fixed-width units
//! - [`DecodeState`]: cursors for one top-level decode, never shared
//!
//! ## Example
//! ```
//! use std::num::NonZeroUsize;
//! use atlas_reply::decode::{self, Collect, ListDecoder, NestedMultiDecoder, StringDecoder};
//! use atlas_reply::protocol::RawValue;
//!
//! let reply = RawValue::bulk_array(["a1", "b1", "a2", "b2"]);
//! let units = NestedMultiDecoder::flat(
//!     ListDecoder::new(StringDecoder),
//!     Collect::new(),
//!     NonZeroUsize::new(2).unwrap(),
//!     true,
//! );
//!
//! let decoded = decode::decode(&reply, &units).unwrap().unwrap();
//! assert_eq!(decoded, vec![vec!["a1", "b1"], vec!["a2", "b2"]]);
//! ```

mod state;
mod decoder;
mod multi;
mod nested;
mod engine;

pub use state::{DecodeState, DecoderId, NestedDecoderState};
pub use decoder::{
    Decoder, StringDecoder, BytesDecoder, IntegerDecoder, BooleanDecoder,
    OptionalDecoder, TextDecoder, InfoDecoder,
};
pub use multi::{
    Assembler, MultiDecoder, ListDecoder, MapDecoder, PairDecoder,
    Collect, CollectMap, Field,
};
pub use nested::{NestedMultiDecoder, Selection, BoundaryReset};
pub use engine::{decode, decode_with_state, decode_scalar, SubReplyDecoder};
