//! Tests for NestedMultiDecoder
//!
//! These tests verify:
//! - Flattened sequences regroup into units in original order
//! - Selection and assembly agree on unit boundaries for every width
//! - Lengths that are not a multiple of the width fail with an arity error
//! - The flat variant restarts its cursor at position 0
//! - Nested decoders compose with each other and with sub-replies

use std::collections::BTreeMap;
use std::num::NonZeroUsize;

use proptest::prelude::*;

use atlas_reply::decode::{
    self, Assembler, BoundaryReset, Collect, CollectMap, DecodeState, Decoder, IntegerDecoder,
    ListDecoder, MultiDecoder, NestedMultiDecoder, PairDecoder, Selection, StringDecoder,
    SubReplyDecoder,
};
use atlas_reply::protocol::RawValue;
use atlas_reply::DecodeError;

// =============================================================================
// Helper Functions
// =============================================================================

fn width(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap()
}

type StringUnits = NestedMultiDecoder<ListDecoder<StringDecoder>, Collect<Vec<String>>>;

fn flat_units(w: usize) -> StringUnits {
    NestedMultiDecoder::flat(ListDecoder::new(StringDecoder), Collect::new(), width(w), true)
}

fn base_units(w: usize) -> StringUnits {
    NestedMultiDecoder::new(ListDecoder::new(StringDecoder), Collect::new(), width(w), true)
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Leaf that tags its output with the unit slot it was selected for
struct Slot(usize);

impl Decoder for Slot {
    type Output = (usize, String);

    fn decode(&self, raw: &RawValue, state: &mut DecodeState) -> Result<Self::Output, DecodeError> {
        Ok((self.0, StringDecoder.decode(raw, state)?))
    }
}

/// Unit decoder that checks each unit arrives with slots 0..width in order
struct SlotChecked {
    slots: Vec<Slot>,
}

impl SlotChecked {
    fn new(width: usize) -> Self {
        Self {
            slots: (0..width).map(Slot).collect(),
        }
    }
}

impl Assembler for SlotChecked {
    type Part = (usize, String);
    type Output = Vec<String>;

    fn assemble(&self, parts: Vec<Self::Part>, _state: &mut DecodeState) -> Result<Vec<String>, DecodeError> {
        let mut unit = Vec::with_capacity(parts.len());
        for (expected, (slot, value)) in parts.into_iter().enumerate() {
            if slot != expected {
                return Err(DecodeError::wire_shape("aligned unit", "misaligned unit"));
            }
            unit.push(value);
        }
        Ok(unit)
    }
}

impl MultiDecoder for SlotChecked {
    fn decoder(&self, position: usize, _state: &mut DecodeState) -> &dyn Decoder<Output = (usize, String)> {
        &self.slots[position % self.slots.len()]
    }
}

// =============================================================================
// Regrouping
// =============================================================================

#[test]
fn test_flat_sequence_regroups_into_units() {
    let reply = RawValue::bulk_array(["a1", "b1", "a2", "b2", "a3", "b3"]);

    let decoded = decode::decode(&reply, &flat_units(2)).unwrap().unwrap();

    assert_eq!(
        decoded,
        vec![
            strings(&["a1", "b1"]),
            strings(&["a2", "b2"]),
            strings(&["a3", "b3"]),
        ]
    );
}

#[test]
fn test_base_and_flat_agree_on_fresh_state() {
    let reply = RawValue::bulk_array(["a", "b", "c", "d", "e", "f"]);

    for w in [1, 2, 3, 6] {
        assert_eq!(
            decode::decode(&reply, &base_units(w)).unwrap(),
            decode::decode(&reply, &flat_units(w)).unwrap()
        );
    }
}

#[test]
fn test_typed_pairs_into_map() {
    let reply = RawValue::Array(vec![
        RawValue::bulk("keys"),
        RawValue::Integer(10),
        RawValue::bulk("expires"),
        RawValue::Integer(2),
    ]);
    let decoder = NestedMultiDecoder::new(
        PairDecoder::new(StringDecoder, IntegerDecoder),
        CollectMap::new(),
        width(2),
        true,
    );

    let decoded = decode::decode(&reply, &decoder).unwrap().unwrap();

    let expected: BTreeMap<String, i64> =
        [("keys".to_string(), 10), ("expires".to_string(), 2)].into();
    assert_eq!(decoded, expected);
}

#[test]
fn test_typed_pairs_keep_order() {
    let reply = RawValue::Array(vec![
        RawValue::bulk("z"),
        RawValue::Integer(1),
        RawValue::bulk("a"),
        RawValue::Integer(2),
    ]);
    let decoder = NestedMultiDecoder::flat(
        PairDecoder::new(StringDecoder, IntegerDecoder),
        Collect::new(),
        width(2),
        true,
    );

    let decoded = decode::decode(&reply, &decoder).unwrap().unwrap();

    assert_eq!(decoded, vec![("z".to_string(), 1), ("a".to_string(), 2)]);
}

#[test]
fn test_resp3_map_through_nested_pairs() {
    let reply = RawValue::Map(vec![
        (RawValue::bulk("peak.allocated"), RawValue::Integer(1024)),
        (RawValue::bulk("keys.count"), RawValue::Integer(3)),
    ]);
    let decoder = NestedMultiDecoder::new(
        PairDecoder::new(StringDecoder, IntegerDecoder),
        CollectMap::new(),
        width(2),
        true,
    );

    let decoded = decode::decode(&reply, &decoder).unwrap().unwrap();

    assert_eq!(decoded.get("peak.allocated"), Some(&1024));
    assert_eq!(decoded.get("keys.count"), Some(&3));
}

// =============================================================================
// Arity and Empty Replies
// =============================================================================

#[test]
fn test_partial_unit_is_arity_error() {
    let reply = RawValue::bulk_array(["a1", "b1", "a2", "b2", "a3"]);

    let err = decode::decode(&reply, &flat_units(2)).unwrap_err();

    assert_eq!(err, DecodeError::Arity { group: 2, actual: 5 });
}

#[test]
fn test_partial_unit_wider_group() {
    let reply = RawValue::bulk_array(["1", "2", "3", "4", "5", "6", "7"]);

    let err = decode::decode(&reply, &base_units(3)).unwrap_err();

    assert_eq!(err, DecodeError::Arity { group: 3, actual: 7 });
}

#[test]
fn test_empty_with_handle_empty_gives_empty_aggregate() {
    let reply = RawValue::Array(vec![]);

    let decoded = decode::decode(&reply, &flat_units(2)).unwrap();

    assert_eq!(decoded, Some(vec![]));
}

#[test]
fn test_empty_without_handle_empty_is_absent() {
    let reply = RawValue::Array(vec![]);
    let decoder =
        NestedMultiDecoder::flat(ListDecoder::new(StringDecoder), Collect::<Vec<String>>::new(), width(2), false);

    assert_eq!(decode::decode(&reply, &decoder).unwrap(), None);
}

// =============================================================================
// Cursor Discipline
// =============================================================================

#[test]
fn test_flat_variant_resets_at_position_zero() {
    let flat = flat_units(2);
    let base = base_units(2);
    let mut state = DecodeState::new();

    // Three elements leave both cursors mid-unit
    for position in 0..3 {
        flat.decoder(position, &mut state);
        base.decoder(position, &mut state);
    }
    assert_eq!(state.cursor(flat.id()).map(|c| c.index()), Some(1));
    assert_eq!(state.cursor(base.id()).map(|c| c.index()), Some(1));

    // A new top-level unit: only the flat variant starts over
    flat.decoder(0, &mut state);
    base.decoder(0, &mut state);
    assert_eq!(state.cursor(flat.id()).map(|c| c.index()), Some(1));
    assert_eq!(state.cursor(base.id()).map(|c| c.index()), Some(0));
}

#[test]
fn test_flat_reset_is_idempotent_across_units() {
    let flat = NestedMultiDecoder::flat(SlotChecked::new(3), Collect::new(), width(3), true);
    let mut state = DecodeState::new();

    // Leave the cursor two elements into a unit
    flat.decoder(0, &mut state);
    flat.decoder(1, &mut state);

    let reply = RawValue::bulk_array(["a", "b", "c", "d", "e", "f"]);
    let first = decode::decode_with_state(&reply, &flat, &mut state).unwrap();
    let second = decode::decode_with_state(&reply, &flat, &mut state).unwrap();

    assert_eq!(first, second);
    assert_eq!(first, Some(vec![strings(&["a", "b", "c"]), strings(&["d", "e", "f"])]));
}

#[test]
fn test_base_variant_misaligns_on_stale_cursor() {
    let base = NestedMultiDecoder::new(SlotChecked::new(3), Collect::new(), width(3), true);
    let mut state = DecodeState::new();

    base.decoder(0, &mut state);

    let reply = RawValue::bulk_array(["a", "b", "c"]);
    let err = decode::decode_with_state(&reply, &base, &mut state).unwrap_err();

    assert!(matches!(err, DecodeError::WireShape { .. }));
}

#[test]
fn test_boundary_policy_can_be_set_explicitly() {
    let decoder = base_units(2).with_boundary_reset(BoundaryReset::FirstPosition);

    assert_eq!(decoder.boundary_reset(), BoundaryReset::FirstPosition);
    assert_eq!(decoder.selection(), Selection::UnitIndex);
    assert_eq!(flat_units(2).selection(), Selection::ReplyPosition);
}

#[test]
fn test_cursor_is_scoped_to_one_decode() {
    let decoder = base_units(2);

    // A failed decode leaves its cursor mid-unit in its own state only
    assert!(decode::decode(&RawValue::bulk_array(["x"]), &decoder).is_err());

    let decoded = decode::decode(&RawValue::bulk_array(["a", "b"]), &decoder).unwrap();
    assert_eq!(decoded, Some(vec![strings(&["a", "b"])]));
}

// =============================================================================
// Composition
// =============================================================================

#[test]
fn test_nested_inside_nested() {
    let inner = base_units(2);
    let outer = NestedMultiDecoder::new(inner, Collect::new(), width(4), true);
    let reply = RawValue::bulk_array(["a", "b", "c", "d", "e", "f", "g", "h"]);

    let decoded = decode::decode(&reply, &outer).unwrap().unwrap();

    assert_eq!(
        decoded,
        vec![
            vec![strings(&["a", "b"]), strings(&["c", "d"])],
            vec![strings(&["e", "f"]), strings(&["g", "h"])],
        ]
    );
}

#[test]
fn test_flat_nested_per_sub_reply() {
    let reply = RawValue::Array(vec![
        RawValue::bulk_array(["a1", "b1", "a2", "b2"]),
        RawValue::bulk_array(["c1", "d1"]),
    ]);
    let decoder = ListDecoder::new(SubReplyDecoder(flat_units(2)));

    let decoded = decode::decode(&reply, &decoder).unwrap().unwrap();

    assert_eq!(
        decoded,
        vec![
            Some(vec![strings(&["a1", "b1"]), strings(&["a2", "b2"])]),
            Some(vec![strings(&["c1", "d1"])]),
        ]
    );
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_selection_and_assembly_agree(w in 1usize..=4, units in 0usize..6) {
        let values: Vec<String> = (0..w * units).map(|i| format!("v{}", i)).collect();
        let reply = RawValue::bulk_array(values.clone());
        let expected: Vec<Vec<String>> = values.chunks(w).map(|c| c.to_vec()).collect();

        let base = NestedMultiDecoder::new(SlotChecked::new(w), Collect::new(), width(w), true);
        let flat = NestedMultiDecoder::flat(SlotChecked::new(w), Collect::new(), width(w), true);

        prop_assert_eq!(decode::decode(&reply, &base).unwrap(), Some(expected.clone()));
        prop_assert_eq!(decode::decode(&reply, &flat).unwrap(), Some(expected));
    }

    #[test]
    fn prop_non_multiple_length_is_arity_error(w in 2usize..=4, units in 0usize..6, extra in 1usize..4) {
        prop_assume!(extra % w != 0);
        let len = w * units + extra;
        let values: Vec<String> = (0..len).map(|i| i.to_string()).collect();
        let reply = RawValue::bulk_array(values);

        let err = decode::decode(&reply, &base_units(w)).unwrap_err();

        prop_assert_eq!(err, DecodeError::Arity { group: w, actual: len });
    }
}
