//! Deterministic ids for collection and item cells.
//!
//! A type id is `blake2b_256(CellInput ++ u64 LE output index)` over the first input of the
//! creating transaction. An input can be consumed once, so the id is unique per funding cell and
//! output slot.

use ckb_hash::new_blake2b;
use ckb_types::prelude::*;

use crate::{
    constants::{TYPE_ID_SIZE, UNIQUE_TYPE_ARGS_SIZE},
    types::CellInput,
};

/// Computes the type id of output `output_index` of a transaction whose first input is
/// `first_input`.
pub fn type_id(first_input: &CellInput, output_index: u64) -> [u8; TYPE_ID_SIZE] {
    let mut hasher = new_blake2b();
    hasher.update(first_input.to_packed().as_slice());
    hasher.update(&output_index.to_le_bytes());

    let mut out = [0u8; TYPE_ID_SIZE];
    hasher.finalize(&mut out);
    out
}

/// The unique type args: the type id truncated to its first 20 bytes.
pub fn unique_type_args(first_input: &CellInput, output_index: u64) -> [u8; UNIQUE_TYPE_ARGS_SIZE] {
    let mut args = [0u8; UNIQUE_TYPE_ARGS_SIZE];
    args.copy_from_slice(&type_id(first_input, output_index)[..UNIQUE_TYPE_ARGS_SIZE]);
    args
}

#[cfg(test)]
mod tests {
    use ckb_hash::blake2b_256;

    use super::*;
    use crate::types::{Byte32, OutPoint};

    fn input(seed: u8, index: u32) -> CellInput {
        CellInput::new(OutPoint::new(Byte32::new([seed; 32]), index))
    }

    #[test]
    fn matches_manual_preimage() {
        let first = input(3, 1);

        let mut preimage = first.to_packed().as_slice().to_vec();
        assert_eq!(preimage.len(), 44);
        preimage.extend_from_slice(&2u64.to_le_bytes());

        assert_eq!(type_id(&first, 2), blake2b_256(&preimage));
    }

    #[test]
    fn id_depends_on_input_and_slot() {
        let a = type_id(&input(1, 0), 0);

        assert_eq!(a, type_id(&input(1, 0), 0));
        assert_ne!(a, type_id(&input(1, 0), 1));
        assert_ne!(a, type_id(&input(1, 1), 0));
        assert_ne!(a, type_id(&input(2, 0), 0));
    }

    #[test]
    fn unique_args_are_a_prefix() {
        let first = input(5, 7);

        assert_eq!(unique_type_args(&first, 1)[..], type_id(&first, 1)[..20]);
    }
}
