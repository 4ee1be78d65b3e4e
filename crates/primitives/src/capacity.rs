//! Cell storage cost and fee arithmetic.
//!
//! A cell must hold at least as many CKB as it occupies bytes. Fees are charged per kilobyte of
//! the serialized transaction.

use rgbpp_params::tx::CKB_UNIT;

use crate::{
    constants::{CELL_CAPACITY_SIZE, SCRIPT_FIXED_SIZE},
    errors::{PrimitiveError, PrimitiveResult},
    types::{CellOutput, LedgerCell, Script, VirtualTransaction},
};

/// Bytes occupied by a script.
pub fn script_size(script: &Script) -> usize {
    SCRIPT_FIXED_SIZE + script.args.len()
}

/// Bytes occupied by a cell with the given scripts and data length.
pub fn occupied_bytes(lock: &Script, type_: Option<&Script>, data_len: usize) -> usize {
    CELL_CAPACITY_SIZE + script_size(lock) + type_.map_or(0, script_size) + data_len
}

/// Converts occupied bytes into the minimum capacity in shannons.
pub const fn bytes_to_capacity(bytes: usize) -> u64 {
    (bytes as u64).saturating_mul(CKB_UNIT)
}

/// The minimum capacity in shannons a cell must hold.
pub fn cell_capacity(cell: &LedgerCell) -> u64 {
    bytes_to_capacity(occupied_bytes(
        &cell.lock,
        cell.type_.as_ref(),
        cell.data.len(),
    ))
}

/// The minimum capacity in shannons of an output carrying `data_len` bytes of data.
pub fn output_min_capacity(output: &CellOutput, data_len: usize) -> u64 {
    bytes_to_capacity(occupied_bytes(
        &output.lock,
        output.type_.as_ref(),
        data_len,
    ))
}

/// Fee for a transaction of `size` bytes at `fee_rate` shannons per kilobyte, rounded up.
pub const fn estimate_fee(size: usize, fee_rate: u64) -> u64 {
    (size as u64).saturating_mul(fee_rate).div_ceil(1000)
}

/// Fee for `tx` with `extra_bytes` reserved for witnesses that are not filled in yet.
pub fn estimate_tx_fee(tx: &VirtualTransaction, extra_bytes: usize, fee_rate: u64) -> u64 {
    estimate_fee(tx.serialized_size() + extra_bytes, fee_rate)
}

/// Subtracts `fee` from `capacity`, failing if the result would drop below `min_capacity`.
pub fn subtract_fee(capacity: u64, fee: u64, min_capacity: u64) -> PrimitiveResult<u64> {
    capacity
        .checked_sub(fee)
        .filter(|left| *left >= min_capacity)
        .ok_or(PrimitiveError::InsufficientCapacity {
            required: min_capacity.saturating_add(fee),
            available: capacity,
        })
}

/// Sums the capacity of a set of cells.
pub fn sum_capacity<'a>(cells: impl IntoIterator<Item = &'a LedgerCell>) -> PrimitiveResult<u64> {
    cells.into_iter().try_fold(0u64, |acc, cell| {
        acc.checked_add(cell.capacity)
            .ok_or(PrimitiveError::Overflow("sum of input capacity"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Byte32, ScriptHashType};

    fn lock(args_len: usize) -> Script {
        Script::new(Byte32::ZERO, ScriptHashType::Type, vec![0; args_len])
    }

    #[test]
    fn plain_secp_cell_costs_61_ckb() {
        let cell = LedgerCell {
            capacity: 0,
            lock: lock(20),
            type_: None,
            data: vec![],
        };

        assert_eq!(cell_capacity(&cell), 61 * CKB_UNIT);
    }

    #[test]
    fn typed_cell_includes_type_and_data() {
        let cell = LedgerCell {
            capacity: 0,
            lock: lock(36),
            type_: Some(lock(32)),
            data: vec![0; 16],
        };

        // 8 + (33 + 36) + (33 + 32) + 16
        assert_eq!(cell_capacity(&cell), 158 * CKB_UNIT);
    }

    #[test]
    fn fee_rounds_up() {
        assert_eq!(estimate_fee(1000, 1000), 1000);
        assert_eq!(estimate_fee(1001, 1000), 1001);
        assert_eq!(estimate_fee(1, 1100), 2);
        assert_eq!(estimate_fee(0, 1100), 0);
    }

    #[test]
    fn subtracting_fee_below_minimum_fails() {
        assert_eq!(subtract_fee(100, 10, 80), Ok(90));
        assert!(matches!(
            subtract_fee(100, 30, 80),
            Err(PrimitiveError::InsufficientCapacity { .. })
        ));
        assert!(subtract_fee(10, 30, 0).is_err());
    }
}
