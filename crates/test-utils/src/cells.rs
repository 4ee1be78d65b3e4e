//! Ledger cell fixtures.

use bitcoin::{hashes::Hash, Txid};
use rand::{rngs::OsRng, Rng};
use rgbpp_primitives::{
    params::tx::CKB_UNIT,
    types::{Byte32, LedgerCell, LiveCell, OutPoint, Script},
};
use secp256k1::SecretKey;

/// Converts whole CKB to shannons.
pub const fn ckb(amount: u64) -> u64 {
    amount * CKB_UNIT
}

/// A deterministic txid filled with `seed`.
pub fn txid(seed: u8) -> Txid {
    Txid::from_byte_array([seed; 32])
}

/// Generates a random txid.
pub fn generate_txid() -> Txid {
    let mut bytes = [0u8; 32];
    OsRng.fill(&mut bytes);

    Txid::from_byte_array(bytes)
}

/// Generates a random secret key.
pub fn generate_secret_key() -> SecretKey {
    SecretKey::new(&mut OsRng)
}

/// A deterministic ledger outpoint.
pub fn out_point(seed: u8, index: u32) -> OutPoint {
    OutPoint::new(Byte32::new([seed; 32]), index)
}

/// A live cell at `out_point`.
pub fn live_cell(
    out_point: OutPoint,
    capacity: u64,
    lock: Script,
    type_: Option<Script>,
    data: Vec<u8>,
) -> LiveCell {
    LiveCell {
        out_point,
        cell: LedgerCell {
            capacity,
            lock,
            type_,
            data,
        },
    }
}

/// A typeless cell holding `capacity` shannons under `lock`.
pub fn capacity_cell(seed: u8, capacity: u64, lock: Script) -> LiveCell {
    live_cell(out_point(seed, 0), capacity, lock, None, Vec::new())
}
