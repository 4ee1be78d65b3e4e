//! Weight estimates for signed binding transactions.
//!
//! The builder works on unsigned transactions, so the weight of the signatures each input will
//! carry is added on top of the weight of the transaction as built.

use bitcoin::{Script, Transaction, TxOut, Weight};

use crate::errors::{PsbtError, PsbtResult};

/// Segwit marker and flag.
pub const SEGWIT_MARKER_WEIGHT: Weight = Weight::from_wu(2);

/// Witness of a P2WPKH spend: item count, a 72-byte signature and a 33-byte key, each with its
/// length prefix.
pub const P2WPKH_WITNESS_WEIGHT: Weight = Weight::from_wu(1 + 1 + 72 + 1 + 33);

/// Witness of a P2TR key-path spend with the default sighash.
pub const P2TR_WITNESS_WEIGHT: Weight = Weight::from_wu(1 + 1 + 64);

/// A P2PKH script sig in base bytes, plus the empty witness count it carries in a segwit
/// transaction.
pub const P2PKH_SCRIPT_SIG_WEIGHT: Weight = Weight::from_wu(4 * (1 + 1 + 72 + 1 + 33) + 1);

/// The weight a signature for an input spending `script_pubkey` adds.
pub fn satisfaction_weight(script_pubkey: &Script) -> PsbtResult<Weight> {
    if script_pubkey.is_p2wpkh() {
        Ok(P2WPKH_WITNESS_WEIGHT)
    } else if script_pubkey.is_p2tr() {
        Ok(P2TR_WITNESS_WEIGHT)
    } else if script_pubkey.is_p2pkh() {
        Ok(P2PKH_SCRIPT_SIG_WEIGHT)
    } else {
        Err(PsbtError::UnsupportedScript(script_pubkey.to_hex_string()))
    }
}

/// The weight of `tx` once the inputs spending `prevouts` are signed.
pub fn signed_weight(tx: &Transaction, prevouts: &[TxOut]) -> PsbtResult<Weight> {
    prevouts
        .iter()
        .try_fold(tx.weight() + SEGWIT_MARKER_WEIGHT, |acc, prevout| {
            Ok(acc + satisfaction_weight(&prevout.script_pubkey)?)
        })
}
