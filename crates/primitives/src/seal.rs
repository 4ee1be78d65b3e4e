//! The lock-args codec for seal references.
//!
//! A seal lock carries `u32 LE out_index ++ 32-byte txid` in its args, the txid in bitcoin's
//! internal byte order. Before the binding transaction exists the txid bytes are all zero, which
//! is how a pre-seal placeholder is told apart from a real seal. A real txid of all zeros cannot
//! occur and is rejected on encode so the two forms never collide.
//!
//! Timed-unlock cells carry the binding txid inside a molecule table and follow the same rule.

use bitcoin::{hashes::Hash, Txid};
use ckb_types::{packed, prelude::*};

use crate::{
    constants::{RGBPP_LOCK_ARGS_SIZE, TXID_SIZE},
    errors::{PrimitiveError, PrimitiveResult},
    packed::{parse_table, table},
    types::Script,
};

/// A reference to the binding-chain output a cell is sealed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SealReference {
    /// Output index in the binding transaction.
    pub out_index: u32,

    /// The binding transaction, or `None` while it does not exist yet.
    pub binding_txid: Option<Txid>,
}

impl SealReference {
    /// A seal to an output of an existing binding transaction.
    pub const fn new(out_index: u32, binding_txid: Txid) -> Self {
        Self {
            out_index,
            binding_txid: Some(binding_txid),
        }
    }

    /// A pre-seal placeholder for output `out_index` of a binding transaction still to be built.
    pub const fn placeholder(out_index: u32) -> Self {
        Self {
            out_index,
            binding_txid: None,
        }
    }

    /// Returns true if the binding transaction is not known yet.
    pub const fn is_placeholder(&self) -> bool {
        self.binding_txid.is_none()
    }

    /// Encodes the reference into lock args.
    pub fn encode(&self) -> PrimitiveResult<[u8; RGBPP_LOCK_ARGS_SIZE]> {
        encode_seal(self.out_index, self.binding_txid)
    }

    /// The bitcoin outpoint this seal points at, if the binding transaction is known.
    pub fn outpoint(&self) -> Option<bitcoin::OutPoint> {
        self.binding_txid
            .map(|txid| bitcoin::OutPoint::new(txid, self.out_index))
    }
}

/// Encodes a seal reference into fixed-width lock args.
pub fn encode_seal(
    out_index: u32,
    binding_txid: Option<Txid>,
) -> PrimitiveResult<[u8; RGBPP_LOCK_ARGS_SIZE]> {
    let mut args = [0u8; RGBPP_LOCK_ARGS_SIZE];
    args[..4].copy_from_slice(&out_index.to_le_bytes());
    args[4..].copy_from_slice(&encode_txid(binding_txid)?);

    Ok(args)
}

/// Decodes lock args into a seal reference.
pub fn decode_seal(args: &[u8]) -> PrimitiveResult<SealReference> {
    if args.len() != RGBPP_LOCK_ARGS_SIZE {
        return Err(PrimitiveError::MalformedArgs(format!(
            "seal args must be {RGBPP_LOCK_ARGS_SIZE} bytes, got {}",
            args.len()
        )));
    }

    let (index, txid) = args.split_at(4);
    let mut index_bytes = [0u8; 4];
    index_bytes.copy_from_slice(index);

    Ok(SealReference {
        out_index: u32::from_le_bytes(index_bytes),
        binding_txid: decode_txid(txid)?,
    })
}

/// Fills in the binding txid of placeholder seal args.
///
/// Args already sealed to `real_txid` are returned unchanged. Args sealed to any other txid are
/// rejected instead of being re-encoded.
pub fn rewrite_with_real_id(args: &[u8], real_txid: Txid) -> PrimitiveResult<Vec<u8>> {
    let seal = decode_seal(args)?;
    let rewritten = rebind(seal.binding_txid, real_txid)?;

    Ok(encode_seal(seal.out_index, Some(rewritten))?.to_vec())
}

/// Args of the timed-unlock lock: the lock the cell moves to once the binding transaction has
/// enough confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BtcTimeLockArgs {
    /// The lock that may spend the cell after the delay.
    pub lock_script: Script,

    /// Number of binding-chain confirmations required.
    pub after: u32,

    /// The binding transaction, or `None` while it does not exist yet.
    pub btc_txid: Option<Txid>,
}

impl BtcTimeLockArgs {
    /// Serializes the args as the molecule table the time-lock script expects.
    pub fn encode(&self) -> PrimitiveResult<Vec<u8>> {
        let after: packed::Uint32 = self.after.pack();
        let txid: packed::Byte32 = encode_txid(self.btc_txid)?.pack();

        Ok(table(&[
            self.lock_script.to_packed().as_slice(),
            after.as_slice(),
            txid.as_slice(),
        ]))
    }

    /// Parses time-lock args.
    pub fn decode(args: &[u8]) -> PrimitiveResult<Self> {
        let fields = parse_table(args, 3)?;

        let lock_script = packed::Script::from_slice(fields[0])
            .map_err(|e| PrimitiveError::MalformedArgs(format!("time lock script: {e}")))?;
        let after: u32 = packed::Uint32::from_slice(fields[1])
            .map_err(|e| PrimitiveError::MalformedArgs(format!("time lock `after` field: {e}")))?
            .unpack();

        Ok(Self {
            lock_script: Script::from_packed(&lock_script)?,
            after,
            btc_txid: decode_txid(fields[2])?,
        })
    }
}

/// Fills in the binding txid of placeholder time-lock args, with the same rules as
/// [`rewrite_with_real_id`].
pub fn rewrite_time_lock_with_real_id(args: &[u8], real_txid: Txid) -> PrimitiveResult<Vec<u8>> {
    let mut decoded = BtcTimeLockArgs::decode(args)?;
    decoded.btc_txid = Some(rebind(decoded.btc_txid, real_txid)?);

    decoded.encode()
}

fn rebind(current: Option<Txid>, real_txid: Txid) -> PrimitiveResult<Txid> {
    match current {
        None => Ok(real_txid),
        Some(txid) if txid == real_txid => Ok(txid),
        Some(txid) => Err(PrimitiveError::MalformedArgs(format!(
            "args are already sealed to {txid}, refusing to rebind to {real_txid}"
        ))),
    }
}

fn encode_txid(txid: Option<Txid>) -> PrimitiveResult<[u8; TXID_SIZE]> {
    match txid {
        None => Ok([0u8; TXID_SIZE]),
        Some(txid) if txid == Txid::all_zeros() => Err(PrimitiveError::MalformedArgs(
            "the all-zero txid is reserved for placeholders".to_string(),
        )),
        Some(txid) => Ok(txid.to_byte_array()),
    }
}

fn decode_txid(bytes: &[u8]) -> PrimitiveResult<Option<Txid>> {
    let bytes = <[u8; TXID_SIZE]>::try_from(bytes).map_err(|_| {
        PrimitiveError::MalformedArgs(format!("txid must be {TXID_SIZE} bytes"))
    })?;

    if bytes == [0u8; TXID_SIZE] {
        return Ok(None);
    }

    Ok(Some(Txid::from_byte_array(bytes)))
}
