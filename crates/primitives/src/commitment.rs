//! The commitment engine.
//!
//! The commitment binds a ledger-side virtual transaction to the binding transaction that carries
//! it in an `OP_RETURN` output. It covers every input and the outputs up to and including the last
//! one with a type script. Typeless outputs after that (change) are left out so their capacity can
//! still be adjusted once fees are known.

use std::{fmt, str::FromStr};

use bitcoin::{
    opcodes::all::OP_RETURN,
    script::{Builder, Instruction},
    Script as BtcScript, ScriptBuf,
};
use ckb_types::prelude::*;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::{
    constants::{COMMITMENT_PREFIX, COMMITMENT_VERSION, MAX_COMMITTED_CELLS},
    errors::{PrimitiveError, PrimitiveResult},
    types::{CellInput, CellOutput, VirtualTransaction},
};

/// A 32-byte commitment to a virtual transaction.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// Wraps raw commitment bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw commitment bytes, as embedded in the binding transaction.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// The `OP_RETURN` output script carrying this commitment.
    pub fn to_script(&self) -> ScriptBuf {
        Builder::new()
            .push_opcode(OP_RETURN)
            .push_slice(self.0)
            .into_script()
    }

    /// Extracts a commitment from an `OP_RETURN` output script.
    pub fn from_script(script: &BtcScript) -> Option<Self> {
        let mut instructions = script.instructions();

        match (instructions.next(), instructions.next(), instructions.next()) {
            (
                Some(Ok(Instruction::Op(OP_RETURN))),
                Some(Ok(Instruction::PushBytes(data))),
                None,
            ) => <[u8; 32]>::try_from(data.as_bytes()).ok().map(Self),
            _ => None,
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({self})")
    }
}

impl FromStr for Commitment {
    type Err = PrimitiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 32];
        hex::decode_to_slice(s.strip_prefix("0x").unwrap_or(s), &mut out)
            .map_err(|e| PrimitiveError::MalformedArgs(format!("commitment: {e}")))?;

        Ok(Self(out))
    }
}

impl Serialize for Commitment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Commitment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(de::Error::custom)
    }
}

/// Computes the commitment over `inputs` and the committed prefix of `outputs`/`outputs_data`.
///
/// The prefix ends at the last output carrying a type script; a transaction without any typed
/// output cannot be committed to.
pub fn compute_commitment(
    inputs: &[CellInput],
    outputs: &[CellOutput],
    outputs_data: &[Vec<u8>],
) -> PrimitiveResult<Commitment> {
    if outputs.len() != outputs_data.len() {
        return Err(PrimitiveError::InvalidVirtualTx(format!(
            "{} outputs but {} data entries",
            outputs.len(),
            outputs_data.len()
        )));
    }

    let last_typed = outputs
        .iter()
        .rposition(|output| output.type_.is_some())
        .ok_or_else(|| PrimitiveError::InvalidVirtualTx("no typed output to commit".to_string()))?;
    let committed = last_typed + 1;

    if inputs.len() > MAX_COMMITTED_CELLS || committed > MAX_COMMITTED_CELLS {
        return Err(PrimitiveError::InvalidVirtualTx(format!(
            "at most {MAX_COMMITTED_CELLS} inputs and committed outputs are supported"
        )));
    }

    let mut hasher = Sha256::new();
    hasher.update(COMMITMENT_PREFIX);
    hasher.update(COMMITMENT_VERSION);
    hasher.update([inputs.len() as u8, committed as u8]);

    for input in inputs {
        hasher.update(input.to_packed().as_slice());
    }

    for (output, data) in outputs.iter().zip(outputs_data).take(committed) {
        hasher.update(output.to_packed().as_slice());
        hasher.update((data.len() as u32).to_le_bytes());
        hasher.update(data);
    }

    let first = hasher.finalize();
    let second = Sha256::digest(first);

    Ok(Commitment(second.into()))
}

impl VirtualTransaction {
    /// Computes the commitment of this transaction.
    pub fn commitment(&self) -> PrimitiveResult<Commitment> {
        compute_commitment(&self.inputs, &self.outputs, &self.outputs_data)
    }
}

/// Re-derives the commitment of `tx` and checks it equals `expected`.
pub fn verify_commitment(expected: &Commitment, tx: &VirtualTransaction) -> PrimitiveResult<()> {
    let computed = tx.commitment()?;

    if computed != *expected {
        return Err(PrimitiveError::CommitmentMismatch {
            expected: expected.to_string(),
            computed: computed.to_string(),
        });
    }

    Ok(())
}
