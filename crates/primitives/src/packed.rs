//! Molecule serialization of the ledger data model.
//!
//! Standard ledger structures go through [`ckb_types::packed`]. RGB++-specific tables (time-lock
//! args, unlock witnesses) have no generated builder, so [`table`] joins their already packed
//! fields with the molecule header helpers.

use ckb_hash::blake2b_256;
use ckb_types::{
    bytes::Bytes,
    molecule::{pack_number, unpack_number, Number, NUMBER_SIZE},
    packed,
    prelude::*,
};

use crate::{
    errors::{PrimitiveError, PrimitiveResult},
    types::{
        Byte32, CellDep, CellInput, CellOutput, OutPoint, Script, ScriptHashType,
        VirtualTransaction, Witness,
    },
};

impl Script {
    /// Returns the molecule form of this script.
    pub fn to_packed(&self) -> packed::Script {
        packed::Script::new_builder()
            .code_hash(self.code_hash.0.pack())
            .hash_type(packed::Byte::new(self.hash_type.as_byte()))
            .args(self.args.pack())
            .build()
    }

    /// Parses a script from its molecule form.
    pub fn from_packed(script: &packed::Script) -> PrimitiveResult<Self> {
        let code_hash = byte32_from_slice(script.code_hash().as_slice())?;
        let hash_type = hash_type_from_byte(script.hash_type().as_slice())?;

        Ok(Self {
            code_hash,
            hash_type,
            args: script.args().raw_data().to_vec(),
        })
    }

    /// The script hash as computed by the ledger.
    pub fn hash(&self) -> Byte32 {
        Byte32::new(blake2b_256(self.to_packed().as_slice()))
    }
}

impl OutPoint {
    /// Returns the molecule form of this outpoint.
    pub fn to_packed(&self) -> packed::OutPoint {
        packed::OutPoint::new_builder()
            .tx_hash(self.tx_hash.0.pack())
            .index(self.index.pack())
            .build()
    }
}

impl CellInput {
    /// Returns the molecule form of this input.
    pub fn to_packed(&self) -> packed::CellInput {
        packed::CellInput::new_builder()
            .previous_output(self.previous_output.to_packed())
            .since(self.since.pack())
            .build()
    }
}

impl CellOutput {
    /// Returns the molecule form of this output.
    pub fn to_packed(&self) -> packed::CellOutput {
        let type_ = packed::ScriptOpt::new_builder()
            .set(self.type_.as_ref().map(Script::to_packed))
            .build();

        packed::CellOutput::new_builder()
            .capacity(self.capacity.pack())
            .lock(self.lock.to_packed())
            .type_(type_)
            .build()
    }
}

impl CellDep {
    /// Returns the molecule form of this cell dep.
    pub fn to_packed(&self) -> packed::CellDep {
        packed::CellDep::new_builder()
            .out_point(self.out_point.to_packed())
            .dep_type(packed::Byte::new(self.dep_type.as_byte()))
            .build()
    }
}

impl VirtualTransaction {
    /// Returns the molecule form of the transaction without witnesses.
    pub fn to_packed_raw(&self) -> packed::RawTransaction {
        packed::RawTransaction::new_builder()
            .version(self.version.pack())
            .cell_deps(
                self.cell_deps
                    .iter()
                    .map(CellDep::to_packed)
                    .collect::<Vec<_>>()
                    .pack(),
            )
            .header_deps(
                self.header_deps
                    .iter()
                    .map(|h| h.0.pack())
                    .collect::<Vec<packed::Byte32>>()
                    .pack(),
            )
            .inputs(
                self.inputs
                    .iter()
                    .map(CellInput::to_packed)
                    .collect::<Vec<_>>()
                    .pack(),
            )
            .outputs(
                self.outputs
                    .iter()
                    .map(CellOutput::to_packed)
                    .collect::<Vec<_>>()
                    .pack(),
            )
            .outputs_data(
                self.outputs_data
                    .iter()
                    .map(|d| d.pack())
                    .collect::<Vec<packed::Bytes>>()
                    .pack(),
            )
            .build()
    }

    /// Returns the molecule form of the full transaction.
    pub fn to_packed(&self) -> packed::Transaction {
        packed::Transaction::new_builder()
            .raw(self.to_packed_raw())
            .witnesses(
                self.witnesses
                    .iter()
                    .map(|w| w.to_bytes().pack())
                    .collect::<Vec<packed::Bytes>>()
                    .pack(),
            )
            .build()
    }

    /// The transaction hash as computed by the ledger.
    ///
    /// Witnesses are not covered, so the hash is stable across witness substitution.
    pub fn tx_hash(&self) -> Byte32 {
        Byte32::new(blake2b_256(self.to_packed_raw().as_slice()))
    }

    /// The size the transaction occupies in a block, used for fee estimation.
    ///
    /// This is the molecule size plus the 4-byte offset entry of the block's transaction vector.
    pub fn serialized_size(&self) -> usize {
        self.to_packed().as_slice().len() + NUMBER_SIZE
    }
}

/// Wraps a lock witness into a molecule `WitnessArgs` with no input/output type parts.
pub fn witness_args_with_lock(lock: &[u8]) -> Vec<u8> {
    packed::WitnessArgs::new_builder()
        .lock(Some(Bytes::from(lock.to_vec())).pack())
        .build()
        .as_slice()
        .to_vec()
}

/// Encodes a placeholder `WitnessArgs` whose lock is `size` zero bytes.
pub fn witness_args_placeholder(size: usize) -> Witness {
    Witness::Bytes(witness_args_with_lock(&vec![0u8; size]))
}

/// Lays out a molecule table from already packed fields.
pub fn table(fields: &[&[u8]]) -> Vec<u8> {
    let header_len = NUMBER_SIZE * (fields.len() + 1);
    let total = header_len + fields.iter().map(|f| f.len()).sum::<usize>();

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&pack_number(total as Number));

    let mut offset = header_len;
    for field in fields {
        out.extend_from_slice(&pack_number(offset as Number));
        offset += field.len();
    }

    for field in fields {
        out.extend_from_slice(field);
    }

    out
}

/// Splits a molecule table into its raw fields, checking it has exactly `expected` of them.
pub fn parse_table(bytes: &[u8], expected: usize) -> PrimitiveResult<Vec<&[u8]>> {
    let read_number = |at: usize| -> PrimitiveResult<usize> {
        bytes
            .get(at..at + NUMBER_SIZE)
            .map(|b| unpack_number(b) as usize)
            .ok_or_else(|| PrimitiveError::MalformedArgs("truncated molecule table".to_string()))
    };

    let total = read_number(0)?;
    if total != bytes.len() {
        return Err(PrimitiveError::MalformedArgs(format!(
            "molecule table declares {total} bytes but has {}",
            bytes.len()
        )));
    }

    let first_offset = read_number(NUMBER_SIZE)?;
    if first_offset < NUMBER_SIZE
        || first_offset % NUMBER_SIZE != 0
        || first_offset / NUMBER_SIZE - 1 != expected
    {
        return Err(PrimitiveError::MalformedArgs(format!(
            "molecule table must have {expected} fields"
        )));
    }

    let mut offsets = (0..expected)
        .map(|i| read_number(NUMBER_SIZE * (i + 1)))
        .collect::<PrimitiveResult<Vec<_>>>()?;
    offsets.push(total);

    offsets
        .windows(2)
        .map(|w| {
            bytes
                .get(w[0]..w[1])
                .ok_or_else(|| PrimitiveError::MalformedArgs("bad molecule offsets".to_string()))
        })
        .collect()
}

/// Reads a molecule `Bytes` field.
pub fn unpack_bytes(field: &[u8]) -> PrimitiveResult<Vec<u8>> {
    packed::Bytes::from_slice(field)
        .map(|bytes| bytes.raw_data().to_vec())
        .map_err(|e| PrimitiveError::MalformedArgs(format!("bytes field: {e}")))
}

pub(crate) fn byte32_from_slice(slice: &[u8]) -> PrimitiveResult<Byte32> {
    <[u8; 32]>::try_from(slice)
        .map(Byte32::new)
        .map_err(|_| PrimitiveError::MalformedArgs(format!("expected 32 bytes, got {}", slice.len())))
}

fn hash_type_from_byte(slice: &[u8]) -> PrimitiveResult<ScriptHashType> {
    match slice {
        [0] => Ok(ScriptHashType::Data),
        [1] => Ok(ScriptHashType::Type),
        [2] => Ok(ScriptHashType::Data1),
        [4] => Ok(ScriptHashType::Data2),
        other => Err(PrimitiveError::MalformedArgs(format!(
            "unknown script hash type {other:?}"
        ))),
    }
}
