//! The ledger data model: scripts, cells, outpoints and the virtual transaction.
//!
//! These mirror the ledger's own structures closely enough to be serialized with molecule (see
//! [`crate::packed`]) and with the ledger's JSON conventions (see [`crate::serde_utils`]).

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub use rgbpp_params::types::{Byte32, DepType, ScriptHashType};

use crate::serde_utils::{hex_bytes, hex_u32, hex_u64};

/// A ledger script: the code to run and the arguments to run it with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Script {
    /// Hash identifying the code.
    pub code_hash: Byte32,

    /// How [`Self::code_hash`] is matched.
    pub hash_type: ScriptHashType,

    /// Arguments passed to the script.
    #[serde(with = "hex_bytes")]
    pub args: Vec<u8>,
}

impl Script {
    /// Creates a new script.
    pub fn new(code_hash: Byte32, hash_type: ScriptHashType, args: impl Into<Vec<u8>>) -> Self {
        Self {
            code_hash,
            hash_type,
            args: args.into(),
        }
    }

    /// Returns true if `other` runs the same code, regardless of args.
    pub fn same_code(&self, other: &Script) -> bool {
        self.code_hash == other.code_hash && self.hash_type == other.hash_type
    }

    /// Returns a copy of this script with different args.
    pub fn with_args(&self, args: impl Into<Vec<u8>>) -> Self {
        Self {
            code_hash: self.code_hash,
            hash_type: self.hash_type,
            args: args.into(),
        }
    }
}

/// Points at an output of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction hash.
    pub tx_hash: Byte32,

    /// The output index.
    #[serde(with = "hex_u32")]
    pub index: u32,
}

impl OutPoint {
    /// Creates a new outpoint.
    pub const fn new(tx_hash: Byte32, index: u32) -> Self {
        Self { tx_hash, index }
    }
}

/// An input of a ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellInput {
    /// The cell being consumed.
    pub previous_output: OutPoint,

    /// Relative or absolute lock on when the input may be consumed.
    #[serde(with = "hex_u64")]
    pub since: u64,
}

impl CellInput {
    /// Creates an input with no `since` restriction.
    pub const fn new(previous_output: OutPoint) -> Self {
        Self {
            previous_output,
            since: 0,
        }
    }
}

/// The fixed part of a ledger cell, without its data.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellOutput {
    /// The capacity in shannons held by the cell.
    #[serde(with = "hex_u64")]
    pub capacity: u64,

    /// The script guarding consumption.
    pub lock: Script,

    /// The optional script guarding creation and consumption of typed state.
    #[serde(rename = "type")]
    pub type_: Option<Script>,
}

/// A ledger cell: capacity, scripts and data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerCell {
    /// The capacity in shannons held by the cell.
    pub capacity: u64,

    /// The script guarding consumption.
    pub lock: Script,

    /// The optional type script.
    pub type_: Option<Script>,

    /// The cell data.
    pub data: Vec<u8>,
}

impl LedgerCell {
    /// Returns the fixed part of the cell.
    pub fn output(&self) -> CellOutput {
        CellOutput {
            capacity: self.capacity,
            lock: self.lock.clone(),
            type_: self.type_.clone(),
        }
    }

    /// Rebuilds a cell from its fixed part and data.
    pub fn from_output(output: CellOutput, data: Vec<u8>) -> Self {
        Self {
            capacity: output.capacity,
            lock: output.lock,
            type_: output.type_,
            data,
        }
    }

    /// Returns true if the cell carries no type script.
    pub const fn is_typeless(&self) -> bool {
        self.type_.is_none()
    }
}

/// A cell that is currently unspent, together with where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LiveCell {
    /// Where the cell was created.
    pub out_point: OutPoint,

    /// The cell itself.
    pub cell: LedgerCell,
}

impl LiveCell {
    /// Returns an input consuming this cell.
    pub const fn as_input(&self) -> CellInput {
        CellInput::new(self.out_point)
    }
}

/// A cell whose code or data must be loadable by the scripts of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellDep {
    /// The dep cell.
    pub out_point: OutPoint,

    /// How the dep is resolved.
    pub dep_type: DepType,
}

/// A witness slot of a virtual transaction.
///
/// Seal-consuming inputs keep a [`Witness::Placeholder`] until the binding transaction and its
/// proof are known.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Witness {
    /// No witness data.
    #[default]
    Empty,

    /// Stand-in for the seal unlock witness.
    Placeholder,

    /// Concrete witness bytes.
    Bytes(Vec<u8>),
}

/// The byte the placeholder witness serializes to.
pub const WITNESS_PLACEHOLDER_BYTE: u8 = 0xff;

impl Witness {
    /// Returns the bytes this slot serializes to.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Witness::Empty => Vec::new(),
            Witness::Placeholder => vec![WITNESS_PLACEHOLDER_BYTE],
            Witness::Bytes(bytes) => bytes.clone(),
        }
    }

    /// Returns true if this slot is the seal placeholder.
    pub const fn is_placeholder(&self) -> bool {
        matches!(self, Witness::Placeholder)
    }
}

impl Serialize for Witness {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        hex_bytes::serialize(&self.to_bytes(), serializer)
    }
}

impl<'de> Deserialize<'de> for Witness {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex_bytes::decode(&s).map_err(de::Error::custom)?;

        Ok(match bytes.as_slice() {
            [] => Witness::Empty,
            [WITNESS_PLACEHOLDER_BYTE] => Witness::Placeholder,
            _ => Witness::Bytes(bytes),
        })
    }
}

/// An unsigned ledger transaction whose seal outputs may still point at a binding transaction
/// that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VirtualTransaction {
    /// Transaction version.
    #[serde(with = "hex_u32")]
    pub version: u32,

    /// Cells whose code the scripts need.
    pub cell_deps: Vec<CellDep>,

    /// Block headers the scripts may read.
    pub header_deps: Vec<Byte32>,

    /// Consumed cells.
    pub inputs: Vec<CellInput>,

    /// Created cells.
    pub outputs: Vec<CellOutput>,

    /// Data of the created cells, parallel to [`Self::outputs`].
    #[serde(with = "hex_vec")]
    pub outputs_data: Vec<Vec<u8>>,

    /// Witness slots.
    pub witnesses: Vec<Witness>,
}

impl VirtualTransaction {
    /// Returns the output at `index` together with its data.
    pub fn cell(&self, index: usize) -> Option<LedgerCell> {
        let output = self.outputs.get(index)?.clone();
        let data = self.outputs_data.get(index)?.clone();

        Some(LedgerCell::from_output(output, data))
    }

    /// Appends a cell as a new output.
    pub fn push_cell(&mut self, cell: LedgerCell) {
        self.outputs.push(cell.output());
        self.outputs_data.push(cell.data);
    }

    /// Adds a cell dep unless it is already present.
    pub fn add_cell_dep(&mut self, dep: CellDep) {
        if !self.cell_deps.contains(&dep) {
            self.cell_deps.push(dep);
        }
    }

    /// Sum of the capacity of all outputs.
    pub fn outputs_capacity(&self) -> Option<u64> {
        self.outputs
            .iter()
            .try_fold(0u64, |acc, output| acc.checked_add(output.capacity))
    }

    /// Index of the last output that carries a type script.
    pub fn last_typed_output_index(&self) -> Option<usize> {
        self.outputs.iter().rposition(|output| output.type_.is_some())
    }

    /// Indices of the witness slots that still hold the seal placeholder.
    pub fn placeholder_slots(&self) -> Vec<usize> {
        self.witnesses
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.is_placeholder().then_some(i))
            .collect()
    }
}

mod hex_vec {
    use serde::{de, ser::SerializeSeq, Deserialize, Deserializer, Serializer};

    use crate::serde_utils::hex_bytes;

    pub(super) fn serialize<S: Serializer>(
        items: &[Vec<u8>],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
            seq.serialize_element(&format!("0x{}", hex::encode(item)))?;
        }
        seq.end()
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|s| hex_bytes::decode(s).map_err(de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> VirtualTransaction {
        let lock = Script::new(Byte32::new([1; 32]), ScriptHashType::Type, vec![7; 36]);
        let type_ = Script::new(Byte32::new([2; 32]), ScriptHashType::Data1, vec![9; 32]);

        VirtualTransaction {
            inputs: vec![CellInput::new(OutPoint::new(Byte32::new([3; 32]), 2))],
            outputs: vec![
                CellOutput {
                    capacity: 100,
                    lock: lock.clone(),
                    type_: Some(type_),
                },
                CellOutput {
                    capacity: 50,
                    lock,
                    type_: None,
                },
            ],
            outputs_data: vec![vec![1, 2, 3], vec![]],
            witnesses: vec![Witness::Placeholder, Witness::Empty],
            ..Default::default()
        }
    }

    #[test]
    fn last_typed_output_skips_trailing_change() {
        assert_eq!(sample_tx().last_typed_output_index(), Some(0));
        assert_eq!(VirtualTransaction::default().last_typed_output_index(), None);
    }

    #[test]
    fn json_uses_ledger_conventions() {
        let tx = sample_tx();
        let json = serde_json::to_value(&tx).unwrap();

        assert_eq!(json["version"], "0x0");
        assert_eq!(json["inputs"][0]["previous_output"]["index"], "0x2");
        assert_eq!(json["outputs"][0]["capacity"], "0x64");
        assert!(json["outputs"][1]["type"].is_null());
        assert_eq!(json["outputs_data"][0], "0x010203");
        assert_eq!(json["witnesses"][0], "0xff");
        assert_eq!(json["witnesses"][1], "0x");

        let back: VirtualTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(back, tx);
    }

    #[test]
    fn placeholder_slots_are_reported() {
        assert_eq!(sample_tx().placeholder_slots(), vec![0]);
        assert_eq!(sample_tx().outputs_capacity(), Some(150));
    }
}
