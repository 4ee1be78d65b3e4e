//! Where the scripts RGB++ relies on are deployed on the ledger.
//!
//! Deployments differ per network (and, on testnet, per bitcoin test network the RGB++ lock is
//! bound to), so they are always loaded as data rather than compiled in.

use serde::{Deserialize, Serialize};

use crate::types::{Byte32, DepType, ScriptHashType};

/// A reference to the cell that carries a script's code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellDepParam {
    /// Hash of the transaction that created the code cell.
    pub tx_hash: Byte32,

    /// Output index of the code cell in that transaction.
    pub index: u32,

    /// Whether the cell is code or a dep group.
    #[serde(default)]
    pub dep_type: DepType,
}

/// A deployed script: how to reference it from a cell and which cell dep makes it loadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDeployment {
    /// The code hash scripts must carry.
    pub code_hash: Byte32,

    /// How the code hash is matched.
    pub hash_type: ScriptHashType,

    /// The cell dep that must accompany any transaction running this script.
    pub cell_dep: CellDepParam,
}

/// All scripts the builders reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDeployments {
    /// The seal lock that binds a cell to a bitcoin output.
    pub rgbpp_lock: ScriptDeployment,

    /// The timed-unlock lock used by cells that leaped back to the ledger.
    pub btc_time_lock: ScriptDeployment,

    /// The extensible UDT type script.
    pub xudt: ScriptDeployment,

    /// The unique type script carrying token metadata.
    pub unique: ScriptDeployment,

    /// The spore cluster (collection) type script.
    pub cluster: ScriptDeployment,

    /// The spore (item) type script.
    pub spore: ScriptDeployment,

    /// The default secp256k1/blake160 sighash-all lock, used by paymaster and change cells.
    pub secp256k1_blake160: ScriptDeployment,
}
