//! The explicit network context handed to every builder.
//!
//! It turns the raw [`RgbppParams`] deployment table into scripts and cell deps, and answers the
//! structural questions builders ask about locks ("is this a seal lock?").

use bitcoin::{Network, Txid};
use rgbpp_params::{
    deployments::{ScriptDeployment, ScriptDeployments},
    network::RgbppParams,
    protocol::ProtocolParams,
};

use crate::{
    errors::PrimitiveResult,
    seal::{encode_seal, BtcTimeLockArgs},
    types::{CellDep, OutPoint, Script},
};

/// The lock a timed-unlock cell releases to when it is never meant to be spent again.
///
/// Token-info cells are parked under it so their metadata stays live forever.
pub fn unlockable_lock_script() -> Script {
    Script::new(
        rgbpp_params::types::Byte32::ZERO,
        rgbpp_params::types::ScriptHashType::Data,
        Vec::new(),
    )
}

/// Network-specific scripts and parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkContext {
    params: RgbppParams,
}

impl NetworkContext {
    /// Creates a context from validated parameters.
    pub const fn new(params: RgbppParams) -> Self {
        Self { params }
    }

    /// The raw parameters.
    pub const fn params(&self) -> &RgbppParams {
        &self.params
    }

    /// The tunable protocol parameters.
    pub const fn protocol(&self) -> &ProtocolParams {
        &self.params.protocol
    }

    /// The script deployments.
    pub const fn scripts(&self) -> &ScriptDeployments {
        &self.params.scripts
    }

    /// The binding network.
    pub const fn btc_network(&self) -> Network {
        self.params.btc_network
    }

    /// Whether the context targets the main networks.
    pub const fn is_mainnet(&self) -> bool {
        self.params.is_mainnet()
    }

    /// Returns a copy with different protocol parameters.
    pub const fn with_protocol(mut self, protocol: ProtocolParams) -> Self {
        self.params.protocol = protocol;
        self
    }

    /// The seal lock for output `out_index` of `binding_txid`, or a pre-seal lock when the binding
    /// transaction does not exist yet.
    pub fn rgbpp_lock(&self, out_index: u32, binding_txid: Option<Txid>) -> PrimitiveResult<Script> {
        let args = encode_seal(out_index, binding_txid)?;
        Ok(script_of(&self.params.scripts.rgbpp_lock, args.to_vec()))
    }

    /// The timed-unlock lock releasing to `lock_script` after `after` confirmations of
    /// `btc_txid`.
    pub fn btc_time_lock(
        &self,
        lock_script: Script,
        after: u32,
        btc_txid: Option<Txid>,
    ) -> PrimitiveResult<Script> {
        let args = BtcTimeLockArgs {
            lock_script,
            after,
            btc_txid,
        }
        .encode()?;

        Ok(script_of(&self.params.scripts.btc_time_lock, args))
    }

    /// The xUDT type script with the given args (the issuer's lock hash).
    pub fn xudt_type(&self, args: impl Into<Vec<u8>>) -> Script {
        script_of(&self.params.scripts.xudt, args.into())
    }

    /// The unique type script with the given args.
    pub fn unique_type(&self, args: impl Into<Vec<u8>>) -> Script {
        script_of(&self.params.scripts.unique, args.into())
    }

    /// The cluster type script with the given cluster id.
    pub fn cluster_type(&self, args: impl Into<Vec<u8>>) -> Script {
        script_of(&self.params.scripts.cluster, args.into())
    }

    /// The spore type script with the given spore id.
    pub fn spore_type(&self, args: impl Into<Vec<u8>>) -> Script {
        script_of(&self.params.scripts.spore, args.into())
    }

    /// The secp256k1/blake160 lock for a public key hash.
    pub fn secp256k1_lock(&self, pubkey_hash: [u8; 20]) -> Script {
        script_of(&self.params.scripts.secp256k1_blake160, pubkey_hash.to_vec())
    }

    /// Returns true if `script` is a seal lock.
    pub fn is_rgbpp_lock(&self, script: &Script) -> bool {
        runs(&self.params.scripts.rgbpp_lock, script)
    }

    /// Returns true if `script` is a timed-unlock lock.
    pub fn is_btc_time_lock(&self, script: &Script) -> bool {
        runs(&self.params.scripts.btc_time_lock, script)
    }

    /// Returns true if `script` is an xUDT type script.
    pub fn is_xudt(&self, script: &Script) -> bool {
        runs(&self.params.scripts.xudt, script)
    }

    /// The cell dep a type script needs, if it is one of the known asset types.
    pub fn type_dep(&self, type_: &Script) -> Option<CellDep> {
        let scripts = &self.params.scripts;

        [scripts.xudt, scripts.unique, scripts.cluster, scripts.spore]
            .iter()
            .find(|deployment| runs(deployment, type_))
            .map(dep_of)
    }

    /// Cell dep of the seal lock.
    pub fn rgbpp_lock_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.rgbpp_lock)
    }

    /// Cell dep of the timed-unlock lock.
    pub fn btc_time_lock_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.btc_time_lock)
    }

    /// Cell dep of the xUDT type.
    pub fn xudt_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.xudt)
    }

    /// Cell dep of the unique type.
    pub fn unique_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.unique)
    }

    /// Cell dep of the cluster type.
    pub fn cluster_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.cluster)
    }

    /// Cell dep of the spore type.
    pub fn spore_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.spore)
    }

    /// Cell dep of the secp256k1/blake160 lock.
    pub fn secp256k1_dep(&self) -> CellDep {
        dep_of(&self.params.scripts.secp256k1_blake160)
    }
}

fn script_of(deployment: &ScriptDeployment, args: Vec<u8>) -> Script {
    Script::new(deployment.code_hash, deployment.hash_type, args)
}

fn runs(deployment: &ScriptDeployment, script: &Script) -> bool {
    script.code_hash == deployment.code_hash && script.hash_type == deployment.hash_type
}

fn dep_of(deployment: &ScriptDeployment) -> CellDep {
    CellDep {
        out_point: OutPoint::new(deployment.cell_dep.tx_hash, deployment.cell_dep.index),
        dep_type: deployment.cell_dep.dep_type,
    }
}

#[cfg(test)]
pub(crate) fn testnet_context() -> NetworkContext {
    use rgbpp_params::{
        deployments::CellDepParam,
        network::LedgerNetwork,
        types::{Byte32, DepType, ScriptHashType},
    };

    let deployment = |seed: u8| ScriptDeployment {
        code_hash: Byte32::new([seed; 32]),
        hash_type: ScriptHashType::Type,
        cell_dep: CellDepParam {
            tx_hash: Byte32::new([seed + 0x10; 32]),
            index: 0,
            dep_type: DepType::Code,
        },
    };

    NetworkContext::new(RgbppParams {
        ledger_network: LedgerNetwork::Testnet,
        btc_network: Network::Signet,
        scripts: ScriptDeployments {
            rgbpp_lock: deployment(1),
            btc_time_lock: deployment(2),
            xudt: deployment(3),
            unique: deployment(4),
            cluster: deployment(5),
            spore: deployment(6),
            secp256k1_blake160: deployment(7),
        },
        protocol: ProtocolParams::default(),
    })
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;

    use super::*;
    use crate::seal::decode_seal;

    #[test]
    fn locks_are_recognised_by_code() {
        let ctx = testnet_context();
        let seal = ctx.rgbpp_lock(1, None).unwrap();
        let time_lock = ctx
            .btc_time_lock(unlockable_lock_script(), 6, None)
            .unwrap();

        assert!(ctx.is_rgbpp_lock(&seal));
        assert!(!ctx.is_rgbpp_lock(&time_lock));
        assert!(ctx.is_btc_time_lock(&time_lock));
        assert!(decode_seal(&seal.args).unwrap().is_placeholder());
    }

    #[test]
    fn sealed_lock_carries_txid() {
        let ctx = testnet_context();
        let txid = Txid::from_byte_array([9; 32]);
        let seal = ctx.rgbpp_lock(2, Some(txid)).unwrap();

        assert_eq!(decode_seal(&seal.args).unwrap().binding_txid, Some(txid));
    }

    #[test]
    fn type_deps_follow_deployments() {
        let ctx = testnet_context();

        assert_eq!(ctx.type_dep(&ctx.xudt_type(vec![0; 32])), Some(ctx.xudt_dep()));
        assert_eq!(ctx.type_dep(&ctx.spore_type(vec![1; 32])), Some(ctx.spore_dep()));
        assert_eq!(ctx.type_dep(&ctx.secp256k1_lock([0; 20])), None);
    }
}
