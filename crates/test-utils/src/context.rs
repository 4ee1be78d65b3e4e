//! Network contexts with made-up script deployments.

use bitcoin::Network;
use rgbpp_primitives::{
    context::NetworkContext,
    params::prelude::{
        Byte32, CellDepParam, DepType, LedgerNetwork, ProtocolParams, RgbppParams,
        ScriptDeployment, ScriptDeployments, ScriptHashType,
    },
};

/// A deployment whose code hash is `seed` repeated and whose code cell lives at `seed + 0x10`.
pub fn deployment(seed: u8) -> ScriptDeployment {
    ScriptDeployment {
        code_hash: Byte32::new([seed; 32]),
        hash_type: ScriptHashType::Type,
        cell_dep: CellDepParam {
            tx_hash: Byte32::new([seed.wrapping_add(0x10); 32]),
            index: 0,
            dep_type: DepType::Code,
        },
    }
}

/// The script deployments used by every fixture.
pub fn test_deployments() -> ScriptDeployments {
    ScriptDeployments {
        rgbpp_lock: deployment(1),
        btc_time_lock: deployment(2),
        xudt: deployment(3),
        unique: deployment(4),
        cluster: deployment(5),
        spore: deployment(6),
        secp256k1_blake160: deployment(7),
    }
}

/// A testnet context bound to signet with default protocol parameters.
pub fn test_context() -> NetworkContext {
    NetworkContext::new(RgbppParams {
        ledger_network: LedgerNetwork::Testnet,
        btc_network: Network::Signet,
        scripts: test_deployments(),
        protocol: ProtocolParams::default(),
    })
}
