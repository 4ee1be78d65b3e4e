//! The top-level parameter set for one ledger/bitcoin network pairing.

use std::fmt;

use bitcoin::Network;
use serde::{Deserialize, Serialize};

use crate::{deployments::ScriptDeployments, errors::ParamsError, protocol::ProtocolParams};

/// The ledger network the transactions are built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerNetwork {
    /// The main ledger network.
    Mainnet,

    /// The public test network.
    Testnet,
}

impl LedgerNetwork {
    /// Whether `btc` can be the binding chain of this ledger network.
    pub const fn accepts(&self, btc: Network) -> bool {
        match self {
            LedgerNetwork::Mainnet => matches!(btc, Network::Bitcoin),
            LedgerNetwork::Testnet => !matches!(btc, Network::Bitcoin),
        }
    }
}

impl fmt::Display for LedgerNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerNetwork::Mainnet => f.write_str("mainnet"),
            LedgerNetwork::Testnet => f.write_str("testnet"),
        }
    }
}

/// Everything needed to build RGB++ transactions for one network pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RgbppParams {
    /// The ledger network.
    pub ledger_network: LedgerNetwork,

    /// The binding network.
    pub btc_network: Network,

    /// Script deployments on the ledger network.
    pub scripts: ScriptDeployments,

    /// Tunable parameters.
    #[serde(default)]
    pub protocol: ProtocolParams,
}

impl RgbppParams {
    /// Parses and validates parameters from a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ParamsError> {
        let params: Self = toml::from_str(s)?;
        params.validate()?;

        Ok(params)
    }

    /// Checks that the networks belong together and that the protocol parameters are sane.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if !self.ledger_network.accepts(self.btc_network) {
            return Err(ParamsError::NetworkMismatch {
                ledger: self.ledger_network.to_string(),
                btc: self.btc_network.to_string(),
            });
        }

        self.protocol.validate()
    }

    /// Whether these parameters target the main networks.
    pub const fn is_mainnet(&self) -> bool {
        matches!(self.ledger_network, LedgerNetwork::Mainnet)
    }
}
