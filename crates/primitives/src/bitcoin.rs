//! Binding-chain primitives.

use bitcoin::{address::NetworkUnchecked, Address, Network, ScriptBuf};
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::errors::{PrimitiveError, PrimitiveResult};

/// A [`bitcoin::Address`] checked against, and serialized together with, its network.
///
/// Receivers and paymasters are configured as strings; wrapping them here means a mainnet address
/// can never sneak into a signet binding transaction.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BitcoinAddress {
    /// The network this address is valid in.
    network: Network,

    /// The wrapped address.
    address: Address,
}

impl BitcoinAddress {
    /// Parses an address and checks it belongs to `network`.
    pub fn parse(address_str: &str, network: Network) -> PrimitiveResult<Self> {
        let address = address_str
            .parse::<Address<NetworkUnchecked>>()
            .map_err(|e| PrimitiveError::InvalidAddress(format!("{address_str}: {e}")))?
            .require_network(network)
            .map_err(|e| PrimitiveError::InvalidAddress(format!("{address_str}: {e}")))?;

        Ok(Self { network, address })
    }

    /// Wraps an already checked address.
    pub fn from_address(address: Address, network: Network) -> PrimitiveResult<Self> {
        if !address.as_unchecked().is_valid_for_network(network) {
            return Err(PrimitiveError::InvalidAddress(format!(
                "{address} is not valid on {network}"
            )));
        }

        Ok(Self { network, address })
    }

    /// Returns the address.
    pub const fn address(&self) -> &Address {
        &self.address
    }

    /// Returns the network.
    pub const fn network(&self) -> Network {
        self.network
    }

    /// The output script paying to this address.
    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }
}

impl std::fmt::Display for BitcoinAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.address.fmt(f)
    }
}

impl<'de> Deserialize<'de> for BitcoinAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Shim {
            network: Network,
            address: String,
        }

        let shim = Shim::deserialize(deserializer)?;

        BitcoinAddress::parse(&shim.address, shim.network).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNET_P2WPKH: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";
    const MAINNET_P2WPKH: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    #[test]
    fn parse_checks_network() {
        let addr = BitcoinAddress::parse(SIGNET_P2WPKH, Network::Signet).unwrap();
        assert_eq!(addr.network(), Network::Signet);
        assert!(addr.script_pubkey().is_p2wpkh());

        assert!(matches!(
            BitcoinAddress::parse(MAINNET_P2WPKH, Network::Signet),
            Err(PrimitiveError::InvalidAddress(_))
        ));
        assert!(BitcoinAddress::parse("not-an-address", Network::Bitcoin).is_err());
    }

    #[test]
    fn serde_keeps_network() {
        let addr = BitcoinAddress::parse(MAINNET_P2WPKH, Network::Bitcoin).unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        let back: BitcoinAddress = serde_json::from_str(&json).unwrap();

        assert_eq!(back, addr);

        let wrong = json.replace("bitcoin", "signet");
        assert!(serde_json::from_str::<BitcoinAddress>(&wrong).is_err());
    }
}
