//! Tunable protocol parameters: dust floors, fee defaults and confirmation thresholds.

use bitcoin::Amount;
use serde::{Deserialize, Serialize};

use crate::{
    errors::ParamsError,
    tx::{
        BTC_UTXO_DUST_LIMIT, DEFAULT_BTC_TIME_LOCK_CONFIRMATIONS, DEFAULT_CKB_FEE_RATE,
        DEFAULT_SPV_CONFIRMATIONS, RECOMMENDED_MAX_CKB_TX_SIZE, RGBPP_TX_WITNESS_MAX_SIZE,
        RGBPP_UTXO_DUST_LIMIT,
    },
};

/// Parameters that callers may override per network or per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolParams {
    /// The value of each binding output carrying a seal.
    pub rgbpp_utxo_dust: Amount,

    /// The minimum value of change and paymaster outputs on the binding chain.
    pub btc_utxo_dust: Amount,

    /// Ledger fee rate in shannons per kilobyte.
    pub ckb_fee_rate: u64,

    /// Bytes reserved for the seal unlock witness while estimating ledger fees.
    pub witness_placeholder_size: usize,

    /// Confirmations before a timed-unlock cell can be spent.
    pub btc_time_lock_confirmations: u32,

    /// Confirmations requested when fetching SPV proofs for seal unlocks.
    pub spv_confirmations: u32,

    /// Upper bound on the serialized size of a built ledger transaction.
    pub max_ckb_tx_size: usize,
}

impl Default for ProtocolParams {
    fn default() -> Self {
        Self {
            rgbpp_utxo_dust: RGBPP_UTXO_DUST_LIMIT,
            btc_utxo_dust: BTC_UTXO_DUST_LIMIT,
            ckb_fee_rate: DEFAULT_CKB_FEE_RATE,
            witness_placeholder_size: RGBPP_TX_WITNESS_MAX_SIZE,
            btc_time_lock_confirmations: DEFAULT_BTC_TIME_LOCK_CONFIRMATIONS,
            spv_confirmations: DEFAULT_SPV_CONFIRMATIONS,
            max_ckb_tx_size: RECOMMENDED_MAX_CKB_TX_SIZE,
        }
    }
}

impl ProtocolParams {
    /// Sets the ledger fee rate.
    pub const fn with_ckb_fee_rate(mut self, fee_rate: u64) -> Self {
        self.ckb_fee_rate = fee_rate;
        self
    }

    /// Sets the witness placeholder size.
    pub const fn with_witness_placeholder_size(mut self, size: usize) -> Self {
        self.witness_placeholder_size = size;
        self
    }

    /// Sets the value of each seal output.
    pub const fn with_rgbpp_utxo_dust(mut self, value: Amount) -> Self {
        self.rgbpp_utxo_dust = value;
        self
    }

    /// Sets the number of confirmations for timed-unlock cells.
    pub const fn with_btc_time_lock_confirmations(mut self, confirmations: u32) -> Self {
        self.btc_time_lock_confirmations = confirmations;
        self
    }

    /// Sets the number of confirmations requested with SPV proofs.
    pub const fn with_spv_confirmations(mut self, confirmations: u32) -> Self {
        self.spv_confirmations = confirmations;
        self
    }

    /// Checks that the parameters can produce valid transactions.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.ckb_fee_rate == 0 {
            return Err(ParamsError::InvalidParam("ckb_fee_rate must be positive"));
        }

        if self.rgbpp_utxo_dust == Amount::ZERO {
            return Err(ParamsError::InvalidParam("rgbpp_utxo_dust must be positive"));
        }

        if self.max_ckb_tx_size <= self.witness_placeholder_size {
            return Err(ParamsError::InvalidParam(
                "max_ckb_tx_size must exceed witness_placeholder_size",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_params_serde() {
        let params = ProtocolParams::default();
        let serialized = toml::to_string(&params).unwrap();

        let deserialized: ProtocolParams = toml::from_str(&serialized).unwrap();

        assert_eq!(params, deserialized);

        let params_toml = r#"
            ckb_fee_rate = 3000
            btc_time_lock_confirmations = 12
        "#;

        let parsed = toml::from_str::<ProtocolParams>(params_toml)
            .expect("must be able to deserialize partial ProtocolParams from a toml");
        assert_eq!(parsed.ckb_fee_rate, 3000);
        assert_eq!(parsed.btc_time_lock_confirmations, 12);
        assert_eq!(parsed.rgbpp_utxo_dust, RGBPP_UTXO_DUST_LIMIT);
    }

    #[test]
    fn zero_fee_rate_is_rejected() {
        let params = ProtocolParams::default().with_ckb_fee_rate(0);
        assert!(params.validate().is_err());
        assert!(ProtocolParams::default().validate().is_ok());
    }
}
