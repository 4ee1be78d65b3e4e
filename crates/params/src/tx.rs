//! Default values for the transactions built on either chain.
//!
//! These are the values used when [`ProtocolParams`](crate::protocol::ProtocolParams) is not
//! overridden by the caller.

use bitcoin::Amount;

/// Number of shannons in one CKB.
pub const CKB_UNIT: u64 = 100_000_000;

/// The default fee rate for ledger transactions in shannons per kilobyte.
pub const DEFAULT_CKB_FEE_RATE: u64 = 1_100;

/// Upper bound on the fee a single ledger transaction is allowed to pay in shannons (0.2 CKB).
///
/// Builders that pick capacity cells reserve this much on top of the outputs they create.
pub const MAX_CKB_FEE: u64 = 20_000_000;

/// Bytes reserved for the unlock witness of seal-consuming inputs while the binding transaction
/// and its proof are still unknown.
pub const RGBPP_TX_WITNESS_MAX_SIZE: usize = 5_000;

/// Size of a recoverable secp256k1 signature placed in a `WitnessArgs.lock`.
pub const SECP256K1_WITNESS_LOCK_SIZE: usize = 65;

/// Ledger transactions above this size are unlikely to be relayed.
pub const RECOMMENDED_MAX_CKB_TX_SIZE: usize = 60 * 1024;

/// The value of each binding output that carries an RGB++ seal.
pub const RGBPP_UTXO_DUST_LIMIT: Amount = Amount::from_sat(546);

/// The minimum value of any other output (change, paymaster) of the binding transaction.
pub const BTC_UTXO_DUST_LIMIT: Amount = Amount::from_sat(1_000);

/// The default number of binding-chain confirmations after which a leaped cell can be unlocked.
pub const DEFAULT_BTC_TIME_LOCK_CONFIRMATIONS: u32 = 6;

/// The default number of confirmations requested when fetching an SPV proof.
pub const DEFAULT_SPV_CONFIRMATIONS: u32 = 0;
