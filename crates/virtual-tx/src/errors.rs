//! Errors raised while building and finalizing ledger transactions.

use rgbpp_primitives::errors::PrimitiveError;
use rgbpp_rpc::errors::{LedgerError, ServiceError};
use thiserror::Error;

/// Errors raised while building a virtual transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The indexer has no cell matching the selection.
    #[error("no eligible cell: {0}")]
    NoEligibleCell(String),

    /// The selected inputs cannot cover the outputs and the fee.
    #[error("insufficient capacity: need {required} shannons, have {available}")]
    InsufficientCapacity {
        /// Shannons required.
        required: u64,

        /// Shannons available.
        available: u64,
    },

    /// The selected asset cells hold less than the amount to move.
    #[error("insufficient amount: need {required}, have {available}")]
    InsufficientAmount {
        /// Amount required.
        required: u128,

        /// Amount available.
        available: u128,
    },

    /// The built transaction is larger than the ledger accepts.
    #[error("transaction of {size} bytes exceeds the {max} byte limit")]
    TxTooLarge {
        /// Estimated size including the witness allowance.
        size: usize,

        /// The configured maximum.
        max: usize,
    },

    /// The payload asked for something the builder cannot do.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A codec or calculator failed.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    /// The ledger could not be queried.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type alias for [`BuildError`].
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised while finalizing a virtual transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FinalizeError {
    /// The binding transaction does not carry this virtual transaction's commitment.
    #[error("binding transaction mismatch: {0}")]
    BindingTxMismatch(String),

    /// The virtual transaction needs a paymaster cell but none was supplied.
    #[error("a paymaster cell is required to finalize this transaction")]
    PaymasterRequired,

    /// The paymaster cell cannot cover the shortfall.
    #[error("paymaster capacity too low: need {required} shannons, have {available}")]
    PaymasterCapacityTooLow {
        /// Shannons required from all inputs.
        required: u64,

        /// Shannons available including the paymaster cell.
        available: u64,
    },

    /// The transaction is not in the shape finalization expects.
    #[error("invalid virtual transaction: {0}")]
    InvalidVirtualTx(String),

    /// Producing a signature failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// A codec or calculator failed.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    /// The assets service could not provide what was asked for.
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// The ledger could not be queried.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type alias for [`FinalizeError`].
pub type FinalizeResult<T> = Result<T, FinalizeError>;
