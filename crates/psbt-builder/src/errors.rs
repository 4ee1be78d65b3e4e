//! Errors raised while building a binding transaction.

use bitcoin::Amount;
use rgbpp_primitives::errors::PrimitiveError;
use rgbpp_rpc::errors::{LedgerError, ServiceError};
use thiserror::Error;

/// Errors raised while building a binding transaction.
#[derive(Debug, Error)]
pub enum PsbtError {
    /// The virtual transaction cannot be bound.
    #[error("invalid virtual transaction: {0}")]
    InvalidVirtualTx(String),

    /// The virtual transaction does not hash to the commitment it was built with.
    #[error("commitment mismatch: expected {expected}, computed {computed}")]
    CommitmentMismatch {
        /// The commitment that was handed in.
        expected: String,

        /// The commitment of the transaction as it is.
        computed: String,
    },

    /// A required UTXO is not in the available set.
    #[error("cannot find utxo: {0}")]
    CannotFindUtxo(String),

    /// The available UTXOs cannot cover the outputs and the fee.
    #[error("insufficient utxo value: need {required}, have {available}")]
    InsufficientUtxo {
        /// Value required.
        required: Amount,

        /// Value available.
        available: Amount,
    },

    /// An output would be below the dust limit of its script.
    #[error("output {index} of {value} is below the dust limit of {limit}")]
    DustOutput {
        /// Index of the output.
        index: usize,

        /// Its value.
        value: Amount,

        /// The smallest value it may carry.
        limit: Amount,
    },

    /// The fee rate is zero.
    #[error("invalid fee rate: {0}")]
    InvalidFeeRate(String),

    /// A UTXO pays to a script whose spending weight is unknown.
    #[error("unsupported script: {0}")]
    UnsupportedScript(String),

    /// The unsigned transaction could not be wrapped.
    #[error(transparent)]
    Psbt(#[from] bitcoin::psbt::Error),

    /// A codec failed.
    #[error(transparent)]
    Primitive(PrimitiveError),

    /// The ledger could not be queried.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The assets service could not be queried.
    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<PrimitiveError> for PsbtError {
    fn from(err: PrimitiveError) -> Self {
        match err {
            PrimitiveError::CommitmentMismatch { expected, computed } => {
                PsbtError::CommitmentMismatch { expected, computed }
            }
            other => PsbtError::Primitive(other),
        }
    }
}

/// Result type alias for [`PsbtError`].
pub type PsbtResult<T> = Result<T, PsbtError>;
