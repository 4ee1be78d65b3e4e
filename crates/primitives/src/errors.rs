//! Errors raised by the pure codecs and calculators in this crate.

use thiserror::Error;

/// Errors from encoding, decoding and validating ledger-side values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Lock args (or another fixed-layout field) do not have the expected shape.
    #[error("malformed args: {0}")]
    MalformedArgs(String),

    /// The outputs cannot pay for their own storage plus the fee.
    #[error("insufficient capacity: need {required} shannons, have {available}")]
    InsufficientCapacity {
        /// Shannons required.
        required: u64,

        /// Shannons available.
        available: u64,
    },

    /// A commitment recomputed from a transaction does not match the expected one.
    #[error("commitment mismatch: expected {expected}, computed {computed}")]
    CommitmentMismatch {
        /// The commitment the caller expected.
        expected: String,

        /// The commitment derived from the transaction.
        computed: String,
    },

    /// The transaction cannot carry a commitment.
    #[error("invalid virtual transaction: {0}")]
    InvalidVirtualTx(String),

    /// The transaction still carries placeholders and cannot be broadcast.
    #[error("transaction not finalized: {0}")]
    NotFinalized(String),

    /// A capacity or amount computation overflowed.
    #[error("arithmetic overflow while computing {0}")]
    Overflow(&'static str),

    /// A bitcoin address does not belong to the expected network or cannot be parsed.
    #[error("invalid bitcoin address: {0}")]
    InvalidAddress(String),
}

/// Result type alias for [`PrimitiveError`].
pub type PrimitiveResult<T> = Result<T, PrimitiveError>;
