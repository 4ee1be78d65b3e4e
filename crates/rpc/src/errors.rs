//! Errors reported by collaborators.

use rgbpp_primitives::types::{Byte32, OutPoint};
use thiserror::Error;

/// Errors from the ledger node or indexer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// The cell does not exist or has already been spent.
    #[error("cell {}:{} is not live", .0.tx_hash, .0.index)]
    CellNotFound(OutPoint),

    /// The node refused the transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),

    /// The transaction did not reach the requested confirmations in time.
    #[error("timed out waiting for transaction {0}")]
    Timeout(Byte32),

    /// The node could not be reached or answered garbage.
    #[error("ledger transport: {0}")]
    Transport(String),
}

/// Result type alias for [`LedgerError`].
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors from the assets service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// The service has not produced a proof or job for the transaction yet.
    ///
    /// This is the only error that is worth retrying without user intervention.
    #[error("proof not ready")]
    ProofNotReady,

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,

        /// Message from the response body, if any.
        message: String,
    },

    /// The response body could not be decoded.
    #[error("invalid service response: {0}")]
    InvalidResponse(String),

    /// The request could not be sent or the response could not be read.
    #[error("service transport: {0}")]
    Transport(String),
}

impl ServiceError {
    /// Returns true if the request may succeed later without any change on the caller's side.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::ProofNotReady)
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ServiceError::InvalidResponse(err.to_string())
        } else {
            ServiceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::InvalidResponse(err.to_string())
    }
}

/// Result type alias for [`ServiceError`].
pub type ServiceResult<T> = Result<T, ServiceError>;
