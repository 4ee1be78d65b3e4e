//! Errors that end polling.

use rgbpp_rpc::types::TransactionState;
use thiserror::Error;

/// Why a poller stopped without reaching a terminal state, or why the terminal state is a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    /// The caller cancelled the poller.
    #[error("polling was cancelled")]
    Cancelled,

    /// The attempt limit was reached first.
    #[error("gave up polling after {attempts} attempts in state {last}")]
    AttemptsExhausted {
        /// Lookups made.
        attempts: u32,

        /// The last state observed.
        last: TransactionState,
    },

    /// The service gave up on the operation.
    #[error("transaction failed: {0}")]
    StateTerminalFailed(String),
}

/// Result type alias for [`PollError`].
pub type PollResult<T> = Result<T, PollError>;

/// Turns a terminal [`TransactionState::Failed`] into an error.
pub trait IntoPollResult {
    /// Returns the state, or [`PollError::StateTerminalFailed`] for a failure.
    fn into_result(self) -> PollResult<TransactionState>;
}

impl IntoPollResult for TransactionState {
    fn into_result(self) -> PollResult<TransactionState> {
        match self {
            TransactionState::Failed(reason) => Err(PollError::StateTerminalFailed(reason)),
            state => Ok(state),
        }
    }
}
