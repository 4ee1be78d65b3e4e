//! What a poller reports while it runs.

use rgbpp_rpc::{errors::ServiceError, types::TransactionState};

/// One observation of a poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollEvent {
    /// The operation moved forward to this state.
    State(TransactionState),

    /// A lookup failed with something other than a missing proof. Polling goes on.
    Error(ServiceError),
}
