//! This crate contains the parameters that dictate how RGB++ transactions are built on both the
//! ledger side and the binding (bitcoin) side.
//!
//! Nothing in here is read from global state. Callers load an [`network::RgbppParams`] (usually
//! from TOML) and hand it explicitly to every component that needs it.

pub mod deployments;
pub mod errors;
pub mod network;
pub mod protocol;
pub mod tx;
pub mod types;

pub mod prelude {
    //! Re-exports of the types most callers need.
    pub use crate::{
        deployments::{CellDepParam, ScriptDeployment, ScriptDeployments},
        errors::ParamsError,
        network::{LedgerNetwork, RgbppParams},
        protocol::ProtocolParams,
        types::{Byte32, DepType, ScriptHashType},
    };
}
