//! This crate contains the types, codecs and pure functions that every other crate in this
//! workspace builds on: the ledger data model, the seal lock-args codec, capacity and fee
//! arithmetic, the commitment engine and the witness encodings.
//!
//! Nothing in here performs I/O. Apart from [`rgbpp_params`], this crate lies at the bottom of the
//! crate-hierarchy in this workspace.

pub mod bitcoin;
pub mod capacity;
pub mod commitment;
pub mod constants;
pub mod context;
pub mod errors;
pub mod ledger_tx;
pub mod packed;
pub mod seal;
pub mod serde_utils;
pub mod token;
pub mod type_id;
pub mod types;
pub mod witness;

pub use rgbpp_params as params;
