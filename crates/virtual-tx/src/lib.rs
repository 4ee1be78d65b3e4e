//! This crate builds the ledger side of RGB++ operations.
//!
//! Every seal-consuming operation is an [`payload::AssetPayload`] run through one generic
//! [`builder::SealBuilder`], which produces a [`VirtualTxResult`](rgbpp_primitives::ledger_tx::VirtualTxResult)
//! carrying pre-seal locks and a placeholder witness. Once the binding transaction is known, the
//! [`finalize`] module turns it into a `LedgerTx<Finalized>`, the only form the ledger RPC
//! accepts.
//!
//! Operations that do not consume seals (preparing seal cells, spending matured timed-unlock
//! cells) live in [`prepare`] and [`time_lock`].

pub mod builder;
pub mod errors;
pub mod finalize;
pub mod payload;
pub mod payloads;
pub mod prepare;
pub mod signer;
pub mod time_lock;

