//! Builds the unsigned binding transaction that carries the commitment of a virtual transaction.
//!
//! The binding transaction spends the seals the virtual transaction consumes, commits to it in an
//! `OP_RETURN` at output 0 and creates one dust output per new seal. Extra funding comes from the
//! sender's UTXOs, picked largest first so the result only depends on the UTXO set it is given.
//! Signing is left to the wallet holding the keys.

pub mod builder;
pub mod errors;
pub mod weight;
