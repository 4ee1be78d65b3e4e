//! Interfaces to the collaborators the RGB++ core talks to.
//!
//! The core never reaches the network directly. It goes through two traits:
//!
//! - [`traits::LedgerRpc`]: the ledger node and its cell indexer.
//! - [`traits::AssetsService`]: the service that tracks binding transactions, serves SPV proofs,
//!   and relays binding-chain transactions.
//!
//! [`client::AssetsApiClient`] implements the latter over HTTP.

pub mod client;
pub mod errors;
pub mod traits;
pub mod types;
