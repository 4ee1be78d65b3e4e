//! # `rgbpp-tx-tracker`
//!
//! Follows an RGB++ operation through the assets service until its ledger transaction lands or
//! the service gives up on it.
//!
//! Polling is read-only. Cancelling a poller at any point leaves nothing behind on either chain.

pub mod config;
pub mod errors;
pub mod event;
pub mod poller;
pub mod subscription;
