//! This crate provides fixtures and in-memory collaborators for testing the RGB++ crates.
//!
//! The mocks implement [`rgbpp_rpc::traits::LedgerRpc`] and [`rgbpp_rpc::traits::AssetsService`]
//! over plain vectors so that builders, finalization and the poller can be exercised without a
//! node or a service.

pub mod binding;
pub mod cells;
pub mod context;
pub mod mocks;
