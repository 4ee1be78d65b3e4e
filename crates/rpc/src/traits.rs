//! Collaborator interfaces.

use std::{future::Future, time::Duration};

use bitcoin::{Transaction, Txid};
use rgbpp_primitives::{
    bitcoin::BitcoinAddress,
    ledger_tx::{Finalized, LedgerTx, VirtualTxResult},
    types::{Byte32, LiveCell, OutPoint},
};

use crate::{
    errors::{LedgerResult, ServiceResult},
    types::{
        CellFilter, PaymasterInfo, RecommendedFees, RetryOutcome, ServiceJob, SpvProof, Utxo,
    },
};

/// Access to the ledger node and its cell indexer.
pub trait LedgerRpc: Send + Sync {
    /// Returns the live cells matching `filter`, in indexer order.
    fn find_cells(
        &self,
        filter: &CellFilter,
    ) -> impl Future<Output = LedgerResult<Vec<LiveCell>>> + Send;

    /// Returns the live cell at `out_point`, failing with
    /// [`LedgerError::CellNotFound`](crate::errors::LedgerError::CellNotFound) if it was spent or
    /// never existed.
    fn get_live_cell(
        &self,
        out_point: &OutPoint,
    ) -> impl Future<Output = LedgerResult<LiveCell>> + Send;

    /// Broadcasts a finalized transaction and returns its hash.
    ///
    /// Only [`LedgerTx<Finalized>`] is accepted, so placeholder-carrying transactions cannot be
    /// sent by mistake.
    fn send_transaction(
        &self,
        tx: &LedgerTx<Finalized>,
    ) -> impl Future<Output = LedgerResult<Byte32>> + Send;

    /// Waits until `tx_hash` has `confirmations` confirmations or `timeout` elapses.
    fn wait_transaction(
        &self,
        tx_hash: Byte32,
        confirmations: u32,
        timeout: Duration,
    ) -> impl Future<Output = LedgerResult<()>> + Send;
}

/// The service tracking binding transactions and serving their SPV proofs.
pub trait AssetsService: Send + Sync {
    /// Fetches the SPV proof of `btc_txid` once it has `confirmations` confirmations.
    fn get_spv_proof(
        &self,
        btc_txid: Txid,
        confirmations: u32,
    ) -> impl Future<Output = ServiceResult<SpvProof>> + Send;

    /// Returns the job the service keeps for `btc_txid`.
    fn get_transaction_job(&self, btc_txid: Txid)
        -> impl Future<Output = ServiceResult<ServiceJob>> + Send;

    /// Returns the hash of the ledger transaction the service broadcast for `btc_txid`.
    fn get_transaction_hash(&self, btc_txid: Txid)
        -> impl Future<Output = ServiceResult<Byte32>> + Send;

    /// Hands a virtual transaction to the service, which finalizes and broadcasts it once the
    /// binding transaction is provable.
    fn send_rgbpp_ckb_transaction(
        &self,
        btc_txid: Txid,
        result: &VirtualTxResult,
    ) -> impl Future<Output = ServiceResult<ServiceJob>> + Send;

    /// Asks the service to retry a failed job.
    fn retry_rgbpp_ckb_transaction(
        &self,
        btc_txid: Txid,
    ) -> impl Future<Output = ServiceResult<RetryOutcome>> + Send;

    /// Returns where the paymaster must be paid.
    fn get_paymaster_info(&self) -> impl Future<Output = ServiceResult<PaymasterInfo>> + Send;

    /// Relays a signed binding transaction.
    fn send_btc_transaction(
        &self,
        tx: &Transaction,
    ) -> impl Future<Output = ServiceResult<Txid>> + Send;

    /// Returns the current fee rate recommendations.
    fn get_recommended_fees(&self) -> impl Future<Output = ServiceResult<RecommendedFees>> + Send;

    /// Lists the unspent outputs of `address`.
    fn get_utxos(
        &self,
        address: &BitcoinAddress,
        only_confirmed: bool,
    ) -> impl Future<Output = ServiceResult<Vec<Utxo>>> + Send;
}
