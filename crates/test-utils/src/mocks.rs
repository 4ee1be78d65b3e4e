//! In-memory collaborators.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use bitcoin::{Amount, Transaction, Txid};
use rgbpp_primitives::{
    bitcoin::BitcoinAddress,
    ledger_tx::{Finalized, LedgerTx, VirtualTxResult},
    types::{Byte32, LiveCell, OutPoint, VirtualTransaction},
};
use rgbpp_rpc::{
    errors::{LedgerError, LedgerResult, ServiceError, ServiceResult},
    traits::{AssetsService, LedgerRpc},
    types::{
        CellFilter, PaymasterInfo, RecommendedFees, RetryOutcome, ServiceJob, ServiceJobState,
        SpvProof, Utxo,
    },
};

/// A ledger holding a fixed set of live cells and recording what is sent to it.
#[derive(Debug, Default)]
pub struct MockLedger {
    cells: Mutex<Vec<LiveCell>>,

    sent: Mutex<Vec<VirtualTransaction>>,
}

impl MockLedger {
    /// A ledger with the given live cells, in indexer order.
    pub fn with_cells(cells: impl IntoIterator<Item = LiveCell>) -> Self {
        Self {
            cells: Mutex::new(cells.into_iter().collect()),
            sent: Mutex::default(),
        }
    }

    /// Adds a live cell.
    pub fn add_cell(&self, cell: LiveCell) {
        self.cells.lock().expect("ledger cells poisoned").push(cell);
    }

    /// The transactions sent so far.
    pub fn sent(&self) -> Vec<VirtualTransaction> {
        self.sent.lock().expect("ledger sent poisoned").clone()
    }
}

impl LedgerRpc for MockLedger {
    async fn find_cells(&self, filter: &CellFilter) -> LedgerResult<Vec<LiveCell>> {
        let cells = self.cells.lock().expect("ledger cells poisoned");

        Ok(cells
            .iter()
            .filter(|cell| filter.matches(cell))
            .cloned()
            .collect())
    }

    async fn get_live_cell(&self, out_point: &OutPoint) -> LedgerResult<LiveCell> {
        let cells = self.cells.lock().expect("ledger cells poisoned");

        cells
            .iter()
            .find(|cell| cell.out_point == *out_point)
            .cloned()
            .ok_or(LedgerError::CellNotFound(*out_point))
    }

    async fn send_transaction(&self, tx: &LedgerTx<Finalized>) -> LedgerResult<Byte32> {
        self.sent
            .lock()
            .expect("ledger sent poisoned")
            .push(tx.inner().clone());

        Ok(tx.tx_hash())
    }

    async fn wait_transaction(
        &self,
        tx_hash: Byte32,
        _confirmations: u32,
        _timeout: Duration,
    ) -> LedgerResult<()> {
        let sent = self.sent.lock().expect("ledger sent poisoned");

        if sent.iter().any(|tx| tx.tx_hash() == tx_hash) {
            Ok(())
        } else {
            Err(LedgerError::Timeout(tx_hash))
        }
    }
}

/// An assets service answering from scripted responses.
///
/// Job lookups pop responses in order; the last response keeps being returned once the queue is
/// down to one entry.
#[derive(Debug)]
pub struct MockAssetsService {
    jobs: Mutex<VecDeque<ServiceResult<ServiceJob>>>,

    job_queries: AtomicUsize,

    proofs: Mutex<HashMap<Txid, SpvProof>>,

    utxos: Mutex<Vec<Utxo>>,

    paymaster: Option<PaymasterInfo>,

    fees: RecommendedFees,

    broadcast: Mutex<Vec<Transaction>>,

    submitted: Mutex<Vec<(Txid, VirtualTxResult)>>,
}

impl Default for MockAssetsService {
    fn default() -> Self {
        Self {
            jobs: Mutex::default(),
            job_queries: AtomicUsize::new(0),
            proofs: Mutex::default(),
            utxos: Mutex::default(),
            paymaster: None,
            fees: RecommendedFees {
                fastest_fee: 20,
                half_hour_fee: 10,
                hour_fee: 5,
                economy_fee: 2,
                minimum_fee: 1,
            },
            broadcast: Mutex::default(),
            submitted: Mutex::default(),
        }
    }
}

impl MockAssetsService {
    /// A service with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the answers to job lookups.
    pub fn with_job_responses(
        self,
        responses: impl IntoIterator<Item = ServiceResult<ServiceJob>>,
    ) -> Self {
        *self.jobs.lock().expect("jobs poisoned") = responses.into_iter().collect();
        self
    }

    /// Serves `proof` for `btc_txid`.
    pub fn with_proof(self, btc_txid: Txid, proof: SpvProof) -> Self {
        self.proofs
            .lock()
            .expect("proofs poisoned")
            .insert(btc_txid, proof);
        self
    }

    /// Lists `utxos` for every address whose script they pay to.
    pub fn with_utxos(self, utxos: impl IntoIterator<Item = Utxo>) -> Self {
        self.utxos.lock().expect("utxos poisoned").extend(utxos);
        self
    }

    /// Serves a paymaster at `btc_address` asking for `value`.
    pub fn with_paymaster(mut self, btc_address: &BitcoinAddress, value: Amount) -> Self {
        self.paymaster = Some(PaymasterInfo {
            btc_address: btc_address.to_string(),
            value,
        });
        self
    }

    /// Sets the recommended fees.
    pub fn with_fees(mut self, fees: RecommendedFees) -> Self {
        self.fees = fees;
        self
    }

    /// How many job lookups have been answered.
    pub fn job_queries(&self) -> usize {
        self.job_queries.load(Ordering::SeqCst)
    }

    /// The binding transactions relayed so far.
    pub fn broadcast(&self) -> Vec<Transaction> {
        self.broadcast.lock().expect("broadcast poisoned").clone()
    }

    /// The virtual transactions handed over so far.
    pub fn submitted(&self) -> Vec<(Txid, VirtualTxResult)> {
        self.submitted.lock().expect("submitted poisoned").clone()
    }
}

/// A job in `state` with no failure reason.
pub fn job(state: ServiceJobState) -> ServiceJob {
    ServiceJob {
        state,
        attempts: 0,
        failed_reason: None,
    }
}

impl AssetsService for MockAssetsService {
    async fn get_spv_proof(&self, btc_txid: Txid, _confirmations: u32) -> ServiceResult<SpvProof> {
        self.proofs
            .lock()
            .expect("proofs poisoned")
            .get(&btc_txid)
            .cloned()
            .ok_or(ServiceError::ProofNotReady)
    }

    async fn get_transaction_job(&self, _btc_txid: Txid) -> ServiceResult<ServiceJob> {
        self.job_queries.fetch_add(1, Ordering::SeqCst);
        let mut jobs = self.jobs.lock().expect("jobs poisoned");

        let response = if jobs.len() > 1 {
            jobs.pop_front()
        } else {
            jobs.front().cloned()
        };
        response.unwrap_or(Err(ServiceError::ProofNotReady))
    }

    async fn get_transaction_hash(&self, btc_txid: Txid) -> ServiceResult<Byte32> {
        self.submitted
            .lock()
            .expect("submitted poisoned")
            .iter()
            .find(|(txid, _)| *txid == btc_txid)
            .map(|(_, result)| result.tx.tx_hash())
            .ok_or(ServiceError::ProofNotReady)
    }

    async fn send_rgbpp_ckb_transaction(
        &self,
        btc_txid: Txid,
        result: &VirtualTxResult,
    ) -> ServiceResult<ServiceJob> {
        self.submitted
            .lock()
            .expect("submitted poisoned")
            .push((btc_txid, result.clone()));

        Ok(job(ServiceJobState::Waiting))
    }

    async fn retry_rgbpp_ckb_transaction(&self, _btc_txid: Txid) -> ServiceResult<RetryOutcome> {
        Ok(RetryOutcome {
            success: true,
            state: ServiceJobState::Waiting,
        })
    }

    async fn get_paymaster_info(&self) -> ServiceResult<PaymasterInfo> {
        self.paymaster.clone().ok_or(ServiceError::Status {
            status: 404,
            message: "paymaster not configured".to_string(),
        })
    }

    async fn send_btc_transaction(&self, tx: &Transaction) -> ServiceResult<Txid> {
        self.broadcast
            .lock()
            .expect("broadcast poisoned")
            .push(tx.clone());

        Ok(tx.compute_txid())
    }

    async fn get_recommended_fees(&self) -> ServiceResult<RecommendedFees> {
        Ok(self.fees)
    }

    async fn get_utxos(&self, address: &BitcoinAddress, only_confirmed: bool) -> ServiceResult<Vec<Utxo>> {
        let script = address.script_pubkey();

        Ok(self
            .utxos
            .lock()
            .expect("utxos poisoned")
            .iter()
            .filter(|utxo| utxo.script_pubkey == script && (utxo.confirmed || !only_confirmed))
            .cloned()
            .collect())
    }
}
