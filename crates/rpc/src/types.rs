//! Types exchanged with the collaborators.

use std::fmt;

use bitcoin::{Amount, OutPoint as BtcOutPoint, ScriptBuf, Txid};
use rgbpp_primitives::{
    serde_utils::hex_bytes,
    types::{LiveCell, OutPoint, Script},
};
use serde::{Deserialize, Serialize};

/// Which cells to look up in the indexer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellFilter {
    /// Cells under `lock`, narrowed by their type.
    Lock {
        /// The exact lock script.
        lock: Script,

        /// Constraint on the type script.
        type_: TypeFilter,
    },

    /// Cells with exactly this type script, under any lock.
    Type(Script),
}

/// Constraint on the type script of a cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeFilter {
    /// Any type or none.
    Any,

    /// Only cells without a type script.
    Typeless,

    /// Only cells with exactly this type script.
    Exact(Script),
}

impl CellFilter {
    /// Plain capacity cells under `lock`.
    pub const fn capacity(lock: Script) -> Self {
        CellFilter::Lock {
            lock,
            type_: TypeFilter::Typeless,
        }
    }

    /// Cells under `lock` carrying `type_`.
    pub const fn typed(lock: Script, type_: Script) -> Self {
        CellFilter::Lock {
            lock,
            type_: TypeFilter::Exact(type_),
        }
    }

    /// Returns true if `cell` satisfies the filter.
    pub fn matches(&self, cell: &LiveCell) -> bool {
        match self {
            CellFilter::Lock { lock, type_ } => {
                cell.cell.lock == *lock
                    && match type_ {
                        TypeFilter::Any => true,
                        TypeFilter::Typeless => cell.cell.type_.is_none(),
                        TypeFilter::Exact(script) => cell.cell.type_.as_ref() == Some(script),
                    }
            }
            CellFilter::Type(script) => cell.cell.type_.as_ref() == Some(script),
        }
    }
}

/// Lifecycle of an RGB++ operation, from building the virtual transaction to the ledger
/// transaction landing on chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum TransactionState {
    /// The virtual transaction and its commitment exist, nothing has been broadcast.
    Preparing,

    /// The binding transaction has been broadcast.
    AwaitingConfirmation,

    /// The binding transaction is visible; the SPV proof is pending.
    AwaitingProof,

    /// The ledger transaction is being finalized and broadcast.
    Finalizing,

    /// The ledger transaction is on chain.
    Completed,

    /// The operation failed for good.
    Failed(String),
}

impl TransactionState {
    /// Position in the lifecycle; terminal states share the highest rank.
    pub const fn rank(&self) -> u8 {
        match self {
            TransactionState::Preparing => 0,
            TransactionState::AwaitingConfirmation => 1,
            TransactionState::AwaitingProof => 2,
            TransactionState::Finalizing => 3,
            TransactionState::Completed | TransactionState::Failed(_) => 4,
        }
    }

    /// Returns true for [`TransactionState::Completed`] and [`TransactionState::Failed`].
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionState::Completed | TransactionState::Failed(_)
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Preparing => f.write_str("preparing"),
            TransactionState::AwaitingConfirmation => f.write_str("awaiting-confirmation"),
            TransactionState::AwaitingProof => f.write_str("awaiting-proof"),
            TransactionState::Finalizing => f.write_str("finalizing"),
            TransactionState::Completed => f.write_str("completed"),
            TransactionState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Job states as reported by the assets service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceJobState {
    /// Queued, waiting for the binding transaction to confirm.
    Waiting,

    /// Postponed until the SPV proof is available.
    Delayed,

    /// Being processed.
    Active,

    /// Done.
    Completed,

    /// Gave up.
    Failed,
}

/// The job record the assets service keeps per binding transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceJob {
    /// The job state.
    pub state: ServiceJobState,

    /// How many times the service has tried to process the job.
    #[serde(default)]
    pub attempts: u32,

    /// Why the job failed, if it did.
    #[serde(
        default,
        rename = "failedReason",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_reason: Option<String>,
}

impl ServiceJob {
    /// Maps the job to the lifecycle state.
    pub fn transaction_state(&self) -> TransactionState {
        match self.state {
            ServiceJobState::Waiting => TransactionState::AwaitingConfirmation,
            ServiceJobState::Delayed => TransactionState::AwaitingProof,
            ServiceJobState::Active => TransactionState::Finalizing,
            ServiceJobState::Completed => TransactionState::Completed,
            ServiceJobState::Failed => TransactionState::Failed(
                self.failed_reason
                    .clone()
                    .unwrap_or_else(|| "unknown reason".to_string()),
            ),
        }
    }
}

/// Outcome of asking the service to retry a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryOutcome {
    /// Whether the job was requeued.
    pub success: bool,

    /// The job state after the request.
    pub state: ServiceJobState,
}

/// An SPV proof of a binding transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpvProof {
    /// The serialized proof, placed verbatim in the unlock witness.
    #[serde(with = "hex_bytes")]
    pub proof: Vec<u8>,

    /// The SPV client cell the proof verifies against; it becomes a cell dep.
    pub spv_client: OutPoint,
}

/// Where and how much the paymaster must be paid on the binding chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymasterInfo {
    /// The paymaster's binding-chain address.
    pub btc_address: String,

    /// The value of the paymaster output.
    #[serde(rename = "fee", with = "bitcoin::amount::serde::as_sat")]
    pub value: Amount,
}

/// Fee rate recommendations in sat/vB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedFees {
    /// Next block.
    pub fastest_fee: u64,

    /// Within three blocks.
    pub half_hour_fee: u64,

    /// Within six blocks.
    pub hour_fee: u64,

    /// Low priority.
    pub economy_fee: u64,

    /// The relay floor.
    pub minimum_fee: u64,
}

/// A spendable binding-chain output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Utxo {
    /// Where the output lives.
    pub outpoint: BtcOutPoint,

    /// The output value.
    pub value: Amount,

    /// The output script.
    pub script_pubkey: ScriptBuf,

    /// Whether the creating transaction is in a block.
    pub confirmed: bool,
}

/// The unspent output record returned by the service, before the caller attaches the script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUtxo {
    /// Creating transaction.
    pub txid: Txid,

    /// Output index.
    pub vout: u32,

    /// Value in satoshis.
    pub value: u64,

    /// Confirmation status.
    pub status: ApiUtxoStatus,
}

/// Confirmation status of an [`ApiUtxo`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUtxoStatus {
    /// Whether the creating transaction is in a block.
    pub confirmed: bool,
}

impl ApiUtxo {
    /// Attaches the output script of the address the UTXO was queried for.
    pub fn into_utxo(self, script_pubkey: ScriptBuf) -> Utxo {
        Utxo {
            outpoint: BtcOutPoint::new(self.txid, self.vout),
            value: Amount::from_sat(self.value),
            script_pubkey,
            confirmed: self.status.confirmed,
        }
    }
}

#[cfg(test)]
mod tests {
    use rgbpp_primitives::types::{Byte32, LedgerCell, ScriptHashType};

    use super::*;

    #[test]
    fn job_states_map_to_lifecycle() {
        let job = |state, reason: Option<&str>| ServiceJob {
            state,
            attempts: 1,
            failed_reason: reason.map(str::to_string),
        };

        assert_eq!(
            job(ServiceJobState::Waiting, None).transaction_state(),
            TransactionState::AwaitingConfirmation
        );
        assert_eq!(
            job(ServiceJobState::Delayed, None).transaction_state(),
            TransactionState::AwaitingProof
        );
        assert_eq!(
            job(ServiceJobState::Active, None).transaction_state(),
            TransactionState::Finalizing
        );
        assert_eq!(
            job(ServiceJobState::Completed, None).transaction_state(),
            TransactionState::Completed
        );
        assert_eq!(
            job(ServiceJobState::Failed, Some("invalid proof")).transaction_state(),
            TransactionState::Failed("invalid proof".to_string())
        );
    }

    #[test]
    fn job_json_decodes() {
        let json = r#"{"state":"failed","attempts":3,"failedReason":"CKB tx rejected"}"#;
        let job: ServiceJob = serde_json::from_str(json).unwrap();

        assert_eq!(job.state, ServiceJobState::Failed);
        assert_eq!(job.attempts, 3);
        assert_eq!(job.failed_reason.as_deref(), Some("CKB tx rejected"));

        let job: ServiceJob = serde_json::from_str(r#"{"state":"delayed"}"#).unwrap();
        assert_eq!(job.attempts, 0);
    }

    #[test]
    fn proof_json_decodes() {
        let json = r#"{
            "proof": "0x0102ff",
            "spv_client": {
                "tx_hash": "0x5e570a5a7e7d0c0a7d0b7c3c1e1e1a3e5f6a7b8c9d0e1f2a3b4c5d6e7f8a9b0c",
                "index": "0x1"
            }
        }"#;
        let proof: SpvProof = serde_json::from_str(json).unwrap();

        assert_eq!(proof.proof, vec![1, 2, 0xff]);
        assert_eq!(proof.spv_client.index, 1);
    }

    #[test]
    fn fees_and_paymaster_decode() {
        let fees: RecommendedFees = serde_json::from_str(
            r#"{"fastestFee":20,"halfHourFee":15,"hourFee":10,"economyFee":5,"minimumFee":1}"#,
        )
        .unwrap();
        assert_eq!(fees.half_hour_fee, 15);

        let info: PaymasterInfo =
            serde_json::from_str(r#"{"btc_address":"tb1qexample","fee":7000}"#).unwrap();
        assert_eq!(info.value, Amount::from_sat(7000));
    }

    #[test]
    fn utxo_decodes_and_takes_script() {
        let json = r#"{
            "txid": "0202020202020202020202020202020202020202020202020202020202020202",
            "vout": 3,
            "value": 546,
            "status": {"confirmed": false}
        }"#;
        let utxo = serde_json::from_str::<ApiUtxo>(json)
            .unwrap()
            .into_utxo(ScriptBuf::new());

        assert_eq!(utxo.outpoint.vout, 3);
        assert_eq!(utxo.value, Amount::from_sat(546));
        assert!(!utxo.confirmed);
    }

    #[test]
    fn filter_matches_lock_and_type() {
        let lock = Script::new(Byte32::new([1; 32]), ScriptHashType::Type, vec![1]);
        let type_ = Script::new(Byte32::new([2; 32]), ScriptHashType::Type, vec![2]);
        let cell = |type_: Option<Script>| LiveCell {
            out_point: OutPoint::new(Byte32::new([3; 32]), 0),
            cell: LedgerCell {
                capacity: 1,
                lock: lock.clone(),
                type_,
                data: vec![],
            },
        };

        assert!(CellFilter::capacity(lock.clone()).matches(&cell(None)));
        assert!(!CellFilter::capacity(lock.clone()).matches(&cell(Some(type_.clone()))));
        assert!(CellFilter::typed(lock.clone(), type_.clone()).matches(&cell(Some(type_.clone()))));
        assert!(CellFilter::Type(type_.clone()).matches(&cell(Some(type_))));
    }

    #[test]
    fn terminal_states_rank_highest() {
        assert!(TransactionState::Completed.is_terminal());
        assert!(TransactionState::Failed(String::new()).is_terminal());
        assert!(TransactionState::AwaitingProof.rank() > TransactionState::Preparing.rank());
        assert!(!TransactionState::Finalizing.is_terminal());
    }
}
