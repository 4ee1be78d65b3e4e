//! Spending matured timed-unlock cells to their target lock.

use std::collections::BTreeMap;

use bitcoin::Txid;
use rgbpp_primitives::{
    capacity::{estimate_tx_fee, output_min_capacity, subtract_fee},
    context::NetworkContext,
    ledger_tx::{Finalized, LedgerTx, Unfinalized},
    seal::BtcTimeLockArgs,
    types::{CellDep, CellOutput, DepType, LiveCell, OutPoint, VirtualTransaction, Witness},
    witness::BtcTimeUnlock,
};
use rgbpp_rpc::traits::{AssetsService, LedgerRpc};
use tracing::{debug, info};

use crate::{
    builder::collect_inputs,
    errors::{BuildError, BuildResult, FinalizeError, FinalizeResult},
    payload::InputSelection,
};

/// A timed-unlock spend waiting for its proofs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLockSpendTx {
    /// The ledger transaction.
    pub tx: LedgerTx<Unfinalized>,

    /// The decoded args of each input, in input order.
    pub unlocks: Vec<BtcTimeLockArgs>,

    /// The fee taken from the last output.
    pub fee: u64,
}

/// Builds the spend of a set of timed-unlock cells.
///
/// Every cell moves to the lock it was waiting for, keeping its type and data. The last output
/// pays the fee.
#[derive(Debug, Clone)]
pub struct TimeLockSpend<'a> {
    ctx: &'a NetworkContext,

    out_points: Vec<OutPoint>,
}

impl<'a> TimeLockSpend<'a> {
    /// Creates a spend of the cells at `out_points`.
    pub const fn new(ctx: &'a NetworkContext, out_points: Vec<OutPoint>) -> Self {
        Self { ctx, out_points }
    }

    /// Fetches the cells and builds the spend.
    pub async fn build_with<L: LedgerRpc>(&self, ledger: &L) -> BuildResult<TimeLockSpendTx> {
        let inputs = collect_inputs(ledger, &InputSelection::Exact(self.out_points.clone())).await?;
        self.build(&inputs)
    }

    /// Builds the spend of `inputs`.
    pub fn build(&self, inputs: &[LiveCell]) -> BuildResult<TimeLockSpendTx> {
        let ctx = self.ctx;
        let protocol = ctx.protocol();

        if inputs.is_empty() {
            return Err(BuildError::NoEligibleCell(
                "no timed-unlock cell to spend".to_string(),
            ));
        }

        let mut tx = VirtualTransaction::default();
        let mut unlocks = Vec::with_capacity(inputs.len());
        tx.add_cell_dep(ctx.btc_time_lock_dep());

        for input in inputs {
            let lock = &input.cell.lock;
            if !ctx.is_btc_time_lock(lock) {
                return Err(BuildError::InvalidPayload(format!(
                    "cell {}:{} is not time-locked",
                    input.out_point.tx_hash, input.out_point.index
                )));
            }

            let args = BtcTimeLockArgs::decode(&lock.args)?;
            if args.btc_txid.is_none() {
                return Err(BuildError::InvalidPayload(format!(
                    "cell {}:{} is locked to an unbound transaction",
                    input.out_point.tx_hash, input.out_point.index
                )));
            }

            if let Some(dep) = input.cell.type_.as_ref().and_then(|t| ctx.type_dep(t)) {
                tx.add_cell_dep(dep);
            }

            tx.inputs.push(input.as_input());
            tx.outputs.push(CellOutput {
                capacity: input.cell.capacity,
                lock: args.lock_script.clone(),
                type_: input.cell.type_.clone(),
            });
            tx.outputs_data.push(input.cell.data.clone());
            tx.witnesses.push(Witness::Empty);
            unlocks.push(args);
        }

        let size = tx.serialized_size();
        if size > protocol.max_ckb_tx_size {
            return Err(BuildError::TxTooLarge {
                size,
                max: protocol.max_ckb_tx_size,
            });
        }

        // one proof per input at most
        let allowance = protocol
            .witness_placeholder_size
            .saturating_mul(inputs.len());
        let fee = estimate_tx_fee(&tx, allowance, protocol.ckb_fee_rate);

        let last = tx.outputs.len() - 1;
        let min = output_min_capacity(&tx.outputs[last], tx.outputs_data[last].len());
        tx.outputs[last].capacity = subtract_fee(tx.outputs[last].capacity, fee, min)?;

        debug!(inputs = tx.inputs.len(), fee, "built timed-unlock spend");
        Ok(TimeLockSpendTx {
            tx: LedgerTx::new(tx),
            unlocks,
            fee,
        })
    }
}

/// Fetches a proof for every binding transaction the inputs wait on and fills the unlock
/// witnesses.
pub async fn finalize_time_lock_spend<A: AssetsService>(
    ctx: &NetworkContext,
    spend: TimeLockSpendTx,
    service: &A,
) -> FinalizeResult<LedgerTx<Finalized>> {
    let TimeLockSpendTx {
        mut tx, unlocks, ..
    } = spend;

    let mut proofs = BTreeMap::<Txid, Vec<u8>>::new();
    let mut spv_clients = Vec::new();

    for args in &unlocks {
        let btc_txid = args.btc_txid.ok_or_else(|| {
            FinalizeError::InvalidVirtualTx("time lock without binding txid".to_string())
        })?;

        if proofs.contains_key(&btc_txid) {
            continue;
        }

        let proof = service.get_spv_proof(btc_txid, args.after).await?;
        debug!(%btc_txid, after = args.after, "fetched time lock proof");

        spv_clients.push(proof.spv_client);
        proofs.insert(btc_txid, proof.proof);
    }

    let inner = tx.inner_mut();
    if inner.inputs.len() != unlocks.len() {
        return Err(FinalizeError::InvalidVirtualTx(format!(
            "{} inputs but {} unlocks",
            inner.inputs.len(),
            unlocks.len()
        )));
    }

    inner.witnesses.resize(inner.inputs.len(), Witness::Empty);
    for (slot, args) in unlocks.iter().enumerate() {
        let proof = args
            .btc_txid
            .and_then(|txid| proofs.get(&txid))
            .ok_or_else(|| FinalizeError::InvalidVirtualTx("missing proof".to_string()))?;

        inner.witnesses[slot] = BtcTimeUnlock {
            proof: proof.clone(),
        }
        .to_witness();
    }

    for out_point in spv_clients {
        inner.add_cell_dep(CellDep {
            out_point,
            dep_type: DepType::Code,
        });
    }

    info!(tx_hash = %tx.tx_hash(), inputs = unlocks.len(), "finalized timed-unlock spend");
    Ok(tx.try_finalize(ctx)?)
}
