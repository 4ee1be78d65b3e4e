//! Turning a virtual transaction into a broadcastable one once its binding transaction exists.
//!
//! Finalization rewrites every pre-seal lock to the real binding txid, replaces the placeholder
//! witness with the seal unlock and adds the deps the unlock needs. When the build fell short of
//! capacity, a paymaster cell is prepended as input 0 and signed for. The seal unlock is built
//! for the input and output counts of the virtual transaction, before the paymaster joins.

use bitcoin::{consensus, Transaction, Txid};
use rgbpp_primitives::{
    capacity::{estimate_tx_fee, output_min_capacity},
    commitment::{verify_commitment, Commitment},
    context::NetworkContext,
    errors::PrimitiveError,
    ledger_tx::{Finalized, LedgerTx, Unfinalized, VirtualTxResult},
    packed::witness_args_placeholder,
    params::tx::SECP256K1_WITNESS_LOCK_SIZE,
    seal::{rewrite_time_lock_with_real_id, rewrite_with_real_id},
    types::{CellDep, DepType, LiveCell, VirtualTransaction},
    witness::RgbppUnlock,
};
use rgbpp_rpc::{traits::AssetsService, types::SpvProof};
use tracing::{debug, info};

use crate::{
    errors::{FinalizeError, FinalizeResult},
    signer::{sign_group, LedgerSigner},
};

/// Finalizes a virtual transaction that does not need a paymaster.
pub fn finalize(
    ctx: &NetworkContext,
    result: &VirtualTxResult,
    btc_tx: &Transaction,
    proof: &SpvProof,
) -> FinalizeResult<LedgerTx<Finalized>> {
    if result.needs_paymaster {
        return Err(FinalizeError::PaymasterRequired);
    }

    let tx = bind(ctx, result, btc_tx, proof)?;

    info!(tx_hash = %tx.tx_hash(), "finalized virtual transaction");
    Ok(tx.try_finalize(ctx)?)
}

/// Fetches the proof of `btc_tx` from the assets service and finalizes.
pub async fn finalize_from_service<A: AssetsService>(
    ctx: &NetworkContext,
    result: &VirtualTxResult,
    btc_tx: &Transaction,
    service: &A,
) -> FinalizeResult<LedgerTx<Finalized>> {
    let btc_txid = btc_tx.compute_txid();
    let proof = service
        .get_spv_proof(btc_txid, ctx.protocol().spv_confirmations)
        .await?;

    debug!(%btc_txid, proof_len = proof.proof.len(), "fetched spv proof");
    finalize(ctx, result, btc_tx, &proof)
}

/// Finalizes with a paymaster cell covering the capacity shortfall.
///
/// The paymaster cell becomes input 0 with its witness in slot 0, and must be locked by `signer`.
/// The change output is recomputed from the enlarged input set and the new fee.
pub fn finalize_with_paymaster<S: LedgerSigner>(
    ctx: &NetworkContext,
    result: &VirtualTxResult,
    btc_tx: &Transaction,
    proof: &SpvProof,
    paymaster: &LiveCell,
    signer: &S,
) -> FinalizeResult<LedgerTx<Finalized>> {
    let change_index = result.change_index.ok_or_else(|| {
        FinalizeError::InvalidVirtualTx("no change output to refund the paymaster".to_string())
    })?;

    if paymaster.cell.lock != ctx.secp256k1_lock(signer.pubkey_hash()) {
        return Err(FinalizeError::Signing(
            "paymaster cell is not locked by the signer".to_string(),
        ));
    }

    let mut tx = bind(ctx, result, btc_tx, proof)?;
    let inner = tx.inner_mut();

    inner.inputs.insert(0, paymaster.as_input());
    inner
        .witnesses
        .insert(0, witness_args_placeholder(SECP256K1_WITNESS_LOCK_SIZE));
    inner.add_cell_dep(ctx.secp256k1_dep());

    let fee = estimate_tx_fee(inner, 0, ctx.protocol().ckb_fee_rate);
    let available = result
        .sum_inputs_capacity
        .checked_add(paymaster.cell.capacity)
        .ok_or(PrimitiveError::Overflow("inputs plus paymaster"))?;
    let others = inner
        .outputs
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != change_index)
        .try_fold(0u64, |acc, (_, output)| acc.checked_add(output.capacity))
        .ok_or(PrimitiveError::Overflow("sum of output capacity"))?;

    let change = inner.outputs.get(change_index).ok_or_else(|| {
        FinalizeError::InvalidVirtualTx(format!("no output at change index {change_index}"))
    })?;
    let required = others
        .saturating_add(fee)
        .saturating_add(output_min_capacity(change, 0));

    if available < required {
        return Err(FinalizeError::PaymasterCapacityTooLow {
            required,
            available,
        });
    }

    inner.outputs[change_index].capacity = available - others - fee;
    sign_group(inner, &[0], signer)?;

    info!(
        tx_hash = %tx.tx_hash(),
        paymaster = %paymaster.out_point.tx_hash,
        fee,
        "finalized virtual transaction with paymaster"
    );
    Ok(tx.try_finalize(ctx)?)
}

/// Signs a transaction whose inputs are all locked by `signer` and carry no seal placeholder.
///
/// Used for leaps onto the binding chain and for preparing seal cells.
pub fn finalize_signed<S: LedgerSigner>(
    ctx: &NetworkContext,
    tx: LedgerTx<Unfinalized>,
    signer: &S,
) -> FinalizeResult<LedgerTx<Finalized>> {
    let mut tx = tx;
    let inner = tx.inner_mut();

    if !inner.placeholder_slots().is_empty() {
        return Err(FinalizeError::InvalidVirtualTx(
            "seal placeholders can only be filled from a binding transaction".to_string(),
        ));
    }

    inner.add_cell_dep(ctx.secp256k1_dep());
    let group: Vec<usize> = (0..inner.inputs.len()).collect();
    sign_group(inner, &group, signer)?;

    info!(tx_hash = %tx.tx_hash(), "signed ledger transaction");
    Ok(tx.try_finalize(ctx)?)
}

/// Rewrites every pre-seal and pre-time-lock output of `tx` to `btc_txid`.
pub fn rewrite_seals(
    ctx: &NetworkContext,
    tx: &mut VirtualTransaction,
    btc_txid: Txid,
) -> FinalizeResult<usize> {
    let mut rewritten = 0;

    for output in &mut tx.outputs {
        if ctx.is_rgbpp_lock(&output.lock) {
            output.lock.args = rewrite_with_real_id(&output.lock.args, btc_txid)?;
            rewritten += 1;
        } else if ctx.is_btc_time_lock(&output.lock) {
            output.lock.args = rewrite_time_lock_with_real_id(&output.lock.args, btc_txid)?;
            rewritten += 1;
        }
    }

    Ok(rewritten)
}

/// The binding transaction without its segwit witnesses, as the seal lock hashes it.
pub fn stripped_btc_tx(btc_tx: &Transaction) -> Vec<u8> {
    let mut stripped = btc_tx.clone();
    for input in &mut stripped.input {
        input.witness.clear();
    }

    consensus::serialize(&stripped)
}

fn bind(
    ctx: &NetworkContext,
    result: &VirtualTxResult,
    btc_tx: &Transaction,
    proof: &SpvProof,
) -> FinalizeResult<LedgerTx<Unfinalized>> {
    let btc_txid = btc_tx.compute_txid();

    let carried = btc_tx
        .output
        .first()
        .and_then(|output| Commitment::from_script(&output.script_pubkey));
    if carried != Some(result.commitment) {
        return Err(FinalizeError::BindingTxMismatch(format!(
            "{btc_txid} does not carry commitment {}",
            result.commitment
        )));
    }

    let mut tx = result.tx.clone();
    let inner = tx.inner_mut();
    verify_commitment(&result.commitment, inner)?;

    let rewritten = rewrite_seals(ctx, inner, btc_txid)?;

    let slots = inner.placeholder_slots();
    let [slot] = slots.as_slice() else {
        return Err(FinalizeError::InvalidVirtualTx(format!(
            "expected one placeholder witness, found {}",
            slots.len()
        )));
    };

    let unlock = RgbppUnlock::new(
        inner.inputs.len(),
        inner.outputs.len(),
        stripped_btc_tx(btc_tx),
        proof.proof.clone(),
    )?;
    inner.witnesses[*slot] = unlock.to_witness();

    inner.add_cell_dep(ctx.rgbpp_lock_dep());
    inner.add_cell_dep(ctx.btc_time_lock_dep());
    inner.add_cell_dep(CellDep {
        out_point: proof.spv_client,
        dep_type: DepType::Code,
    });

    debug!(%btc_txid, rewritten, slot, "bound virtual transaction");
    Ok(tx)
}
