//! Typestate wrapper separating transactions that still carry placeholders from those ready to be
//! broadcast.

use std::marker::PhantomData;

use crate::{
    commitment::Commitment,
    context::NetworkContext,
    errors::{PrimitiveError, PrimitiveResult},
    seal::{decode_seal, BtcTimeLockArgs},
    types::{Byte32, VirtualTransaction},
};

/// Marker for a transaction whose seals and witnesses may still be placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unfinalized;

/// Marker for a transaction whose seals, witnesses and signatures are all final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Finalized;

/// A ledger transaction in a given lifecycle state.
///
/// Only `LedgerTx<Finalized>` can be broadcast. The only way to get one is
/// [`LedgerTx::try_finalize`], which refuses transactions that still carry placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerTx<State = Unfinalized> {
    tx: VirtualTransaction,

    state: PhantomData<State>,
}

impl<State> LedgerTx<State> {
    /// Returns the inner transaction.
    pub const fn inner(&self) -> &VirtualTransaction {
        &self.tx
    }

    /// Consumes the wrapper and returns the inner transaction.
    pub fn into_inner(self) -> VirtualTransaction {
        self.tx
    }

    /// The transaction hash.
    pub fn tx_hash(&self) -> Byte32 {
        self.tx.tx_hash()
    }
}

impl LedgerTx<Unfinalized> {
    /// Wraps a freshly built transaction.
    pub const fn new(tx: VirtualTransaction) -> Self {
        Self {
            tx,
            state: PhantomData,
        }
    }

    /// Mutable access, available only before finalization.
    pub fn inner_mut(&mut self) -> &mut VirtualTransaction {
        &mut self.tx
    }

    /// Marks the transaction as final.
    ///
    /// Fails with [`PrimitiveError::NotFinalized`] while any witness is still the seal placeholder
    /// or any seal or timed-unlock output still points at a binding transaction that is not known.
    pub fn try_finalize(self, ctx: &NetworkContext) -> PrimitiveResult<LedgerTx<Finalized>> {
        let tx = &self.tx;

        if let Some(slot) = tx.placeholder_slots().first() {
            return Err(PrimitiveError::NotFinalized(format!(
                "witness {slot} is still a placeholder"
            )));
        }

        for (index, output) in tx.outputs.iter().enumerate() {
            let unbound = if ctx.is_rgbpp_lock(&output.lock) {
                decode_seal(&output.lock.args)?.is_placeholder()
            } else if ctx.is_btc_time_lock(&output.lock) {
                BtcTimeLockArgs::decode(&output.lock.args)?.btc_txid.is_none()
            } else {
                false
            };

            if unbound {
                return Err(PrimitiveError::NotFinalized(format!(
                    "output {index} is not bound to a binding transaction"
                )));
            }
        }

        Ok(LedgerTx {
            tx: self.tx,
            state: PhantomData,
        })
    }
}

/// What a virtual-transaction builder hands to the binding-chain side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualTxResult {
    /// The ledger transaction, with pre-seal locks and a placeholder witness.
    pub tx: LedgerTx<Unfinalized>,

    /// The commitment to embed in the binding transaction.
    pub commitment: Commitment,

    /// Whether the inputs fall short of the outputs plus fee and a paymaster cell must be added
    /// at finalization.
    pub needs_paymaster: bool,

    /// Total capacity of the selected inputs, in shannons.
    pub sum_inputs_capacity: u64,

    /// The fee accounted for at build time, in shannons.
    pub fee: u64,

    /// Index of the typeless change output, if the transaction has one.
    pub change_index: Option<usize>,
}

#[cfg(test)]
mod tests {
    use bitcoin::{hashes::Hash, Txid};

    use super::*;
    use crate::{
        context::testnet_context,
        types::{CellInput, CellOutput, OutPoint, Script, Witness},
    };

    fn tx_with(ctx: &NetworkContext, lock: Script, witness: Witness) -> LedgerTx {
        LedgerTx::new(VirtualTransaction {
            inputs: vec![CellInput::new(OutPoint::new(Byte32::new([1; 32]), 0))],
            outputs: vec![CellOutput {
                capacity: 0,
                lock,
                type_: Some(ctx.xudt_type(vec![2; 32])),
            }],
            outputs_data: vec![Vec::new()],
            witnesses: vec![witness],
            ..Default::default()
        })
    }

    #[test]
    fn placeholder_witness_cannot_be_finalized() {
        let ctx = testnet_context();
        let bound = ctx
            .rgbpp_lock(1, Some(Txid::from_byte_array([3; 32])))
            .unwrap();

        let err = tx_with(&ctx, bound, Witness::Placeholder)
            .try_finalize(&ctx)
            .unwrap_err();

        assert!(matches!(err, PrimitiveError::NotFinalized(_)));
    }

    #[test]
    fn pre_seal_output_cannot_be_finalized() {
        let ctx = testnet_context();
        let pre_seal = ctx.rgbpp_lock(1, None).unwrap();

        let err = tx_with(&ctx, pre_seal, Witness::Bytes(vec![1]))
            .try_finalize(&ctx)
            .unwrap_err();

        assert!(matches!(err, PrimitiveError::NotFinalized(_)));
    }

    #[test]
    fn unbound_time_lock_cannot_be_finalized() {
        let ctx = testnet_context();
        let target = ctx.secp256k1_lock([4; 20]);
        let time_lock = ctx.btc_time_lock(target, 6, None).unwrap();

        let err = tx_with(&ctx, time_lock, Witness::Bytes(vec![1]))
            .try_finalize(&ctx)
            .unwrap_err();

        assert!(matches!(err, PrimitiveError::NotFinalized(_)));
    }

    #[test]
    fn bound_transaction_is_finalized() {
        let ctx = testnet_context();
        let txid = Txid::from_byte_array([3; 32]);
        let bound = ctx.rgbpp_lock(1, Some(txid)).unwrap();

        let finalized = tx_with(&ctx, bound, Witness::Bytes(vec![1]))
            .try_finalize(&ctx)
            .unwrap();

        assert_eq!(finalized.inner().witnesses, vec![Witness::Bytes(vec![1])]);
    }
}
