//! Moving xUDT between seal custody and ledger custody.

use rgbpp_primitives::{
    context::NetworkContext,
    seal::SealReference,
    token::encode_udt_amount,
    types::{CellDep, LiveCell, Script},
};

use super::{existing_seal_lock, sum_amounts, sum_udt_amount, udt_change};
use crate::{
    errors::BuildResult,
    payload::{AssetPayload, InputSelection, OutputSpec},
};

/// Leaps xUDT from seals to a ledger lock.
///
/// The leaped amount lands in a timed-unlock cell that releases to `to_lock` once the binding
/// transaction has enough confirmations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeapToLedger {
    /// The seals holding the xUDT cells to spend.
    pub from: Vec<SealReference>,

    /// The xUDT type script.
    pub xudt_type: Script,

    /// The amount to leap.
    pub amount: u128,

    /// The ledger lock the timed-unlock cell releases to.
    pub to_lock: Script,

    /// The lock of the typeless change output.
    pub change_lock: Script,
}

impl AssetPayload for LeapToLedger {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Assets {
            locks: self
                .from
                .iter()
                .map(|seal| existing_seal_lock(ctx, seal))
                .collect::<BuildResult<_>>()?,
            type_: self.xudt_type.clone(),
        })
    }

    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let required = sum_amounts(&[self.amount])?;
        let change = udt_change(sum_udt_amount(inputs, &self.xudt_type)?, required)?;

        let landing_lock = ctx.btc_time_lock(
            self.to_lock.clone(),
            ctx.protocol().btc_time_lock_confirmations,
            None,
        )?;

        let mut outputs = vec![OutputSpec::locked(
            landing_lock,
            self.xudt_type.clone(),
            encode_udt_amount(self.amount).to_vec(),
        )];

        if change > 0 {
            outputs.push(OutputSpec::sealed(
                self.xudt_type.clone(),
                encode_udt_amount(change).to_vec(),
            ));
        }

        Ok(outputs)
    }

    fn change_lock(&self) -> Option<Script> {
        Some(self.change_lock.clone())
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.xudt_dep()]
    }

    fn allow_paymaster(&self) -> bool {
        true
    }
}

/// Leaps ledger-held xUDT onto an existing binding output.
///
/// The inputs are plain ledger cells, so the transaction carries no placeholder and is
/// completed with [`finalize_signed`](crate::finalize::finalize_signed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeapToBtc {
    /// The ledger lock holding the xUDT cells.
    pub from_lock: Script,

    /// The xUDT type script.
    pub xudt_type: Script,

    /// The amount to leap.
    pub amount: u128,

    /// The binding output that receives the amount.
    pub to_seal: SealReference,

    /// The lock of the typeless change output.
    pub change_lock: Script,
}

impl AssetPayload for LeapToBtc {
    fn input_selection(&self, _ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Assets {
            locks: vec![self.from_lock.clone()],
            type_: self.xudt_type.clone(),
        })
    }

    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let required = sum_amounts(&[self.amount])?;
        let change = udt_change(sum_udt_amount(inputs, &self.xudt_type)?, required)?;

        let mut outputs = vec![OutputSpec::locked(
            existing_seal_lock(ctx, &self.to_seal)?,
            self.xudt_type.clone(),
            encode_udt_amount(self.amount).to_vec(),
        )];

        if change > 0 {
            outputs.push(OutputSpec::locked(
                self.from_lock.clone(),
                self.xudt_type.clone(),
                encode_udt_amount(change).to_vec(),
            ));
        }

        Ok(outputs)
    }

    fn change_lock(&self) -> Option<Script> {
        Some(self.change_lock.clone())
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.xudt_dep()]
    }
}

#[cfg(test)]
mod tests {
    use rgbpp_primitives::{seal::BtcTimeLockArgs, token::decode_udt_amount};
    use rgbpp_test_utils::{
        cells::{ckb, live_cell, out_point, txid},
        context::test_context,
        mocks::MockLedger,
    };

    use super::*;
    use crate::builder::SealBuilder;

    #[tokio::test]
    async fn leap_to_ledger_lands_in_a_time_lock() {
        let ctx = test_context();
        let seal = SealReference::new(1, txid(0x04));
        let xudt_type = ctx.xudt_type(vec![0x09; 32]);
        let to_lock = ctx.secp256k1_lock([0x08; 20]);
        let ledger = MockLedger::with_cells([live_cell(
            out_point(0x40, 0),
            ckb(600),
            ctx.rgbpp_lock(1, Some(txid(0x04))).unwrap(),
            Some(xudt_type.clone()),
            encode_udt_amount(800).to_vec(),
        )]);

        let payload = LeapToLedger {
            from: vec![seal],
            xudt_type,
            amount: 500,
            to_lock: to_lock.clone(),
            change_lock: ctx.secp256k1_lock([0x07; 20]),
        };
        let result = SealBuilder::new(&ctx, payload)
            .build_with(&ledger)
            .await
            .unwrap();
        let tx = result.tx.inner();

        assert!(ctx.is_btc_time_lock(&tx.outputs[0].lock));
        let args = BtcTimeLockArgs::decode(&tx.outputs[0].lock.args).unwrap();
        assert_eq!(args.lock_script, to_lock);
        assert_eq!(args.after, ctx.protocol().btc_time_lock_confirmations);
        assert_eq!(args.btc_txid, None);
        assert_eq!(decode_udt_amount(&tx.outputs_data[0]).unwrap(), 500);

        assert!(ctx.is_rgbpp_lock(&tx.outputs[1].lock));
        assert_eq!(decode_udt_amount(&tx.outputs_data[1]).unwrap(), 300);
        assert_eq!(result.change_index, Some(2));
    }

    #[tokio::test]
    async fn leap_to_btc_needs_no_placeholder() {
        let ctx = test_context();
        let from_lock = ctx.secp256k1_lock([0x05; 20]);
        let xudt_type = ctx.xudt_type(vec![0x09; 32]);
        let to_seal = SealReference::new(3, txid(0x03));
        let ledger = MockLedger::with_cells([live_cell(
            out_point(0x41, 0),
            ckb(400),
            from_lock.clone(),
            Some(xudt_type.clone()),
            encode_udt_amount(1000).to_vec(),
        )]);

        let payload = LeapToBtc {
            from_lock: from_lock.clone(),
            xudt_type,
            amount: 600,
            to_seal,
            change_lock: from_lock.clone(),
        };
        let result = SealBuilder::new(&ctx, payload)
            .build_with(&ledger)
            .await
            .unwrap();
        let tx = result.tx.inner();

        assert!(tx.placeholder_slots().is_empty());
        assert_eq!(tx.outputs[0].lock, ctx.rgbpp_lock(3, Some(txid(0x03))).unwrap());
        assert_eq!(tx.outputs[1].lock, from_lock);
        assert_eq!(decode_udt_amount(&tx.outputs_data[1]).unwrap(), 400);
        assert!(!result.needs_paymaster);
    }
}
