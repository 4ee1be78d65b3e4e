use rgbpp_primitives::{
    context::NetworkContext,
    seal::SealReference,
    token::encode_udt_amount,
    types::{CellDep, LiveCell, Script},
};

use super::{existing_seal_lock, sum_amounts, sum_udt_amount, udt_change};
use crate::{
    errors::{BuildError, BuildResult},
    payload::{AssetPayload, InputSelection, OutputSpec},
};

/// Moves xUDT held under one or more seals to new seals, one per amount.
///
/// Any amount left over is re-sealed after the receivers. Capacity change goes to
/// `change_lock`, and a paymaster may cover a shortfall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    /// The seals holding the xUDT cells to spend.
    pub from: Vec<SealReference>,

    /// The xUDT type script.
    pub xudt_type: Script,

    /// The amount for each receiver, in binding output order.
    pub amounts: Vec<u128>,

    /// The lock of the typeless change output.
    pub change_lock: Script,
}

impl AssetPayload for Transfer {
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

    fn outputs(&self, _ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let required = sum_amounts(&self.amounts)?;
        let change = udt_change(sum_udt_amount(inputs, &self.xudt_type)?, required)?;

        let mut outputs: Vec<OutputSpec> = self
            .amounts
            .iter()
            .map(|amount| {
                OutputSpec::sealed(self.xudt_type.clone(), encode_udt_amount(*amount).to_vec())
            })
            .collect();

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

/// Sweeps every xUDT cell of one type held under `from` into a single new seal.
///
/// Nothing is re-sealed for the sender. Capacity change goes to `change_lock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferAll {
    /// The seals to sweep.
    pub from: Vec<SealReference>,

    /// The xUDT type script.
    pub xudt_type: Script,

    /// The lock of the typeless change output.
    pub change_lock: Script,
}

impl AssetPayload for TransferAll {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        if self.from.is_empty() {
            return Err(BuildError::InvalidPayload("no seal to sweep".to_string()));
        }

        Ok(InputSelection::Assets {
            locks: self
                .from
                .iter()
                .map(|seal| existing_seal_lock(ctx, seal))
                .collect::<BuildResult<_>>()?,
            type_: self.xudt_type.clone(),
        })
    }

    fn outputs(&self, _ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let total = sum_udt_amount(inputs, &self.xudt_type)?;
        if total == 0 {
            return Err(BuildError::InvalidPayload(
                "the swept seals hold no xUDT".to_string(),
            ));
        }

        Ok(vec![OutputSpec::sealed(
            self.xudt_type.clone(),
            encode_udt_amount(total).to_vec(),
        )])
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
