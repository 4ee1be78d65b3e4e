use rgbpp_primitives::{
    context::{unlockable_lock_script, NetworkContext},
    seal::SealReference,
    token::{encode_udt_amount, TokenInfo},
    type_id::unique_type_args,
    types::{CellDep, LiveCell},
};

use super::{existing_seal_lock, first_input};
use crate::{
    errors::BuildResult,
    payload::{AssetPayload, InputSelection, OutputSpec},
};

/// Issues a new xUDT token from the capacity cells sealed to `owner`.
///
/// Produces the token cell sealed to binding output 1, which absorbs the fee, and the token-info
/// cell under a timed-unlock lock that releases to the unlockable lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issuance {
    /// The seal the funding cells are locked to.
    pub owner: SealReference,

    /// The token metadata.
    pub token_info: TokenInfo,

    /// The total supply.
    pub amount: u128,
}

impl AssetPayload for Issuance {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Capacity {
            lock: existing_seal_lock(ctx, &self.owner)?,
        })
    }

    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let owner_lock = existing_seal_lock(ctx, &self.owner)?;
        let first = first_input(inputs)?.as_input();

        let xudt_type = ctx.xudt_type(owner_lock.hash().as_bytes().to_vec());
        let info_lock = ctx.btc_time_lock(
            unlockable_lock_script(),
            ctx.protocol().btc_time_lock_confirmations,
            None,
        )?;
        let info_type = ctx.unique_type(unique_type_args(&first, 1).to_vec());

        Ok(vec![
            OutputSpec::sealed(xudt_type, encode_udt_amount(self.amount).to_vec()).remainder(),
            OutputSpec::locked(info_lock, info_type, self.token_info.encode()?),
        ])
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.xudt_dep(), ctx.unique_dep()]
    }
}
