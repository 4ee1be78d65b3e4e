//! The asset operations that plug into [`SealBuilder`](crate::builder::SealBuilder).

mod cluster;
mod issuance;
mod leap;
mod spore;
mod transfer;

pub use cluster::{ClusterData, CreateCluster};
pub use issuance::Issuance;
pub use leap::{LeapToBtc, LeapToLedger};
pub use spore::{CreateSpores, LeapSporeToLedger, SporeData, TransferSpore};
pub use transfer::{Transfer, TransferAll};

use rgbpp_primitives::{
    context::NetworkContext,
    seal::SealReference,
    token::decode_udt_amount,
    types::{LiveCell, Script},
};

use crate::errors::{BuildError, BuildResult};

/// The lock of a cell sealed to an existing binding output.
pub(crate) fn existing_seal_lock(ctx: &NetworkContext, seal: &SealReference) -> BuildResult<Script> {
    if seal.is_placeholder() {
        return Err(BuildError::InvalidPayload(format!(
            "seal at output {} does not reference a binding transaction",
            seal.out_index
        )));
    }

    Ok(ctx.rgbpp_lock(seal.out_index, seal.binding_txid)?)
}

/// The first selected input, from which type ids are derived.
pub(crate) fn first_input(inputs: &[LiveCell]) -> BuildResult<&LiveCell> {
    inputs
        .first()
        .ok_or_else(|| BuildError::NoEligibleCell("no input cells were selected".to_string()))
}

/// The input carrying `type_`.
pub(crate) fn input_with_type<'a>(inputs: &'a [LiveCell], type_: &Script) -> BuildResult<&'a LiveCell> {
    inputs
        .iter()
        .find(|cell| cell.cell.type_.as_ref() == Some(type_))
        .ok_or_else(|| {
            BuildError::NoEligibleCell(format!("no input carries type {}", type_.hash()))
        })
}

/// Sums the xUDT amounts of the inputs carrying `xudt_type`.
pub(crate) fn sum_udt_amount(inputs: &[LiveCell], xudt_type: &Script) -> BuildResult<u128> {
    inputs
        .iter()
        .filter(|cell| cell.cell.type_.as_ref() == Some(xudt_type))
        .try_fold(0u128, |acc, cell| {
            let amount = decode_udt_amount(&cell.cell.data)?;
            acc.checked_add(amount).ok_or_else(|| {
                BuildError::InvalidPayload("input xUDT amounts overflow".to_string())
            })
        })
}

/// Sums the amounts to send, rejecting an empty list.
pub(crate) fn sum_amounts(amounts: &[u128]) -> BuildResult<u128> {
    if amounts.is_empty() {
        return Err(BuildError::InvalidPayload("no amount to send".to_string()));
    }

    amounts.iter().try_fold(0u128, |acc, amount| {
        acc.checked_add(*amount)
            .ok_or_else(|| BuildError::InvalidPayload("amounts overflow".to_string()))
    })
}

/// The xUDT left over after sending `required`, failing if the inputs hold too little.
pub(crate) fn udt_change(available: u128, required: u128) -> BuildResult<u128> {
    available
        .checked_sub(required)
        .ok_or(BuildError::InsufficientAmount {
            required,
            available,
        })
}
