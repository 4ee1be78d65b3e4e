//! The build skeleton shared by every seal-consuming operation.

use rgbpp_primitives::{
    capacity::{estimate_tx_fee, output_min_capacity, sum_capacity},
    context::NetworkContext,
    errors::PrimitiveError,
    ledger_tx::{LedgerTx, VirtualTxResult},
    packed::witness_args_with_lock,
    params::tx::SECP256K1_WITNESS_LOCK_SIZE,
    types::{CellOutput, LiveCell, VirtualTransaction, Witness},
};
use rgbpp_rpc::{traits::LedgerRpc, types::CellFilter};
use tracing::{debug, info};

use crate::{
    errors::{BuildError, BuildResult},
    payload::{AssetPayload, InputSelection, OutputCapacity, OutputLock},
};

/// Builds virtual transactions for one [`AssetPayload`].
///
/// Building is split in two halves. [`Self::collect_inputs`] queries the ledger for the cells the
/// payload selects; [`Self::build`] is pure and turns those cells into a [`VirtualTxResult`].
/// [`Self::build_with`] runs both.
#[derive(Debug, Clone)]
pub struct SealBuilder<'a, P> {
    ctx: &'a NetworkContext,

    payload: P,
}

impl<'a, P: AssetPayload> SealBuilder<'a, P> {
    /// Creates a builder for `payload` on the network described by `ctx`.
    pub const fn new(ctx: &'a NetworkContext, payload: P) -> Self {
        Self { ctx, payload }
    }

    /// The payload being built.
    pub const fn payload(&self) -> &P {
        &self.payload
    }

    /// Queries the ledger for the cells the payload consumes.
    pub async fn collect_inputs<L: LedgerRpc>(&self, ledger: &L) -> BuildResult<Vec<LiveCell>> {
        let selection = self.payload.input_selection(self.ctx)?;
        collect_inputs(ledger, &selection).await
    }

    /// Collects the inputs and builds the transaction.
    pub async fn build_with<L: LedgerRpc>(&self, ledger: &L) -> BuildResult<VirtualTxResult> {
        let inputs = self.collect_inputs(ledger).await?;
        self.build(&inputs)
    }

    /// Builds the virtual transaction consuming `inputs`, in the given order.
    pub fn build(&self, inputs: &[LiveCell]) -> BuildResult<VirtualTxResult> {
        let ctx = self.ctx;
        let protocol = ctx.protocol();

        if inputs.is_empty() {
            return Err(BuildError::NoEligibleCell(
                "no input cells were selected".to_string(),
            ));
        }

        let specs = self.payload.outputs(ctx, inputs)?;
        let change_lock = self.payload.change_lock();

        let remainders: Vec<usize> = specs
            .iter()
            .enumerate()
            .filter_map(|(i, spec)| (spec.capacity == OutputCapacity::Remainder).then_some(i))
            .collect();
        let remainder = match (change_lock.is_some(), remainders.as_slice()) {
            (true, []) => None,
            (false, [index]) => Some(*index),
            _ => {
                return Err(BuildError::InvalidPayload(
                    "exactly one output or the change output must absorb the fee".to_string(),
                ))
            }
        };

        let mut tx = VirtualTransaction {
            inputs: inputs.iter().map(LiveCell::as_input).collect(),
            ..Default::default()
        };
        for dep in self.payload.cell_deps(ctx) {
            tx.add_cell_dep(dep);
        }

        // binding output 0 carries the commitment
        let mut next_vout = 1u32;
        let mut minimums = Vec::with_capacity(specs.len() + 1);

        for spec in specs {
            let lock = match spec.lock {
                OutputLock::NextSeal => {
                    let lock = ctx.rgbpp_lock(next_vout, None)?;
                    next_vout += 1;
                    lock
                }
                OutputLock::Script(lock) => lock,
            };

            let mut output = CellOutput {
                capacity: 0,
                lock,
                type_: spec.type_,
            };
            let min = output_min_capacity(&output, spec.data.len());

            output.capacity = match spec.capacity {
                OutputCapacity::Min | OutputCapacity::Remainder => min,
                OutputCapacity::Exact(capacity) if capacity >= min => capacity,
                OutputCapacity::Exact(capacity) => {
                    return Err(BuildError::InsufficientCapacity {
                        required: min,
                        available: capacity,
                    })
                }
            };

            minimums.push(min);
            tx.outputs.push(output);
            tx.outputs_data.push(spec.data);
        }

        let change_index = match change_lock {
            Some(lock) => {
                let output = CellOutput {
                    capacity: 0,
                    lock,
                    type_: None,
                };
                let min = output_min_capacity(&output, 0);

                tx.outputs.push(CellOutput {
                    capacity: min,
                    ..output
                });
                tx.outputs_data.push(Vec::new());
                minimums.push(min);

                Some(tx.outputs.len() - 1)
            }
            None => None,
        };

        let seal_slot = inputs
            .iter()
            .position(|cell| ctx.is_rgbpp_lock(&cell.cell.lock));
        tx.witnesses = vec![Witness::Empty; inputs.len()];
        if let Some(slot) = seal_slot {
            tx.witnesses[slot] = Witness::Placeholder;
        }

        let allowance = if seal_slot.is_some() {
            protocol.witness_placeholder_size
        } else {
            signature_witness_size()
        };

        let size = tx.serialized_size() + allowance;
        if size > protocol.max_ckb_tx_size {
            return Err(BuildError::TxTooLarge {
                size,
                max: protocol.max_ckb_tx_size,
            });
        }

        let fee = estimate_tx_fee(&tx, allowance, protocol.ckb_fee_rate);
        let sum_inputs_capacity = sum_capacity(inputs.iter().map(|cell| &cell.cell))?;

        let sink = change_index
            .or(remainder)
            .ok_or_else(|| BuildError::InvalidPayload("no fee sink".to_string()))?;
        let others = tx
            .outputs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != sink)
            .try_fold(0u64, |acc, (_, output)| acc.checked_add(output.capacity))
            .ok_or(PrimitiveError::Overflow("sum of output capacity"))?;
        let spent = others
            .checked_add(fee)
            .ok_or(PrimitiveError::Overflow("outputs plus fee"))?;
        let sink_min = minimums[sink];

        let needs_paymaster = match sum_inputs_capacity.checked_sub(spent) {
            Some(left) if left >= sink_min => {
                tx.outputs[sink].capacity = left;
                false
            }
            _ if change_index.is_some() && self.payload.allow_paymaster() => true,
            _ => {
                return Err(BuildError::InsufficientCapacity {
                    required: spent.saturating_add(sink_min),
                    available: sum_inputs_capacity,
                })
            }
        };

        let commitment = tx.commitment()?;

        info!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            %commitment,
            fee,
            needs_paymaster,
            "built virtual transaction"
        );

        Ok(VirtualTxResult {
            tx: LedgerTx::new(tx),
            commitment,
            needs_paymaster,
            sum_inputs_capacity,
            fee,
            change_index,
        })
    }
}

/// Resolves an input selection against the ledger.
pub async fn collect_inputs<L: LedgerRpc>(
    ledger: &L,
    selection: &InputSelection,
) -> BuildResult<Vec<LiveCell>> {
    match selection {
        InputSelection::Capacity { lock } => {
            let cells = ledger.find_cells(&CellFilter::capacity(lock.clone())).await?;
            if cells.is_empty() {
                return Err(BuildError::NoEligibleCell(format!(
                    "no capacity cell under lock {}",
                    lock.hash()
                )));
            }

            debug!(count = cells.len(), "collected capacity cells");
            Ok(cells)
        }

        InputSelection::Assets { locks, type_ } => {
            let mut selected: Vec<LiveCell> = Vec::new();

            for lock in locks {
                let filter = CellFilter::typed(lock.clone(), type_.clone());
                let cells = ledger.find_cells(&filter).await?;
                if cells.is_empty() {
                    return Err(BuildError::NoEligibleCell(format!(
                        "no asset cell under lock {}",
                        lock.hash()
                    )));
                }

                for cell in cells {
                    if !selected.iter().any(|s| s.out_point == cell.out_point) {
                        selected.push(cell);
                    }
                }
            }

            debug!(count = selected.len(), "collected asset cells");
            Ok(selected)
        }

        InputSelection::Exact(out_points) => {
            let mut selected = Vec::with_capacity(out_points.len());
            for out_point in out_points {
                selected.push(ledger.get_live_cell(out_point).await?);
            }

            Ok(selected)
        }
    }
}

/// Bytes a `WitnessArgs` holding a recoverable secp256k1 signature occupies.
pub fn signature_witness_size() -> usize {
    witness_args_with_lock(&[0u8; SECP256K1_WITNESS_LOCK_SIZE]).len()
}
