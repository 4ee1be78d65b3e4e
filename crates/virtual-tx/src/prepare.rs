//! Preparing the seal-locked capacity cells that issuance and cluster creation consume.
//!
//! These are plain ledger transactions from a secp256k1 lock, finalized with
//! [`finalize_signed`](crate::finalize::finalize_signed).

use rgbpp_primitives::{
    capacity::{estimate_tx_fee, output_min_capacity, sum_capacity},
    constants::UDT_AMOUNT_SIZE,
    context::NetworkContext,
    ledger_tx::{LedgerTx, Unfinalized},
    params::tx::MAX_CKB_FEE,
    seal::SealReference,
    token::TokenInfo,
    types::{CellOutput, LiveCell, Script, VirtualTransaction, Witness},
};
use rgbpp_rpc::traits::LedgerRpc;
use tracing::info;

use crate::{
    builder::{collect_inputs, signature_witness_size},
    errors::{BuildError, BuildResult},
    payload::InputSelection,
    payloads::ClusterData,
};

/// A seal cell preparation ready to be signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTx {
    /// The ledger transaction.
    pub tx: LedgerTx<Unfinalized>,

    /// The fee paid.
    pub fee: u64,
}

/// Creates one typeless cell sealed to an existing binding output.
#[derive(Debug, Clone)]
pub struct SealCellPreparation<'a> {
    ctx: &'a NetworkContext,

    from_lock: Script,

    seal: SealReference,

    capacity: u64,
}

impl<'a> SealCellPreparation<'a> {
    /// Prepares a cell of `capacity` shannons sealed to `seal`, funded from `from_lock`.
    pub const fn new(
        ctx: &'a NetworkContext,
        from_lock: Script,
        seal: SealReference,
        capacity: u64,
    ) -> Self {
        Self {
            ctx,
            from_lock,
            seal,
            capacity,
        }
    }

    /// Prepares the cell an [`Issuance`](crate::payloads::Issuance) of `token_info` will consume.
    pub fn for_issuance(
        ctx: &'a NetworkContext,
        from_lock: Script,
        seal: SealReference,
        token_info: &TokenInfo,
    ) -> BuildResult<Self> {
        let capacity = issuance_cell_capacity(ctx, &seal, token_info)?;
        Ok(Self::new(ctx, from_lock, seal, capacity))
    }

    /// Prepares the cell a [`CreateCluster`](crate::payloads::CreateCluster) will consume.
    pub fn for_cluster(
        ctx: &'a NetworkContext,
        from_lock: Script,
        seal: SealReference,
        cluster_data: &ClusterData,
    ) -> BuildResult<Self> {
        let capacity = cluster_cell_capacity(ctx, cluster_data)?;
        Ok(Self::new(ctx, from_lock, seal, capacity))
    }

    /// The capacity of the prepared cell.
    pub const fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Collects the funding cells and builds the preparation.
    pub async fn build_with<L: LedgerRpc>(&self, ledger: &L) -> BuildResult<PreparedTx> {
        let selection = InputSelection::Capacity {
            lock: self.from_lock.clone(),
        };
        let cells = collect_inputs(ledger, &selection).await?;
        self.build(&cells)
    }

    /// Builds the preparation, consuming as few of `cells` as needed in the given order.
    pub fn build(&self, cells: &[LiveCell]) -> BuildResult<PreparedTx> {
        let ctx = self.ctx;
        let protocol = ctx.protocol();

        if self.seal.is_placeholder() {
            return Err(BuildError::InvalidPayload(
                "a prepared cell must be sealed to an existing binding output".to_string(),
            ));
        }

        let sealed = CellOutput {
            capacity: self.capacity,
            lock: ctx.rgbpp_lock(self.seal.out_index, self.seal.binding_txid)?,
            type_: None,
        };
        let sealed_min = output_min_capacity(&sealed, 0);
        if self.capacity < sealed_min {
            return Err(BuildError::InsufficientCapacity {
                required: sealed_min,
                available: self.capacity,
            });
        }

        let change = CellOutput {
            capacity: 0,
            lock: self.from_lock.clone(),
            type_: None,
        };
        let change_min = output_min_capacity(&change, 0);
        let target = self
            .capacity
            .saturating_add(change_min)
            .saturating_add(MAX_CKB_FEE);

        let mut inputs = Vec::new();
        let mut collected = 0u64;
        for cell in cells {
            if collected >= target {
                break;
            }
            collected = collected.saturating_add(cell.cell.capacity);
            inputs.push(cell.clone());
        }

        if inputs.is_empty() {
            return Err(BuildError::NoEligibleCell(
                "no capacity cell to fund the seal cell".to_string(),
            ));
        }

        let mut tx = VirtualTransaction {
            inputs: inputs.iter().map(LiveCell::as_input).collect(),
            outputs: vec![sealed, change],
            outputs_data: vec![Vec::new(), Vec::new()],
            witnesses: vec![Witness::Empty; inputs.len()],
            ..Default::default()
        };

        let fee = estimate_tx_fee(&tx, signature_witness_size(), protocol.ckb_fee_rate);
        let sum_inputs = sum_capacity(inputs.iter().map(|cell| &cell.cell))?;
        let required = self
            .capacity
            .saturating_add(fee)
            .saturating_add(change_min);

        if sum_inputs < required {
            return Err(BuildError::InsufficientCapacity {
                required,
                available: sum_inputs,
            });
        }
        tx.outputs[1].capacity = sum_inputs - self.capacity - fee;

        info!(
            seal_index = self.seal.out_index,
            capacity = self.capacity,
            fee,
            "built seal cell preparation"
        );
        Ok(PreparedTx {
            tx: LedgerTx::new(tx),
            fee,
        })
    }
}

/// Capacity of the cell an issuance consumes: the sealed token cell, the token-info cell and a
/// fee reserve.
pub fn issuance_cell_capacity(
    ctx: &NetworkContext,
    owner: &SealReference,
    token_info: &TokenInfo,
) -> BuildResult<u64> {
    let owner_lock = ctx.rgbpp_lock(owner.out_index, owner.binding_txid)?;
    let token_cell = CellOutput {
        capacity: 0,
        lock: ctx.rgbpp_lock(1, None)?,
        type_: Some(ctx.xudt_type(owner_lock.hash().as_bytes().to_vec())),
    };

    Ok(output_min_capacity(&token_cell, UDT_AMOUNT_SIZE)
        .saturating_add(token_info.cell_capacity(ctx)?)
        .saturating_add(MAX_CKB_FEE))
}

/// Capacity of the cell a cluster creation consumes: the sealed cluster cell and a fee reserve.
pub fn cluster_cell_capacity(ctx: &NetworkContext, cluster_data: &ClusterData) -> BuildResult<u64> {
    let cluster_cell = CellOutput {
        capacity: 0,
        lock: ctx.rgbpp_lock(1, None)?,
        type_: Some(ctx.cluster_type(vec![0u8; 32])),
    };

    Ok(output_min_capacity(&cluster_cell, cluster_data.encode().len()).saturating_add(MAX_CKB_FEE))
}

#[cfg(test)]
mod tests {
    use rgbpp_primitives::types::OutPoint;
    use rgbpp_test_utils::{
        cells::{capacity_cell, ckb, generate_secret_key, txid},
        context::test_context,
        mocks::MockLedger,
    };

    use super::*;
    use crate::{
        builder::SealBuilder,
        finalize::finalize_signed,
        payloads::Issuance,
        signer::{LedgerSigner, Secp256k1Signer},
    };

    fn token_info() -> TokenInfo {
        TokenInfo {
            decimal: 8,
            name: "RGBPP Test Token".to_string(),
            symbol: "RTT".to_string(),
        }
    }

    #[tokio::test]
    async fn issuance_cell_funds_the_issuance() {
        let ctx = test_context();
        let signer = Secp256k1Signer::new(generate_secret_key());
        let from_lock = ctx.secp256k1_lock(signer.pubkey_hash());
        let seal = SealReference::new(1, txid(0x0b));
        let ledger = MockLedger::with_cells([
            capacity_cell(0xb0, ckb(300), from_lock.clone()),
            capacity_cell(0xb1, ckb(300), from_lock.clone()),
            capacity_cell(0xb2, ckb(1_000), from_lock.clone()),
        ]);

        let preparation =
            SealCellPreparation::for_issuance(&ctx, from_lock.clone(), seal, &token_info()).unwrap();
        let prepared = preparation.build_with(&ledger).await.unwrap();
        let tx = prepared.tx.inner();

        assert_eq!(tx.inputs.len(), 2);
        assert_eq!(tx.outputs[0].capacity, preparation.capacity());
        assert_eq!(tx.outputs[0].lock, ctx.rgbpp_lock(1, Some(txid(0x0b))).unwrap());
        assert_eq!(tx.outputs[1].lock, from_lock);
        assert_eq!(
            tx.outputs[1].capacity,
            ckb(600) - preparation.capacity() - prepared.fee
        );

        let signed = finalize_signed(&ctx, prepared.tx.clone(), &signer).unwrap();
        let seal_cell = LiveCell {
            out_point: OutPoint::new(signed.tx_hash(), 0),
            cell: signed.inner().cell(0).unwrap(),
        };

        let payload = Issuance {
            owner: seal,
            token_info: token_info(),
            amount: 1_000_000,
        };
        let issued = SealBuilder::new(&ctx, payload).build(&[seal_cell]).unwrap();
        assert!(!issued.needs_paymaster);
    }

    #[test]
    fn cluster_cell_covers_cluster_and_reserve() {
        let ctx = test_context();
        let data = ClusterData {
            name: "Cluster".to_string(),
            description: "A test cluster".to_string(),
        };
        let cluster_cell = CellOutput {
            capacity: 0,
            lock: ctx.rgbpp_lock(1, None).unwrap(),
            type_: Some(ctx.cluster_type(vec![0u8; 32])),
        };

        assert_eq!(
            cluster_cell_capacity(&ctx, &data).unwrap(),
            output_min_capacity(&cluster_cell, data.encode().len()) + MAX_CKB_FEE
        );
    }

    #[test]
    fn too_little_funding_is_rejected() {
        let ctx = test_context();
        let from_lock = ctx.secp256k1_lock([0x0c; 20]);
        let preparation = SealCellPreparation::new(
            &ctx,
            from_lock.clone(),
            SealReference::new(1, txid(0x0c)),
            ckb(500),
        );

        let err = preparation
            .build(&[capacity_cell(0xc0, ckb(100), from_lock)])
            .unwrap_err();

        assert!(matches!(err, BuildError::InsufficientCapacity { .. }));
    }

    #[test]
    fn placeholder_seal_is_rejected() {
        let ctx = test_context();
        let from_lock = ctx.secp256k1_lock([0x0c; 20]);
        let preparation =
            SealCellPreparation::new(&ctx, from_lock.clone(), SealReference::placeholder(1), ckb(500));

        let err = preparation
            .build(&[capacity_cell(0xc1, ckb(1_000), from_lock)])
            .unwrap_err();

        assert!(matches!(err, BuildError::InvalidPayload(_)));
    }
}
