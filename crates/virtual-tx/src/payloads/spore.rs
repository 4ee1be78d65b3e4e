//! Spores: non-fungible items minted into a cluster.

use ckb_types::{packed, prelude::*};
use rgbpp_primitives::{
    context::NetworkContext,
    packed::table,
    seal::SealReference,
    type_id::type_id,
    types::{Byte32, CellDep, LiveCell, Script},
};

use super::{existing_seal_lock, first_input, input_with_type};
use crate::{
    errors::{BuildError, BuildResult},
    payload::{AssetPayload, InputSelection, OutputSpec},
};

/// Content of a spore cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SporeData {
    /// MIME type of the content.
    pub content_type: String,

    /// The content bytes.
    pub content: Vec<u8>,

    /// The cluster the spore belongs to.
    pub cluster_id: Option<Byte32>,
}

impl SporeData {
    /// Serializes as the molecule table
    /// `{content_type: Bytes, content: Bytes, cluster_id: BytesOpt}`.
    pub fn encode(&self) -> Vec<u8> {
        let content_type: packed::Bytes = self.content_type.as_bytes().pack();
        let content: packed::Bytes = self.content.pack();
        let cluster_id = packed::BytesOpt::new_builder()
            .set(self.cluster_id.map(|id| id.as_bytes().as_slice().pack()))
            .build();

        table(&[
            content_type.as_slice(),
            content.as_slice(),
            cluster_id.as_slice(),
        ])
    }
}

/// Mints spores into the cluster sealed to `cluster`.
///
/// The cluster cell is re-sealed to binding output 1 with its capacity unchanged, followed by one
/// sealed spore per entry. Spore ids are the type ids of the first input at each spore's output
/// index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpores {
    /// The seal holding the cluster cell.
    pub cluster: SealReference,

    /// The cluster id, which is the cluster type args.
    pub cluster_id: Byte32,

    /// The spores to mint. Their `cluster_id` is overwritten with this cluster.
    pub spores: Vec<SporeData>,

    /// The lock of the typeless change output.
    pub change_lock: Script,
}

impl AssetPayload for CreateSpores {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Assets {
            locks: vec![existing_seal_lock(ctx, &self.cluster)?],
            type_: ctx.cluster_type(self.cluster_id.as_bytes().to_vec()),
        })
    }

    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        if self.spores.is_empty() {
            return Err(BuildError::InvalidPayload("no spore to create".to_string()));
        }

        let cluster_type = ctx.cluster_type(self.cluster_id.as_bytes().to_vec());
        let cluster = input_with_type(inputs, &cluster_type)?;
        let first = first_input(inputs)?.as_input();

        let mut outputs = Vec::with_capacity(self.spores.len() + 1);
        outputs.push(
            OutputSpec::sealed(cluster_type, cluster.cell.data.clone()).exact(cluster.cell.capacity),
        );

        for (i, spore) in self.spores.iter().enumerate() {
            let spore_id = type_id(&first, i as u64 + 1);
            let data = SporeData {
                cluster_id: Some(self.cluster_id),
                ..spore.clone()
            };

            outputs.push(OutputSpec::sealed(
                ctx.spore_type(spore_id.to_vec()),
                data.encode(),
            ));
        }

        Ok(outputs)
    }

    fn change_lock(&self) -> Option<Script> {
        Some(self.change_lock.clone())
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.cluster_dep(), ctx.spore_dep()]
    }

    fn allow_paymaster(&self) -> bool {
        true
    }
}

/// Moves a spore to binding output 1. The spore cell absorbs the fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpore {
    /// The seal holding the spore.
    pub from: SealReference,

    /// The spore type script.
    pub spore_type: Script,
}

impl AssetPayload for TransferSpore {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Assets {
            locks: vec![existing_seal_lock(ctx, &self.from)?],
            type_: self.spore_type.clone(),
        })
    }

    fn outputs(&self, _ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let spore = input_with_type(inputs, &self.spore_type)?;

        Ok(vec![OutputSpec::sealed(
            self.spore_type.clone(),
            spore.cell.data.clone(),
        )
        .remainder()])
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.spore_dep()]
    }
}

/// Leaps a spore to a ledger lock through a timed-unlock cell, which absorbs the fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeapSporeToLedger {
    /// The seal holding the spore.
    pub from: SealReference,

    /// The spore type script.
    pub spore_type: Script,

    /// The ledger lock the timed-unlock cell releases to.
    pub to_lock: Script,
}

impl AssetPayload for LeapSporeToLedger {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Assets {
            locks: vec![existing_seal_lock(ctx, &self.from)?],
            type_: self.spore_type.clone(),
        })
    }

    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let spore = input_with_type(inputs, &self.spore_type)?;
        let landing_lock = ctx.btc_time_lock(
            self.to_lock.clone(),
            ctx.protocol().btc_time_lock_confirmations,
            None,
        )?;

        Ok(vec![OutputSpec::locked(
            landing_lock,
            self.spore_type.clone(),
            spore.cell.data.clone(),
        )
        .remainder()])
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.spore_dep()]
    }
}

#[cfg(test)]
mod tests {
    use rgbpp_primitives::{
        packed::{parse_table, unpack_bytes},
        seal::{decode_seal, BtcTimeLockArgs},
    };
    use rgbpp_test_utils::{
        cells::{ckb, live_cell, out_point, txid},
        context::test_context,
        mocks::MockLedger,
    };

    use super::*;
    use crate::{builder::SealBuilder, payloads::ClusterData};

    fn spore(content: &[u8]) -> SporeData {
        SporeData {
            content_type: "text/plain".to_string(),
            content: content.to_vec(),
            cluster_id: None,
        }
    }

    fn cluster_cell(ctx: &NetworkContext, cluster_id: Byte32) -> LiveCell {
        let data = ClusterData {
            name: "Cluster".to_string(),
            description: "A test cluster".to_string(),
        };

        live_cell(
            out_point(0x60, 0),
            ckb(300),
            ctx.rgbpp_lock(1, Some(txid(0x06))).unwrap(),
            Some(ctx.cluster_type(cluster_id.as_bytes().to_vec())),
            data.encode(),
        )
    }

    #[tokio::test]
    async fn spores_get_sequential_type_ids() {
        let ctx = test_context();
        let cluster_id = Byte32::new([0x66; 32]);
        let cluster = cluster_cell(&ctx, cluster_id);
        let ledger = MockLedger::with_cells([cluster.clone()]);

        let payload = CreateSpores {
            cluster: SealReference::new(1, txid(0x06)),
            cluster_id,
            spores: vec![spore(b"first"), spore(b"second")],
            change_lock: ctx.secp256k1_lock([0x07; 20]),
        };
        let result = SealBuilder::new(&ctx, payload)
            .build_with(&ledger)
            .await
            .unwrap();
        let tx = result.tx.inner();
        let first = cluster.as_input();

        assert_eq!(tx.outputs.len(), 4);
        assert_eq!(tx.outputs[0].capacity, ckb(300));
        assert_eq!(tx.outputs_data[0], cluster.cell.data);

        for (i, content) in [b"first".as_slice(), b"second".as_slice()].into_iter().enumerate() {
            let index = i + 1;
            assert_eq!(
                tx.outputs[index].type_,
                Some(ctx.spore_type(type_id(&first, index as u64).to_vec()))
            );
            assert_eq!(
                decode_seal(&tx.outputs[index].lock.args).unwrap().out_index,
                index as u32 + 1
            );

            let expected = SporeData {
                cluster_id: Some(cluster_id),
                ..spore(content)
            };
            assert_eq!(tx.outputs_data[index], expected.encode());
        }

        assert!(result.needs_paymaster);
        assert_eq!(result.change_index, Some(3));
    }

    #[test]
    fn no_spores_is_invalid() {
        let ctx = test_context();
        let cluster_id = Byte32::new([0x66; 32]);
        let payload = CreateSpores {
            cluster: SealReference::new(1, txid(0x06)),
            cluster_id,
            spores: Vec::new(),
            change_lock: ctx.secp256k1_lock([0x07; 20]),
        };

        let err = SealBuilder::new(&ctx, payload)
            .build(&[cluster_cell(&ctx, cluster_id)])
            .unwrap_err();

        assert!(matches!(err, BuildError::InvalidPayload(_)));
    }

    #[test]
    fn spore_leap_lands_in_a_time_lock() {
        let ctx = test_context();
        let spore_type = ctx.spore_type(vec![0x67; 32]);
        let to_lock = ctx.secp256k1_lock([0x08; 20]);
        let cell = live_cell(
            out_point(0x61, 0),
            ckb(400),
            ctx.rgbpp_lock(2, Some(txid(0x06))).unwrap(),
            Some(spore_type.clone()),
            spore(b"leaping").encode(),
        );

        let payload = LeapSporeToLedger {
            from: SealReference::new(2, txid(0x06)),
            spore_type: spore_type.clone(),
            to_lock: to_lock.clone(),
        };
        let result = SealBuilder::new(&ctx, payload).build(&[cell.clone()]).unwrap();
        let tx = result.tx.inner();

        assert_eq!(tx.outputs.len(), 1);
        assert_eq!(tx.outputs[0].type_, Some(spore_type));
        assert_eq!(tx.outputs_data[0], cell.cell.data);
        assert_eq!(
            BtcTimeLockArgs::decode(&tx.outputs[0].lock.args)
                .unwrap()
                .lock_script,
            to_lock
        );
        assert_eq!(tx.outputs[0].capacity, ckb(400) - result.fee);
    }

    #[test]
    fn spore_transfer_reseals_to_output_one() {
        let ctx = test_context();
        let spore_type = ctx.spore_type(vec![0x68; 32]);
        let cell = live_cell(
            out_point(0x62, 0),
            ckb(400),
            ctx.rgbpp_lock(2, Some(txid(0x06))).unwrap(),
            Some(spore_type.clone()),
            spore(b"moving").encode(),
        );

        let payload = TransferSpore {
            from: SealReference::new(2, txid(0x06)),
            spore_type,
        };
        let result = SealBuilder::new(&ctx, payload).build(&[cell]).unwrap();
        let seal = decode_seal(&result.tx.inner().outputs[0].lock.args).unwrap();

        assert_eq!(seal.out_index, 1);
        assert!(seal.is_placeholder());
        assert!(!result.needs_paymaster);
    }

    #[test]
    fn spore_data_is_a_molecule_table() {
        let data = SporeData {
            cluster_id: Some(Byte32::new([0x03; 32])),
            ..spore(b"hello")
        };

        let encoded = data.encode();
        let fields = parse_table(&encoded, 3).unwrap();
        assert_eq!(unpack_bytes(fields[0]).unwrap(), b"text/plain");
        assert_eq!(unpack_bytes(fields[1]).unwrap(), b"hello");
        assert_eq!(unpack_bytes(fields[2]).unwrap(), vec![0x03; 32]);

        let unclustered = spore(b"hello").encode();
        assert!(parse_table(&unclustered, 3).unwrap()[2].is_empty());
    }
}
