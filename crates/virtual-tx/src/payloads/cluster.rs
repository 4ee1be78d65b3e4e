use ckb_types::{packed, prelude::*};
use rgbpp_primitives::{
    context::NetworkContext,
    packed::table,
    seal::SealReference,
    type_id::type_id,
    types::{CellDep, LiveCell},
};

use super::{existing_seal_lock, first_input};
use crate::{
    errors::BuildResult,
    payload::{AssetPayload, InputSelection, OutputSpec},
};

/// Content of a cluster cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterData {
    /// Cluster name.
    pub name: String,

    /// Free-form description.
    pub description: String,
}

impl ClusterData {
    /// Serializes as the molecule table `{name: Bytes, description: Bytes}`.
    pub fn encode(&self) -> Vec<u8> {
        let name: packed::Bytes = self.name.as_bytes().pack();
        let description: packed::Bytes = self.description.as_bytes().pack();

        table(&[name.as_slice(), description.as_slice()])
    }
}

/// Creates a cluster from the capacity cells sealed to `owner`.
///
/// The cluster id is the type id of the first input at output 0, and the cluster cell absorbs the
/// fee.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCluster {
    /// The seal the funding cells are locked to.
    pub owner: SealReference,

    /// The cluster content.
    pub cluster_data: ClusterData,
}

impl AssetPayload for CreateCluster {
    fn input_selection(&self, ctx: &NetworkContext) -> BuildResult<InputSelection> {
        Ok(InputSelection::Capacity {
            lock: existing_seal_lock(ctx, &self.owner)?,
        })
    }

    fn outputs(&self, ctx: &NetworkContext, inputs: &[LiveCell]) -> BuildResult<Vec<OutputSpec>> {
        let cluster_id = type_id(&first_input(inputs)?.as_input(), 0);

        Ok(vec![OutputSpec::sealed(
            ctx.cluster_type(cluster_id.to_vec()),
            self.cluster_data.encode(),
        )
        .remainder()])
    }

    fn cell_deps(&self, ctx: &NetworkContext) -> Vec<CellDep> {
        vec![ctx.cluster_dep()]
    }
}

#[cfg(test)]
mod tests {
    use rgbpp_test_utils::{
        cells::{capacity_cell, ckb, txid},
        context::test_context,
    };

    use super::*;
    use crate::builder::SealBuilder;

    #[test]
    fn cluster_id_is_type_id_of_first_input() {
        let ctx = test_context();
        let owner = SealReference::new(1, txid(0x05));
        let funding = capacity_cell(0x50, ckb(400), ctx.rgbpp_lock(1, Some(txid(0x05))).unwrap());
        let payload = CreateCluster {
            owner,
            cluster_data: ClusterData {
                name: "Cluster".to_string(),
                description: "A test cluster".to_string(),
            },
        };

        let result = SealBuilder::new(&ctx, payload.clone())
            .build(&[funding.clone()])
            .unwrap();
        let again = SealBuilder::new(&ctx, payload).build(&[funding.clone()]).unwrap();
        let tx = result.tx.inner();

        let cluster_id = type_id(&funding.as_input(), 0);
        assert_eq!(tx.outputs[0].type_, Some(ctx.cluster_type(cluster_id.to_vec())));
        assert_eq!(tx.outputs[0].capacity, ckb(400) - result.fee);
        assert_eq!(result.commitment, again.commitment);
    }

    #[test]
    fn cluster_data_layout() {
        let data = ClusterData {
            name: "ab".to_string(),
            description: "c".to_string(),
        };

        assert_eq!(
            data.encode(),
            vec![
                23, 0, 0, 0, 12, 0, 0, 0, 18, 0, 0, 0, 2, 0, 0, 0, b'a', b'b', 1, 0, 0, 0, b'c'
            ]
        );
    }
}
