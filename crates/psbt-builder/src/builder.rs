//! Assembling the binding transaction of a virtual transaction.

use bitcoin::{
    absolute::LockTime, transaction::Version, Amount, FeeRate, OutPoint, Psbt, ScriptBuf,
    Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use rgbpp_primitives::{
    bitcoin::BitcoinAddress,
    commitment::{verify_commitment, Commitment},
    context::NetworkContext,
    ledger_tx::VirtualTxResult,
    seal::decode_seal,
};
use rgbpp_rpc::{
    traits::{AssetsService, LedgerRpc},
    types::Utxo,
};
use tracing::{debug, info};

use crate::{
    errors::{PsbtError, PsbtResult},
    weight::signed_weight,
};

/// The binding-chain output paying the paymaster for covering the ledger-side shortfall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymasterOutput {
    /// Where the paymaster is paid.
    pub address: BitcoinAddress,

    /// How much.
    pub value: Amount,
}

/// An unsigned binding transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingPsbt {
    /// The PSBT, with a `witness_utxo` on every input.
    pub psbt: Psbt,

    /// The fee it pays.
    pub fee: Amount,

    /// Index of the change output, if change was not dust.
    pub change_index: Option<usize>,
}

impl BindingPsbt {
    /// The txid of the binding transaction. Signing does not change it, since every input is a
    /// segwit spend or is fixed by its script sig.
    pub fn txid(&self) -> Txid {
        self.psbt.unsigned_tx.compute_txid()
    }
}

/// Builds binding transactions for virtual transactions that consume seals.
#[derive(Debug, Clone)]
pub struct BindingTxBuilder<'a> {
    ctx: &'a NetworkContext,

    from: BitcoinAddress,

    receivers: Vec<BitcoinAddress>,

    paymaster: Option<PaymasterOutput>,

    fee_rate: Option<FeeRate>,

    only_confirmed: bool,
}

impl<'a> BindingTxBuilder<'a> {
    /// Creates a builder funding from, and returning change to, `from`.
    pub const fn new(ctx: &'a NetworkContext, from: BitcoinAddress) -> Self {
        Self {
            ctx,
            from,
            receivers: Vec::new(),
            paymaster: None,
            fee_rate: None,
            only_confirmed: true,
        }
    }

    /// Sets the owners of the new seals, in seal order. Seals without a receiver go to the
    /// sender.
    pub fn with_receivers(mut self, receivers: Vec<BitcoinAddress>) -> Self {
        self.receivers = receivers;
        self
    }

    /// Sets the paymaster output, added when the virtual transaction needs a paymaster.
    pub fn with_paymaster(mut self, paymaster: PaymasterOutput) -> Self {
        self.paymaster = Some(paymaster);
        self
    }

    /// Sets the fee rate. Without one, [`Self::build_from_service`] asks for the recommended
    /// rate.
    pub fn with_fee_rate(mut self, fee_rate: FeeRate) -> Self {
        self.fee_rate = Some(fee_rate);
        self
    }

    /// Whether unconfirmed UTXOs may fund the transaction. Defaults to confirmed only.
    pub fn with_only_confirmed(mut self, only_confirmed: bool) -> Self {
        self.only_confirmed = only_confirmed;
        self
    }

    /// Builds with the UTXOs, fee rate and paymaster the assets service reports, unless they were
    /// set on the builder.
    pub async fn build_from_service<L: LedgerRpc, A: AssetsService>(
        &self,
        result: &VirtualTxResult,
        ledger: &L,
        service: &A,
    ) -> PsbtResult<BindingPsbt> {
        let utxos = service.get_utxos(&self.from, self.only_confirmed).await?;

        let fee_rate = match self.fee_rate {
            Some(fee_rate) => fee_rate,
            None => {
                let fees = service.get_recommended_fees().await?;
                debug!(sat_per_vb = fees.fastest_fee, "using recommended fee rate");

                FeeRate::from_sat_per_vb(fees.fastest_fee).ok_or_else(|| {
                    PsbtError::InvalidFeeRate(format!("{} sat/vB", fees.fastest_fee))
                })?
            }
        };

        let mut builder = self.clone().with_fee_rate(fee_rate);
        if result.needs_paymaster && builder.paymaster.is_none() {
            let info = service
                .get_paymaster_info()
                .await
                .map_err(|e| PsbtError::CannotFindUtxo(format!("no paymaster: {e}")))?;
            let address = BitcoinAddress::parse(&info.btc_address, self.ctx.btc_network())?;

            builder = builder.with_paymaster(PaymasterOutput {
                address,
                value: info.value,
            });
        }

        builder.build(result, ledger, &utxos).await
    }

    /// Builds the binding transaction of `result`, funding it from `utxos`.
    ///
    /// `utxos` must contain the UTXOs of the seals the virtual transaction consumes.
    pub async fn build<L: LedgerRpc>(
        &self,
        result: &VirtualTxResult,
        ledger: &L,
        utxos: &[Utxo],
    ) -> PsbtResult<BindingPsbt> {
        // fail before touching the ledger
        verify_commitment(&result.commitment, result.tx.inner())?;

        let mut seals = Vec::new();
        for input in &result.tx.inner().inputs {
            let cell = ledger.get_live_cell(&input.previous_output).await?;
            if !self.ctx.is_rgbpp_lock(&cell.cell.lock) {
                continue;
            }

            let seal = decode_seal(&cell.cell.lock.args)?;
            let outpoint = seal.outpoint().ok_or_else(|| {
                PsbtError::InvalidVirtualTx(format!(
                    "input {} is sealed to an unbound output",
                    input.previous_output.tx_hash
                ))
            })?;

            if !seals.contains(&outpoint) {
                seals.push(outpoint);
            }
        }

        self.build_with_seals(result, &seals, utxos)
    }

    /// Builds the binding transaction of `result` spending `seals`, funding it from `utxos`.
    pub fn build_with_seals(
        &self,
        result: &VirtualTxResult,
        seals: &[OutPoint],
        utxos: &[Utxo],
    ) -> PsbtResult<BindingPsbt> {
        let fee_rate = self.checked_fee_rate()?;
        verify_commitment(&result.commitment, result.tx.inner())?;

        if seals.is_empty() {
            return Err(PsbtError::InvalidVirtualTx(
                "the virtual transaction consumes no seal".to_string(),
            ));
        }

        let mut prevouts = Vec::with_capacity(seals.len());
        for seal in seals {
            let utxo = utxos
                .iter()
                .find(|utxo| utxo.outpoint == *seal)
                .ok_or_else(|| PsbtError::CannotFindUtxo(format!("seal {seal}")))?;

            prevouts.push((utxo.outpoint, txout(utxo)));
        }

        let candidates = self.funding_candidates(seals, utxos);
        self.assemble(result, prevouts, candidates, fee_rate)
    }

    /// Replaces `previous` with a transaction paying the builder's fee rate, which must beat the
    /// rate `previous` pays.
    ///
    /// Every input of `previous` is kept, in order, so the replacement conflicts with it. Outputs
    /// are rebuilt the same way and change shrinks to pay the higher fee. When the kept inputs
    /// fall short, more funding is taken from `utxos`, never from the outputs of `previous`.
    pub fn bump_fee(
        &self,
        result: &VirtualTxResult,
        previous: &BindingPsbt,
        utxos: &[Utxo],
    ) -> PsbtResult<BindingPsbt> {
        let fee_rate = self.checked_fee_rate()?;
        let previous_tx = &previous.psbt.unsigned_tx;

        let carried = previous_tx
            .output
            .first()
            .and_then(|output| Commitment::from_script(&output.script_pubkey));
        if carried != Some(result.commitment) {
            return Err(PsbtError::InvalidVirtualTx(format!(
                "{} does not carry commitment {}",
                previous.txid(),
                result.commitment
            )));
        }

        let prevouts = previous_tx
            .input
            .iter()
            .zip(&previous.psbt.inputs)
            .map(|(txin, input)| {
                let prevout = input.witness_utxo.clone().ok_or_else(|| {
                    PsbtError::CannotFindUtxo(format!("no witness utxo for {}", txin.previous_output))
                })?;
                Ok((txin.previous_output, prevout))
            })
            .collect::<PsbtResult<Vec<_>>>()?;

        let previous_prevouts: Vec<TxOut> = prevouts.iter().map(|(_, out)| out.clone()).collect();
        let previous_weight = signed_weight(previous_tx, &previous_prevouts)?;
        let previous_rate = previous
            .fee
            .to_sat()
            .checked_mul(1000)
            .and_then(|fee| fee.checked_div(previous_weight.to_wu()))
            .map(FeeRate::from_sat_per_kwu)
            .ok_or_else(overflow)?;
        if fee_rate <= previous_rate {
            return Err(PsbtError::InvalidFeeRate(format!(
                "{} sat/kwu does not beat the replaced {} sat/kwu",
                fee_rate.to_sat_per_kwu(),
                previous_rate.to_sat_per_kwu()
            )));
        }

        let previous_txid = previous.txid();
        let spent: Vec<OutPoint> = prevouts.iter().map(|(outpoint, _)| *outpoint).collect();
        let fresh: Vec<Utxo> = utxos
            .iter()
            .filter(|utxo| utxo.outpoint.txid != previous_txid)
            .cloned()
            .collect();
        let candidates = self.funding_candidates(&spent, &fresh);

        let replacement = self.assemble(result, prevouts, candidates, fee_rate)?;
        if replacement.fee <= previous.fee {
            return Err(PsbtError::InvalidFeeRate(format!(
                "replacement fee {} does not beat {}",
                replacement.fee, previous.fee
            )));
        }

        info!(
            replaced = %previous_txid,
            txid = %replacement.txid(),
            previous_fee = %previous.fee,
            fee = %replacement.fee,
            "bumped binding transaction fee"
        );
        Ok(replacement)
    }

    fn checked_fee_rate(&self) -> PsbtResult<FeeRate> {
        let fee_rate = self
            .fee_rate
            .ok_or_else(|| PsbtError::InvalidFeeRate("no fee rate set".to_string()))?;
        if fee_rate == FeeRate::ZERO {
            return Err(PsbtError::InvalidFeeRate("zero".to_string()));
        }

        Ok(fee_rate)
    }

    /// Lays out the outputs of `result` after the fixed `inputs` and funds the rest from
    /// `candidates`, in order.
    fn assemble(
        &self,
        result: &VirtualTxResult,
        inputs: Vec<(OutPoint, TxOut)>,
        candidates: Vec<&Utxo>,
        fee_rate: FeeRate,
    ) -> PsbtResult<BindingPsbt> {
        let protocol = self.ctx.protocol();

        let (input, mut prevouts): (Vec<TxIn>, Vec<TxOut>) = inputs
            .into_iter()
            .map(|(outpoint, prevout)| (txin(outpoint), prevout))
            .unzip();

        let mut output = vec![TxOut {
            value: Amount::ZERO,
            script_pubkey: result.commitment.to_script(),
        }];

        let seal_count = new_seal_count(self.ctx, result)?;
        if self.receivers.len() > seal_count {
            return Err(PsbtError::InvalidVirtualTx(format!(
                "{} receivers for {seal_count} new seals",
                self.receivers.len()
            )));
        }
        for i in 0..seal_count {
            let receiver = self.receivers.get(i).unwrap_or(&self.from);
            output.push(TxOut {
                value: protocol.rgbpp_utxo_dust,
                script_pubkey: receiver.script_pubkey(),
            });
        }

        if result.needs_paymaster {
            let paymaster = self.paymaster.as_ref().ok_or_else(|| {
                PsbtError::CannotFindUtxo("the virtual transaction needs a paymaster".to_string())
            })?;

            output.push(TxOut {
                value: paymaster.value,
                script_pubkey: paymaster.address.script_pubkey(),
            });
        }

        check_dust(&output)?;

        let mut tx = Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input,
            output,
        };

        let change_script = self.from.script_pubkey();
        let outputs_value = sum_values(tx.output.iter().map(|out| out.value))?;

        let mut candidates = candidates.into_iter();
        let (fee, change_index) = loop {
            let inputs_value = sum_values(prevouts.iter().map(|prevout| prevout.value))?;
            let fee = fee_for(&tx, &prevouts, fee_rate)?;
            let required = outputs_value.checked_add(fee).ok_or_else(overflow)?;

            if inputs_value >= required {
                break self.settle_change(
                    &mut tx,
                    &prevouts,
                    (inputs_value, outputs_value),
                    fee,
                    fee_rate,
                    &change_script,
                )?;
            }

            let Some(utxo) = candidates.next() else {
                return Err(PsbtError::InsufficientUtxo {
                    required,
                    available: inputs_value,
                });
            };

            debug!(outpoint = %utxo.outpoint, value = %utxo.value, "selected funding utxo");
            tx.input.push(txin(utxo.outpoint));
            prevouts.push(txout(utxo));
        };

        let mut psbt = Psbt::from_unsigned_tx(tx)?;
        for (input, prevout) in psbt.inputs.iter_mut().zip(prevouts) {
            input.witness_utxo = Some(prevout);
        }

        let built = BindingPsbt {
            psbt,
            fee,
            change_index,
        };

        info!(
            txid = %built.txid(),
            inputs = built.psbt.inputs.len(),
            outputs = built.psbt.outputs.len(),
            %fee,
            commitment = %result.commitment,
            "built binding transaction"
        );
        Ok(built)
    }

    /// Adds a change output if what is left after the fee is not dust. Otherwise the remainder
    /// goes to the fee.
    fn settle_change(
        &self,
        tx: &mut Transaction,
        prevouts: &[TxOut],
        (inputs_value, outputs_value): (Amount, Amount),
        fee: Amount,
        fee_rate: FeeRate,
        change_script: &ScriptBuf,
    ) -> PsbtResult<(Amount, Option<usize>)> {
        tx.output.push(TxOut {
            value: Amount::ZERO,
            script_pubkey: change_script.clone(),
        });
        let fee_with_change = fee_for(tx, prevouts, fee_rate)?;

        let change = outputs_value
            .checked_add(fee_with_change)
            .and_then(|spent| inputs_value.checked_sub(spent))
            .filter(|change| *change >= self.ctx.protocol().btc_utxo_dust);

        match change {
            Some(change) => {
                let index = tx.output.len() - 1;
                tx.output[index].value = change;

                Ok((fee_with_change, Some(index)))
            }
            None => {
                tx.output.pop();
                let donated = inputs_value
                    .checked_sub(outputs_value)
                    .ok_or_else(overflow)?;
                debug!(%fee, %donated, "change is dust, donating it to the fee");

                Ok((donated, None))
            }
        }
    }

    /// UTXOs of the sender that may fund the transaction, largest first.
    ///
    /// Seals and UTXOs below the change dust limit are never picked, since they may carry other
    /// assets.
    fn funding_candidates<'u>(&self, seals: &[OutPoint], utxos: &'u [Utxo]) -> Vec<&'u Utxo> {
        let script = self.from.script_pubkey();
        let dust = self.ctx.protocol().btc_utxo_dust;

        let mut candidates: Vec<&Utxo> = utxos
            .iter()
            .filter(|utxo| utxo.script_pubkey == script)
            .filter(|utxo| !seals.contains(&utxo.outpoint))
            .filter(|utxo| utxo.confirmed || !self.only_confirmed)
            .filter(|utxo| utxo.value >= dust)
            .collect();

        candidates.sort_by(|a, b| {
            b.value
                .cmp(&a.value)
                .then_with(|| a.outpoint.txid.cmp(&b.outpoint.txid))
                .then_with(|| a.outpoint.vout.cmp(&b.outpoint.vout))
        });
        candidates
    }
}

/// Counts the new seals of `result`, checking they are numbered from binding output 1 without
/// gaps.
fn new_seal_count(ctx: &NetworkContext, result: &VirtualTxResult) -> PsbtResult<usize> {
    let mut count = 0usize;

    for (i, output) in result.tx.inner().outputs.iter().enumerate() {
        if ctx.is_rgbpp_lock(&output.lock) {
            let seal = decode_seal(&output.lock.args)?;
            if !seal.is_placeholder() {
                continue;
            }

            count += 1;
            if seal.out_index as usize != count {
                return Err(PsbtError::InvalidVirtualTx(format!(
                    "output {i} is sealed to binding output {}, expected {count}",
                    seal.out_index
                )));
            }
        } else if output.type_.is_some() && !ctx.is_btc_time_lock(&output.lock) {
            return Err(PsbtError::InvalidVirtualTx(format!(
                "typed output {i} is neither sealed nor time-locked"
            )));
        }
    }

    Ok(count)
}

fn check_dust(outputs: &[TxOut]) -> PsbtResult<()> {
    for (index, out) in outputs.iter().enumerate() {
        if out.script_pubkey.is_op_return() {
            continue;
        }

        let limit = out.script_pubkey.minimal_non_dust();
        if out.value < limit {
            return Err(PsbtError::DustOutput {
                index,
                value: out.value,
                limit,
            });
        }
    }

    Ok(())
}

fn fee_for(tx: &Transaction, prevouts: &[TxOut], fee_rate: FeeRate) -> PsbtResult<Amount> {
    let weight = signed_weight(tx, prevouts)?;
    fee_rate.fee_wu(weight).ok_or_else(overflow)
}

fn sum_values(mut values: impl Iterator<Item = Amount>) -> PsbtResult<Amount> {
    values
        .try_fold(Amount::ZERO, |acc, value| acc.checked_add(value))
        .ok_or_else(overflow)
}

fn overflow() -> PsbtError {
    PsbtError::InvalidVirtualTx("amount overflow".to_string())
}

fn txin(outpoint: OutPoint) -> TxIn {
    TxIn {
        previous_output: outpoint,
        script_sig: ScriptBuf::new(),
        sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
        witness: Witness::new(),
    }
}

fn txout(utxo: &Utxo) -> TxOut {
    TxOut {
        value: utxo.value,
        script_pubkey: utxo.script_pubkey.clone(),
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::hashes::Hash;
    use rgbpp_primitives::{
        seal::SealReference,
        token::encode_udt_amount,
        types::{LiveCell, Script},
    };
    use rgbpp_rpc::types::RecommendedFees;
    use rgbpp_test_utils::{
        binding::{signet_address, signet_taproot_address},
        cells::{ckb, live_cell, out_point, txid},
        context::test_context,
        mocks::{MockAssetsService, MockLedger},
    };
    use rgbpp_virtual_tx::{builder::SealBuilder, payloads::Transfer};

    use super::*;

    const SEAL_VOUT: u32 = 2;

    fn seal_cell(ctx: &NetworkContext, capacity: u64) -> LiveCell {
        let xudt = ctx.xudt_type(vec![0x09; 32]);

        live_cell(
            out_point(0x32, 0),
            capacity,
            ctx.rgbpp_lock(SEAL_VOUT, Some(txid(0x02))).unwrap(),
            Some(xudt),
            encode_udt_amount(3000).to_vec(),
        )
    }

    fn transfer(ctx: &NetworkContext, input: &LiveCell) -> VirtualTxResult {
        let payload = Transfer {
            from: vec![SealReference::new(SEAL_VOUT, txid(0x02))],
            xudt_type: ctx.xudt_type(vec![0x09; 32]),
            amounts: vec![1000, 2000],
            change_lock: ctx.secp256k1_lock([0x07; 20]),
        };

        SealBuilder::new(ctx, payload)
            .build(std::slice::from_ref(input))
            .unwrap()
    }

    fn utxo(seed: u8, vout: u32, sats: u64, confirmed: bool) -> Utxo {
        Utxo {
            outpoint: OutPoint::new(Txid::from_byte_array([seed; 32]), vout),
            value: Amount::from_sat(sats),
            script_pubkey: signet_address().script_pubkey(),
            confirmed,
        }
    }

    fn seal_utxo() -> Utxo {
        utxo(0x02, SEAL_VOUT, 546, true)
    }

    fn one_sat_per_vb() -> FeeRate {
        FeeRate::from_sat_per_vb(1).unwrap()
    }

    fn scenario(capacity: u64) -> (MockLedger, VirtualTxResult) {
        let ctx = test_context();
        let input = seal_cell(&ctx, capacity);
        let result = transfer(&ctx, &input);

        (MockLedger::with_cells([input]), result)
    }

    #[tokio::test]
    async fn outputs_follow_the_seal_order() {
        let ctx = test_context();
        let (ledger, result) = scenario(ckb(500));
        let receiver = signet_taproot_address();
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, true)];

        let built = BindingTxBuilder::new(&ctx, signet_address())
            .with_receivers(vec![receiver.clone()])
            .with_fee_rate(one_sat_per_vb())
            .build(&result, &ledger, &utxos)
            .await
            .unwrap();
        let tx = &built.psbt.unsigned_tx;

        assert_eq!(tx.output[0].value, Amount::ZERO);
        assert_eq!(
            Commitment::from_script(&tx.output[0].script_pubkey),
            Some(result.commitment)
        );
        assert_eq!(tx.output[1].script_pubkey, receiver.script_pubkey());
        assert_eq!(tx.output[2].script_pubkey, signet_address().script_pubkey());
        assert_eq!(tx.output[1].value, Amount::from_sat(546));
        assert_eq!(tx.output[2].value, Amount::from_sat(546));

        assert_eq!(tx.input[0].previous_output, seal_utxo().outpoint);
        assert_eq!(built.change_index, Some(3));
        assert!(built.psbt.inputs.iter().all(|input| input.witness_utxo.is_some()));

        let inputs = Amount::from_sat(546 + 50_000);
        let outputs = tx.output.iter().map(|out| out.value).sum::<Amount>();
        assert_eq!(inputs - outputs, built.fee);
    }

    #[tokio::test]
    async fn same_inputs_build_the_same_transaction() {
        let ctx = test_context();
        let (ledger, result) = scenario(ckb(500));
        let utxos = [
            seal_utxo(),
            utxo(0x11, 0, 20_000, true),
            utxo(0x10, 1, 50_000, true),
        ];
        let builder = BindingTxBuilder::new(&ctx, signet_address()).with_fee_rate(one_sat_per_vb());

        let first = builder.build(&result, &ledger, &utxos).await.unwrap();
        let second = builder.build(&result, &ledger, &utxos).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.txid(), second.txid());
    }

    #[test]
    fn largest_utxo_is_picked_first() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let utxos = [
            seal_utxo(),
            utxo(0x12, 0, 10_000, true),
            utxo(0x14, 0, 50_000, true),
            utxo(0x13, 5, 50_000, true),
        ];

        let built = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap();
        let tx = &built.psbt.unsigned_tx;

        assert_eq!(tx.input.len(), 2);
        assert_eq!(tx.input[1].previous_output, utxos[3].outpoint);
    }

    #[test]
    fn dust_change_goes_to_the_fee() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let utxos = [seal_utxo(), utxo(0x15, 0, 1_500, true)];

        let built = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap();

        assert_eq!(built.change_index, None);
        assert_eq!(built.psbt.unsigned_tx.output.len(), 3);
        // 546 + 1500 in, 3 x 546 out
        assert_eq!(built.fee, Amount::from_sat(2_046 - 1_092));
    }

    #[test]
    fn paymaster_is_required_when_flagged() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(320));
        assert!(result.needs_paymaster);
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, true)];

        let err = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap_err();

        assert!(matches!(err, PsbtError::CannotFindUtxo(_)));
    }

    #[test]
    fn paymaster_output_follows_the_seals() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(320));
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, true)];
        let paymaster = PaymasterOutput {
            address: signet_taproot_address(),
            value: Amount::from_sat(7_000),
        };

        let built = BindingTxBuilder::new(&ctx, signet_address())
            .with_paymaster(paymaster.clone())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap();
        let tx = &built.psbt.unsigned_tx;

        assert_eq!(tx.output[3].value, paymaster.value);
        assert_eq!(tx.output[3].script_pubkey, paymaster.address.script_pubkey());
        assert_eq!(built.change_index, Some(4));
    }

    #[test]
    fn missing_seal_utxo_is_reported() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));

        let err = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &[utxo(0x10, 0, 50_000, true)])
            .unwrap_err();

        assert!(matches!(err, PsbtError::CannotFindUtxo(_)));
    }

    #[test]
    fn unconfirmed_funding_is_skipped_by_default() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, false)];
        let builder = BindingTxBuilder::new(&ctx, signet_address()).with_fee_rate(one_sat_per_vb());

        let err = builder
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap_err();
        assert!(matches!(err, PsbtError::InsufficientUtxo { .. }));

        let built = builder
            .with_only_confirmed(false)
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap();
        assert_eq!(built.psbt.unsigned_tx.input.len(), 2);
    }

    #[test]
    fn tampered_commitment_is_rejected() {
        let ctx = test_context();
        let (_, mut result) = scenario(ckb(500));
        result.commitment = Commitment::from_bytes([0u8; 32]);

        let err = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &[seal_utxo()])
            .unwrap_err();

        assert!(matches!(err, PsbtError::CommitmentMismatch { .. }));
    }

    #[test]
    fn zero_fee_rate_is_rejected() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));

        let err = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(FeeRate::ZERO)
            .build_with_seals(&result, &[seal_utxo().outpoint], &[seal_utxo()])
            .unwrap_err();

        assert!(matches!(err, PsbtError::InvalidFeeRate(_)));
    }

    #[test]
    fn typed_output_under_a_plain_lock_is_rejected() {
        let ctx = test_context();
        let (_, mut result) = scenario(ckb(500));
        let tx = result.tx.inner_mut();
        tx.outputs[2].type_ = Some(Script::new(
            rgbpp_primitives::types::Byte32::new([0x42; 32]),
            rgbpp_primitives::types::ScriptHashType::Type,
            Vec::new(),
        ));
        result.commitment = tx.commitment().unwrap();

        let err = BindingTxBuilder::new(&ctx, signet_address())
            .with_fee_rate(one_sat_per_vb())
            .build_with_seals(&result, &[seal_utxo().outpoint], &[seal_utxo()])
            .unwrap_err();

        assert!(matches!(err, PsbtError::InvalidVirtualTx(_)));
    }

    #[tokio::test]
    async fn service_supplies_utxos_fees_and_paymaster() {
        let ctx = test_context();
        let (ledger, result) = scenario(ckb(320));
        let service = MockAssetsService::new()
            .with_utxos([seal_utxo(), utxo(0x10, 0, 50_000, true)])
            .with_paymaster(&signet_taproot_address(), Amount::from_sat(7_000))
            .with_fees(RecommendedFees {
                fastest_fee: 3,
                half_hour_fee: 2,
                hour_fee: 1,
                economy_fee: 1,
                minimum_fee: 1,
            });

        let built = BindingTxBuilder::new(&ctx, signet_address())
            .build_from_service(&result, &ledger, &service)
            .await
            .unwrap();
        let tx = &built.psbt.unsigned_tx;

        assert_eq!(tx.output[3].value, Amount::from_sat(7_000));
        let weight = crate::weight::signed_weight(
            tx,
            &built
                .psbt
                .inputs
                .iter()
                .filter_map(|input| input.witness_utxo.clone())
                .collect::<Vec<_>>(),
        )
        .unwrap();
        assert_eq!(
            built.fee,
            FeeRate::from_sat_per_vb(3).unwrap().fee_wu(weight).unwrap()
        );
    }

    fn at_rate(ctx: &NetworkContext, sat_per_vb: u64) -> BindingTxBuilder<'_> {
        BindingTxBuilder::new(ctx, signet_address())
            .with_fee_rate(FeeRate::from_sat_per_vb(sat_per_vb).unwrap())
    }

    #[test]
    fn fee_bump_keeps_the_replaced_inputs() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, true)];
        let seals = [seal_utxo().outpoint];

        let previous = at_rate(&ctx, 1)
            .build_with_seals(&result, &seals, &utxos)
            .unwrap();
        let bumped = at_rate(&ctx, 5).bump_fee(&result, &previous, &utxos).unwrap();

        let inputs = |built: &BindingPsbt| -> Vec<OutPoint> {
            built
                .psbt
                .unsigned_tx
                .input
                .iter()
                .map(|input| input.previous_output)
                .collect()
        };
        assert_eq!(inputs(&bumped), inputs(&previous));
        assert!(bumped
            .psbt
            .unsigned_tx
            .input
            .iter()
            .all(|input| input.sequence.is_rbf()));

        assert!(bumped.fee > previous.fee);
        assert_eq!(
            bumped.psbt.unsigned_tx.output[..3],
            previous.psbt.unsigned_tx.output[..3]
        );
        assert_eq!(bumped.change_index, previous.change_index);
        assert_ne!(bumped.txid(), previous.txid());
    }

    #[test]
    fn fee_bump_must_raise_the_rate() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, true)];

        let previous = at_rate(&ctx, 3)
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap();

        for rate in [1, 3] {
            let err = at_rate(&ctx, rate)
                .bump_fee(&result, &previous, &utxos)
                .unwrap_err();
            assert!(matches!(err, PsbtError::InvalidFeeRate(_)));
        }
    }

    #[test]
    fn fee_bump_never_funds_from_the_replaced_transaction() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let seals = [seal_utxo().outpoint];

        let previous = at_rate(&ctx, 1)
            .build_with_seals(&result, &seals, &[seal_utxo(), utxo(0x15, 0, 1_500, true)])
            .unwrap();
        assert_eq!(previous.change_index, None);

        let own_output = Utxo {
            outpoint: OutPoint::new(previous.txid(), 1),
            value: Amount::from_sat(900_000),
            script_pubkey: signet_address().script_pubkey(),
            confirmed: true,
        };
        let fresh = utxo(0x16, 0, 20_000, true);
        let utxos = [seal_utxo(), own_output, fresh.clone()];

        let bumped = at_rate(&ctx, 20).bump_fee(&result, &previous, &utxos).unwrap();
        let tx = &bumped.psbt.unsigned_tx;

        assert_eq!(tx.input.len(), 3);
        assert_eq!(tx.input[2].previous_output, fresh.outpoint);
    }

    #[test]
    fn fee_bump_rejects_an_unrelated_transaction() {
        let ctx = test_context();
        let (_, result) = scenario(ckb(500));
        let utxos = [seal_utxo(), utxo(0x10, 0, 50_000, true)];

        let mut previous = at_rate(&ctx, 1)
            .build_with_seals(&result, &[seal_utxo().outpoint], &utxos)
            .unwrap();
        previous.psbt.unsigned_tx.output[0].script_pubkey =
            Commitment::from_bytes([0u8; 32]).to_script();

        let err = at_rate(&ctx, 5)
            .bump_fee(&result, &previous, &utxos)
            .unwrap_err();

        assert!(matches!(err, PsbtError::InvalidVirtualTx(_)));
    }
}
