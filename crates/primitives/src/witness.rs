//! Unlock witnesses for seal-locked and timed-unlock inputs.
//!
//! Both are molecule tables wrapped in the `lock` field of a `WitnessArgs`.

use ckb_types::{packed, prelude::*};

use crate::{
    constants::RGBPP_UNLOCK_VERSION,
    errors::{PrimitiveError, PrimitiveResult},
    packed::{parse_table, table, unpack_bytes, witness_args_with_lock},
    types::Witness,
};

/// The witness that unlocks seal-locked inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbppUnlock {
    /// Layout version, currently always zero.
    pub version: u16,

    /// Number of inputs of the ledger transaction.
    pub input_len: u8,

    /// Number of outputs of the ledger transaction.
    pub output_len: u8,

    /// The binding transaction, serialized without its segwit witnesses.
    pub btc_tx: Vec<u8>,

    /// The SPV proof of the binding transaction.
    pub proof: Vec<u8>,
}

impl RgbppUnlock {
    /// Creates an unlock for a ledger transaction with the given input and output counts.
    pub fn new(
        input_len: usize,
        output_len: usize,
        btc_tx: Vec<u8>,
        proof: Vec<u8>,
    ) -> PrimitiveResult<Self> {
        let input_len = u8::try_from(input_len)
            .map_err(|_| PrimitiveError::InvalidVirtualTx(format!("{input_len} inputs")))?;
        let output_len = u8::try_from(output_len)
            .map_err(|_| PrimitiveError::InvalidVirtualTx(format!("{output_len} outputs")))?;

        Ok(Self {
            version: RGBPP_UNLOCK_VERSION,
            input_len,
            output_len,
            btc_tx,
            proof,
        })
    }

    /// Serializes the molecule table.
    pub fn encode(&self) -> Vec<u8> {
        let btc_tx: packed::Bytes = self.btc_tx.pack();
        let proof: packed::Bytes = self.proof.pack();

        table(&[
            &self.version.to_le_bytes(),
            &[self.input_len, self.output_len],
            btc_tx.as_slice(),
            proof.as_slice(),
        ])
    }

    /// Parses the molecule table.
    pub fn decode(bytes: &[u8]) -> PrimitiveResult<Self> {
        let fields = parse_table(bytes, 4)?;

        let version = <[u8; 2]>::try_from(fields[0])
            .map(u16::from_le_bytes)
            .map_err(|_| PrimitiveError::MalformedArgs("unlock version".to_string()))?;
        let [input_len, output_len] = <[u8; 2]>::try_from(fields[1])
            .map_err(|_| PrimitiveError::MalformedArgs("unlock extra data".to_string()))?;

        Ok(Self {
            version,
            input_len,
            output_len,
            btc_tx: unpack_bytes(fields[2])?,
            proof: unpack_bytes(fields[3])?,
        })
    }

    /// Wraps the unlock into a witness slot.
    pub fn to_witness(&self) -> Witness {
        Witness::Bytes(witness_args_with_lock(&self.encode()))
    }
}

/// The witness that unlocks matured timed-unlock inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BtcTimeUnlock {
    /// The SPV proof of the binding transaction.
    pub proof: Vec<u8>,
}

impl BtcTimeUnlock {
    /// Serializes the molecule table.
    pub fn encode(&self) -> Vec<u8> {
        let proof: packed::Bytes = self.proof.pack();
        table(&[proof.as_slice()])
    }

    /// Wraps the unlock into a witness slot.
    pub fn to_witness(&self) -> Witness {
        Witness::Bytes(witness_args_with_lock(&self.encode()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlock_survives_witness_args() {
        let unlock = RgbppUnlock::new(2, 3, vec![0xde, 0xad], vec![0xbe, 0xef, 0x01]).unwrap();
        let Witness::Bytes(bytes) = unlock.to_witness() else {
            panic!("unlock must produce concrete witness bytes");
        };

        let args = packed::WitnessArgs::from_slice(&bytes).unwrap();
        let lock = args.lock().to_opt().unwrap().raw_data();
        let back = RgbppUnlock::decode(&lock).unwrap();

        assert_eq!(back, unlock);
        assert_eq!(back.version, 0);
    }

    #[test]
    fn unlock_header_layout() {
        let encoded = RgbppUnlock::new(1, 2, vec![], vec![]).unwrap().encode();

        // 5 header words, then version, then the two counts.
        assert_eq!(&encoded[20..22], &[0, 0]);
        assert_eq!(&encoded[22..24], &[1, 2]);
        assert_eq!(encoded.len(), 20 + 2 + 2 + 4 + 4);
    }

    #[test]
    fn too_many_inputs_are_rejected() {
        assert!(RgbppUnlock::new(256, 1, vec![], vec![]).is_err());
    }

    #[test]
    fn time_unlock_is_single_field_table() {
        let encoded = BtcTimeUnlock { proof: vec![7; 10] }.encode();
        let fields = parse_table(&encoded, 1).unwrap();

        assert_eq!(unpack_bytes(fields[0]).unwrap(), vec![7; 10]);
    }
}
