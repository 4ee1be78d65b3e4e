//! Binding-chain transaction and proof fixtures.

use bitcoin::{
    absolute::LockTime,
    key::TweakedPublicKey,
    secp256k1::{Secp256k1, SecretKey},
    transaction::Version,
    Address, Amount, KnownHrp, Network, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut,
    Witness,
};
use rgbpp_primitives::{bitcoin::BitcoinAddress, commitment::Commitment};
use rgbpp_rpc::types::SpvProof;

use crate::cells::{out_point, txid};

/// A signet P2WPKH address.
pub const SIGNET_ADDRESS: &str = "tb1qw508d6qejxtdg4y5r3zarvary0c5xw7kxpjzsx";

/// Parses [`SIGNET_ADDRESS`].
pub fn signet_address() -> BitcoinAddress {
    BitcoinAddress::parse(SIGNET_ADDRESS, Network::Signet).expect("fixture address must parse")
}

/// A signet P2TR address derived from a fixed key.
pub fn signet_taproot_address() -> BitcoinAddress {
    let secp = Secp256k1::new();
    let key = SecretKey::from_slice(&[0x11; 32]).expect("fixture key must be valid");
    let (xonly, _) = key.x_only_public_key(&secp);

    let address = Address::p2tr_tweaked(
        TweakedPublicKey::dangerous_assume_tweaked(xonly),
        KnownHrp::Testnets,
    );
    BitcoinAddress::from_address(address, Network::Signet).expect("fixture address must be signet")
}

/// A signed binding transaction carrying `commitment` in output 0 and `seal_outputs` seal
/// outputs of `value` each, paying to [`SIGNET_ADDRESS`].
pub fn binding_tx(commitment: &Commitment, seal_outputs: usize, value: Amount) -> Transaction {
    let script = signet_address().script_pubkey();

    let mut output = vec![TxOut {
        value: Amount::ZERO,
        script_pubkey: commitment.to_script(),
    }];
    output.extend((0..seal_outputs).map(|_| TxOut {
        value,
        script_pubkey: script.clone(),
    }));

    Transaction {
        version: Version::TWO,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(txid(0xaa), 1),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::ENABLE_RBF_NO_LOCKTIME,
            witness: Witness::from_slice(&[vec![0x30; 72], vec![0x02; 33]]),
        }],
        output,
    }
}

/// An SPV proof filled with `seed`, verified by a client cell at a fixed outpoint.
pub fn spv_proof(seed: u8) -> SpvProof {
    SpvProof {
        proof: vec![seed; 64],
        spv_client: out_point(0xee, 0),
    }
}
